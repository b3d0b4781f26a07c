//! Process-wide logging setup shared by the stayforge binaries.

pub mod tracing;

pub use tracing::{init_with_format, LogFormat};

/// Install the default subscriber. Later calls are no-ops, so every binary
/// and test harness can call this unconditionally.
pub fn init() {
    tracing::init();
}
