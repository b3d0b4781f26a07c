use chrono::{DateTime, Utc};

/// Contract every persisted domain event implements.
///
/// The store never looks inside a payload; it needs a stable name for
/// routing, a schema version for future upcasting, and the business
/// timestamp. Events are facts: once appended they are never edited,
/// only superseded by later events.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted event name, stable across releases
    /// (for example "lodging.room.stay_reserved").
    fn event_type(&self) -> &'static str;

    /// Payload schema version, bumped whenever the serialized shape changes.
    fn version(&self) -> u32;

    /// When the fact became true at the property, not when it was stored.
    fn occurred_at(&self) -> DateTime<Utc>;
}
