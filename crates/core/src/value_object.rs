//! Marker for domain values compared by content.

/// Marker trait for value objects.
///
/// A value object has no identity of its own: two stay periods covering the
/// same nights are interchangeable, unlike two guests who happen to share a
/// name. Implementors stay immutable; "changing" one means constructing a
/// new value, which keeps them safe to copy around and compare freely.
///
/// The supertraits are the floor for behaving like a value: cloneable,
/// compared by content, printable in test failures.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
