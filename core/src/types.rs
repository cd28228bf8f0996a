//! Shared primitive types used across the entire core.

/// Wall-clock milliseconds since the Unix epoch.
pub type Millis = i64;

/// The unique key of a player's profile (a chosen display name).
pub type Identity = String;

/// Identifier of an entry in the variant catalog.
pub type VariantId = u32;
