//! Wire field names and default values

/// Discriminant field present on every ARI event message.
pub const FIELD_TYPE: &str = "type";

/// Name of the Stasis application an event was delivered to.
pub const FIELD_APPLICATION: &str = "application";

/// ISO-8601 timestamp set by Asterisk when the event was raised.
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// Unique id of the Asterisk instance in a cluster (ARI 1.10+).
pub const FIELD_ASTERISK_ID: &str = "asterisk_id";

/// Default capacity of the inbound channel created by [`crate::pump::default_channel`].
///
/// One WebSocket rarely bursts more than a few hundred events between
/// handler runs; beyond this the transport side gets backpressure.
pub const DEFAULT_PUMP_QUEUE_SIZE: usize = 1000;

/// Separator used when building nested field paths in projection errors
/// (`channel.caller.name`).
pub const FIELD_PATH_SEPARATOR: char = '.';
