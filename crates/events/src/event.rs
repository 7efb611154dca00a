use chrono::{DateTime, Utc};

/// A fact emitted by an aggregate once a command has been accepted.
///
/// The event type string is what notification routing and logs key on, so it
/// must stay stable once published (`"<module>.<aggregate>.<fact>"`).
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn event_type(&self) -> &'static str;

    /// Business time of the fact, not the time it was published.
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Payload schema revision. Bump when a field changes meaning.
    fn schema_version(&self) -> u32 {
        1
    }
}
