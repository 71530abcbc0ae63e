use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Publish failed due to internal lock poisoning.
    #[error("event bus lock poisoned")]
    Poisoned,

    /// The transport behind the bus has shut down.
    #[error("event bus closed")]
    Closed,
}
