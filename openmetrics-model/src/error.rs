use thiserror::Error;

/// Errors raised while building metrics, labels, or snapshots, or while
/// registering collectors.
///
/// Validation happens up front: observation methods on the hot path never
/// return these. The only runtime sources are numeric sanity checks such as
/// a negative counter increment.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A metric or label name failed validation.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// An argument was out of range or otherwise unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A collector with the same family name is already registered.
    #[error("duplicate metric name: {0}")]
    DuplicateName(String),
}
