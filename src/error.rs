//! Unified error type.

use thiserror::Error;

/// Boxed error used wherever a foreign failure crosses a crate boundary:
/// body streams, resolvers, and rewrite collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type returned by specifier-rewrite's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures (binding to a port or accepting a connection) and
/// the two ways a rewrite attempt can fail. The rewrite middleware never lets
/// the latter escape; it hands them to its [`Logger`](crate::Logger).
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// The response body stream failed before it was fully drained.
    #[error("failed to read response body: {0}")]
    Body(#[source] BoxError),

    /// The HTML or JavaScript collaborator rejected the body.
    #[error("failed to rewrite module specifiers: {0}")]
    Rewrite(#[source] BoxError),
}
