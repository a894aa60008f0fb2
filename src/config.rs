//! Construction-time options for
//! [`ModuleSpecifierTransform`](crate::middleware::ModuleSpecifierTransform).

use std::fmt;
use std::sync::Arc;

use crate::logger::{Logger, TracingLogger};

/// Options for the rewrite middleware. `logger` is the only one.
///
/// ```rust
/// use specifier_rewrite::{Options, logger::Silent};
///
/// let quiet = Options::default().logger(Silent);
/// ```
#[derive(Clone)]
pub struct Options {
    pub(crate) logger: Arc<dyn Logger>,
}

impl Options {
    /// Where rewrite failures are reported. Defaults to [`TracingLogger`].
    pub fn logger(mut self, logger: impl Logger) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Like [`logger`](Self::logger), for a logger the caller keeps a handle
    /// to.
    pub fn shared_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self { logger: Arc::new(TracingLogger) }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options").finish_non_exhaustive()
    }
}
