//! Specifier rewriting collaborators.
//!
//! The middleware does not know how to find specifiers; it hands the body to
//! a [`Rewrite`] implementation for the body's family. [`HtmlRewriter`] runs
//! on `lol_html`. [`ModuleRewriter`] is a lexical scanner that skips comments
//! and literals well enough to find `import`/`export` specifiers, but does
//! not build a syntax tree. Swap in a real parser through
//! [`ModuleSpecifierTransform::with_rewriters`](crate::middleware::ModuleSpecifierTransform::with_rewriters)
//! if you need one.

mod html;
mod module;

pub use html::HtmlRewriter;
pub use module::ModuleRewriter;

use thiserror::Error;

use crate::error::BoxError;
use crate::resolve::SpecifierResolver;

/// Rewrites every specifier in `source` through `resolver`.
///
/// Implemented for any function or closure of the same shape, which is the
/// easy way to stub a collaborator in tests.
pub trait Rewrite: Send + Sync + 'static {
    fn rewrite(
        &self,
        source: &str,
        base_url: &str,
        resolver: &dyn SpecifierResolver,
    ) -> Result<String, BoxError>;
}

impl<F> Rewrite for F
where
    F: Fn(&str, &str, &dyn SpecifierResolver) -> Result<String, BoxError> + Send + Sync + 'static,
{
    fn rewrite(
        &self,
        source: &str,
        base_url: &str,
        resolver: &dyn SpecifierResolver,
    ) -> Result<String, BoxError> {
        self(source, base_url, resolver)
    }
}

/// Why a default rewriter gave up on a body.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("unterminated {what} starting at byte {offset}")]
    Unterminated { what: &'static str, offset: usize },

    #[error("resolver failed for `{specifier}`: {source}")]
    Resolve {
        specifier: String,
        #[source]
        source: BoxError,
    },
}

/// Runs `specifier` through the resolver, tagging failures with it.
fn resolve(
    resolver: &dyn SpecifierResolver,
    base_url: &str,
    specifier: &str,
) -> Result<Option<String>, RewriteError> {
    resolver
        .resolve(base_url, specifier)
        .map_err(|source| RewriteError::Resolve { specifier: specifier.to_owned(), source })
}
