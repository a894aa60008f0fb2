//! Specifier resolution.
//!
//! A resolver decides what URL a module specifier should become. The
//! middleware has no opinion on that; it passes the resolver through to the
//! rewrite collaborators, which call it once per specifier they find.
//!
//! Any plain function or closure with the right shape is a resolver:
//!
//! ```rust
//! use specifier_rewrite::SpecifierResolver;
//!
//! fn node_modules(_base_url: &str, specifier: &str) -> Option<String> {
//!     let bare = !specifier.starts_with(['.', '/']) && !specifier.contains("://");
//!     bare.then(|| format!("/node_modules/{specifier}"))
//! }
//!
//! let resolved = node_modules.resolve("/index.html", "lit").unwrap();
//! assert_eq!(resolved.as_deref(), Some("/node_modules/lit"));
//! ```

use crate::error::BoxError;

/// Maps `(base_url, specifier)` to a replacement specifier.
///
/// `Ok(None)` leaves the specifier unchanged. An `Err` aborts the rewrite of
/// the whole body; the middleware then serves the body untouched.
///
/// Resolvers are shared by every in-flight request, hence `Send + Sync`.
pub trait SpecifierResolver: Send + Sync + 'static {
    fn resolve(&self, base_url: &str, specifier: &str) -> Result<Option<String>, BoxError>;
}

impl<F> SpecifierResolver for F
where
    F: Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
{
    fn resolve(&self, base_url: &str, specifier: &str) -> Result<Option<String>, BoxError> {
        Ok(self(base_url, specifier))
    }
}

/// Adapter for resolvers that can fail. Build one with [`fallible`].
pub struct Fallible<F>(F);

/// Wraps a function returning `Result<Option<String>, E>` as a resolver.
pub fn fallible<F, E>(f: F) -> Fallible<F>
where
    F: Fn(&str, &str) -> Result<Option<String>, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    Fallible(f)
}

impl<F, E> SpecifierResolver for Fallible<F>
where
    F: Fn(&str, &str) -> Result<Option<String>, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    fn resolve(&self, base_url: &str, specifier: &str) -> Result<Option<String>, BoxError> {
        (self.0)(base_url, specifier).map_err(Into::into)
    }
}
