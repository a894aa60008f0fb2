//! Module-specifier rewriting for HTML and JavaScript responses.
//!
//! After the rest of the pipeline has produced a response, this middleware
//! does three things in order:
//!
//! 1. **Gate** on the declared content type. Anything outside the HTML and
//!    JavaScript families passes through without its body being read, as
//!    does a body with a `Content-Encoding` other than `identity`.
//! 2. **Materialize** the body to text (see [`Body::materialize`]). An empty
//!    body passes through.
//! 3. **Dispatch** to the HTML or module collaborator with the request URL as
//!    base and the caller's resolver. On success the body becomes the
//!    collaborator's output.
//!
//! A failure in step 2 or 3 is reported once to the configured logger and the
//! response goes out with the body it had before the rewrite was attempted.
//! A stream that fails part way leaves only what was read, so its
//! `Content-Length` is dropped along with it.
//! Nothing this middleware does can turn a response into an error response.
//!
//! [`Body::materialize`]: crate::Body::materialize

use std::sync::Arc;

use http::header;

use crate::config::Options;
use crate::error::Error;
use crate::handler::BoxFuture;
use crate::logger::Logger;
use crate::request::Request;
use crate::resolve::SpecifierResolver;
use crate::response::Response;
use crate::rewrite::{HtmlRewriter, ModuleRewriter, Rewrite};
use crate::sniff::SourceKind;

use super::{Middleware, Next};

/// Rewrites module specifiers in HTML and JavaScript responses.
///
/// ```rust
/// use specifier_rewrite::{ModuleSpecifierTransform, Router};
///
/// let bare_to_node_modules = |_base: &str, specifier: &str| -> Option<String> {
///     let bare = !specifier.starts_with(['.', '/']) && !specifier.contains("://");
///     bare.then(|| format!("/node_modules/{specifier}"))
/// };
///
/// let app = Router::new().layer(ModuleSpecifierTransform::new(bare_to_node_modules));
/// ```
#[derive(Clone)]
pub struct ModuleSpecifierTransform {
    resolver: Arc<dyn SpecifierResolver>,
    logger: Arc<dyn Logger>,
    html: Arc<dyn Rewrite>,
    module: Arc<dyn Rewrite>,
}

impl ModuleSpecifierTransform {
    /// Builds the middleware with default [`Options`].
    pub fn new(resolver: impl SpecifierResolver) -> Self {
        Self::with_options(resolver, Options::default())
    }

    pub fn with_options(resolver: impl SpecifierResolver, options: Options) -> Self {
        Self {
            resolver: Arc::new(resolver),
            logger: options.logger,
            html: Arc::new(HtmlRewriter),
            module: Arc::new(ModuleRewriter),
        }
    }

    /// Replaces the HTML and JavaScript-module collaborators.
    pub fn with_rewriters(mut self, html: impl Rewrite, module: impl Rewrite) -> Self {
        self.html = Arc::new(html);
        self.module = Arc::new(module);
        self
    }

    async fn transform(&self, base_url: &str, res: &mut Response) {
        let Some(kind) = res.content_type().and_then(SourceKind::from_content_type) else {
            return;
        };
        if is_encoded(res) {
            return;
        }

        let source = match res.body_mut().materialize().await {
            Ok(source) => source,
            Err(e) => {
                res.headers_mut().remove(header::CONTENT_LENGTH);
                self.logger.error(&e);
                return;
            }
        };
        if source.is_empty() {
            return;
        }

        let rewriter = match kind {
            SourceKind::Html => &self.html,
            SourceKind::JavaScript => &self.module,
        };
        match rewriter.rewrite(&source, base_url, self.resolver.as_ref()) {
            Ok(rewritten) => res.set_body(rewritten),
            Err(e) => self.logger.error(&Error::Rewrite(e)),
        }
    }
}

fn is_encoded(res: &Response) -> bool {
    res.headers()
        .get(header::CONTENT_ENCODING)
        .is_some_and(|v| !v.as_bytes().trim_ascii().eq_ignore_ascii_case(b"identity"))
}

impl Middleware for ModuleSpecifierTransform {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let this = self.clone();
        Box::pin(async move {
            let base_url = req.url().to_owned();
            let mut res = next.run(req).await;
            this.transform(&base_url, &mut res).await;
            res
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use futures_util::stream;
    use http::header::HeaderValue;

    use super::*;
    use crate::body::Body;
    use crate::error::BoxError;
    use crate::response::ContentType;

    #[derive(Default)]
    struct Recording {
        errors: Mutex<Vec<String>>,
    }

    impl Logger for Recording {
        fn error(&self, message: &dyn fmt::Display) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    impl Recording {
        fn errors(&self) -> Vec<String> {
            self.errors.lock().unwrap().clone()
        }
    }

    fn counting() -> (Arc<AtomicUsize>, impl SpecifierResolver) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resolver = move |_base: &str, specifier: &str| -> Option<String> {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(format!("/resolved/{specifier}"))
        };
        (calls, resolver)
    }

    fn shouting(source: &str, _base: &str, _r: &dyn SpecifierResolver) -> Result<String, BoxError> {
        Ok(source.to_uppercase())
    }

    fn exploding(_: &str, _: &str, _: &dyn SpecifierResolver) -> Result<String, BoxError> {
        Err("collaborator exploded".into())
    }

    fn transform_with(logger: &Arc<Recording>) -> ModuleSpecifierTransform {
        let (_, resolver) = counting();
        ModuleSpecifierTransform::with_options(resolver, Options::default().shared_logger(logger.clone()))
    }

    fn text_of(res: &Response) -> String {
        match res.body() {
            Body::Text(t) => t.clone(),
            Body::Bytes(b) => String::from_utf8(b.to_vec()).unwrap(),
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[tokio::test]
    async fn other_content_types_are_not_read() {
        let (calls, resolver) = counting();
        let mw = ModuleSpecifierTransform::new(resolver);
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![Ok(Bytes::from_static(b"{\"import\":1}"))];
        let mut res = Response::builder().body(ContentType::Json, Body::from_stream(stream::iter(chunks)));

        mw.transform("/data.json", &mut res).await;

        assert!(res.body().is_stream());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_content_type_is_skipped() {
        let (calls, resolver) = counting();
        let mw = ModuleSpecifierTransform::new(resolver);
        let mut res = Response::builder().raw("import 'a';");

        mw.transform("/", &mut res).await;

        assert_eq!(text_of(&res), "import 'a';");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_body_is_left_alone() {
        let (calls, resolver) = counting();
        let logger = Arc::new(Recording::default());
        let mw = ModuleSpecifierTransform::with_options(resolver, Options::default().shared_logger(logger.clone()))
            .with_rewriters(exploding, exploding);
        let mut res = Response::builder().body(ContentType::Html, Body::Empty);

        mw.transform("/", &mut res).await;

        assert!(matches!(res.body(), Body::Empty));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(logger.errors().is_empty());
    }

    #[tokio::test]
    async fn successful_rewrite_replaces_the_body() {
        let logger = Arc::new(Recording::default());
        let mw = transform_with(&logger).with_rewriters(shouting, exploding);
        let mut res = Response::builder()
            .header(header::CONTENT_LENGTH, HeaderValue::from_static("9"))
            .html("<p>hi</p>");

        mw.transform("/", &mut res).await;

        assert_eq!(text_of(&res), "<P>HI</P>");
        assert!(res.headers().get(header::CONTENT_LENGTH).is_none());
        assert!(logger.errors().is_empty());
    }

    #[tokio::test]
    async fn dispatch_follows_the_content_type() {
        let logger = Arc::new(Recording::default());
        let mw = transform_with(&logger).with_rewriters(exploding, shouting);
        let mut res = Response::javascript("export {}");

        mw.transform("/", &mut res).await;

        assert_eq!(text_of(&res), "EXPORT {}");
    }

    #[tokio::test]
    async fn collaborator_failure_keeps_the_original_body() {
        let logger = Arc::new(Recording::default());
        let mw = transform_with(&logger).with_rewriters(exploding, exploding);
        let mut res = Response::javascript("import 'a';");

        mw.transform("/", &mut res).await;

        assert_eq!(text_of(&res), "import 'a';");
        let errors = logger.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("collaborator exploded"), "{errors:?}");
    }

    #[tokio::test]
    async fn failing_stream_is_logged_once() {
        let logger = Arc::new(Recording::default());
        let mw = transform_with(&logger).with_rewriters(shouting, shouting);
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"import ")),
            Err(std::io::Error::other("disk went away")),
        ];
        let mut res = Response::builder().javascript(Body::from_stream(stream::iter(chunks)));

        mw.transform("/", &mut res).await;

        assert_eq!(text_of(&res), "import ");
        let errors = logger.errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("disk went away"), "{errors:?}");
    }

    #[tokio::test]
    async fn failing_stream_drops_the_declared_length() {
        let logger = Arc::new(Recording::default());
        let mw = transform_with(&logger);
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"import a ")),
            Err(std::io::Error::other("gone")),
        ];
        let mut res = Response::builder()
            .header(header::CONTENT_LENGTH, HeaderValue::from_static("23"))
            .javascript(Body::from_stream(stream::iter(chunks)));

        mw.transform("/", &mut res).await;

        assert_eq!(text_of(&res), "import a ");
        assert!(res.headers().get(header::CONTENT_LENGTH).is_none());
        assert_eq!(logger.errors().len(), 1);
    }

    #[tokio::test]
    async fn encoded_bodies_are_not_read() {
        let (calls, resolver) = counting();
        let mw = ModuleSpecifierTransform::new(resolver);
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![Ok(Bytes::from_static(b"\x1f\x8b\x08"))];
        let mut res = Response::builder()
            .header(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"))
            .javascript(Body::from_stream(stream::iter(chunks)));

        mw.transform("/app.js", &mut res).await;

        assert!(res.body().is_stream());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn identity_encoding_is_still_rewritten() {
        let logger = Arc::new(Recording::default());
        let mw = transform_with(&logger);
        let mut res = Response::builder()
            .header(header::CONTENT_ENCODING, HeaderValue::from_static("identity"))
            .javascript("import 'a';");

        mw.transform("/", &mut res).await;

        assert_eq!(text_of(&res), "import '/resolved/a';");
    }

    #[tokio::test]
    async fn collaborator_sees_base_url_and_resolver() {
        let logger = Arc::new(Recording::default());
        let via_resolver = |source: &str, base: &str, r: &dyn SpecifierResolver| -> Result<String, BoxError> {
            Ok(r.resolve(base, source.trim())?.unwrap_or_else(|| source.to_owned()))
        };
        let resolver = |base: &str, specifier: &str| -> Option<String> { Some(format!("{base}#{specifier}")) };
        let mw = ModuleSpecifierTransform::with_options(resolver, Options::default().shared_logger(logger.clone()))
            .with_rewriters(via_resolver, via_resolver);
        let mut res = Response::javascript("lit");

        mw.transform("/src/app.js?t=1", &mut res).await;

        assert_eq!(text_of(&res), "/src/app.js?t=1#lit");
    }
}
