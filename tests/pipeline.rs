//! End-to-end behaviour of the rewrite middleware inside a router.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::stream;
use http::StatusCode;
use specifier_rewrite::{
    Body, BoxError, ContentType, Logger, ModuleSpecifierTransform, Options, Request, Response,
    Router, SpecifierResolver, fallible,
};

#[derive(Default)]
struct RecordingLogger {
    errors: Mutex<Vec<String>>,
}

impl Logger for RecordingLogger {
    fn error(&self, message: &dyn fmt::Display) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

impl RecordingLogger {
    fn count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

/// A resolver that maps a fixed table and counts every call.
fn table(pairs: &'static [(&'static str, &'static str)]) -> (Arc<AtomicUsize>, impl SpecifierResolver) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let resolver = move |_base: &str, specifier: &str| -> Option<String> {
        counter.fetch_add(1, Ordering::SeqCst);
        pairs.iter().find(|(from, _)| *from == specifier).map(|(_, to)| (*to).to_owned())
    };
    (calls, resolver)
}

fn get(uri: &str) -> Request {
    Request::from(http::Request::get(uri).body(Bytes::new()).unwrap())
}

async fn body_text(mut res: Response) -> String {
    res.body_mut().materialize().await.unwrap()
}

fn stream_of(parts: &[&'static str]) -> Body {
    let chunks: Vec<Result<Bytes, std::io::Error>> =
        parts.iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect();
    Body::from_stream(stream::iter(chunks))
}

#[tokio::test]
async fn html_module_script_is_resolved() {
    let (_, resolver) = table(&[("./a.js", "/resolved/a.js")]);
    let app = Router::new()
        .get("/", |_req: Request| async {
            Response::html(r#"<script type="module" src="./a.js"></script>"#)
        })
        .layer(ModuleSpecifierTransform::new(resolver));

    let res = app.call(get("/")).await;

    assert_eq!(res.status_code(), StatusCode::OK);
    let html = body_text(res).await;
    assert!(html.contains("/resolved/a.js"), "{html}");
    assert!(!html.contains("./a.js"), "{html}");
}

#[tokio::test]
async fn json_is_passed_through_without_resolving() {
    let (calls, resolver) = table(&[("./a.js", "/resolved/a.js")]);
    let app = Router::new()
        .get("/data.json", |_req: Request| async {
            Response::json(br#"{"import":"./a.js"}"#.to_vec())
        })
        .layer(ModuleSpecifierTransform::new(resolver));

    let res = app.call(get("/data.json")).await;

    assert_eq!(body_text(res).await, r#"{"import":"./a.js"}"#);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn streamed_javascript_is_rewritten_as_one_string() {
    let (_, resolver) = table(&[("./x.js", "/x-resolved.js")]);
    let app = Router::new()
        .get("/main.js", |_req: Request| async {
            Response::builder().javascript(stream_of(&["import x fr", "om \"./x.js\";"]))
        })
        .layer(ModuleSpecifierTransform::new(resolver));

    let res = app.call(get("/main.js")).await;

    assert!(matches!(res.body(), Body::Text(_)));
    assert_eq!(body_text(res).await, r#"import x from "/x-resolved.js";"#);
}

#[tokio::test]
async fn every_body_shape_rewrites_the_same() {
    let src = "import { a } from 'pkg';";
    let expected = "import { a } from '/node_modules/pkg';";

    for shape in ["bytes", "text", "stream"] {
        let (_, resolver) = table(&[("pkg", "/node_modules/pkg")]);
        let app = Router::new()
            .get("/m.js", move |_req: Request| async move {
                let body = match shape {
                    "bytes" => Body::from(Bytes::from_static(src.as_bytes())),
                    "text" => Body::from(src.to_owned()),
                    _ => stream_of(&["import { a } ", "from 'pkg';"]),
                };
                Response::builder().body(ContentType::JavaScript, body)
            })
            .layer(ModuleSpecifierTransform::new(resolver));

        let res = app.call(get("/m.js")).await;
        assert_eq!(body_text(res).await, expected, "{shape}");
    }
}

#[tokio::test]
async fn empty_html_never_reaches_the_resolver() {
    let (calls, resolver) = table(&[]);
    let app = Router::new()
        .get("/", |_req: Request| async { Response::html("") })
        .layer(ModuleSpecifierTransform::new(resolver));

    let res = app.call(get("/")).await;

    assert_eq!(body_text(res).await, "");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unresolved_specifiers_are_left_alone() {
    let (calls, resolver) = table(&[("lit", "/node_modules/lit/index.js")]);
    let app = Router::new()
        .get("/app.js", |_req: Request| async {
            Response::javascript("import './local.js';\nimport { html } from 'lit';\n")
        })
        .layer(ModuleSpecifierTransform::new(resolver));

    let res = app.call(get("/app.js")).await;

    assert_eq!(
        body_text(res).await,
        "import './local.js';\nimport { html } from '/node_modules/lit/index.js';\n",
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn resolver_sees_the_request_url() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let resolver = move |base: &str, specifier: &str| -> Option<String> {
        record.lock().unwrap().push((base.to_owned(), specifier.to_owned()));
        None
    };
    let app = Router::new()
        .get("/pages/{name}", |_req: Request| async { Response::javascript("export * from './shared.js';") })
        .layer(ModuleSpecifierTransform::new(resolver));

    app.call(get("/pages/home.js?v=7")).await;

    assert_eq!(
        *seen.lock().unwrap(),
        [("/pages/home.js?v=7".to_owned(), "./shared.js".to_owned())],
    );
}

#[tokio::test]
async fn failing_resolver_serves_the_original_and_logs_once() {
    let logger = Arc::new(RecordingLogger::default());
    let resolver = fallible(|_base: &str, specifier: &str| -> Result<Option<String>, BoxError> {
        Err(format!("no package named {specifier}").into())
    });
    let original = r#"<script type="module">import "missing-pkg";</script>"#;
    let app = Router::new()
        .get("/", move |_req: Request| async move { Response::html(original) })
        .layer(ModuleSpecifierTransform::with_options(
            resolver,
            Options::default().shared_logger(logger.clone()),
        ));

    let res = app.call(get("/")).await;

    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(body_text(res).await, original);
    assert_eq!(logger.count(), 1);
    assert!(logger.errors.lock().unwrap()[0].contains("missing-pkg"));
}

#[tokio::test]
async fn failing_stream_still_completes_the_response() {
    let logger = Arc::new(RecordingLogger::default());
    let (calls, resolver) = table(&[]);
    let app = Router::new()
        .get("/broken.js", |_req: Request| async {
            let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::from_static(b"import a from './a.js';")),
                Err(std::io::Error::other("upstream closed")),
            ];
            Response::builder().javascript(Body::from_stream(stream::iter(chunks)))
        })
        .layer(ModuleSpecifierTransform::with_options(
            resolver,
            Options::default().shared_logger(logger.clone()),
        ));

    let res = app.call(get("/broken.js")).await;

    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(body_text(res).await, "import a from './a.js';");
    assert_eq!(logger.count(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stub_collaborators_can_replace_the_defaults() {
    fn html_stub(src: &str, base: &str, resolver: &dyn SpecifierResolver) -> Result<String, BoxError> {
        let resolved = resolver.resolve(base, "stub")?.unwrap_or_default();
        Ok(format!("{src}<!-- {resolved} -->"))
    }
    fn never(_: &str, _: &str, _: &dyn SpecifierResolver) -> Result<String, BoxError> {
        Err("module collaborator must not run for html".into())
    }

    let (calls, resolver) = table(&[("stub", "/stubbed")]);
    let app = Router::new()
        .get("/", |_req: Request| async { Response::html("<p>x</p>") })
        .layer(ModuleSpecifierTransform::new(resolver).with_rewriters(html_stub, never));

    let res = app.call(get("/")).await;

    assert_eq!(body_text(res).await, "<p>x</p><!-- /stubbed -->");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn not_found_passes_through_untouched() {
    let (calls, resolver) = table(&[]);
    let app = Router::new().layer(ModuleSpecifierTransform::new(resolver));

    let res = app.call(get("/missing.js")).await;

    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
