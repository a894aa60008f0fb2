//! Minimal dev server: static files with bare specifiers mapped to
//! `/node_modules`.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example dev_server -- ./public
//!
//! Try:
//!   echo '<script type="module">import "lit";</script>' > public/index.html
//!   curl http://localhost:8080/

use std::path::PathBuf;

use specifier_rewrite::{ModuleSpecifierTransform, Router, Server, files::serve_dir};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let root: PathBuf = std::env::args_os().nth(1).map_or_else(|| "public".into(), PathBuf::from);

    let app = Router::new()
        .get("/",        serve_dir(root.clone()))
        .get("/{*path}", serve_dir(root))
        .layer(ModuleSpecifierTransform::new(node_modules));

    Server::bind(([127, 0, 0, 1], 8080))
        .serve(app)
        .await
        .expect("server error");
}

// lit          → /node_modules/lit/index.js
// lit/html.js  → /node_modules/lit/html.js
// ./a.js, /b.js, https://… are left alone.
fn node_modules(_base_url: &str, specifier: &str) -> Option<String> {
    if specifier.starts_with(['.', '/']) || specifier.contains("://") {
        return None;
    }
    let scoped = specifier.starts_with('@');
    let has_subpath = specifier.matches('/').count() > usize::from(scoped);
    if has_subpath {
        Some(format!("/node_modules/{specifier}"))
    } else {
        Some(format!("/node_modules/{specifier}/index.js"))
    }
}
