//! # specifier-rewrite
//!
//! Rewrites module specifiers in HTML and JavaScript responses on their way
//! out, so a browser can load `import { html } from "lit"` straight from a
//! dev server.
//!
//! ## The contract
//!
//! The middleware does not decide where a specifier should point. You hand it
//! a [`SpecifierResolver`], a function from `(base_url, specifier)` to a new
//! specifier or `None`. It does the rest:
//!
//! - **Content sniffing**: only `text/html` and JavaScript responses are
//!   touched. Everything else passes through unread.
//! - **Any body shape**: buffers, strings and streams are all materialized to
//!   text the same way.
//! - **Never breaks serving**: if a rewrite fails, the failure is logged and
//!   the original body goes out. No request ever fails because of this crate.
//!
//! Around it sits a small hyper-based host (router, static files, graceful
//! shutdown), enough to run a dev server.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use specifier_rewrite::{ModuleSpecifierTransform, Router, Server, files::serve_dir};
//!
//! fn resolve(_base_url: &str, specifier: &str) -> Option<String> {
//!     let bare = !specifier.starts_with(['.', '/']) && !specifier.contains("://");
//!     bare.then(|| format!("/node_modules/{specifier}/index.js"))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .get("/",        serve_dir("public"))
//!         .get("/{*path}", serve_dir("public"))
//!         .layer(ModuleSpecifierTransform::new(resolve));
//!
//!     Server::bind(([127, 0, 0, 1], 8080)).serve(app).await.unwrap();
//! }
//! ```

mod body;
mod config;
mod error;
mod handler;
mod request;
mod resolve;
mod response;
mod router;
mod server;
mod sniff;

pub mod files;
pub mod logger;
pub mod middleware;
pub mod rewrite;

pub use body::{Body, BodyStream};
pub use config::Options;
pub use error::{BoxError, Error};
pub use handler::{BoxFuture, Handler};
pub use logger::{Logger, TracingLogger};
pub use middleware::{Middleware, ModuleSpecifierTransform, Next};
pub use request::Request;
pub use resolve::{Fallible, SpecifierResolver, fallible};
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use sniff::SourceKind;
