//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Middleware registered with
//! [`Router::layer`] wraps every request, matched or not.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{Middleware, Next, Stack};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each builder call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    layers: Stack,
    fallback: BoxedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            layers: Arc::new([]),
            fallback: not_found.into_boxed_handler(),
        }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax, catch-alls `{*name}`:
    ///
    /// ```rust,no_run
    /// # use http::Method;
    /// # use specifier_rewrite::{Request, Response, Router};
    /// # async fn page(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET, "/pages/{name}", page)
    ///     .on(Method::GET, "/assets/{*path}", page);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered. Routes are fixed at startup, so this is a programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Shorthand for `on(Method::GET, …)`.
    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    /// Wraps every route in `middleware`. The first layer added is outermost.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        let mut layers = self.layers.to_vec();
        layers.push(Arc::new(middleware));
        self.layers = layers.into();
        self
    }

    /// Runs one request through the middleware stack and its handler.
    pub async fn call(&self, mut req: Request) -> Response {
        let endpoint = match self.lookup(&req.method, req.uri.path()) {
            Some((handler, params)) => {
                req.params = params;
                handler
            }
            None => Arc::clone(&self.fallback),
        };
        Next::new(Arc::clone(&self.layers), endpoint).run(req).await
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

async fn not_found(_req: Request) -> StatusCode {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;

    use super::*;
    use crate::handler::BoxFuture;

    fn get(uri: &str) -> Request {
        Request::from(http::Request::get(uri).body(Bytes::new()).unwrap())
    }

    struct Tag {
        name: &'static str,
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Tag {
        fn call(&self, req: Request, next: Next) -> BoxFuture {
            let name = self.name;
            let seen = Arc::clone(&self.seen);
            Box::pin(async move {
                seen.lock().unwrap().push(format!("{name} in"));
                let res = next.run(req).await;
                seen.lock().unwrap().push(format!("{name} out"));
                res
            })
        }
    }

    async fn hello(req: Request) -> String {
        format!("hello {}", req.param("name").unwrap_or("?"))
    }

    #[tokio::test]
    async fn params_reach_the_handler() {
        let app = Router::new().get("/hello/{name}", hello);
        let res = app.call(get("/hello/ada")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert!(matches!(res.body(), crate::Body::Text(t) if t == "hello ada"));
    }

    #[tokio::test]
    async fn unknown_paths_and_methods_fall_back_to_404() {
        let app = Router::new().get("/hello/{name}", hello);
        assert_eq!(app.call(get("/nope")).await.status_code(), StatusCode::NOT_FOUND);

        let post = Request::from(http::Request::post("/hello/ada").body(Bytes::new()).unwrap());
        assert_eq!(app.call(post).await.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn layers_nest_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .get("/hello/{name}", hello)
            .layer(Tag { name: "outer", seen: Arc::clone(&seen) })
            .layer(Tag { name: "inner", seen: Arc::clone(&seen) });

        app.call(get("/hello/x")).await;

        assert_eq!(*seen.lock().unwrap(), ["outer in", "inner in", "inner out", "outer out"]);
    }

    #[tokio::test]
    async fn layers_also_wrap_the_fallback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new().layer(Tag { name: "only", seen: Arc::clone(&seen) });

        let res = app.call(get("/missing")).await;

        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }
}
