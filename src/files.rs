//! Static file serving.
//!
//! [`serve_dir`] is the handler a dev server mounts under `/` and
//! `/{*path}`. Files go out as streamed bodies, so middleware that wants the
//! text has to drain them, and a large file that nobody rewrites is never
//! buffered.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::BytesMut;
use futures_util::stream;
use http::StatusCode;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::body::Body;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::{ContentType, Response};

const CHUNK_SIZE: usize = 16 * 1024;

/// Serves files below `root`.
///
/// `/` and paths ending in `/` map to `index.html` in that directory. Paths
/// that try to leave `root` get `404`, the same as missing files.
///
/// ```rust,no_run
/// use specifier_rewrite::{Router, files::serve_dir};
///
/// let app = Router::new()
///     .get("/", serve_dir("public"))
///     .get("/{*path}", serve_dir("public"));
/// ```
pub fn serve_dir(root: impl Into<PathBuf>) -> impl Handler {
    let root: PathBuf = root.into();
    let root: Arc<Path> = Arc::from(root);
    move |req: Request| {
        let root = Arc::clone(&root);
        async move { serve_file(&root, req.path()).await }
    }
}

async fn serve_file(root: &Path, request_path: &str) -> Response {
    let Some(path) = resolve_path(root, request_path) else {
        return Response::status(StatusCode::NOT_FOUND);
    };

    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %path.display(), "not served: {e}");
            return Response::status(StatusCode::NOT_FOUND);
        }
    };
    match file.metadata().await {
        Ok(meta) if meta.is_file() => {}
        _ => return Response::status(StatusCode::NOT_FOUND),
    }

    let content_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(ContentType::OctetStream, ContentType::from_extension);

    Response::builder().body(content_type, read_chunks(file))
}

/// Maps a URL path onto the filesystem below `root`.
fn resolve_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for component in Path::new(request_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if request_path.is_empty() || request_path.ends_with('/') {
        path.push("index.html");
    }
    Some(path)
}

fn read_chunks(file: File) -> Body {
    Body::from_stream(stream::try_unfold(file, |mut file| async move {
        let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
        match file.read_buf(&mut buf).await? {
            0 => Ok::<_, std::io::Error>(None),
            _ => Ok(Some((buf.freeze(), file))),
        }
    }))
}
