//! Content sniffing: which responses carry rewritable source.
//!
//! Only the declared `content-type` is consulted; the body is never peeked.
//! Parameters such as `charset` are ignored and the comparison is
//! case-insensitive, so `Text/HTML; charset=utf-8` is HTML.

/// The two families of source the rewrite middleware understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SourceKind {
    Html,
    JavaScript,
}

impl SourceKind {
    /// Classifies a `content-type` header value.
    ///
    /// Returns `None` for anything that is neither HTML nor JavaScript.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        let (ty, subtype) = essence.split_once('/')?;
        let ty = ty.trim().to_ascii_lowercase();
        let subtype = subtype.trim().to_ascii_lowercase();

        match (ty.as_str(), subtype.as_str()) {
            ("text", "html") | ("application", "xhtml+xml") => Some(Self::Html),
            ("text" | "application", "javascript" | "x-javascript" | "ecmascript" | "x-ecmascript") => {
                Some(Self::JavaScript)
            }
            ("text" | "application", s) if s.ends_with("+javascript") => Some(Self::JavaScript),
            _ => None,
        }
    }
}
