//! Specifier rewriting for HTML documents, built on `lol_html`.
//!
//! Three shapes are rewritten:
//!
//! - `<script type="module" src="…">`: the `src` value is resolved.
//! - `<script type="module">…</script>`: the inline body goes through the
//!   module rewriter.
//! - `<link rel="modulepreload" href="…">`: the `href` value is resolved.
//!
//! Tokenizing is left to `lol_html`, so comments, raw text (`<style>`,
//! classic scripts) and RCDATA (`<title>`, `<textarea>`) are never mistaken
//! for markup. Tags nothing resolves are copied byte for byte.

use std::mem;

use lol_html::html_content::{ContentType, Element};
use lol_html::errors::RewritingError;
use lol_html::{HandlerResult, RewriteStrSettings, element, rewrite_str, text};

use crate::error::BoxError;
use crate::resolve::SpecifierResolver;

use super::module::rewrite_module;
use super::{Rewrite, resolve};

const MODULE_SRC: &str = r#"script[type="module" i][src]"#;
const MODULE_INLINE: &str = r#"script[type="module" i]:not([src])"#;
const MODULE_PRELOAD: &str = r#"link[rel~="modulepreload" i][href]"#;

/// The default HTML collaborator.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlRewriter;

impl Rewrite for HtmlRewriter {
    fn rewrite(
        &self,
        source: &str,
        base_url: &str,
        resolver: &dyn SpecifierResolver,
    ) -> Result<String, BoxError> {
        rewrite_html(source, base_url, resolver)
    }
}

/// Handler errors come back as they were raised, so a failing resolver is
/// still a [`RewriteError`](super::RewriteError) to the caller.
pub(crate) fn rewrite_html(
    source: &str,
    base_url: &str,
    resolver: &dyn SpecifierResolver,
) -> Result<String, BoxError> {
    // Inline module text can arrive in several chunks; it is rewritten once
    // the last one is seen.
    let mut inline = String::new();

    let settings = RewriteStrSettings {
        element_content_handlers: vec![
            element!(MODULE_SRC, |el| rewrite_attr(el, "src", base_url, resolver)),
            element!(MODULE_PRELOAD, |el| rewrite_attr(el, "href", base_url, resolver)),
            text!(MODULE_INLINE, |chunk| {
                inline.push_str(chunk.as_str());
                if !chunk.last_in_text_node() {
                    chunk.remove();
                    return Ok(());
                }
                let body = mem::take(&mut inline);
                if !body.is_empty() {
                    let rewritten = rewrite_module(&body, base_url, resolver)?;
                    chunk.replace(&rewritten, ContentType::Html);
                }
                Ok(())
            }),
        ],
        ..RewriteStrSettings::new()
    };

    rewrite_str(source, settings).map_err(|e| match e {
        RewritingError::ContentHandlerError(inner) => inner,
        other => other.into(),
    })
}

/// Resolves the entity-decoded value of `name` and writes it back encoded.
/// An unresolved value leaves the tag untouched.
fn rewrite_attr(
    el: &mut Element<'_, '_>,
    name: &str,
    base_url: &str,
    resolver: &dyn SpecifierResolver,
) -> HandlerResult {
    let Some(raw) = el.get_attribute(name) else {
        return Ok(());
    };
    let specifier = html_escape::decode_html_entities(&raw);
    if let Some(resolved) = resolve(resolver, base_url, &specifier)? {
        el.set_attribute(name, &html_escape::encode_double_quoted_attribute(&resolved))?;
    }
    Ok(())
}
