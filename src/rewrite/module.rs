//! Lexical specifier rewriting for JavaScript modules.
//!
//! Two passes. The lexer splits the source into significant tokens, skipping
//! whitespace and comments and swallowing string, template and regex literals
//! whole so nothing inside them is mistaken for code. The second pass walks
//! the tokens looking for the four places a module specifier can appear:
//!
//! ```text
//! import "x";                  side-effect import
//! import a, { b } from "x";    static import
//! export * from "x";           re-export
//! import("x")                  dynamic import with a literal argument
//! ```
//!
//! Only the text between the quotes is replaced; everything else is copied
//! byte for byte.
//!
//! A `/` is read as a regex where an expression may start: after operators,
//! expression keywords, a block's `}` or the `)` of an `if`/`for`/`while`
//! head. Elsewhere it divides.
//!
//! Known limits: escapes inside a specifier literal are not decoded, and
//! dynamic imports nested inside template `${}` expressions are left alone.

use crate::error::BoxError;
use crate::resolve::SpecifierResolver;

use super::{Rewrite, RewriteError, resolve};

/// The default JavaScript-module collaborator.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModuleRewriter;

impl Rewrite for ModuleRewriter {
    fn rewrite(
        &self,
        source: &str,
        base_url: &str,
        resolver: &dyn SpecifierResolver,
    ) -> Result<String, BoxError> {
        Ok(rewrite_module(source, base_url, resolver)?)
    }
}

/// Rewrites every import/export specifier in `source`.
pub(crate) fn rewrite_module(
    source: &str,
    base_url: &str,
    resolver: &dyn SpecifierResolver,
) -> Result<String, RewriteError> {
    let tokens = Lexer::new(source).run()?;

    let mut out = String::with_capacity(source.len());
    let mut copied = 0;
    for literal in specifier_literals(source, &tokens) {
        let quote = char::from(source.as_bytes()[literal.start]);
        let specifier = &source[literal.start + 1..literal.end - 1];
        if let Some(resolved) = resolve(resolver, base_url, specifier)? {
            out.push_str(&source[copied..literal.start + 1]);
            push_quoted(&mut out, &resolved, quote);
            copied = literal.end - 1;
        }
    }
    out.push_str(&source[copied..]);
    Ok(out)
}

/// Appends `value` so that it stays inside a `quote`-delimited literal.
fn push_quoted(out: &mut String, value: &str, quote: char) {
    for ch in value.chars() {
        if ch == quote || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
}

// ── Tokens ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Kind {
    Word,
    Str,
    Template,
    Regex,
    Punct(u8),
}

/// A significant token. `start..end` is a byte range, quotes included.
#[derive(Clone, Copy, Debug)]
struct Token {
    kind: Kind,
    start: usize,
    end: usize,
}

/// Words after which a `/` opens a regex rather than dividing.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "await", "case", "delete", "do", "else", "in", "instanceof", "new", "of", "return", "throw",
    "typeof", "void", "yield",
];

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'\\' || b >= 0x80
}

/// Words whose parenthesised head is followed by a statement, so a `/`
/// after the closing `)` starts a regex.
const CONDITION_KEYWORDS: &[&str] = &["for", "if", "while", "with"];

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    /// One entry per open `(` or `{`: whether a `/` after its closer opens
    /// a regex.
    open: Vec<bool>,
    regex_after_close: bool,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src: src.as_bytes(), pos: 0, tokens: Vec::new(), open: Vec::new(), regex_after_close: false }
    }

    fn run(mut self) -> Result<Vec<Token>, RewriteError> {
        if self.src.starts_with(b"#!") {
            self.skip_line();
        }

        while let Some(&b) = self.src.get(self.pos) {
            let start = self.pos;
            match b {
                b if b.is_ascii_whitespace() => self.pos += 1,
                b'/' => match self.peek(1) {
                    Some(b'/') => self.skip_line(),
                    Some(b'*') => self.skip_block_comment()?,
                    _ if self.regex_allowed() => {
                        self.skip_regex()?;
                        self.push(Kind::Regex, start);
                    }
                    _ => {
                        self.pos += 1;
                        self.push(Kind::Punct(b'/'), start);
                    }
                },
                b'"' | b'\'' => {
                    self.skip_string(b)?;
                    self.push(Kind::Str, start);
                }
                b'`' => {
                    self.skip_template()?;
                    self.push(Kind::Template, start);
                }
                b if is_word_byte(b) => {
                    while self.peek(0).is_some_and(is_word_byte) {
                        self.pos += 1;
                    }
                    self.push(Kind::Word, start);
                }
                _ => {
                    match b {
                        b'(' => {
                            let condition = self.last_word_is(CONDITION_KEYWORDS);
                            self.open.push(condition);
                        }
                        b'{' => {
                            let block = self.brace_opens_block();
                            self.open.push(block);
                        }
                        b')' | b'}' => self.regex_after_close = self.open.pop().unwrap_or(false),
                        _ => {}
                    }
                    self.pos += 1;
                    self.push(Kind::Punct(b), start);
                }
            }
        }

        Ok(self.tokens)
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.pos + ahead).copied()
    }

    fn push(&mut self, kind: Kind, start: usize) {
        self.tokens.push(Token { kind, start, end: self.pos });
    }

    fn unterminated(what: &'static str, offset: usize) -> RewriteError {
        RewriteError::Unterminated { what, offset }
    }

    fn skip_line(&mut self) {
        while self.peek(0).is_some_and(|b| b != b'\n') {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), RewriteError> {
        let start = self.pos;
        self.pos += 2;
        loop {
            match self.peek(0) {
                None => return Err(Self::unterminated("block comment", start)),
                Some(b'*') if self.peek(1) == Some(b'/') => {
                    self.pos += 2;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn skip_string(&mut self, quote: u8) -> Result<(), RewriteError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek(0) {
                None | Some(b'\n') => return Err(Self::unterminated("string literal", start)),
                Some(b'\\') if self.peek(1) == Some(b'\r') && self.peek(2) == Some(b'\n') => {
                    self.pos += 3;
                }
                Some(b'\\') => self.pos += 2,
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn skip_template(&mut self) -> Result<(), RewriteError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek(0) {
                None => return Err(Self::unterminated("template literal", start)),
                Some(b'\\') => self.pos += 2,
                Some(b'`') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b'$') if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.skip_substitution(start)?;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skips a `${ … }` body, up to and including its closing brace.
    fn skip_substitution(&mut self, template_start: usize) -> Result<(), RewriteError> {
        let mut depth = 1usize;
        loop {
            match self.peek(0) {
                None => return Err(Self::unterminated("template literal", template_start)),
                Some(b'{') => {
                    depth += 1;
                    self.pos += 1;
                }
                Some(b'}') => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(q @ (b'"' | b'\'')) => self.skip_string(q)?,
                Some(b'`') => self.skip_template()?,
                Some(b'/') if self.peek(1) == Some(b'/') => self.skip_line(),
                Some(b'/') if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                Some(_) => self.pos += 1,
            }
        }
    }

    fn regex_allowed(&self) -> bool {
        let Some(last) = self.tokens.last() else {
            return true;
        };
        match last.kind {
            Kind::Punct(b')' | b'}') => self.regex_after_close,
            Kind::Punct(b']') => false,
            Kind::Punct(_) => true,
            Kind::Word => self.last_word_is(EXPRESSION_KEYWORDS),
            Kind::Str | Kind::Template | Kind::Regex => false,
        }
    }

    fn last_word_is(&self, words: &[&str]) -> bool {
        self.tokens.last().is_some_and(|t| {
            t.kind == Kind::Word && words.iter().any(|w| w.as_bytes() == &self.src[t.start..t.end])
        })
    }

    /// Whether a `{` here opens a block (or a declaration body) rather than
    /// an object literal.
    fn brace_opens_block(&self) -> bool {
        let Some(last) = self.tokens.last() else {
            return true;
        };
        match last.kind {
            Kind::Punct(b')' | b';' | b'{' | b'}') => true,
            Kind::Punct(b'>') => self.src.get(last.start.wrapping_sub(1)) == Some(&b'='),
            Kind::Punct(_) => false,
            Kind::Word => !self.last_word_is(EXPRESSION_KEYWORDS) || self.last_word_is(&["do", "else"]),
            Kind::Str | Kind::Template | Kind::Regex => false,
        }
    }

    fn skip_regex(&mut self) -> Result<(), RewriteError> {
        let start = self.pos;
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.peek(0) {
                None | Some(b'\n') => return Err(Self::unterminated("regular expression", start)),
                Some(b'\\') => self.pos += 2,
                Some(b'[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(b']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some(b'/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        // flags
        while self.peek(0).is_some_and(is_word_byte) {
            self.pos += 1;
        }
        Ok(())
    }
}

// ── Specifier detection ───────────────────────────────────────────────────────

/// Returns the string-literal tokens that hold module specifiers, in source
/// order.
fn specifier_literals(src: &str, tokens: &[Token]) -> Vec<Token> {
    let word = |t: &Token| (t.kind == Kind::Word).then(|| &src[t.start..t.end]);
    let kind_at = |i: usize| tokens.get(i).map(|t| t.kind);

    let mut found = Vec::new();
    // Inside an `import …`/`export …` clause whose `from "x"` is still ahead.
    let mut in_clause = false;

    for (i, tok) in tokens.iter().enumerate() {
        let after_dot = i > 0 && kind_at(i - 1) == Some(Kind::Punct(b'.'));
        match word(tok) {
            Some("import") if !after_dot => match kind_at(i + 1) {
                Some(Kind::Str) => found.push(tokens[i + 1]),
                Some(Kind::Punct(b'(')) => {
                    let literal_arg = kind_at(i + 2) == Some(Kind::Str)
                        && matches!(kind_at(i + 3), Some(Kind::Punct(b')' | b',')));
                    if literal_arg {
                        found.push(tokens[i + 2]);
                    }
                }
                // import.meta
                Some(Kind::Punct(b'.')) => {}
                _ => in_clause = true,
            },
            Some("export") if !after_dot => in_clause = true,
            Some("from") if in_clause && kind_at(i + 1) == Some(Kind::Str) => {
                found.push(tokens[i + 1]);
                in_clause = false;
            }
            _ => {
                if matches!(tok.kind, Kind::Punct(b';' | b'=' | b'(')) {
                    in_clause = false;
                }
            }
        }
    }

    found
}
