//! logos-based expression tokenizer.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `==` as EqEq beats `=` as Assign)
//! 2. For equal length matches, earlier-defined variants win
//!
//! Our ordering ensures:
//! - `true`, `false`, `null` match their keyword variants, not [`Token::Ident`]
//! - `<=` matches [`Token::Le`], not `Lt` + `Assign`
//! - `&&` / `||` match as single tokens

use logos::Logos;

/// Expression token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // ── Keywords (before Ident so equal-length matches pick them) ────

    /// `true`
    #[token("true")]
    True,

    /// `false`
    #[token("false")]
    False,

    /// `null`
    #[token("null")]
    Null,

    // ── Literals and identifiers ─────────────────────────────────────

    /// Number: integer or float. Negation is a unary operator.
    #[regex(r"[0-9]+(\.[0-9]+)?")]
    Number,

    /// Double-quoted string literal.
    #[regex(r#""[^"]*""#)]
    StringDouble,

    /// Single-quoted string literal.
    #[regex(r"'[^']*'")]
    StringSingle,

    /// Identifier: scope keys, property names.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // ── Multi-character operators ────────────────────────────────────

    /// `==`
    #[token("==")]
    EqEq,

    /// `!=`
    #[token("!=")]
    NotEq,

    /// `<=`
    #[token("<=")]
    Le,

    /// `>=`
    #[token(">=")]
    Ge,

    /// `&&`
    #[token("&&")]
    AndAnd,

    /// `||`
    #[token("||")]
    OrOr,

    // ── Single-character operators and punctuation ───────────────────

    /// `<`
    #[token("<")]
    Lt,

    /// `>`
    #[token(">")]
    Gt,

    /// `!`
    #[token("!")]
    Bang,

    /// `=`
    #[token("=")]
    Assign,

    /// `+`
    #[token("+")]
    Plus,

    /// `-`
    #[token("-")]
    Minus,

    /// `*`
    #[token("*")]
    Star,

    /// `/`
    #[token("/")]
    Slash,

    /// `.`
    #[token(".")]
    Dot,

    /// `,`
    #[token(",")]
    Comma,

    /// `:`
    #[token(":")]
    Colon,

    /// `{`
    #[token("{")]
    BraceOpen,

    /// `}`
    #[token("}")]
    BraceClose,

    /// `(`
    #[token("(")]
    ParenOpen,

    /// `)`
    #[token(")")]
    ParenClose,
}

/// Tokenize an expression into `(Token, text)` pairs.
///
/// Returns `Err` with the byte offset of the first character no token matches;
/// expressions come from untrusted markup, so lexing failures must surface
/// instead of being skipped.
pub fn tokenize(input: &str) -> Result<Vec<(Token, String)>, usize> {
    let lexer = Token::lexer(input);
    let mut tokens = Vec::new();
    for (result, span) in lexer.spanned() {
        match result {
            Ok(token) => tokens.push((token, input[span].to_string())),
            Err(()) => return Err(span.start),
        }
    }
    Ok(tokens)
}
