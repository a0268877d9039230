//! Tokenizer for Opal source.
//!
//! Comments and whitespace are trivia: they never become tokens, but every
//! token records its exact byte span so the text between tokens survives any
//! span-bounded rewrite untouched.

use super::{ParseError, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    /// Integer literal, optionally with an `L` suffix for `long`.
    Int,
    /// Floating-point literal, `f` suffix selects `float` over `double`.
    Float,
    Str,
    Char,

    KwUse,
    KwVar,
    KwNew,
    KwDefault,
    KwIf,
    KwElse,
    KwWhile,
    KwReturn,
    KwTrue,
    KwFalse,
    KwNull,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Dot,
    Question,
    Colon,
    /// `=>`
    Arrow,

    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    Ne,
    AndAnd,
    OrOr,
    Assign,

    Eof,
}

#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

fn keyword(text: &str) -> Option<TokenKind> {
    Some(match text {
        "use" => TokenKind::KwUse,
        "var" => TokenKind::KwVar,
        "new" => TokenKind::KwNew,
        "default" => TokenKind::KwDefault,
        "if" => TokenKind::KwIf,
        "else" => TokenKind::KwElse,
        "while" => TokenKind::KwWhile,
        "return" => TokenKind::KwReturn,
        "true" => TokenKind::KwTrue,
        "false" => TokenKind::KwFalse,
        "null" => TokenKind::KwNull,
        _ => return None,
    })
}

/// Tokenize `source`, producing a token stream ending in `Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    while pos < bytes.len() {
        let b = bytes[pos];

        // Whitespace trivia.
        if b.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        // Comment trivia.
        if b == b'/' && pos + 1 < bytes.len() {
            match bytes[pos + 1] {
                b'/' => {
                    while pos < bytes.len() && bytes[pos] != b'\n' {
                        pos += 1;
                    }
                    continue;
                }
                b'*' => {
                    let start = pos;
                    pos += 2;
                    loop {
                        if pos + 1 >= bytes.len() {
                            return Err(ParseError::new("unterminated block comment", start));
                        }
                        if bytes[pos] == b'*' && bytes[pos + 1] == b'/' {
                            pos += 2;
                            break;
                        }
                        pos += 1;
                    }
                    continue;
                }
                _ => {}
            }
        }

        let start = pos;
        let kind = match b {
            b'(' => {
                pos += 1;
                TokenKind::LParen
            }
            b')' => {
                pos += 1;
                TokenKind::RParen
            }
            b'{' => {
                pos += 1;
                TokenKind::LBrace
            }
            b'}' => {
                pos += 1;
                TokenKind::RBrace
            }
            b'[' => {
                pos += 1;
                TokenKind::LBracket
            }
            b']' => {
                pos += 1;
                TokenKind::RBracket
            }
            b',' => {
                pos += 1;
                TokenKind::Comma
            }
            b';' => {
                pos += 1;
                TokenKind::Semi
            }
            b'.' => {
                pos += 1;
                TokenKind::Dot
            }
            b'?' => {
                pos += 1;
                TokenKind::Question
            }
            b':' => {
                pos += 1;
                TokenKind::Colon
            }
            b'+' => {
                pos += 1;
                TokenKind::Plus
            }
            b'-' => {
                pos += 1;
                TokenKind::Minus
            }
            b'*' => {
                pos += 1;
                TokenKind::Star
            }
            b'/' => {
                pos += 1;
                TokenKind::Slash
            }
            b'%' => {
                pos += 1;
                TokenKind::Percent
            }
            b'!' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    pos += 2;
                    TokenKind::Ne
                } else {
                    pos += 1;
                    TokenKind::Not
                }
            }
            b'<' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    pos += 2;
                    TokenKind::Le
                } else {
                    pos += 1;
                    TokenKind::Lt
                }
            }
            b'>' => {
                if bytes.get(pos + 1) == Some(&b'=') {
                    pos += 2;
                    TokenKind::Ge
                } else {
                    pos += 1;
                    TokenKind::Gt
                }
            }
            b'=' => match bytes.get(pos + 1) {
                Some(&b'=') => {
                    pos += 2;
                    TokenKind::EqEq
                }
                Some(&b'>') => {
                    pos += 2;
                    TokenKind::Arrow
                }
                _ => {
                    pos += 1;
                    TokenKind::Assign
                }
            },
            b'&' => {
                if bytes.get(pos + 1) == Some(&b'&') {
                    pos += 2;
                    TokenKind::AndAnd
                } else {
                    return Err(ParseError::new("expected '&&'", pos));
                }
            }
            b'|' => {
                if bytes.get(pos + 1) == Some(&b'|') {
                    pos += 2;
                    TokenKind::OrOr
                } else {
                    return Err(ParseError::new("expected '||'", pos));
                }
            }
            b'"' => {
                pos += 1;
                loop {
                    match bytes.get(pos) {
                        None | Some(&b'\n') => {
                            return Err(ParseError::new("unterminated string literal", start))
                        }
                        Some(&b'\\') => pos += 2,
                        Some(&b'"') => {
                            pos += 1;
                            break;
                        }
                        _ => pos += 1,
                    }
                }
                TokenKind::Str
            }
            b'\'' => {
                pos += 1;
                loop {
                    match bytes.get(pos) {
                        None | Some(&b'\n') => {
                            return Err(ParseError::new("unterminated char literal", start))
                        }
                        Some(&b'\\') => pos += 2,
                        Some(&b'\'') => {
                            pos += 1;
                            break;
                        }
                        _ => pos += 1,
                    }
                }
                TokenKind::Char
            }
            b'0'..=b'9' => {
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                let mut is_float = false;
                if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
                    is_float = true;
                    pos += 1;
                    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                        pos += 1;
                    }
                }
                match bytes.get(pos) {
                    Some(&b'f') | Some(&b'F') => {
                        is_float = true;
                        pos += 1;
                    }
                    Some(&b'L') if !is_float => {
                        pos += 1;
                    }
                    _ => {}
                }
                if is_float {
                    TokenKind::Float
                } else {
                    TokenKind::Int
                }
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                let text = &source[start..pos];
                keyword(text).unwrap_or(TokenKind::Ident)
            }
            _ => {
                return Err(ParseError::new(
                    format!("unexpected character '{}'", source[pos..].chars().next().unwrap_or('?')),
                    pos,
                ))
            }
        };

        tokens.push(Token {
            kind,
            span: Span::new(start, pos),
        });
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(source.len(), source.len()),
    });
    Ok(tokens)
}

/// Decode a quoted string literal (including its quotes) into its value.
pub(crate) fn unescape_string(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
    unescape_body(inner)
}

/// Decode a quoted char literal (including its quotes) into its value.
pub(crate) fn unescape_char(raw: &str) -> Option<char> {
    let inner = raw.strip_prefix('\'')?.strip_suffix('\'')?;
    let decoded = unescape_body(inner)?;
    let mut chars = decoded.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(c)
}

fn unescape_body(inner: &str) -> Option<String> {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            _ => return None,
        }
    }
    Some(out)
}

/// Render a char value as an Opal char literal, quoting as needed.
pub(crate) fn escape_char(c: char) -> String {
    match c {
        '\\' => "'\\\\'".to_string(),
        '\'' => "'\\''".to_string(),
        '\n' => "'\\n'".to_string(),
        '\t' => "'\\t'".to_string(),
        '\r' => "'\\r'".to_string(),
        '\0' => "'\\0'".to_string(),
        _ => format!("'{}'", c),
    }
}

/// Render a string value as an Opal string literal.
pub(crate) fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
