use std::fmt;

use super::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Lt,
    Le,
    Gt,
    Ge,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::Str(s) => write!(f, "string {s:?}"),
            Token::Ident(name) => write!(f, "identifier {name}"),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::Null => f.write_str("null"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::LBracket => f.write_str("'['"),
            Token::RBracket => f.write_str("']'"),
            Token::Dot => f.write_str("'.'"),
            Token::Bang => f.write_str("'!'"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::Percent => f.write_str("'%'"),
            Token::AndAnd => f.write_str("'&&'"),
            Token::OrOr => f.write_str("'||'"),
            Token::EqEq => f.write_str("'=='"),
            Token::NotEq => f.write_str("'!='"),
            Token::EqEqEq => f.write_str("'==='"),
            Token::NotEqEq => f.write_str("'!=='"),
            Token::Lt => f.write_str("'<'"),
            Token::Le => f.write_str("'<='"),
            Token::Gt => f.write_str("'>'"),
            Token::Ge => f.write_str("'>='"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

/// Token plus its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Operators, longest first so `===` wins over `==`.
const OPERATORS: &[(&str, Token)] = &[
    ("===", Token::EqEqEq),
    ("!==", Token::NotEqEq),
    ("==", Token::EqEq),
    ("!=", Token::NotEq),
    ("<=", Token::Le),
    (">=", Token::Ge),
    ("&&", Token::AndAnd),
    ("||", Token::OrOr),
    ("<", Token::Lt),
    (">", Token::Gt),
    ("!", Token::Bang),
    ("+", Token::Plus),
    ("-", Token::Minus),
    ("*", Token::Star),
    ("/", Token::Slash),
    ("%", Token::Percent),
    ("(", Token::LParen),
    (")", Token::RParen),
    ("[", Token::LBracket),
    ("]", Token::RBracket),
    (".", Token::Dot),
];

/// Split `src` into tokens. Always ends with [`Token::Eof`].
pub(crate) fn tokenize(src: &str) -> Result<Vec<Spanned>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut rest = src;
    loop {
        let trimmed = rest.trim_start();
        let offset = src.len() - trimmed.len();
        rest = trimmed;
        let Some(c) = rest.chars().next() else {
            tokens.push(Spanned {
                token: Token::Eof,
                offset,
            });
            return Ok(tokens);
        };

        let starts_number = c.is_ascii_digit()
            || (c == '.' && rest[1..].starts_with(|d: char| d.is_ascii_digit()));
        let (token, len) = if starts_number {
            lex_number(rest, offset)?
        } else if c == '"' || c == '\'' {
            lex_string(rest, c, offset)?
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            let len = rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_' || ch == '$'))
                .unwrap_or(rest.len());
            let word = &rest[..len];
            let token = match word {
                "true" => Token::True,
                "false" => Token::False,
                "null" | "undefined" => Token::Null,
                _ => Token::Ident(word.to_string()),
            };
            (token, len)
        } else if let Some((op, token)) = OPERATORS.iter().find(|(op, _)| rest.starts_with(op)) {
            (token.clone(), op.len())
        } else {
            return Err(ExpressionError::UnexpectedChar { ch: c, offset });
        };

        tokens.push(Spanned { token, offset });
        rest = &rest[len..];
    }
}

fn lex_number(rest: &str, offset: usize) -> Result<(Token, usize), ExpressionError> {
    let bytes = rest.as_bytes();
    let mut len = 0;
    while len < bytes.len() && bytes[len].is_ascii_digit() {
        len += 1;
    }
    if len < bytes.len() && bytes[len] == b'.' {
        len += 1;
        while len < bytes.len() && bytes[len].is_ascii_digit() {
            len += 1;
        }
    }
    if len < bytes.len() && (bytes[len] == b'e' || bytes[len] == b'E') {
        let mut exp = len + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            len = exp;
            while len < bytes.len() && bytes[len].is_ascii_digit() {
                len += 1;
            }
        }
    }
    let text = &rest[..len];
    text.parse::<f64>()
        .map(|n| (Token::Number(n), len))
        .map_err(|_| ExpressionError::InvalidNumber {
            text: text.to_string(),
            offset,
        })
}

fn lex_string(rest: &str, quote: char, offset: usize) -> Result<(Token, usize), ExpressionError> {
    let mut out = String::new();
    let mut chars = rest.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                });
            }
            c if c == quote => return Ok((Token::Str(out), i + c.len_utf8())),
            c => out.push(c),
        }
    }
    Err(ExpressionError::UnterminatedString { offset })
}
