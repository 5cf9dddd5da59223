//! ### Escaped text tokens
//!
//! Tools print non-printable bytes as `\xHH` escapes.  Rather than matching such text with
//! patterns, both sides are split into typed tokens and the token streams are compared.

use std::fmt;
use log::error;
use super::Error;

#[derive(Clone,PartialEq,Eq,Debug)]
pub enum Token {
    /// a printable character
    Literal(char),
    /// `\xHH`
    Byte(u8),
    /// `\n`, `\t`, `\r`, `\\`, `\"`, `\'`
    Escape(char),
    /// a backslash sequence that is none of the above, kept verbatim
    Malformed(String),
    /// an unescaped line break
    LineBreak
}

impl fmt::Display for Token {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(c) => write!(f,"'{}'",c),
            Self::Byte(b) => write!(f,"\\x{:02X}",b),
            Self::Escape(c) => write!(f,"\\{}",c),
            Self::Malformed(s) => write!(f,"malformed `{}`",s),
            Self::LineBreak => write!(f,"line break")
        }
    }
}

fn hex_val(c: char) -> Option<u8> {
    c.to_digit(16).map(|d| d as u8)
}

/// Split text into tokens
pub fn tokenize(txt: &str) -> Vec<Token> {
    let mut ans = Vec::new();
    let mut chars = txt.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\n' => ans.push(Token::LineBreak),
            '\r' if chars.peek()==Some(&'\n') => {},
            '\\' => match chars.next() {
                Some('x') | Some('X') => {
                    let hi = chars.next();
                    let lo = chars.next();
                    match (hi.and_then(hex_val),lo.and_then(hex_val)) {
                        (Some(h),Some(l)) => ans.push(Token::Byte(h*16+l)),
                        _ => {
                            let mut raw = String::from("\\x");
                            raw.extend(hi);
                            raw.extend(lo);
                            ans.push(Token::Malformed(raw));
                        }
                    }
                },
                Some(e) if "ntr\\\"'".contains(e) => ans.push(Token::Escape(e)),
                Some(other) => ans.push(Token::Malformed(format!("\\{}",other))),
                None => ans.push(Token::Malformed("\\".to_string()))
            },
            c => ans.push(Token::Literal(c))
        }
    }
    ans
}

/// Byte value of each token, malformed tokens and line breaks excepted
pub fn token_bytes(tokens: &[Token]) -> Vec<u8> {
    let mut ans = Vec::new();
    for t in tokens {
        match t {
            Token::Literal(c) => {
                let mut buf = [0;4];
                ans.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            },
            Token::Byte(b) => ans.push(*b),
            Token::Escape('n') => ans.push(0x0a),
            Token::Escape('t') => ans.push(0x09),
            Token::Escape('r') => ans.push(0x0d),
            Token::Escape(c) => ans.push(*c as u8),
            Token::LineBreak => ans.push(0x0a),
            Token::Malformed(_) => {}
        }
    }
    ans
}

/// Compare two texts as token streams, reporting the first differing token
pub fn compare_tokens(expected: &str,actual: &str) -> Result<(),Error> {
    let exp = tokenize(expected);
    let act = tokenize(actual);
    for i in 0..usize::max(exp.len(),act.len()) {
        let (e,a) = (exp.get(i),act.get(i));
        if e!=a {
            let show = |t: Option<&Token>| match t {
                Some(tok) => tok.to_string(),
                None => "end of text".to_string()
            };
            error!("token streams diverge at {}",i);
            return Err(Error::TokenMismatch { index: i, expected: show(e), actual: show(a) });
        }
    }
    Ok(())
}
