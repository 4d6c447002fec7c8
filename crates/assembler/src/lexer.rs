//! Tokenizer for TAC program text.

use std::fmt;

use crate::error::AsmError;

/// A single token from a program line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// An identifier: opcode, type keyword, variable, label or function name.
    /// May contain inner `-` before a letter (`int-list`).
    Ident(String),
    /// `#start_function` / `#end_function` (stored without the `#`).
    Directive(String),
    /// Integer literal.
    Int(i32),
    /// Float literal.
    Float(f32),
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => f.write_str(s),
            Token::Directive(s) => write!(f, "#{s}"),
            Token::Int(n) => write!(f, "{n}"),
            Token::Float(x) => write!(f, "{x:?}"),
            Token::Comma => f.write_str(","),
            Token::Colon => f.write_str(":"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Tokenize a single line of program text.
///
/// Returns an empty Vec for blank lines.
pub(crate) fn tokenize_line(line: &str, line_num: usize) -> Result<Vec<Token>, AsmError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let single = match c {
            ',' => Some(Token::Comma),
            ':' => Some(Token::Colon),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push(token);
            i += 1;
            continue;
        }

        if c == '#' {
            let start = i + 1;
            let end = scan_ident(&chars, start);
            if end == start {
                return Err(AsmError::UnexpectedCharacter { line: line_num, ch: c });
            }
            tokens.push(Token::Directive(chars[start..end].iter().collect()));
            i = end;
            continue;
        }

        if is_ident_start(c) {
            let end = scan_ident(&chars, i);
            tokens.push(Token::Ident(chars[i..end].iter().collect()));
            i = end;
            continue;
        }

        let starts_number =
            c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()));
        if starts_number {
            let (token, end) = scan_number(&chars, i, line_num)?;
            tokens.push(token);
            i = end;
            continue;
        }

        return Err(AsmError::UnexpectedCharacter { line: line_num, ch: c });
    }

    Ok(tokens)
}

/// Scan an identifier starting at `start`, returning the end index.
fn scan_ident(chars: &[char], start: usize) -> usize {
    let mut end = start;
    if end < chars.len() && is_ident_start(chars[end]) {
        end += 1;
    } else {
        return end;
    }
    loop {
        match chars.get(end) {
            Some(&c) if is_ident_continue(c) => end += 1,
            Some(&'-') if chars.get(end + 1).is_some_and(|c| c.is_ascii_alphabetic()) => end += 1,
            _ => return end,
        }
    }
}

/// Scan a decimal number (optional sign, fraction and exponent).
fn scan_number(chars: &[char], start: usize, line: usize) -> Result<(Token, usize), AsmError> {
    let mut end = start;
    if chars[end] == '-' {
        end += 1;
    }
    while chars.get(end).is_some_and(|c| c.is_ascii_digit()) {
        end += 1;
    }

    let mut is_float = false;
    if chars.get(end) == Some(&'.') && chars.get(end + 1).is_some_and(|c| c.is_ascii_digit()) {
        is_float = true;
        end += 1;
        while chars.get(end).is_some_and(|c| c.is_ascii_digit()) {
            end += 1;
        }
    }

    if matches!(chars.get(end), Some(&'e') | Some(&'E')) {
        let mut exp = end + 1;
        if matches!(chars.get(exp), Some(&'+') | Some(&'-')) {
            exp += 1;
        }
        if chars.get(exp).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            end = exp;
            while chars.get(end).is_some_and(|c| c.is_ascii_digit()) {
                end += 1;
            }
        }
    }

    // A number running straight into an identifier (`12ab`) is malformed.
    let mut token_end = end;
    while chars.get(token_end).is_some_and(|&c| is_ident_continue(c) || c == '.') {
        token_end += 1;
    }
    let text: String = chars[start..token_end].iter().collect();
    if token_end != end {
        return Err(AsmError::InvalidNumber { line, token: text });
    }

    let token = if is_float {
        let value: f32 = text
            .parse()
            .map_err(|_| AsmError::InvalidNumber { line, token: text.clone() })?;
        if !value.is_finite() {
            return Err(AsmError::InvalidNumber { line, token: text });
        }
        Token::Float(value)
    } else {
        let value: i32 = text
            .parse()
            .map_err(|_| AsmError::InvalidNumber { line, token: text.clone() })?;
        Token::Int(value)
    };

    Ok((token, end))
}
