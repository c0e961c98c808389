//! Line tokenizer.
//!
//! A line is split on whitespace and each field is classified, in order, as
//! an operation name, `=`, a label (`~name`), a string literal, a boolean
//! literal, an integer literal, or an identifier. String literals may span
//! several fields; their pieces are re-joined with a single space.

use memory::Value;
use vm::Registry;

use crate::error::CompileErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Op(String),
    Assign,
    /// Label name, without the `~`
    Label(String),
    Literal(Value),
    Ident(String),
}

/// First char a lowercase letter, the rest letters or digits.
pub fn is_identifier(field: &str) -> bool {
    let mut chars = field.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() && c.is_lowercase() => {}
        _ => return false,
    }
    chars.all(char::is_alphanumeric)
}

fn is_string_end(field: &str) -> bool {
    field.ends_with('\'') && !field.ends_with("\\'")
}

fn looks_numeric(field: &str) -> bool {
    let digits = field.strip_prefix(&['-', '+'][..]).unwrap_or(field);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn string_literal(raw: &str) -> Token {
    let inner = &raw[1..raw.len() - 1];
    Token::Literal(Value::Str(inner.replace("\\'", "'")))
}

pub fn tokenize(line: &str, registry: &Registry) -> Result<Vec<Token>, CompileErrorKind> {
    let mut tokens = Vec::new();
    let mut pending: Option<String> = None;

    for field in line.split_whitespace() {
        if let Some(buf) = pending.as_mut() {
            buf.push(' ');
            buf.push_str(field);
            if is_string_end(field) {
                if let Some(raw) = pending.take() {
                    tokens.push(string_literal(&raw));
                }
            }
            continue;
        }

        if field.starts_with('#') {
            break;
        }

        let token = if registry.is_operation(field) {
            Token::Op(field.to_string())
        } else if field == "=" {
            Token::Assign
        } else if let Some(name) = field.strip_prefix('~') {
            if !is_identifier(name) {
                return Err(CompileErrorKind::UnknownToken(field.to_string()));
            }
            Token::Label(name.to_string())
        } else if field.starts_with('\'') {
            if field.len() >= 2 && is_string_end(field) {
                string_literal(field)
            } else {
                pending = Some(field.to_string());
                continue;
            }
        } else if field == "True" || field == "False" {
            Token::Literal(Value::Bool(field == "True"))
        } else if looks_numeric(field) {
            let n = field
                .parse()
                .map_err(|_| CompileErrorKind::InvalidLiteral(field.to_string()))?;
            Token::Literal(Value::Int(n))
        } else if is_identifier(field) {
            Token::Ident(field.to_string())
        } else {
            return Err(CompileErrorKind::UnknownToken(field.to_string()));
        };
        tokens.push(token);
    }

    if pending.is_some() {
        return Err(CompileErrorKind::UnterminatedString);
    }
    Ok(tokens)
}
