//! Shell-style variable expansion.
//!
//! Replaces `$name`, `${name}` and `${name:-default}` (or `${name:=default}`)
//! tokens using a lookup function. The scan is a single left-to-right pass
//! over the bytes of the input; every delimiter it cares about is ASCII, so
//! slicing at those positions always lands on a char boundary.

use serde_json::Value;
use thiserror::Error;

/// Separators between a variable name and its default value.
pub const DEFAULT_SEPARATORS: [&str; 2] = [":-", ":="];

/// A `${...}` token whose default syntax doesn't split into key and default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed default value syntax in `${{{name}}}`")]
pub struct ExpandError {
    pub name: String,
}

/// Expand every variable reference in `input`.
///
/// Unresolved plain names expand to the empty string. Malformed braces
/// (`${` with no closing `}`, or `${}`) are consumed and dropped; a `$` that
/// can't start a name is kept as is.
pub fn expand<F>(input: &str, lookup: F) -> Result<String, ExpandError>
where
    F: Fn(&str) -> Option<String>,
{
    let bytes = input.as_bytes();
    let mut out: Option<String> = None;
    // Start of the pending verbatim run
    let mut i = 0;
    let mut j = 0;

    while j < bytes.len() {
        if bytes[j] == b'$' && j + 1 < bytes.len() {
            let buf = out.get_or_insert_with(|| String::with_capacity(2 * input.len()));
            buf.push_str(&input[i..j]);

            let (name, width) = shell_name(&input[j + 1..]);
            match name {
                // Bad syntax, eat the characters
                None if width > 0 => {}
                None => buf.push('$'),
                Some(name) => buf.push_str(&substitute(name, &lookup)?),
            }
            j += width;
            i = j + 1;
        }
        j += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&input[i..]);
            Ok(buf)
        }
        None => Ok(input.to_string()),
    }
}

/// Expand a configuration value in place.
///
/// Strings are expanded, lists have their string elements expanded, maps are
/// walked recursively, everything else is left alone.
pub fn expand_value<F>(value: &mut Value, lookup: &F) -> Result<(), ExpandError>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => *s = expand(s, lookup)?,
        Value::Array(items) => {
            for item in items.iter_mut() {
                if let Value::String(s) = item {
                    *s = expand(s, lookup)?;
                }
            }
        }
        Value::Object(map) => {
            for inner in map.values_mut() {
                expand_value(inner, lookup)?;
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

fn substitute<F>(name: &str, lookup: &F) -> Result<String, ExpandError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(separator) = DEFAULT_SEPARATORS.iter().find(|sep| name.contains(**sep)) else {
        return Ok(lookup(name).unwrap_or_default());
    };

    let parts: Vec<&str> = name.split(separator).collect();
    let [key, default] = parts[..] else {
        return Err(ExpandError {
            name: name.to_string(),
        });
    };

    match lookup(key) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Ok(default.to_string()),
    }
}

/// Extract the name at the start of `s` (the text right after a `$`).
///
/// Returns the name, if any, and the number of bytes consumed. A braced name
/// consumes two more bytes than its length. `(None, n > 0)` means malformed
/// syntax that should be dropped; `(None, 0)` means no name at all.
fn shell_name(s: &str) -> (Option<&str>, usize) {
    let b = s.as_bytes();

    if b[0] == b'{' {
        if b.len() > 2 && is_shell_special(b[1]) && b[2] == b'}' {
            return (Some(&s[1..2]), 3);
        }
        for k in 1..b.len() {
            if b[k] == b'}' {
                if k == 1 {
                    // ${}
                    return (None, 2);
                }
                return (Some(&s[1..k]), k + 1);
            }
        }
        // ${ without a closing brace
        return (None, 1);
    }

    if is_shell_special(b[0]) {
        return (Some(&s[0..1]), 1);
    }

    let len = b.iter().take_while(|c| is_alpha_num(**c)).count();
    if len == 0 { (None, 0) } else { (Some(&s[..len]), len) }
}

/// Characters that name a special shell variable such as `$*`.
fn is_shell_special(c: u8) -> bool {
    matches!(c, b'*' | b'#' | b'$' | b'@' | b'!' | b'?' | b'-' | b'0'..=b'9')
}

fn is_alpha_num(c: u8) -> bool {
    c == b'_' || c.is_ascii_alphanumeric()
}
