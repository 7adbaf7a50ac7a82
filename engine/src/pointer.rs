//! JSON Pointer (RFC 6901) parsing and resolution.
//!
//! A pointer token that looks like a number is only treated as an array index
//! when the container it is evaluated against is actually an array. The same
//! pointer can therefore address different things in two revisions of a
//! document, and callers must resolve it against the revision they mean.

use crate::{document::kind_of, error::Result, Error};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Token naming the position one past the last array element.
pub const APPEND_TOKEN: &str = "-";

/// A parsed JSON Pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pointer {
    tokens: Vec<String>,
}

impl Pointer {
    /// The pointer to the whole document.
    pub fn root() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Build a pointer from already unescaped tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse an RFC 6901 pointer string.
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = s.strip_prefix('/') else {
            return Err(Error::invalid_pointer(s, "missing leading slash"));
        };

        let mut tokens = Vec::new();
        for raw in rest.split('/') {
            let token =
                unescape(raw).ok_or_else(|| Error::invalid_pointer(s, "bad escape sequence"))?;
            tokens.push(token);
        }
        Ok(Self { tokens })
    }

    /// Unescaped tokens, outermost first.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Pointer to the containing value, or `None` for the root.
    pub fn parent(&self) -> Option<Pointer> {
        let (_, parent) = self.tokens.split_last()?;
        Some(Self {
            tokens: parent.to_vec(),
        })
    }

    /// Final token, or `None` for the root.
    pub fn last(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    /// Pointer extended by one token.
    pub fn child(&self, token: impl Into<String>) -> Pointer {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self { tokens }
    }

    /// Whether the final token is the append position `-`.
    pub fn is_append(&self) -> bool {
        self.last() == Some(APPEND_TOKEN)
    }

    /// Whether `prefix` addresses this pointer or one of its ancestors.
    pub fn starts_with(&self, prefix: &Pointer) -> bool {
        self.tokens.starts_with(&prefix.tokens)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", escape(token))?;
        }
        Ok(())
    }
}

impl FromStr for Pointer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pointer::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn escape(token: &str) -> String {
    if !token.contains(['~', '/']) {
        return token.to_string();
    }
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape(raw: &str) -> Option<String> {
    if !raw.contains('~') {
        return Some(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return None,
        }
    }
    Some(out)
}

/// Parse a canonical array index: `0` or digits without a leading zero.
pub fn parse_index(token: &str) -> Option<usize> {
    let bytes = token.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    token.parse().ok()
}

fn step<'a>(current: &'a Value, token: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(token),
        Value::Array(items) => items.get(parse_index(token)?),
        _ => None,
    }
}

fn step_mut<'a>(current: &'a mut Value, token: &str) -> Option<&'a mut Value> {
    match current {
        Value::Object(map) => map.get_mut(token),
        Value::Array(items) => items.get_mut(parse_index(token)?),
        _ => None,
    }
}

fn resolve_mut<'a>(doc: &'a mut Value, pointer: &Pointer, depth: usize) -> Result<&'a mut Value> {
    let mut current = doc;
    for token in &pointer.tokens[..depth] {
        current = step_mut(current, token).ok_or_else(|| Error::NotFound(pointer.to_string()))?;
    }
    Ok(current)
}

/// Split a non-root pointer into its resolved parent and final token.
fn parent_mut<'a, 'p>(
    doc: &'a mut Value,
    pointer: &'p Pointer,
) -> Result<(&'a mut Value, &'p str)> {
    let Some(last) = pointer.last() else {
        return Err(Error::invalid_pointer(pointer, "root has no parent"));
    };
    let parent = resolve_mut(doc, pointer, pointer.tokens.len() - 1)?;
    Ok((parent, last))
}

fn not_a_container(pointer: &Pointer, parent: &Value) -> Error {
    Error::invalid_pointer(
        pointer,
        format!("parent is a {}, not a container", kind_of(parent)),
    )
}

/// Read the value at `pointer`.
pub fn get<'a>(doc: &'a Value, pointer: &Pointer) -> Result<&'a Value> {
    let mut current = doc;
    for token in &pointer.tokens {
        current = step(current, token).ok_or_else(|| Error::NotFound(pointer.to_string()))?;
    }
    Ok(current)
}

/// Whether `pointer` resolves in `doc`.
pub fn contains(doc: &Value, pointer: &Pointer) -> bool {
    get(doc, pointer).is_ok()
}

/// Add `value` at `pointer`.
///
/// Objects gain or overwrite the key. Arrays get the value inserted before
/// the indexed element, or appended when the final token is `-`. The root
/// pointer replaces the whole document. A parent that does not resolve is an
/// [`Error::InvalidPointer`].
pub fn set(doc: &mut Value, pointer: &Pointer, value: Value) -> Result<()> {
    if pointer.is_root() {
        *doc = value;
        return Ok(());
    }
    let (parent, last) = parent_mut(doc, pointer).map_err(|e| match e {
        Error::NotFound(_) => Error::invalid_pointer(pointer, "parent does not exist"),
        other => other,
    })?;
    match parent {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
        }
        Value::Array(items) => {
            if last == APPEND_TOKEN {
                items.push(value);
                return Ok(());
            }
            let index = parse_index(last)
                .ok_or_else(|| Error::invalid_pointer(pointer, "not an array index"))?;
            if index > items.len() {
                return Err(Error::invalid_pointer(
                    pointer,
                    format!("index {} out of bounds for length {}", index, items.len()),
                ));
            }
            items.insert(index, value);
        }
        other => return Err(not_a_container(pointer, other)),
    }
    Ok(())
}

/// Remove the value at `pointer` and return it.
///
/// Array elements after the removed one shift left.
pub fn remove(doc: &mut Value, pointer: &Pointer) -> Result<Value> {
    let (parent, last) = parent_mut(doc, pointer)?;
    match parent {
        Value::Object(map) => map
            .shift_remove(last)
            .ok_or_else(|| Error::NotFound(pointer.to_string())),
        Value::Array(items) => {
            if last == APPEND_TOKEN {
                return Err(Error::invalid_pointer(
                    pointer,
                    "cannot remove the append position",
                ));
            }
            let index = parse_index(last)
                .ok_or_else(|| Error::invalid_pointer(pointer, "not an array index"))?;
            if index >= items.len() {
                return Err(Error::NotFound(pointer.to_string()));
            }
            Ok(items.remove(index))
        }
        other => Err(not_a_container(pointer, other)),
    }
}

/// Overwrite the existing value at `pointer`, returning the previous one.
///
/// Unlike [`set`], the target must already exist.
pub fn replace(doc: &mut Value, pointer: &Pointer, value: Value) -> Result<Value> {
    if pointer.is_root() {
        return Ok(std::mem::replace(doc, value));
    }
    if pointer.is_append() && resolve_mut(doc, pointer, pointer.tokens.len() - 1)?.is_array() {
        return Err(Error::invalid_pointer(
            pointer,
            "cannot replace the append position",
        ));
    }
    let slot = resolve_mut(doc, pointer, pointer.tokens.len())?;
    Ok(std::mem::replace(slot, value))
}

/// Length of the array at `pointer`.
pub fn array_len(doc: &Value, pointer: &Pointer) -> Result<usize> {
    match get(doc, pointer)? {
        Value::Array(items) => Ok(items.len()),
        other => Err(Error::TypeMismatch {
            pointer: pointer.to_string(),
            expected: "array".into(),
            got: kind_of(other).into(),
        }),
    }
}
