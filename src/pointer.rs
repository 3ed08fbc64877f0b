// Pointer paths into a value tree
// Slash-delimited, `~0`/`~1` escaped, numeric segments index lists

use std::rc::Rc;

use thiserror::Error;

use crate::utils::type_name;
use crate::value::Value;

/// Pointer resolution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PointerError {
    #[error("Invalid pointer '{0}': must be empty or start with '/'")]
    InvalidPointer(String),

    #[error("Invalid escape in pointer segment '{0}'")]
    InvalidEscape(String),

    #[error("Member '{member}' not found (pointer '{pointer}')")]
    MissingMember { member: String, pointer: String },

    #[error("'{0}' is not a valid list index")]
    InvalidIndex(String),

    #[error("Index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Cannot index into {type_name} with '{part}'")]
    NotIndexable { part: String, type_name: String },

    #[error("Cannot replace the document root")]
    Root,
}

/// Turn a dotted variable path (`names.1.name`) into a pointer (`/names/1/name`)
pub fn from_path(path: &str) -> String {
    let mut pointer = String::with_capacity(path.len() + 1);
    pointer.push('/');
    pointer.push_str(&path.replace('.', "/"));
    pointer
}

/// Split a pointer into unescaped segments
pub fn parts(pointer: &str) -> Result<Vec<String>, PointerError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let rest = pointer
        .strip_prefix('/')
        .ok_or_else(|| PointerError::InvalidPointer(pointer.to_string()))?;
    rest.split('/').map(unescape_segment).collect()
}

fn unescape_segment(segment: &str) -> Result<String, PointerError> {
    let mut result = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => result.push('~'),
            Some('1') => result.push('/'),
            _ => return Err(PointerError::InvalidEscape(segment.to_string())),
        }
    }
    Ok(result)
}

/// Parse a list index segment: `0` or a number without leading zeros
fn parse_index(part: &str) -> Result<usize, PointerError> {
    let well_formed = part == "0"
        || (!part.is_empty()
            && !part.starts_with('0')
            && part.chars().all(|c| c.is_ascii_digit()));
    if !well_formed {
        return Err(PointerError::InvalidIndex(part.to_string()));
    }
    part.parse()
        .map_err(|_| PointerError::InvalidIndex(part.to_string()))
}

fn step<'a>(current: &'a Value, part: &str, pointer: &str) -> Result<&'a Value, PointerError> {
    match current {
        Value::Object(map) => map.get(part).ok_or_else(|| PointerError::MissingMember {
            member: part.to_string(),
            pointer: pointer.to_string(),
        }),
        Value::Array(items) => {
            let index = parse_index(part)?;
            items.get(index).ok_or(PointerError::IndexOutOfRange {
                index,
                len: items.len(),
            })
        }
        other => Err(PointerError::NotIndexable {
            part: part.to_string(),
            type_name: type_name(other).to_string(),
        }),
    }
}

/// Resolve a pointer against a document
pub fn resolve<'a>(document: &'a Value, pointer: &str) -> Result<&'a Value, PointerError> {
    parts(pointer)?
        .iter()
        .try_fold(document, |current, part| step(current, part, pointer))
}

fn child_mut<'a>(current: &'a mut Value, part: &str, pointer: &str) -> Result<&'a mut Value, PointerError> {
    match current {
        Value::Object(map) => Rc::make_mut(map)
            .get_mut(part)
            .ok_or_else(|| PointerError::MissingMember {
                member: part.to_string(),
                pointer: pointer.to_string(),
            }),
        Value::Array(items) => {
            let index = parse_index(part)?;
            let items = Rc::make_mut(items);
            let len = items.len();
            items
                .get_mut(index)
                .ok_or(PointerError::IndexOutOfRange { index, len })
        }
        other => Err(PointerError::NotIndexable {
            part: part.to_string(),
            type_name: type_name(other).to_string(),
        }),
    }
}

/// Set the value at `pointer`, which must name a member of an existing
/// container. Mapping members are inserted or replaced; list elements must
/// exist, except `-` which appends.
pub fn set(document: &mut Value, pointer: &str, value: Value) -> Result<(), PointerError> {
    let segments = parts(pointer)?;
    let (last, parents) = segments.split_last().ok_or(PointerError::Root)?;

    let mut current = document;
    for part in parents {
        current = child_mut(current, part, pointer)?;
    }

    match current {
        Value::Object(map) => {
            Rc::make_mut(map).insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            let items = Rc::make_mut(items);
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            let index = parse_index(last)?;
            let len = items.len();
            match items.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(PointerError::IndexOutOfRange { index, len }),
            }
        }
        other => Err(PointerError::NotIndexable {
            part: last.clone(),
            type_name: type_name(other).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Value {
        Value::from(json!({
            "my": {"name": "David"},
            "names": [{"name": "James"}, {"name": "David"}],
            "a/b": {"c~d": 1}
        }))
    }

    #[test]
    fn test_from_path() {
        assert_eq!(from_path("names.1.name"), "/names/1/name");
        assert_eq!(from_path("x"), "/x");
    }

    #[test]
    fn test_resolve() {
        let ctx = context();
        assert_eq!(resolve(&ctx, "/my/name").unwrap(), &Value::from("David"));
        assert_eq!(resolve(&ctx, "/names/1/name").unwrap(), &Value::from("David"));
        assert_eq!(resolve(&ctx, "/a~1b/c~0d").unwrap(), &Value::Int(1));
        assert_eq!(resolve(&ctx, "").unwrap(), &ctx);
    }

    #[test]
    fn test_resolve_errors() {
        let ctx = context();
        assert_eq!(
            resolve(&ctx, "/missing").unwrap_err(),
            PointerError::MissingMember {
                member: "missing".to_string(),
                pointer: "/missing".to_string()
            }
        );
        assert_eq!(
            resolve(&ctx, "/names/2").unwrap_err(),
            PointerError::IndexOutOfRange { index: 2, len: 2 }
        );
        assert!(matches!(resolve(&ctx, "/names/01"), Err(PointerError::InvalidIndex(_))));
        assert!(matches!(resolve(&ctx, "/names/-"), Err(PointerError::InvalidIndex(_))));
        assert!(matches!(resolve(&ctx, "/my/name/x"), Err(PointerError::NotIndexable { .. })));
        assert!(matches!(resolve(&ctx, "my"), Err(PointerError::InvalidPointer(_))));
        assert!(matches!(resolve(&ctx, "/a~2b"), Err(PointerError::InvalidEscape(_))));
    }

    #[test]
    fn test_set() {
        let mut ctx = context();
        set(&mut ctx, "/my/name", Value::from("Eve")).unwrap();
        set(&mut ctx, "/my/age", Value::Int(30)).unwrap();
        set(&mut ctx, "/names/0/name", Value::from("Jim")).unwrap();
        set(&mut ctx, "/names/-", Value::from("tail")).unwrap();

        assert_eq!(resolve(&ctx, "/my/name").unwrap(), &Value::from("Eve"));
        assert_eq!(resolve(&ctx, "/my/age").unwrap(), &Value::Int(30));
        assert_eq!(resolve(&ctx, "/names/0/name").unwrap(), &Value::from("Jim"));
        assert_eq!(resolve(&ctx, "/names/2").unwrap(), &Value::from("tail"));
    }

    #[test]
    fn test_set_does_not_affect_shared_copies() {
        let original = context();
        let mut copy = original.clone();
        set(&mut copy, "/my/name", Value::from("Eve")).unwrap();
        assert_eq!(resolve(&original, "/my/name").unwrap(), &Value::from("David"));
    }

    #[test]
    fn test_set_errors() {
        let mut ctx = context();
        assert_eq!(set(&mut ctx, "", Value::Null), Err(PointerError::Root));
        assert!(matches!(
            set(&mut ctx, "/nope/x", Value::Null),
            Err(PointerError::MissingMember { .. })
        ));
        assert!(matches!(
            set(&mut ctx, "/names/5", Value::Null),
            Err(PointerError::IndexOutOfRange { index: 5, len: 2 })
        ));
    }
}
