//! Overlay merger: structural patches over a JSON document tree
//!
//! Applies an ordered list of [`OverlayPatch`]es to a base document
//! using add/replace/remove semantics against JSON-Pointer paths.
//! Patches are applied strictly in list order; later patches see the
//! effects of earlier ones. Any invalid path fails the whole merge;
//! partial application is never accepted. The merger knows nothing
//! about step semantics; it is a pure structural transform, replayed
//! fresh on every merge.

use flowcert_types::{OverlayPatch, PatchOp};
use serde_json::Value;

/// A malformed or inapplicable overlay patch. Fatal to
/// materialization; the offending path and source pack are named so
/// the caller can point at the overlay that broke.
#[derive(Debug, thiserror::Error)]
pub enum OverlayApplicationError {
    #[error("overlay '{source_pack}': path '{path}' not found")]
    PathNotFound { source_pack: String, path: String },

    #[error("overlay '{source_pack}': path '{path}' is not a valid pointer")]
    InvalidPointer { source_pack: String, path: String },

    #[error("overlay '{source_pack}': array index '{index}' out of bounds at '{path}'")]
    IndexOutOfBounds {
        source_pack: String,
        path: String,
        index: String,
    },

    #[error("overlay '{source_pack}': cannot descend into non-container at '{path}'")]
    NotAContainer { source_pack: String, path: String },

    #[error("overlay '{source_pack}': cannot remove the document root")]
    RemoveRoot { source_pack: String },
}

/// Apply patches to a base document in list order.
///
/// Returns the merged document, or the first error encountered. The
/// base is never mutated.
pub fn apply(base: &Value, patches: &[OverlayPatch]) -> Result<Value, OverlayApplicationError> {
    let mut doc = base.clone();
    for patch in patches {
        for op in &patch.ops {
            apply_op(&mut doc, op, &patch.source_pack)?;
        }
    }
    Ok(doc)
}

fn apply_op(doc: &mut Value, op: &PatchOp, pack: &str) -> Result<(), OverlayApplicationError> {
    let tokens = parse_pointer(op.path(), pack)?;

    match op {
        PatchOp::Add { value, .. } => match tokens.split_last() {
            // Adding at the root replaces the whole document.
            None => {
                *doc = value.clone();
                Ok(())
            }
            Some((leaf, parent_tokens)) => {
                let parent = descend_mut(doc, parent_tokens, op.path(), pack)?;
                add_to(parent, leaf, value.clone(), op.path(), pack)
            }
        },
        PatchOp::Replace { value, .. } => {
            let target = descend_mut(doc, &tokens, op.path(), pack)?;
            *target = value.clone();
            Ok(())
        }
        PatchOp::Remove { .. } => match tokens.split_last() {
            None => Err(OverlayApplicationError::RemoveRoot {
                source_pack: pack.to_string(),
            }),
            Some((leaf, parent_tokens)) => {
                let parent = descend_mut(doc, parent_tokens, op.path(), pack)?;
                remove_from(parent, leaf, op.path(), pack)
            }
        },
    }
}

// ── Pointer handling ─────────────────────────────────────────────────

/// Parse a JSON-Pointer path into unescaped reference tokens.
fn parse_pointer(path: &str, pack: &str) -> Result<Vec<String>, OverlayApplicationError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    if !path.starts_with('/') {
        return Err(OverlayApplicationError::InvalidPointer {
            source_pack: pack.to_string(),
            path: path.to_string(),
        });
    }
    Ok(path[1..]
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect())
}

/// Walk down to the value addressed by `tokens`, mutably. Every token
/// must resolve; a miss anywhere fails with the full original path.
fn descend_mut<'a>(
    doc: &'a mut Value,
    tokens: &[String],
    full_path: &str,
    pack: &str,
) -> Result<&'a mut Value, OverlayApplicationError> {
    let mut current = doc;
    for token in tokens {
        current = match current {
            Value::Object(map) => {
                map.get_mut(token)
                    .ok_or_else(|| OverlayApplicationError::PathNotFound {
                        source_pack: pack.to_string(),
                        path: full_path.to_string(),
                    })?
            }
            Value::Array(items) => {
                let index = parse_index(token, items.len(), full_path, pack)?;
                items
                    .get_mut(index)
                    .ok_or_else(|| OverlayApplicationError::PathNotFound {
                        source_pack: pack.to_string(),
                        path: full_path.to_string(),
                    })?
            }
            _ => {
                return Err(OverlayApplicationError::NotAContainer {
                    source_pack: pack.to_string(),
                    path: full_path.to_string(),
                })
            }
        };
    }
    Ok(current)
}

fn parse_index(
    token: &str,
    len: usize,
    full_path: &str,
    pack: &str,
) -> Result<usize, OverlayApplicationError> {
    let index: usize =
        token
            .parse()
            .map_err(|_| OverlayApplicationError::IndexOutOfBounds {
                source_pack: pack.to_string(),
                path: full_path.to_string(),
                index: token.to_string(),
            })?;
    if index >= len {
        return Err(OverlayApplicationError::IndexOutOfBounds {
            source_pack: pack.to_string(),
            path: full_path.to_string(),
            index: token.to_string(),
        });
    }
    Ok(index)
}

// ── Edit operations ──────────────────────────────────────────────────

fn add_to(
    parent: &mut Value,
    leaf: &str,
    value: Value,
    full_path: &str,
    pack: &str,
) -> Result<(), OverlayApplicationError> {
    match parent {
        Value::Object(map) => {
            map.insert(leaf.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            // "-" or the one-past-end index appends.
            if leaf == "-" {
                items.push(value);
                return Ok(());
            }
            let index: usize =
                leaf.parse()
                    .map_err(|_| OverlayApplicationError::IndexOutOfBounds {
                        source_pack: pack.to_string(),
                        path: full_path.to_string(),
                        index: leaf.to_string(),
                    })?;
            if index > items.len() {
                return Err(OverlayApplicationError::IndexOutOfBounds {
                    source_pack: pack.to_string(),
                    path: full_path.to_string(),
                    index: leaf.to_string(),
                });
            }
            items.insert(index, value);
            Ok(())
        }
        _ => Err(OverlayApplicationError::NotAContainer {
            source_pack: pack.to_string(),
            path: full_path.to_string(),
        }),
    }
}

fn remove_from(
    parent: &mut Value,
    leaf: &str,
    full_path: &str,
    pack: &str,
) -> Result<(), OverlayApplicationError> {
    match parent {
        Value::Object(map) => {
            map.remove(leaf)
                .map(|_| ())
                .ok_or_else(|| OverlayApplicationError::PathNotFound {
                    source_pack: pack.to_string(),
                    path: full_path.to_string(),
                })
        }
        Value::Array(items) => {
            let index = parse_index(leaf, items.len(), full_path, pack)?;
            items.remove(index);
            Ok(())
        }
        _ => Err(OverlayApplicationError::NotAContainer {
            source_pack: pack.to_string(),
            path: full_path.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcert_types::OverlayPatch;
    use serde_json::json;

    fn base() -> Value {
        json!({
            "id": "wf1",
            "version": "1.0.0",
            "steps": [
                {"id": "s1", "title": "Check name"},
                {"id": "s2", "title": "File taxes"}
            ]
        })
    }

    #[test]
    fn test_add_appends_at_array_tail() {
        let patch = OverlayPatch::new("pack.a").with_op(PatchOp::Add {
            path: "/steps/-".into(),
            value: json!({"id": "s3"}),
        });
        let merged = apply(&base(), &[patch]).unwrap();
        assert_eq!(merged["steps"][2]["id"], "s3");

        // One-past-end index appends too.
        let patch = OverlayPatch::new("pack.a").with_op(PatchOp::Add {
            path: "/steps/2".into(),
            value: json!({"id": "s3"}),
        });
        let merged = apply(&base(), &[patch]).unwrap();
        assert_eq!(merged["steps"][2]["id"], "s3");
    }

    #[test]
    fn test_add_inserts_mid_array() {
        let patch = OverlayPatch::new("pack.a").with_op(PatchOp::Add {
            path: "/steps/1".into(),
            value: json!({"id": "s1b"}),
        });
        let merged = apply(&base(), &[patch]).unwrap();
        assert_eq!(merged["steps"][1]["id"], "s1b");
        assert_eq!(merged["steps"][2]["id"], "s2");
    }

    #[test]
    fn test_replace_requires_existing_path() {
        let patch = OverlayPatch::new("pack.a").with_op(PatchOp::Replace {
            path: "/steps/0/notThere".into(),
            value: json!(1),
        });
        let err = apply(&base(), &[patch]).unwrap_err();
        assert!(matches!(
            err,
            OverlayApplicationError::PathNotFound { ref path, .. } if path == "/steps/0/notThere"
        ));
    }

    #[test]
    fn test_replace_existing() {
        let patch = OverlayPatch::new("pack.a").with_op(PatchOp::Replace {
            path: "/steps/0/title".into(),
            value: json!("Check company name"),
        });
        let merged = apply(&base(), &[patch]).unwrap();
        assert_eq!(merged["steps"][0]["title"], "Check company name");
    }

    #[test]
    fn test_remove() {
        let patch = OverlayPatch::new("pack.a").with_op(PatchOp::Remove {
            path: "/steps/1".into(),
        });
        let merged = apply(&base(), &[patch]).unwrap();
        assert_eq!(merged["steps"].as_array().unwrap().len(), 1);

        let patch = OverlayPatch::new("pack.a").with_op(PatchOp::Remove {
            path: "/steps/5".into(),
        });
        let err = apply(&base(), &[patch]).unwrap_err();
        assert!(matches!(err, OverlayApplicationError::IndexOutOfBounds { .. }));
    }

    #[test]
    fn test_patches_apply_in_order() {
        // A introduces /steps/2; B edits it. [A, B] works.
        let a = OverlayPatch::new("pack.a").with_op(PatchOp::Add {
            path: "/steps/-".into(),
            value: json!({"id": "s3", "title": "draft"}),
        });
        let b = OverlayPatch::new("pack.b").with_op(PatchOp::Replace {
            path: "/steps/2/title".into(),
            value: json!("final"),
        });

        let merged = apply(&base(), &[a.clone(), b.clone()]).unwrap();
        assert_eq!(merged["steps"][2]["title"], "final");

        // Reversed order fails predictably: B targets a path A has not
        // yet introduced.
        let err = apply(&base(), &[b, a]).unwrap_err();
        assert!(matches!(err, OverlayApplicationError::IndexOutOfBounds { .. }));
    }

    #[test]
    fn test_error_names_source_pack() {
        let patch = OverlayPatch::new("pack.notary").with_op(PatchOp::Remove {
            path: "/missing".into(),
        });
        let err = apply(&base(), &[patch]).unwrap_err();
        assert!(err.to_string().contains("pack.notary"));
        assert!(err.to_string().contains("/missing"));
    }

    #[test]
    fn test_invalid_pointer() {
        let patch = OverlayPatch::new("pack.a").with_op(PatchOp::Remove {
            path: "no-leading-slash".into(),
        });
        let err = apply(&base(), &[patch]).unwrap_err();
        assert!(matches!(err, OverlayApplicationError::InvalidPointer { .. }));
    }

    #[test]
    fn test_escaped_tokens() {
        let doc = json!({"a/b": {"~tilde": 1}});
        let patch = OverlayPatch::new("pack.a").with_op(PatchOp::Replace {
            path: "/a~1b/~0tilde".into(),
            value: json!(2),
        });
        let merged = apply(&doc, &[patch]).unwrap();
        assert_eq!(merged["a/b"]["~tilde"], 2);
    }

    #[test]
    fn test_base_is_not_mutated() {
        let original = base();
        let patch = OverlayPatch::new("pack.a").with_op(PatchOp::Remove {
            path: "/steps/0".into(),
        });
        let _ = apply(&original, &[patch]).unwrap();
        assert_eq!(original, base());
    }

    #[test]
    fn test_no_patches_is_identity() {
        assert_eq!(apply(&base(), &[]).unwrap(), base());
    }
}
