//! Application of update operator documents.
//!
//! Supports `$set`, `$unset`, `$pull` and `$push` (with or without
//! `$each`) on dotted paths.

use serde_json::{Map, Value};

use crate::backends::memory::matcher::element_matches;
use crate::error::{PersistenceError, PersistenceResult};

/// Applies an update document to `document` in place.
pub fn apply_update(document: &mut Value, update: &Value) -> PersistenceResult<()> {
    let Value::Object(operators) = update else {
        return Err(PersistenceError::backend(format!(
            "update must be a document, got {}",
            update
        )));
    };

    for (operator, fields) in operators {
        let Value::Object(fields) = fields else {
            return Err(PersistenceError::backend(format!(
                "{} requires a document",
                operator
            )));
        };
        for (path, argument) in fields {
            match operator.as_str() {
                "$set" => set_path(document, path, argument.clone())?,
                "$unset" => unset_path(document, path),
                "$pull" => pull(document, path, argument)?,
                "$push" => push(document, path, argument)?,
                other => {
                    return Err(PersistenceError::backend(format!(
                        "unsupported update operator {}",
                        other
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Sets the value at a dotted path, creating missing documents.
pub fn set_path(document: &mut Value, path: &str, value: Value) -> PersistenceResult<()> {
    let (parent, last) = match path.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, path),
    };

    let mut current = document;
    for segment in parent.into_iter().flat_map(|parent| parent.split('.')) {
        let Value::Object(map) = current else {
            return Err(not_a_document(path));
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    let Value::Object(map) = current else {
        return Err(not_a_document(path));
    };
    map.insert(last.to_string(), value);
    Ok(())
}

/// Removes the value at a dotted path; a missing path is left alone.
pub fn unset_path(document: &mut Value, path: &str) {
    let target = match path.rsplit_once('.') {
        Some((parent, last)) => get_path_mut(document, parent).map(|parent| (parent, last)),
        None => Some((document, path)),
    };
    if let Some((Value::Object(map), last)) = target {
        map.remove(last);
    }
}

fn get_path_mut<'a>(document: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get_mut(segment))
}

fn pull(document: &mut Value, path: &str, condition: &Value) -> PersistenceResult<()> {
    let Some(Value::Array(items)) = get_path_mut(document, path) else {
        return Ok(());
    };
    let mut kept = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        if !element_matches(&item, condition)? {
            kept.push(item);
        }
    }
    *items = kept;
    Ok(())
}

fn push(document: &mut Value, path: &str, argument: &Value) -> PersistenceResult<()> {
    let values = match argument.get("$each") {
        Some(Value::Array(each)) => each.clone(),
        Some(_) => {
            return Err(PersistenceError::backend(
                "$each requires an array".to_string(),
            ));
        }
        None => vec![argument.clone()],
    };

    match get_path_mut(document, path) {
        Some(Value::Array(items)) => {
            items.extend(values);
            Ok(())
        }
        Some(_) => Err(PersistenceError::backend(format!(
            "cannot push to non-array field {}",
            path
        ))),
        None => set_path(document, path, Value::Array(values)),
    }
}

fn not_a_document(path: &str) -> PersistenceError {
    PersistenceError::backend(format!("cannot create field {} below a non-document", path))
}
