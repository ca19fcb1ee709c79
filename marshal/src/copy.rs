//! C3: the deep-copy projector.
//!
//! Clones a copy-only subgraph (`copyRecord`/`copyArray`/`copyError`, transitively) into a
//! fresh, independent graph. A visited map keyed by source identity collapses shared
//! substructure in the input into shared substructure in the output, the same identity trick
//! `marshal::ibid` uses for encode — see [`crate::ibid::EncodeIbidTable`].

use std::collections::HashMap;

use marshal_types::{ProjectionError, Value};

/// Produces a hardened, cycle-safe, pure-data clone of `value`.
///
/// Fails with [`ProjectionError::CapabilityValue`] as soon as a remote or future is reached;
/// copies may not cross the capability boundary.
pub fn harden_copy(value: &Value) -> Result<Value, ProjectionError> {
    let mut visited = HashMap::new();
    copy_recur(value, &mut visited)
}

fn copy_recur(value: &Value, visited: &mut HashMap<usize, Value>) -> Result<Value, ProjectionError> {
    if let Some(identity) = value.identity() {
        if let Some(existing) = visited.get(&identity) {
            return Ok(existing.clone());
        }
    }

    match value {
        Value::Undefined
        | Value::Null
        | Value::Bool(_)
        | Value::Number(_)
        | Value::BigInt(_)
        | Value::String(_)
        | Value::Symbol(_) => Ok(value.clone()),

        Value::Record(fields) => {
            let placeholder = Value::record(Vec::new());
            visited.insert(value.identity().expect("records have identity"), placeholder);
            let mut copied = Vec::with_capacity(fields.borrow().len());
            for (name, field_value) in fields.borrow().iter() {
                copied.push((name.clone(), copy_recur(field_value, visited)?));
            }
            let result = Value::record(copied);
            visited.insert(value.identity().expect("records have identity"), result.clone());
            Ok(result)
        }

        Value::Array(elements) => {
            let placeholder = Value::array(Vec::new());
            visited.insert(value.identity().expect("arrays have identity"), placeholder);
            let mut copied = Vec::with_capacity(elements.borrow().len());
            for element in elements.borrow().iter() {
                copied.push(copy_recur(element, visited)?);
            }
            let result = Value::array(copied);
            visited.insert(value.identity().expect("arrays have identity"), result.clone());
            Ok(result)
        }

        Value::Error(error) => {
            let result = Value::error(error.name.clone(), error.message.clone());
            visited.insert(value.identity().expect("errors have identity"), result.clone());
            Ok(result)
        }

        Value::Remote(_) => Err(ProjectionError::CapabilityValue("a remote value")),

        Value::Future(_) => Err(ProjectionError::CapabilityValue("a future value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshal_types::{RemotableObject, Target};
    use std::rc::Rc;

    #[test]
    fn copies_primitives_and_nested_structure() {
        let inner = Value::record(vec![("k".to_string(), Value::from("v"))]);
        let outer = Value::array(vec![inner, Value::from(1.0)]);
        let copied = harden_copy(&outer).unwrap();
        assert_ne!(copied.identity(), outer.identity());
        if let Value::Array(elements) = &copied {
            assert_eq!(elements.borrow().len(), 2);
        } else {
            panic!("expected array");
        }
    }

    #[test]
    fn preserves_shared_substructure_identity_within_the_clone() {
        let shared = Value::record(vec![("x".to_string(), Value::from(1.0))]);
        let outer = Value::array(vec![shared.clone(), shared.clone()]);
        let copied = harden_copy(&outer).unwrap();
        if let Value::Array(elements) = &copied {
            let elements = elements.borrow();
            assert_eq!(elements[0].identity(), elements[1].identity());
        } else {
            panic!("expected array");
        }
    }

    #[test]
    fn clones_error_dropping_nothing_but_name_and_message() {
        let err = Value::error("TypeError", "boom");
        let copied = harden_copy(&err).unwrap();
        if let Value::Error(copy) = copied {
            assert_eq!(copy.name, "TypeError");
            assert_eq!(copy.message, "boom");
        } else {
            panic!("expected error");
        }
    }

    #[derive(Debug)]
    struct Echo;
    impl Target for Echo {}

    #[test]
    fn rejects_remote_values() {
        let r = RemotableObject::new("Remotable", Rc::new(Echo)).unwrap();
        let err = harden_copy(&Value::Remote(r)).unwrap_err();
        assert!(matches!(err, ProjectionError::CapabilityValue(_)));
    }
}
