//! C1: the pass-style classifier.
//!
//! The source's classifier is a thirteen-step decision list because its input domain is an
//! untyped host value: most of those steps (primitive type test, function rejection, prototype
//! chain walk, accessor/hole detection) exist only to rule out shapes that `Value` (see
//! `marshal_types::value`) cannot represent in the first place. What remains is the two checks
//! that are genuinely about content rather than shape: the reserved sentinel field name, and
//! the non-empty-record rule. See DESIGN.md for the full step-by-step correspondence.

use marshal_types::{ClassifyError, PassStyle, Value, QCLASS};

/// Classifies `value`, returning its pass-style or a typed failure.
///
/// Total over `Value`: every variant maps to exactly one pass-style or one error, and the
/// match below is exhaustive, so there is no "falls through" case to get wrong.
pub fn classify(value: &Value) -> Result<PassStyle, ClassifyError> {
    match value {
        Value::Undefined | Value::Null => Ok(PassStyle::Unit),
        Value::Bool(_) => Ok(PassStyle::Boolean),
        Value::Number(_) => Ok(PassStyle::Numeric),
        Value::BigInt(_) => Ok(PassStyle::BigInt),
        Value::String(_) => Ok(PassStyle::String),
        Value::Symbol(_) => Ok(PassStyle::Symbol),
        Value::Record(fields) => {
            let fields = fields.borrow();
            if let Some((name, _)) = fields.iter().find(|(name, _)| name == QCLASS) {
                return Err(ClassifyError::ReservedFieldName(name.clone()));
            }
            if fields.is_empty() {
                return Err(ClassifyError::EmptyRecord);
            }
            Ok(PassStyle::CopyRecord)
        }
        Value::Array(_) => Ok(PassStyle::CopyArray),
        Value::Error(_) => Ok(PassStyle::CopyError),
        Value::Remote(remote) => {
            if remote.target().operations().contains(&"then") {
                return Err(ClassifyError::Thenable(remote.interface().to_string()));
            }
            Ok(PassStyle::Remote)
        }
        Value::Future(_) => Ok(PassStyle::Future),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marshal_types::{RemotableObject, Target};
    use std::rc::Rc;

    #[test]
    fn unit_values() {
        assert_eq!(classify(&Value::Undefined).unwrap(), PassStyle::Unit);
        assert_eq!(classify(&Value::Null).unwrap(), PassStyle::Unit);
    }

    #[test]
    fn booleans_are_their_own_pass_style() {
        assert_eq!(classify(&Value::Bool(true)).unwrap(), PassStyle::Boolean);
        assert_eq!(classify(&Value::Bool(false)).unwrap(), PassStyle::Boolean);
    }

    #[test]
    fn non_empty_record_is_copy_record() {
        let v = Value::record(vec![("a".to_string(), Value::from(1.0))]);
        assert_eq!(classify(&v).unwrap(), PassStyle::CopyRecord);
    }

    #[test]
    fn empty_record_is_rejected() {
        let v = Value::record(vec![]);
        assert!(matches!(classify(&v).unwrap_err(), ClassifyError::EmptyRecord));
    }

    #[test]
    fn reserved_field_name_is_rejected() {
        let v = Value::record(vec![(QCLASS.to_string(), Value::from(1.0))]);
        assert!(matches!(
            classify(&v).unwrap_err(),
            ClassifyError::ReservedFieldName(name) if name == QCLASS
        ));
    }

    #[test]
    fn array_is_copy_array() {
        let v = Value::array(vec![Value::from(1.0), Value::from(2.0)]);
        assert_eq!(classify(&v).unwrap(), PassStyle::CopyArray);
    }

    #[derive(Debug)]
    struct Echo;
    impl Target for Echo {}

    #[test]
    fn remote_is_remote() {
        let r = RemotableObject::new("Remotable", Rc::new(Echo)).unwrap();
        assert_eq!(classify(&Value::Remote(r)).unwrap(), PassStyle::Remote);
    }
}
