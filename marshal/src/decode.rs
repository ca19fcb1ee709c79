//! C5: the decoder.
//!
//! Parses the textual body into a `serde_json::Value` raw tree, then revives it in a single
//! recursive pre-order pass that mirrors the encoder's traversal exactly (see
//! [`crate::encode`]): copy-style containers (`copyRecord`/`copyArray`) register into
//! [`crate::ibid::DecodeIbidTable`] before their children are revived, so an `ibid` envelope
//! anywhere inside those children can refer back to the container itself — that is what makes
//! `allowCycles`/`warnOfCycles` possible at all in safe Rust: the container is allocated as an
//! `Rc<RefCell<_>>` placeholder and only filled in afterwards (see `marshal_types::value`).
//!
//! Slot-revived values (`remote`/`future`) are deliberately *not* entered into the ibid table —
//! see `marshal::encode` for why the encoder never assigns them an ibid index either.

use marshal_types::{CapData, CyclePolicy, DecodeError, MarshalError, Value, WellKnownSymbol, QCLASS};
use num_bigint::BigInt;
use serde_json::{Map, Value as Json};

use crate::ibid::DecodeIbidTable;

struct Decoder<'a, S> {
    slots: &'a [S],
    slot_to_val: &'a dyn Fn(&S, Option<&str>) -> Value,
    ibid: DecodeIbidTable,
}

fn expect_string(map: &Map<String, Json>, field: &str) -> Result<String, DecodeError> {
    match map.get(field) {
        Some(Json::String(s)) => Ok(s.clone()),
        Some(_) => Err(DecodeError::MalformedEnvelope(format!(
            "field {field:?} must be a string"
        ))),
        None => Err(DecodeError::MalformedEnvelope(format!(
            "missing required field {field:?}"
        ))),
    }
}

fn expect_index(map: &Map<String, Json>, field: &str) -> Result<usize, DecodeError> {
    match map.get(field) {
        Some(Json::Number(n)) => n.as_u64().map(|n| n as usize).ok_or_else(|| {
            DecodeError::MalformedEnvelope(format!("field {field:?} must be a non-negative integer"))
        }),
        Some(_) => Err(DecodeError::MalformedEnvelope(format!(
            "field {field:?} must be a number"
        ))),
        None => Err(DecodeError::MalformedEnvelope(format!(
            "missing required field {field:?}"
        ))),
    }
}

impl<'a, S> Decoder<'a, S> {
    fn revive_sentinel(
        &mut self,
        tag: &str,
        map: &Map<String, Json>,
        is_root: bool,
        policy: CyclePolicy,
    ) -> Result<Value, MarshalError> {
        match tag {
            "undefined" => Ok(Value::Undefined),
            "NaN" => Ok(Value::Number(f64::NAN)),
            "Infinity" => Ok(Value::Number(f64::INFINITY)),
            "-Infinity" => Ok(Value::Number(f64::NEG_INFINITY)),
            "@@asyncIterator" => Ok(Value::Symbol(WellKnownSymbol::AsyncIterator)),
            "bigint" => {
                let digits = expect_string(map, "digits")?;
                let value = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| {
                    DecodeError::MalformedEnvelope(format!("{digits:?} is not a base-10 integer"))
                })?;
                Ok(Value::BigInt(value))
            }
            "error" => {
                let name = expect_string(map, "name")?;
                let message = expect_string(map, "message")?;
                let value = Value::error(name, message);
                // Mirrors `marshal::encode`'s `CopyError` arm: the top-level value passed to
                // `decode` is never itself ibid-registered, so an error encoded as the bare
                // root does not consume an index the encoder never assigned it.
                if !is_root {
                    self.ibid.register(value.clone());
                }
                Ok(value)
            }
            "slot" => {
                let index = expect_index(map, "index")?;
                let slot = self.slots.get(index).ok_or(DecodeError::SlotIndexOutOfRange {
                    index,
                    len: self.slots.len(),
                })?;
                let iface = match map.get("iface") {
                    Some(Json::String(s)) => Some(s.as_str()),
                    Some(_) => {
                        return Err(DecodeError::MalformedEnvelope(
                            "field \"iface\" must be a string".to_string(),
                        )
                        .into())
                    }
                    None => None,
                };
                Ok((self.slot_to_val)(slot, iface))
            }
            "ibid" => {
                let index = expect_index(map, "index")?;
                Ok(self.ibid.lookup(index, policy)?)
            }
            other => Err(DecodeError::UnknownSentinel(other.to_string()).into()),
        }
    }

    fn revive_recur(&mut self, node: &Json, is_root: bool, policy: CyclePolicy) -> Result<Value, MarshalError> {
        match node {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => Ok(Value::Number(n.as_f64().ok_or_else(|| {
                MarshalError::from(marshal_types::InvariantError("non-finite JSON number literal"))
            })?)),
            Json::String(s) => Ok(Value::String(s.clone())),
            Json::Object(map) => {
                if let Some(Json::String(tag)) = map.get(QCLASS) {
                    return self.revive_sentinel(tag, map, is_root, policy);
                }
                let placeholder = Value::record(Vec::new());
                let slot = (!is_root).then(|| self.ibid.start(placeholder.clone()));
                let Value::Record(fields) = &placeholder else {
                    unreachable!()
                };
                for (name, child) in map.iter() {
                    let revived = self.revive_recur(child, false, policy)?;
                    fields.borrow_mut().push((name.clone(), revived));
                }
                if let Some(index) = slot {
                    self.ibid.finish(index);
                }
                Ok(placeholder)
            }
            Json::Array(elements) => {
                let placeholder = Value::array(Vec::new());
                let slot = (!is_root).then(|| self.ibid.start(placeholder.clone()));
                let Value::Array(out) = &placeholder else {
                    unreachable!()
                };
                for element in elements {
                    let revived = self.revive_recur(element, false, policy)?;
                    out.borrow_mut().push(revived);
                }
                if let Some(index) = slot {
                    self.ibid.finish(index);
                }
                Ok(placeholder)
            }
        }
    }
}

/// Parses and revives `cap`, applying `policy` to any `ibid` reference to a value still under
/// construction. `slot_to_val` materializes a local stand-in from a slot and an optional
/// interface hint, mirroring the encoder's `val_to_slot`.
pub fn decode<S>(
    cap: &CapData<S>,
    slot_to_val: &dyn Fn(&S, Option<&str>) -> Value,
    policy: CyclePolicy,
) -> Result<Value, MarshalError> {
    let raw: Json = serde_json::from_str(&cap.body).map_err(|e| DecodeError::Parse(e.to_string()))?;
    let mut decoder = Decoder {
        slots: &cap.slots,
        slot_to_val,
        ibid: DecodeIbidTable::new(),
    };
    decoder.revive_recur(&raw, true, policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_slot(slot: &String, _iface: Option<&str>) -> Value {
        Value::String(slot.clone())
    }

    #[test]
    fn round_trips_negative_zero_as_positive_zero() {
        let cap = CapData::<String> {
            body: r#"{"n":0}"#.to_string(),
            slots: vec![],
        };
        let value = decode(&cap, &identity_slot, CyclePolicy::ForbidCycles).unwrap();
        let Value::Record(fields) = value else {
            panic!("expected record")
        };
        let fields = fields.borrow();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "n");
        assert!(matches!(fields[0].1, Value::Number(n) if n == 0.0));
    }

    #[test]
    fn nan_decodes_to_a_value_unequal_to_itself() {
        let cap = CapData::<String> {
            body: r#"{"@qclass":"NaN"}"#.to_string(),
            slots: vec![],
        };
        let value = decode(&cap, &identity_slot, CyclePolicy::ForbidCycles).unwrap();
        let Value::Number(n) = value else {
            panic!("expected number")
        };
        assert!(n.is_nan());
    }

    #[test]
    fn bigint_parses_decimal_digits() {
        let cap = CapData::<String> {
            body: r#"{"@qclass":"bigint","digits":"12345678901234567890"}"#.to_string(),
            slots: vec![],
        };
        let value = decode(&cap, &identity_slot, CyclePolicy::ForbidCycles).unwrap();
        assert_eq!(
            value,
            Value::BigInt(BigInt::parse_bytes(b"12345678901234567890", 10).unwrap())
        );
    }

    #[test]
    fn ibid_backreference_resolves_to_the_same_record() {
        let cap = CapData::<String> {
            body: r#"{"x":{"k":1},"y":{"@qclass":"ibid","index":2}}"#.to_string(),
            slots: vec![],
        };
        let value = decode(&cap, &identity_slot, CyclePolicy::ForbidCycles).unwrap();
        let Value::Record(fields) = value else {
            panic!("expected record")
        };
        let fields = fields.borrow();
        let x = &fields.iter().find(|(n, _)| n == "x").unwrap().1;
        let y = &fields.iter().find(|(n, _)| n == "y").unwrap().1;
        assert_eq!(x.identity(), y.identity());
    }

    // The root value is never itself ibid-registered (mirroring the encoder — see
    // `crate::encode`), so a genuine self-reference has to go through a non-root container:
    // `x` is registered at ibid index 2 before its own `self` field is revived.
    const SELF_CYCLE_BODY: &str = r#"{"x":{"self":{"@qclass":"ibid","index":2}}}"#;

    #[test]
    fn forbidden_cycle_fails_under_default_policy() {
        let cap = CapData::<String> {
            body: SELF_CYCLE_BODY.to_string(),
            slots: vec![],
        };
        let err = decode(&cap, &identity_slot, CyclePolicy::ForbidCycles).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::Decode(DecodeError::ForbiddenCycle(2))
        ));
    }

    #[test]
    fn self_cycle_permitted_under_allow_cycles() {
        let cap = CapData::<String> {
            body: SELF_CYCLE_BODY.to_string(),
            slots: vec![],
        };
        let value = decode(&cap, &identity_slot, CyclePolicy::AllowCycles).unwrap();
        let Value::Record(fields) = &value else {
            panic!("expected record")
        };
        let fields = fields.borrow();
        let x = &fields.iter().find(|(n, _)| n == "x").unwrap().1;
        let Value::Record(x_fields) = x else {
            panic!("expected record")
        };
        let x_fields = x_fields.borrow();
        let self_ref = &x_fields.iter().find(|(n, _)| n == "self").unwrap().1;
        assert_eq!(self_ref.identity(), x.identity());
    }

    #[test]
    fn slot_decodes_via_the_caller_supplied_resolver() {
        let cap = CapData::<String> {
            body: r#"{"@qclass":"slot","index":0,"iface":"Remotable"}"#.to_string(),
            slots: vec!["handle-0".to_string()],
        };
        let value = decode(&cap, &identity_slot, CyclePolicy::ForbidCycles).unwrap();
        assert_eq!(value, Value::String("handle-0".to_string()));
    }

    #[test]
    fn out_of_range_slot_index_fails() {
        let cap = CapData::<String> {
            body: r#"{"@qclass":"slot","index":4}"#.to_string(),
            slots: vec![],
        };
        let err = decode(&cap, &identity_slot, CyclePolicy::ForbidCycles).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::Decode(DecodeError::SlotIndexOutOfRange { index: 4, len: 0 })
        ));
    }

    // A root-level error must not consume an ibid index: `marshal::encode`'s `CopyError` arm
    // never registers the root, so a sibling ibid reference appearing later in the same body
    // has to resolve as if the root were never seen at all.
    #[test]
    fn root_level_error_does_not_consume_an_ibid_index() {
        let cap = CapData::<String> {
            body: r#"{"@qclass":"error","errorId":"m:error:0","name":"Error","message":"boom"}"#
                .to_string(),
            slots: vec![],
        };
        let value = decode(&cap, &identity_slot, CyclePolicy::ForbidCycles).unwrap();
        let Value::Error(err) = value else {
            panic!("expected error")
        };
        assert_eq!(err.name, "Error");
        assert_eq!(err.message, "boom");
    }
}
