//! C4: the encoder.
//!
//! Builds the canonical textual body over a `serde_json::Value` raw tree and the positional
//! slot table, driving [`crate::ibid::EncodeIbidTable`] for copy-style backreferences and a
//! separate slot map for remote/future dedup (see DESIGN.md: these are deliberately two
//! different tables, not one, because a repeated remote reserializes as a full `slot` envelope
//! rather than an `ibid` backreference — SPEC_FULL.md §8 scenario 6).
//!
//! Canonical field ordering falls out of `serde_json::Map` without extra work: this crate does
//! not enable serde_json's `preserve_order` feature, so `Map` is `BTreeMap`-backed and iterates
//! (and serializes) in ascending key order by construction.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use marshal_types::{CapData, ClassifyError, EncodeError, MarshalError, PassStyle, Value, QCLASS};
use serde_json::{Map, Number, Value as Json};

use crate::classify::classify;
use crate::ibid::EncodeIbidTable;

fn sentinel(tag: &str) -> Json {
    let mut map = Map::new();
    map.insert(QCLASS.to_string(), Json::String(tag.to_string()));
    Json::Object(map)
}

fn number_to_json(n: f64) -> Json {
    if n.is_nan() {
        return sentinel("NaN");
    }
    if n == f64::INFINITY {
        return sentinel("Infinity");
    }
    if n == f64::NEG_INFINITY {
        return sentinel("-Infinity");
    }
    // Negative zero is normalized to positive zero on the wire (SPEC_FULL.md §9); this loses
    // the sign bit, intentionally, matching the source.
    let n = if n == 0.0 { 0.0 } else { n };
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Json::Number(Number::from(n as i64))
    } else {
        Json::Number(Number::from_f64(n).expect("classify excludes NaN/Infinity here"))
    }
}

struct Encoder<'a, S> {
    val_to_slot: &'a dyn Fn(&Value) -> S,
    ibid: EncodeIbidTable,
    slot_map: HashMap<usize, usize>,
    slots: Vec<S>,
    visiting: HashSet<usize>,
    marshal_name: &'a str,
    next_error_id: &'a Cell<u64>,
}

impl<'a, S: Clone> Encoder<'a, S> {
    fn fresh_error_id(&self) -> String {
        let id = self.next_error_id.get();
        self.next_error_id.set(id + 1);
        format!("{}:error:{id}", self.marshal_name)
    }

    fn encode_slot(&mut self, value: &Value, iface: Option<&str>) -> Json {
        let identity = value.identity().expect("remote/future values have identity");
        let index = if let Some(index) = self.slot_map.get(&identity) {
            *index
        } else {
            let index = self.slots.len();
            self.slots.push((self.val_to_slot)(value));
            self.slot_map.insert(identity, index);
            index
        };
        let mut map = Map::new();
        map.insert(QCLASS.to_string(), Json::String("slot".to_string()));
        map.insert("index".to_string(), Json::Number(Number::from(index)));
        if let Some(iface) = iface {
            map.insert("iface".to_string(), Json::String(iface.to_string()));
        }
        Json::Object(map)
    }

    fn encode_recur(&mut self, value: &Value, is_root: bool) -> Result<Json, MarshalError> {
        let style = classify(value).map_err(EncodeError::from)?;
        match style {
            PassStyle::Unit => Ok(match value {
                Value::Undefined => sentinel("undefined"),
                Value::Null => Json::Null,
                _ => unreachable!("PassStyle::Unit only covers Undefined/Null"),
            }),
            PassStyle::Boolean => {
                let Value::Bool(b) = value else { unreachable!() };
                Ok(Json::Bool(*b))
            }
            PassStyle::Numeric => {
                let Value::Number(n) = value else { unreachable!() };
                Ok(number_to_json(*n))
            }
            PassStyle::BigInt => {
                let Value::BigInt(big) = value else { unreachable!() };
                let mut map = Map::new();
                map.insert(QCLASS.to_string(), Json::String("bigint".to_string()));
                map.insert("digits".to_string(), Json::String(big.to_str_radix(10)));
                Ok(Json::Object(map))
            }
            PassStyle::String => {
                let Value::String(s) = value else { unreachable!() };
                Ok(Json::String(s.clone()))
            }
            PassStyle::Symbol => Ok(sentinel("@@asyncIterator")),
            PassStyle::CopyRecord => {
                let identity = value.identity().expect("records have identity");
                if !is_root {
                    if let Some(index) = self.ibid.lookup(identity) {
                        return Ok(ibid_json(index));
                    }
                }
                if !self.visiting.insert(identity) {
                    return Err(EncodeError::Cyclic(identity).into());
                }
                if !is_root {
                    self.ibid.register(identity);
                }
                let Value::Record(fields) = value else { unreachable!() };
                let mut map = Map::new();
                for (name, field_value) in fields.borrow().iter() {
                    map.insert(name.clone(), self.encode_recur(field_value, false)?);
                }
                self.visiting.remove(&identity);
                Ok(Json::Object(map))
            }
            PassStyle::CopyArray => {
                let identity = value.identity().expect("arrays have identity");
                if !is_root {
                    if let Some(index) = self.ibid.lookup(identity) {
                        return Ok(ibid_json(index));
                    }
                }
                if !self.visiting.insert(identity) {
                    return Err(EncodeError::Cyclic(identity).into());
                }
                if !is_root {
                    self.ibid.register(identity);
                }
                let Value::Array(elements) = value else { unreachable!() };
                let mut out = Vec::with_capacity(elements.borrow().len());
                for element in elements.borrow().iter() {
                    out.push(self.encode_recur(element, false)?);
                }
                self.visiting.remove(&identity);
                Ok(Json::Array(out))
            }
            PassStyle::CopyError => {
                let identity = value.identity().expect("errors have identity");
                if !is_root {
                    if let Some(index) = self.ibid.lookup(identity) {
                        return Ok(ibid_json(index));
                    }
                    self.ibid.register(identity);
                }
                let Value::Error(err) = value else { unreachable!() };
                let error_id = self.fresh_error_id();
                tracing::info!(error_id = %error_id, name = %err.name, "encoding copyError");
                let mut map = Map::new();
                map.insert(QCLASS.to_string(), Json::String("error".to_string()));
                map.insert("errorId".to_string(), Json::String(error_id));
                map.insert("name".to_string(), Json::String(err.name.clone()));
                map.insert("message".to_string(), Json::String(err.message.clone()));
                Ok(Json::Object(map))
            }
            PassStyle::Remote => {
                let Value::Remote(remote) = value else { unreachable!() };
                Ok(self.encode_slot(value, Some(remote.interface())))
            }
            PassStyle::Future => Ok(self.encode_slot(value, None)),
        }
    }
}

fn ibid_json(index: usize) -> Json {
    let mut map = Map::new();
    map.insert(QCLASS.to_string(), Json::String("ibid".to_string()));
    map.insert("index".to_string(), Json::Number(Number::from(index)));
    Json::Object(map)
}

/// Encodes `root` into canonical capdata, calling `val_to_slot` for each distinct remote/future
/// encountered and `next_error_id` to mint fresh per-marshal error correlation IDs.
pub fn encode<S: Clone>(
    root: &Value,
    val_to_slot: &dyn Fn(&Value) -> S,
    marshal_name: &str,
    next_error_id: &Cell<u64>,
) -> Result<CapData<S>, MarshalError> {
    let mut encoder = Encoder {
        val_to_slot,
        ibid: EncodeIbidTable::new(),
        slot_map: HashMap::new(),
        slots: Vec::new(),
        visiting: HashSet::new(),
        marshal_name,
        next_error_id,
    };
    let raw = encoder.encode_recur(root, true)?;
    // The raw tree is built exclusively from this module's own `Json` constructors (no maps
    // with non-string keys, no NaN/Infinity `f64`s reaching `Number::from_f64` directly), so
    // serialization cannot fail; a failure here is an internal invariant violation, not a
    // caller-triggerable error.
    let body = serde_json::to_string(&raw)
        .map_err(|_| MarshalError::from(marshal_types::InvariantError("raw tree was not serializable")))?;
    Ok(CapData {
        body,
        slots: encoder.slots,
    })
}
