//! The value universe the marshaling core classifies, copies, encodes and decodes.
//!
//! Modeled as a closed sum type per SPEC_FULL.md §9 "Polymorphism without inheritance" rather
//! than a virtual hierarchy, so the classifier in `marshal::classify` can dispatch with a
//! single `match`.

use std::cell::RefCell;
use std::rc::Rc;

use num_bigint::BigInt;

use crate::remotable::{FutureObject, RemotableObject};

/// The sentinel field name that discriminates encoded envelopes from natural records.
/// Reserved repository-wide; an input record using this as an ordinary field name is rejected
/// by the classifier (`ClassifyError::ReservedFieldName`).
pub const QCLASS: &str = "@qclass";

/// The total tag assigned by the pass-style classifier (C1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassStyle {
    Unit,
    Boolean,
    Numeric,
    BigInt,
    String,
    Symbol,
    CopyRecord,
    CopyArray,
    CopyError,
    Remote,
    Future,
}

impl PassStyle {
    /// Short machine-readable name, used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            PassStyle::Unit => "unit",
            PassStyle::Boolean => "boolean",
            PassStyle::Numeric => "numeric",
            PassStyle::BigInt => "bigint",
            PassStyle::String => "string",
            PassStyle::Symbol => "symbol",
            PassStyle::CopyRecord => "copyRecord",
            PassStyle::CopyArray => "copyArray",
            PassStyle::CopyError => "copyError",
            PassStyle::Remote => "remote",
            PassStyle::Future => "future",
        }
    }
}

/// The single well-known symbol the classifier admits (the asynchronous iteration marker).
/// Every other symbol is rejected; since this enum has exactly one variant, "every other
/// symbol" is unrepresentable in this Rust model rather than merely forbidden at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    AsyncIterator,
}

/// A copy-pass error object: name and message only. Stack traces are not part of the copy
/// pass-style and are dropped at the projector boundary (C3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyError {
    pub name: String,
    pub message: String,
}

/// A non-empty, ordered bag of named fields.
///
/// Construction order is irrelevant to encoding: the encoder re-sorts by field name before
/// emitting (SPEC_FULL.md §4.4 "Canonical ordering"). Duplicate field names are a caller bug,
/// not validated here, mirroring the source's reliance on the host object model to exclude
/// duplicate keys by construction.
pub type Record = Vec<(String, Value)>;

/// The input domain: every value the marshaling core can classify, copy, encode and decode.
///
/// `Record`, `Array`, `Error`, `Remote` and `Future` are the non-primitive cases (SPEC_FULL.md
/// §3) and are `Rc`-wrapped so two occurrences of the *same* subvalue can be told apart from
/// two independently constructed but equal subvalues by pointer identity — see
/// [`Value::identity`] and SPEC_FULL.md §9 "Object identity across encode". All other cases
/// are primitives and are never ibid-tracked.
///
/// `Record` and `Array` additionally go through a `RefCell`: decoding an `allowCycles` or
/// `warnOfCycles` graph needs to hand back a reference to a record or array that is still being
/// filled in by an enclosing call (SPEC_FULL.md §6), which means the decoder must be able to
/// allocate the container, register its identity, and only then populate it. `Error`, `Remote`
/// and `Future` never participate in that backpatch (an error or a remote is never "under
/// construction" at ibid-registration time) so they stay plain `Rc`.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absence, distinct from `Null`. Classifies as `PassStyle::Unit` but encodes through the
    /// `undefined` sentinel rather than bare `null` (SPEC_FULL.md §4.4).
    Undefined,
    /// Classifies as `PassStyle::Unit`; encodes as bare `null`.
    Null,
    Bool(bool),
    /// Every numeric value, including the IEEE-754 specials (NaN, ±Infinity) and negative
    /// zero. The classifier does not further distinguish integer-valued from non-integer
    /// numbers; both are `PassStyle::Numeric`.
    Number(f64),
    BigInt(BigInt),
    String(String),
    Symbol(WellKnownSymbol),
    Record(Rc<RefCell<Record>>),
    Array(Rc<RefCell<Vec<Value>>>),
    Error(Rc<CopyError>),
    Remote(Rc<RemotableObject>),
    Future(Rc<FutureObject>),
}

impl Value {
    /// A stable identity key for ibid/slot-map deduplication, or `None` for primitives.
    ///
    /// Backed by the `Rc` allocation's address, per the "address-stable arena" strategy
    /// SPEC_FULL.md §9 recommends for languages without a guaranteed identity hash.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Record(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Array(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Error(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Remote(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Future(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            _ => None,
        }
    }

    /// `true` for the non-primitive pass-styles that participate in ibid tracking.
    pub fn is_non_primitive(&self) -> bool {
        self.identity().is_some()
    }

    /// `getInterfaceOf(value)`: the registered interface tag if `self` is a remote-style
    /// object, `None` otherwise.
    pub fn interface_of(&self) -> Option<&str> {
        match self {
            Value::Remote(r) => Some(r.interface()),
            _ => None,
        }
    }

    pub fn record(fields: Record) -> Self {
        Value::Record(Rc::new(RefCell::new(fields)))
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Value::Error(Rc::new(CopyError {
            name: name.into(),
            message: message.into(),
        }))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Structural equality, with one exception: two distinct remotes or futures are never equal,
/// even if "the same" by some caller-defined notion, because this model has no access to
/// whatever identity the caller's `valToSlot`/`slotToVal` translators use — only to the `Rc`
/// allocation itself. This matches the round-trip property in SPEC_FULL.md §8 ("structurally
/// equal", restricted to graphs with no remote or future) rather than a general notion of
/// value equality.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => *a.borrow() == *b.borrow(),
            (Value::Array(a), Value::Array(b)) => *a.borrow() == *b.borrow(),
            (Value::Error(a), Value::Error(b)) => a.name == b.name && a.message == b.message,
            (Value::Remote(a), Value::Remote(b)) => Rc::ptr_eq(a, b),
            (Value::Future(a), Value::Future(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn primitive_equality_is_reflexive(n: f64, s: String, b: bool) -> bool {
        (Value::from(n) == Value::from(n) || n.is_nan())
            && Value::from(s.clone()) == Value::from(s)
            && Value::from(b) == Value::from(b)
    }

    #[quickcheck]
    fn two_records_built_from_the_same_fields_are_equal_but_not_identical(n: f64) -> bool {
        if n.is_nan() {
            return true;
        }
        let a = Value::record(vec![("x".to_string(), Value::from(n))]);
        let b = Value::record(vec![("x".to_string(), Value::from(n))]);
        a == b && a.identity() != b.identity()
    }

    #[test]
    fn pass_style_names_are_pairwise_distinct() {
        let styles = [
            PassStyle::Unit,
            PassStyle::Boolean,
            PassStyle::Numeric,
            PassStyle::BigInt,
            PassStyle::String,
            PassStyle::Symbol,
            PassStyle::CopyRecord,
            PassStyle::CopyArray,
            PassStyle::CopyError,
            PassStyle::Remote,
            PassStyle::Future,
        ];
        for (i, a) in styles.iter().enumerate() {
            for (j, b) in styles.iter().enumerate() {
                assert_eq!(i == j, a.as_str() == b.as_str());
            }
        }
    }
}
