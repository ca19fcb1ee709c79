//! The public factory: `make_marshal` plus the `Marshal` handle it returns.
//!
//! Grounded on the same "factory bundles config + mutable counters, methods are thin
//! dispatchers to free functions" shape the teacher repo uses for its checked-transaction
//! builders: the heavy lifting lives in [`crate::encode`], [`crate::decode`], [`crate::classify`]
//! and [`crate::copy`]; this module only owns the per-instance error-ID counter and the two
//! caller-supplied translators.

use std::cell::Cell;

use marshal_types::{CapData, ClassifyError, CyclePolicy, MarshalError, Value};

use crate::classify::classify;
use crate::copy::harden_copy;
use crate::decode;
use crate::encode;

/// `val→slot`: extracts an opaque slot identifier from a remote-style or future value.
pub type ValToSlot<S> = Box<dyn Fn(&Value) -> S>;
/// `slot→value`: materializes a local stand-in from a slot and an optional interface hint.
pub type SlotToVal<S> = Box<dyn Fn(&S, Option<&str>) -> Value>;

/// A configured encode/decode pair sharing one marshal name and one error-ID counter.
///
/// `S` is the caller's opaque slot identifier type (SPEC_FULL.md §3: the core does not define
/// the capability identifier space).
pub struct Marshal<S> {
    marshal_name: String,
    val_to_slot: ValToSlot<S>,
    slot_to_val: SlotToVal<S>,
    next_error_id: Cell<u64>,
}

impl<S: Clone> Marshal<S> {
    /// Builds a new marshal pair. `marshal_name` appears in generated error IDs.
    pub fn new(val_to_slot: ValToSlot<S>, slot_to_val: SlotToVal<S>, marshal_name: impl Into<String>) -> Self {
        Marshal {
            marshal_name: marshal_name.into(),
            val_to_slot,
            slot_to_val,
            next_error_id: Cell::new(0),
        }
    }

    /// `serialize(root) → {body, slots}`.
    #[tracing::instrument(name = "marshal_serialize", skip(self, root))]
    pub fn serialize(&self, root: &Value) -> Result<CapData<S>, MarshalError> {
        tracing::trace!(marshal_name = %self.marshal_name, "serializing");
        encode::encode(root, self.val_to_slot.as_ref(), &self.marshal_name, &self.next_error_id)
    }

    /// `unserialize({body, slots}, cyclePolicy) → value`. Defaults to `forbidCycles`.
    #[tracing::instrument(name = "marshal_unserialize", skip(self, cap))]
    pub fn unserialize(&self, cap: &CapData<S>, policy: CyclePolicy) -> Result<Value, MarshalError> {
        tracing::trace!(marshal_name = %self.marshal_name, ?policy, "unserializing");
        decode::decode(cap, self.slot_to_val.as_ref(), policy)
    }
}

/// `makeMarshal(valToSlot, slotToVal, marshalName)`: the public factory.
///
/// Defaults: `val_to_slot` defaults to identity when `S = Value` is otherwise meaningless here,
/// so unlike the source this constructor always takes both translators explicitly — Rust has
/// no notion of "the slot type happens to equal the value type" to default against.
pub fn make_marshal<S: Clone>(
    val_to_slot: ValToSlot<S>,
    slot_to_val: SlotToVal<S>,
    marshal_name: impl Into<String>,
) -> Marshal<S> {
    Marshal::new(val_to_slot, slot_to_val, marshal_name)
}

/// `getInterfaceOf(value) → iface | undefined`.
pub fn get_interface_of(value: &Value) -> Option<&str> {
    value.interface_of()
}

/// The pass-style classifier, exposed standalone for callers that want to classify without
/// encoding (SPEC_FULL.md §4.1).
pub fn classify_value(value: &Value) -> Result<marshal_types::PassStyle, ClassifyError> {
    classify(value)
}

/// The deep-copy projector, exposed standalone (SPEC_FULL.md §4.3).
pub fn copy_value(value: &Value) -> Result<Value, marshal_types::ProjectionError> {
    harden_copy(value)
}
