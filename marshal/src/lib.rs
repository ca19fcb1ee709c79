//! Pass-style classification, canonical capdata encoding, and cycle-policed revival.
//!
//! This crate holds the algorithms (C1, C3-C6); the value model, the remotable registry and
//! the error taxonomy live in `marshal-types` and are re-exported here for convenience.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod classify;
mod copy;
mod decode;
mod encode;
mod ibid;
mod marshal;

pub use classify::classify;
pub use copy::harden_copy;
pub use decode::decode;
pub use encode::encode;
pub use ibid::{DecodeIbidTable, EncodeIbidTable};
pub use marshal::{classify_value, copy_value, get_interface_of, make_marshal, Marshal, SlotToVal, ValToSlot};

pub use marshal_types::{
    CapData, ClassifyError, CopyError, CyclePolicy, DecodeError, EncodeError, FutureObject,
    InvariantError, MarshalError, PassStyle, ProjectionError, Record, RegistryError,
    RemotableObject, Target, Value, WellKnownSymbol, QCLASS,
};
