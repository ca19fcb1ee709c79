//! Value model, pass-style tags, the remotable registry and the error taxonomy shared by the
//! capdata marshaling core.
//!
//! This crate holds the data (C2's registry lives here too, since it is owned by the
//! [`Value::Remote`] constructor rather than by the encode/decode algorithms); the algorithms
//! themselves (classify, copy, encode, decode, ibid tables) live in the `marshal` crate.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

pub mod capdata;
pub mod error;
pub mod remotable;
pub mod value;

pub use capdata::{CapData, CyclePolicy};
pub use error::{
    ClassifyError, DecodeError, EncodeError, InvariantError, MarshalError, ProjectionError,
    RegistryError,
};
pub use remotable::{FutureObject, RemotableObject, Target};
pub use value::{CopyError, PassStyle, Record, Value, WellKnownSymbol, QCLASS};
