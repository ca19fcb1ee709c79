//! Error taxonomy for the capdata marshaling core.
//!
//! One `thiserror` enum per component (C1-C5, see SPEC_FULL.md §4), aggregated into
//! [`MarshalError`] for callers that don't need to match on the originating component.

use thiserror::Error;

/// C1 pass-style classifier failures.
///
/// The source's classifier additionally rejects non-immutable values, bare functions and
/// non-whitelisted symbols; those paths are unreachable here because `Value` (see
/// `crate::value`) is a closed, already-frozen sum type that cannot represent them. See
/// DESIGN.md for the grounding of that decision.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// An input record used the reserved sentinel field name as an ordinary field.
    #[error("record contains the reserved sentinel field name {0:?}")]
    ReservedFieldName(String),
    /// The empty record has no legal pass-style in this closed value model (see
    /// SPEC_FULL.md §9 Open Questions).
    #[error(
        "copyRecord must have at least one field; the empty record has no pass-style here"
    )]
    EmptyRecord,
    /// A remote-style object exposed a forbidden iteration-continuation operation.
    #[error(
        "remote object exposes a forbidden iteration-continuation operation {0:?}; thenables are not a legal pass-style"
    )]
    Thenable(String),
}

/// C2 remotable registry failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The interface tag was neither `"Remotable"` nor prefixed with `"Alleged: "`.
    #[error(
        "interface tag {0:?} is invalid: must equal \"Remotable\" or begin with \"Alleged: \""
    )]
    InvalidInterfaceTag(String),
    /// The target object is already registered under a (possibly different) interface tag.
    #[error("target is already registered as a remotable with interface {0:?}")]
    AlreadyRegistered(String),
}

/// C4 encoder failures.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The classifier rejected a value encountered during traversal.
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    /// The input graph is cyclic. Encoding assumes an acyclic input (cycles are only ever
    /// produced on the decode side, under a permissive [`crate::capdata::CyclePolicy`]) so a
    /// cycle reaching the encoder is treated as caller error rather than silently looped over.
    #[error("cannot encode a cyclic value graph (re-entered identity {0:#x} while still visiting it)")]
    Cyclic(usize),
}

/// C3 copy-projector failures.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The projector reached a remote or future reference while walking a supposedly
    /// copy-only subgraph.
    #[error("{0} is not copyable: the deep-copy projector only accepts copy-style subgraphs")]
    CapabilityValue(&'static str),
}

/// C5 decoder failures.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body text was not well-formed JSON.
    #[error("malformed capdata body: {0}")]
    Parse(String),
    /// A `slot` envelope referenced an index past the end of the slots table.
    #[error("slot index {index} out of range (have {len} slots)")]
    SlotIndexOutOfRange {
        /// The out-of-range index that was requested.
        index: usize,
        /// The number of slots actually available.
        len: usize,
    },
    /// An `ibid` envelope referenced an index past the end of the ibid table.
    #[error("ibid index {index} out of range (have {len} prior entries)")]
    IbidIndexOutOfRange {
        /// The out-of-range index that was requested.
        index: usize,
        /// The number of ibid entries recorded so far.
        len: usize,
    },
    /// An object carried a sentinel field whose value did not match any known tag.
    #[error("unknown qclass sentinel tag {0:?}")]
    UnknownSentinel(String),
    /// A sentinel envelope was shaped incorrectly (wrong field types, missing fields).
    #[error("malformed sentinel envelope: {0}")]
    MalformedEnvelope(String),
    /// An `ibid` backreference pointed at a value still under construction, and the active
    /// cycle policy is `forbidCycles`.
    #[error("forbidden cycle: ibid index {0} refers to a value still under construction")]
    ForbiddenCycle(usize),
    /// The caller requested a cycle policy this implementation does not recognize.
    #[error("unknown cycle policy {0:?}")]
    UnknownCyclePolicy(String),
}

/// Internal consistency violation. Should never occur given valid input and a correct
/// implementation; present so invariant checks fail loudly instead of panicking or being
/// silently skipped.
#[derive(Debug, Error)]
#[error("internal invariant violated: {0}")]
pub struct InvariantError(pub &'static str);

/// Top-level error type returned by [`crate::capdata`] operations and the `marshal` crate's
/// `Marshal::serialize`/`Marshal::unserialize`.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// Failure while registering or validating a remotable.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Failure while encoding.
    #[error(transparent)]
    Encode(#[from] EncodeError),
    /// Failure while decoding.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Failure while deep-copy projecting a copy-only subgraph.
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    /// Internal invariant violation.
    #[error(transparent)]
    Invariant(#[from] InvariantError),
}

impl From<ClassifyError> for MarshalError {
    fn from(e: ClassifyError) -> Self {
        MarshalError::Encode(EncodeError::Classify(e))
    }
}
