//! C6: the intra-message backreference tables shared by the encoder and the decoder.
//!
//! Both tables reserve indices `0` and `1`: the source leaves these unused to keep the `ibid`
//! index space aligned with the `slot` index space one field over (SPEC_FULL.md §8 scenario 4),
//! and this port keeps that numbering verbatim rather than renumber from zero. The top-level
//! value passed to `encode`/`revive` is never itself registered — only values reached by
//! recursing into a container's fields are eligible for an ibid index — so the first
//! registered child gets index `2`.

use std::collections::{HashMap, HashSet};

use marshal_types::{CyclePolicy, DecodeError, Value};

/// The first index ever handed out by [`EncodeIbidTable::register`] /
/// [`DecodeIbidTable::register`].
const FIRST_IBID_INDEX: usize = 2;

/// Encode-side table: maps a non-primitive's identity to the ibid index it was first seen at.
#[derive(Debug, Default)]
pub struct EncodeIbidTable {
    seen: HashMap<usize, usize>,
    next_index: usize,
}

impl EncodeIbidTable {
    /// A fresh table, ready for a single top-level `encode` call.
    pub fn new() -> Self {
        EncodeIbidTable {
            seen: HashMap::new(),
            next_index: FIRST_IBID_INDEX,
        }
    }

    /// The ibid index `identity` was previously registered at, if any.
    pub fn lookup(&self, identity: usize) -> Option<usize> {
        self.seen.get(&identity).copied()
    }

    /// Registers `identity`, returning the index it was assigned. Callers must not register the
    /// same identity twice; check [`Self::lookup`] first.
    pub fn register(&mut self, identity: usize) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.seen.insert(identity, index);
        index
    }
}

/// Decode-side table: a positional log of revived values, indexed the same way the encoder's
/// table was, plus the bookkeeping needed to tell a backreference to a value still under
/// construction (a cycle) apart from one that is simply a repeat of a finished value.
#[derive(Debug, Default)]
pub struct DecodeIbidTable {
    /// `entries[i]` is the value registered at ibid index `i`, once known. Indices `0` and `1`
    /// are permanently unused placeholders so real entries line up with [`FIRST_IBID_INDEX`].
    entries: Vec<Option<Value>>,
    /// Indices whose value has been registered but not yet finished (SPEC_FULL.md §6): looking
    /// one of these up is what the cycle policy governs.
    unfinished: HashSet<usize>,
}

impl DecodeIbidTable {
    /// A fresh table, ready for a single top-level `unserialize` call.
    pub fn new() -> Self {
        DecodeIbidTable {
            entries: vec![None, None],
            unfinished: HashSet::new(),
        }
    }

    /// Reserves the next index for `value` before its children have been revived, marking it
    /// unfinished. Returns the reserved index. Pair with [`Self::finish`] once `value`'s
    /// children are fully revived.
    pub fn start(&mut self, value: Value) -> usize {
        let index = self.entries.len();
        self.unfinished.insert(index);
        self.entries.push(Some(value));
        index
    }

    /// Marks the container registered at `index` as fully revived, so a later `ibid` reference
    /// to it is an ordinary backreference rather than a cycle.
    pub fn finish(&mut self, index: usize) {
        self.unfinished.remove(&index);
    }

    /// Registers an already-complete value (anything that isn't a record or array under
    /// construction: errors, remotes, futures) and returns its index.
    pub fn register(&mut self, value: Value) -> usize {
        let index = self.entries.len();
        self.entries.push(Some(value));
        index
    }

    /// Resolves an `ibid` envelope's `index` field to the value registered there, applying
    /// `policy` if that value is still under construction.
    pub fn lookup(&self, index: usize, policy: CyclePolicy) -> Result<Value, DecodeError> {
        let len = self.entries.len();
        let value = self
            .entries
            .get(index)
            .and_then(|slot| slot.as_ref())
            .ok_or(DecodeError::IbidIndexOutOfRange { index, len })?;
        if self.unfinished.contains(&index) {
            match policy {
                CyclePolicy::ForbidCycles => return Err(DecodeError::ForbiddenCycle(index)),
                CyclePolicy::WarnOfCycles => {
                    tracing::warn!(ibid_index = index, "decoded a cyclic reference");
                }
                CyclePolicy::AllowCycles => {}
            }
        }
        Ok(value.clone())
    }
}
