//! Replicated fields.
//!
//! A [`SyncVar`] holds a value that the authoritative participant owns and
//! observers mirror. Local writes that change the value mark it dirty; the
//! owner drains dirty values into [`StateReplication`] messages and ships
//! them over whatever transport the host provides. Inbound values are applied
//! with [`SyncVar::apply_remote`], which never marks the field dirty, so an
//! observer does not echo state back.
//!
//! Ordering across messages is whatever the transport guarantees; the last
//! applied value wins.

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;
use crate::state::PowerState;

/// Which side of the replication boundary a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkRole {
    /// Owns the simulation and produces replication messages.
    Authority,
    /// Mirrors state received from the authority.
    Observer,
}

/// A value with change tracking for replication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncVar<T> {
    value: T,
    #[serde(skip)]
    dirty: bool,
}

impl<T: Copy + PartialEq> SyncVar<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            dirty: false,
        }
    }

    pub fn get(&self) -> T {
        self.value
    }

    /// Write locally. Returns the previous value if it differed, marking the
    /// field dirty; returns `None` and leaves the field untouched otherwise.
    pub fn set(&mut self, value: T) -> Option<T> {
        if self.value == value {
            return None;
        }
        let old = std::mem::replace(&mut self.value, value);
        self.dirty = true;
        Some(old)
    }

    /// Apply a value received from the authority. Returns the previous value.
    pub fn apply_remote(&mut self, value: T) -> T {
        std::mem::replace(&mut self.value, value)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Take the current value if dirty, clearing the flag.
    pub fn take_dirty(&mut self) -> Option<T> {
        if self.dirty {
            self.dirty = false;
            Some(self.value)
        } else {
            None
        }
    }

    /// Force the current value to be sent again, e.g. to a late joiner.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

/// One replicated power-state update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReplication {
    pub device: DeviceId,
    pub state: PowerState,
}
