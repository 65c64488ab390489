//! Match-scoped identities: card instances and seats

use crate::{ClashError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique id of a card instance within one match
///
/// Allocated from a monotonically increasing counter and never reused, so an
/// id stays valid as a lookup key even after the instance leaves play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(u32);

impl InstanceId {
    pub fn new(id: u32) -> Self {
        InstanceId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the two fixed player slots in a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Seat(u8);

impl Seat {
    pub const FIRST: Seat = Seat(0);
    pub const SECOND: Seat = Seat(1);

    /// Build a seat from a player index (anything but 0 maps to the second seat)
    pub fn from_index(idx: usize) -> Self {
        if idx == 0 {
            Seat::FIRST
        } else {
            Seat::SECOND
        }
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn opponent(&self) -> Seat {
        Seat(1 - self.0)
    }

    pub fn both() -> [Seat; 2] {
        [Seat::FIRST, Seat::SECOND]
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0 + 1)
    }
}

/// Arena of match objects keyed by `InstanceId`
///
/// All cross references (zones, combat, pending targets) hold ids and resolve
/// them here at use time. BTreeMap keeps iteration (and serialization) order
/// stable, which the state hash relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRegistry<T> {
    entries: BTreeMap<InstanceId, T>,
    next_id: u32,
}

impl<T> InstanceRegistry<T> {
    pub fn new() -> Self {
        InstanceRegistry {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Reserve the next never-used id
    pub fn next_id(&mut self) -> InstanceId {
        let id = InstanceId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, id: InstanceId, entry: T) {
        self.entries.insert(id, entry);
    }

    pub fn get(&self, id: InstanceId) -> Result<&T> {
        self.entries
            .get(&id)
            .ok_or(ClashError::EntityNotFound(id.as_u32()))
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Result<&mut T> {
        self.entries
            .get_mut(&id)
            .ok_or(ClashError::EntityNotFound(id.as_u32()))
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InstanceId, &T)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for InstanceRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
