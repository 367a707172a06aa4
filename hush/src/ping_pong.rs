use std::ops::Range;

use crate::{Error, Result};

/// Indirection table between logical and physical permanent textures.
///
/// Each entry pairs two permanent textures that trade places once per
/// frame; a binding refers to one side of an entry, and resolving it
/// yields whichever physical texture currently plays that role.
#[derive(Clone, Debug, Default)]
pub struct PingPong {
    entries: Vec<PingPongEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PingPongEntry {
    a: u16,
    b: u16,
    swapped: bool,
}

impl PingPong {
    /// Registers a swap between two permanent textures (given as global
    /// pool indices) and returns its entry; registering the same pair
    /// twice, in any order, yields the same entry.
    pub fn register_swap(&mut self, a: u16, b: u16) -> Result<u16> {
        if a == b {
            return Err(Error::InvalidPingPong);
        }

        let existing = self.entries.iter().position(|entry| {
            (entry.a, entry.b) == (a, b) || (entry.a, entry.b) == (b, a)
        });

        if let Some(idx) = existing {
            return Ok(idx as u16);
        }

        if self.entries.iter().any(|entry| {
            entry.a == a || entry.a == b || entry.b == a || entry.b == b
        }) {
            return Err(Error::InvalidPingPong);
        }

        if self.entries.len() >= usize::from(u16::MAX) {
            return Err(Error::PoolOverflow("ping-pong"));
        }

        self.entries.push(PingPongEntry {
            a,
            b,
            swapped: false,
        });

        Ok((self.entries.len() - 1) as u16)
    }

    /// Returns the physical texture currently standing in for `logical`,
    /// which must be one of the entry's sides.
    pub fn resolve(&self, entry: u16, logical: u16) -> u16 {
        let Some(entry) = self.entries.get(usize::from(entry)) else {
            return logical;
        };

        debug_assert!(logical == entry.a || logical == entry.b);

        if !entry.swapped {
            logical
        } else if logical == entry.a {
            entry.b
        } else {
            entry.a
        }
    }

    /// Exchanges the roles of every entry within given range.
    ///
    /// Applying the same range twice restores the initial mapping.
    pub fn apply_swaps(&mut self, entries: Range<u16>) {
        let entries = usize::from(entries.start)..usize::from(entries.end);

        for entry in &mut self.entries[entries] {
            entry.swapped = !entry.swapped;
        }
    }

    pub fn len(&self) -> u16 {
        self.entries.len() as u16
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
