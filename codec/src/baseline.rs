//! Baseline history storage for snapshots.
//!
//! The store keeps recent snapshots as candidate baselines. Which one both
//! sides agree on changes only through [`BaselineStore::acknowledge`].

use std::fmt;
use std::num::NonZeroUsize;

use crate::SnapshotTick;

/// Errors that can occur when inserting into the baseline store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineError {
    /// Ticks must be strictly increasing.
    OutOfOrder {
        last_tick: SnapshotTick,
        new_tick: SnapshotTick,
    },
    /// The acknowledged tick is not in the store.
    NotFound { tick: SnapshotTick },
}

impl fmt::Display for BaselineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrder {
                last_tick,
                new_tick,
            } => write!(
                f,
                "baseline tick {new_tick} is not newer than last tick {last_tick}"
            ),
            Self::NotFound { tick } => write!(f, "no baseline stored for tick {tick}"),
        }
    }
}

impl std::error::Error for BaselineError {}

/// A fixed-capacity ring buffer of baselines keyed by tick.
#[derive(Debug)]
pub struct BaselineStore<T> {
    entries: Vec<Option<Entry<T>>>,
    head: usize,
    len: usize,
    last_tick: Option<SnapshotTick>,
    agreed: Option<SnapshotTick>,
}

#[derive(Debug)]
struct Entry<T> {
    tick: SnapshotTick,
    value: T,
}

impl<T> BaselineStore<T> {
    /// Creates a new baseline store with the given capacity.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        let cap = capacity.get();
        let mut entries = Vec::with_capacity(cap);
        entries.resize_with(cap, || None);
        Self {
            entries,
            head: 0,
            len: 0,
            last_tick: None,
            agreed: None,
        }
    }

    /// Returns the capacity of the store.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of entries stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts a new baseline at the given tick.
    ///
    /// Ticks must be strictly increasing.
    ///
    /// When the store is full, this overwrites the oldest entry and advances
    /// the head, making the inserted tick the newest entry immediately.
    pub fn insert(&mut self, tick: SnapshotTick, value: T) -> Result<(), BaselineError> {
        if let Some(last) = self.last_tick {
            if tick <= last {
                return Err(BaselineError::OutOfOrder {
                    last_tick: last,
                    new_tick: tick,
                });
            }
        }

        let cap = self.entries.len();
        if self.len < cap {
            let idx = (self.head + self.len) % cap;
            self.entries[idx] = Some(Entry { tick, value });
            self.len += 1;
        } else {
            self.entries[self.head] = Some(Entry { tick, value });
            self.head = (self.head + 1) % cap;
        }

        self.last_tick = Some(tick);
        Ok(())
    }

    /// Returns the baseline for an exact tick, if present.
    #[must_use]
    pub fn get(&self, tick: SnapshotTick) -> Option<&T> {
        self.iter().find(|(t, _)| *t == tick).map(|(_, v)| v)
    }

    /// Marks the baseline at `tick` as agreed by both sides.
    ///
    /// Acknowledging a tick older than the current agreement is a no-op, so
    /// reordered acks never move the baseline backwards.
    pub fn acknowledge(&mut self, tick: SnapshotTick) -> Result<(), BaselineError> {
        if self.agreed.is_some_and(|agreed| tick <= agreed) {
            return Ok(());
        }
        if self.get(tick).is_none() {
            return Err(BaselineError::NotFound { tick });
        }
        self.agreed = Some(tick);
        Ok(())
    }

    /// Returns the agreed baseline, if it is still stored.
    #[must_use]
    pub fn agreed(&self) -> Option<(SnapshotTick, &T)> {
        let tick = self.agreed?;
        self.get(tick).map(|value| (tick, value))
    }

    /// Returns the newest stored entry.
    #[must_use]
    pub fn latest(&self) -> Option<(SnapshotTick, &T)> {
        self.iter().next_back()
    }

    /// Drops every entry and the agreement.
    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|entry| *entry = None);
        self.head = 0;
        self.len = 0;
        self.last_tick = None;
        self.agreed = None;
    }

    /// Returns the latest baseline at or before the given tick.
    ///
    /// This performs an O(capacity) scan and is intended for small windows.
    #[must_use]
    pub fn latest_at_or_before(&self, tick: SnapshotTick) -> Option<(SnapshotTick, &T)> {
        for (t, v) in self.iter().rev() {
            if t <= tick {
                return Some((t, v));
            }
        }
        None
    }

    /// Returns an iterator from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (SnapshotTick, &T)> {
        let cap = self.entries.len();
        (0..self.len).filter_map(move |i| {
            let idx = (self.head + i) % cap;
            self.entries[idx]
                .as_ref()
                .map(|entry| (entry.tick, &entry.value))
        })
    }
}
