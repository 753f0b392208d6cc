//! Capacity-bounded ordered list backing the offset-access window functions

use crate::common::constants::INITIAL_LIST_CAPACITY;
use crate::types::value::Value;
use std::cmp::Ordering;

/// Scan direction of an offset-access function over its frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// Frame start towards frame end (FIRST_VALUE, LEAD, NTH_VALUE FROM FIRST)
    Forward,
    /// Frame end towards frame start (LAST_VALUE, LAG, NTH_VALUE FROM LAST)
    Reverse,
}

impl ScanDirection {
    /// Ordering a value must have against an entry to be placed before it
    fn precedes(&self) -> Ordering {
        match self {
            ScanDirection::Forward => Ordering::Less,
            ScanDirection::Reverse => Ordering::Greater,
        }
    }
}

/// List holding at most `capacity` values.
///
/// Entries before `start_position` are settled and never reordered; entries
/// from `start_position` on belong to the tie group still being scanned and
/// are kept sorted by collation in the scan direction.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedOrderedList {
    items: Vec<Value>,
    capacity: usize,
    start_position: usize,
}

impl BoundedOrderedList {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(INITIAL_LIST_CAPACITY)),
            capacity,
            start_position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn start_position(&self) -> usize {
        self.start_position
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.items
    }

    /// Append in arrival order; returns false once the list is full
    pub fn push(&mut self, item: Value) -> bool {
        if self.is_full() {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Insert among the unsettled entries, ordered by `collate` in `direction`.
    /// Equal values keep arrival order. Entries pushed past capacity are dropped.
    pub fn insert_ordered<F>(&mut self, item: Value, direction: ScanDirection, collate: F)
    where
        F: Fn(&Value, &Value) -> Ordering,
    {
        if self.start_position >= self.capacity {
            return;
        }

        let precedes = direction.precedes();
        let position = self.items[self.start_position..]
            .iter()
            .position(|entry| collate(&item, entry) == precedes)
            .map(|offset| self.start_position + offset)
            .unwrap_or(self.items.len());

        if position >= self.capacity {
            return;
        }
        self.items.insert(position, item);
        self.items.truncate(self.capacity);
    }

    /// Mark every current entry as settled
    pub fn settle(&mut self) {
        self.start_position = self.items.len();
    }
}
