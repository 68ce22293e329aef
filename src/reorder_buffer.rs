use std::collections::VecDeque;

/// Releases items in serial order no matter what order they arrive in.
///
/// Slots are kept in a sparse `VecDeque` starting at the next serial to release. There is
/// no capacity limit: everything that arrives ahead of a late serial is held until it
/// shows up.
#[derive(Debug)]
pub(crate) struct ReorderBuffer<T> {
    slots: VecDeque<Option<T>>,
    next_serial: u64,
    count: usize,
}

impl<T> ReorderBuffer<T> {
    pub fn new() -> Self {
        Self {
            slots: VecDeque::new(),
            next_serial: 0,
            count: 0,
        }
    }

    pub fn insert(&mut self, serial: u64, item: T) {
        debug_assert!(
            serial >= self.next_serial,
            "Serial {serial} was already released"
        );

        let idx = (serial - self.next_serial) as usize;
        if self.slots.len() <= idx {
            self.slots.resize_with(idx + 1, || None);
        }

        debug_assert!(self.slots[idx].is_none(), "Duplicate serial {serial}");
        self.slots[idx] = Some(item);
        self.count += 1;
    }

    /// Pop the item with the next serial, if it has arrived.
    pub fn try_pop_next(&mut self) -> Option<T> {
        match self.slots.front() {
            Some(Some(_)) => (),
            _ => return None,
        }

        let item = self.slots.pop_front().flatten();
        self.next_serial += 1;
        self.count -= 1;
        item
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
