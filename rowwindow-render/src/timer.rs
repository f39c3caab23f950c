use alloc::vec::Vec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Deadline queue driven by explicit `now_ms` values.
///
/// Due entries pop in deadline order; equal deadlines pop in scheduling order.
#[derive(Clone, Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: Vec<(u64, TimerId, T)>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due = now_ms.saturating_add(delay_ms);
        let at = self
            .entries
            .partition_point(|(d, i, _)| (*d, *i) <= (due, id));
        self.entries.insert(at, (due, id, payload));
        id
    }

    /// Returns `false` if the timer already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.entries.iter().position(|(_, i, _)| *i == id) {
            Some(at) => {
                self.entries.remove(at);
                true
            }
            None => false,
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.entries.retain(|(_, _, payload)| keep(payload));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn next_due(&self) -> Option<u64> {
        self.entries.first().map(|(due, _, _)| *due)
    }

    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TimerId, T)> {
        if self.next_due()? > now_ms {
            return None;
        }
        let (_, id, payload) = self.entries.remove(0);
        Some((id, payload))
    }
}
