/// Deferred actions on a millisecond clock.
///
/// Every wait in the greeting is a fixed delay that is never cancelled:
/// once scheduled, an action fires. Actions due at the same instant fire in
/// the order they were scheduled.

pub struct Timers<T> {
    pending: Vec<Pending<T>>,
    seq: u64,
}

struct Pending<T> {
    due_ms: u64,
    seq: u64,
    action: T,
}

impl<T> Timers<T> {
    pub fn new() -> Self {
        Timers { pending: Vec::new(), seq: 0 }
    }

    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, action: T) {
        self.pending.push(Pending {
            due_ms: now_ms.saturating_add(delay_ms),
            seq: self.seq,
            action,
        });
        self.seq += 1;
    }

    /// Remove and return every action due at or before `now_ms`,
    /// earliest first.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<T> {
        let mut due: Vec<Pending<T>> = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due_ms <= now_ms {
                due.push(self.pending.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|p| (p.due_ms, p.seq));
        due.into_iter().map(|p| p.action).collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.pending.len() }
    #[cfg(test)]
    pub fn is_empty(&self) -> bool { self.pending.is_empty() }
}
