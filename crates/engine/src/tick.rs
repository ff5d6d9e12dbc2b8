use std::collections::VecDeque;

/// Work deferred to a later tick.
///
/// Anything scheduled during tick `n` runs when the queue advances to tick
/// `n + 1`, never re-entrantly with the action that scheduled it.
pub struct TickQueue<T> {
    current: u64,
    pending: VecDeque<(u64, T)>,
}

impl<T> TickQueue<T> {
    pub fn new() -> Self {
        Self {
            current: 0,
            pending: VecDeque::new(),
        }
    }

    pub fn current_tick(&self) -> u64 {
        self.current
    }

    pub fn schedule_next(&mut self, task: T) {
        self.pending.push_back((self.current + 1, task));
    }

    /// Move to the next tick and hand back everything due on it, in
    /// scheduling order.
    pub fn advance(&mut self) -> Vec<T> {
        self.current += 1;
        let mut due = Vec::new();
        while self.pending.front().is_some_and(|(tick, _)| *tick <= self.current) {
            if let Some((_, task)) = self.pending.pop_front() {
                due.push(task);
            }
        }
        due
    }

    /// Mutable view of tasks not yet run, for coalescing.
    pub fn pending_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.pending.iter_mut().map(|(_, task)| task)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for TickQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
