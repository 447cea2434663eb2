//! Double-buffered component state.

/// Current state plus the state staged for the next tick boundary.
///
/// During the combinational phase only [`current`](Staged::current) may be
/// read. Components compute their successor from it and hand it to
/// [`stage`](Staged::stage); nothing changes until [`commit`](Staged::commit)
/// swaps it in. Committing every `Staged` in a system back to back gives the
/// atomic, simultaneous register update of a synchronous design.
#[derive(Debug, Clone)]
pub struct Staged<T> {
    current: T,
    next: Option<T>,
}

impl<T> Staged<T> {
    #[must_use]
    pub const fn new(initial: T) -> Self {
        Self {
            current: initial,
            next: None,
        }
    }

    /// Start-of-tick state.
    #[must_use]
    pub const fn current(&self) -> &T {
        &self.current
    }

    /// Stage the successor state. A second call in the same tick replaces
    /// the first.
    pub fn stage(&mut self, next: T) {
        self.next = Some(next);
    }

    /// True when a successor has been staged and not yet committed.
    #[must_use]
    pub const fn is_staged(&self) -> bool {
        self.next.is_some()
    }

    /// Make the staged state current. Without a staged state the component
    /// simply holds its value.
    pub fn commit(&mut self) {
        if let Some(next) = self.next.take() {
            self.current = next;
        }
    }

    /// Replace the current state outside the tick flow (reset, test setup).
    /// Any staged state is discarded.
    pub fn force(&mut self, state: T) {
        self.current = state;
        self.next = None;
    }

    /// Mutable access outside the tick flow. Any staged state is discarded.
    pub fn force_mut(&mut self) -> &mut T {
        self.next = None;
        &mut self.current
    }
}

impl<T: Default> Default for Staged<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
