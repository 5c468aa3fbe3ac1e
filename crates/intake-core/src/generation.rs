//! # Request Generations
//!
//! Stale-response protection for debounced and repeated requests.
//!
//! Every request takes a ticket from a monotonic counter. When the response
//! arrives it is accepted only if its ticket is still the latest issued;
//! otherwise a newer request superseded it and the response is dropped.
//!
//! `InFlight` is the companion for requests that must not overlap at all
//! (AI suggestion and timeline generation): a second caller is refused
//! while a guard is alive.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Ticket handed out by `RequestGeneration::issue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic request counter.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    latest: AtomicU64,
}

impl RequestGeneration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request. The new ticket supersedes every earlier one.
    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Keep `value` only when `ticket` is still current.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        self.is_current(ticket).then_some(value)
    }

    /// Make every outstanding ticket stale without starting a request.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

/// Single-flight flag.
#[derive(Debug, Default)]
pub struct InFlight {
    busy: AtomicBool,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the flag. `None` when a request is already running.
    pub fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlightGuard { flag: &self.busy })
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Releases the `InFlight` flag on drop.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_ticket_is_accepted() {
        let generation = RequestGeneration::new();
        let first = generation.issue();
        let second = generation.issue();

        assert!(first < second);
        assert_eq!(generation.accept(first, "old"), None);
        assert_eq!(generation.accept(second, "new"), Some("new"));
    }

    #[test]
    fn invalidate_stales_outstanding_ticket() {
        let generation = RequestGeneration::new();
        let ticket = generation.issue();
        generation.invalidate();
        assert!(!generation.is_current(ticket));
    }

    #[test]
    fn in_flight_refuses_overlap() {
        let flag = InFlight::new();
        let guard = flag.try_begin().expect("first");
        assert!(flag.is_busy());
        assert!(flag.try_begin().is_none());
        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_begin().is_some());
    }

    #[test]
    fn tickets_are_unique_across_threads() {
        let generation = std::sync::Arc::new(RequestGeneration::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generation = std::sync::Arc::clone(&generation);
                std::thread::spawn(move || (0..100).map(|_| generation.issue()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<Ticket> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("join"))
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 400);
    }
}
