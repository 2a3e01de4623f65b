//! Admission gate bounding concurrent digest work
//!
//! A counting semaphore built on a bounded crossbeam channel pre-filled with
//! one token per slot. Taking a token admits a task; dropping the [`Permit`]
//! puts the token back, so a slot is returned on every exit path.

use crate::error::{HasherError, Result};
use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity admission gate
pub struct AdmissionGate {
    tokens_tx: Sender<()>,
    tokens_rx: Receiver<()>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl AdmissionGate {
    /// Create a gate admitting at most `capacity` holders at once
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tokens_tx, tokens_rx) = bounded(capacity);
        for _ in 0..capacity {
            // Cannot fail: the channel has room and both ends are alive.
            let _ = tokens_tx.try_send(());
        }

        Self {
            tokens_tx,
            tokens_rx,
            capacity,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Block until a slot is free, then take it
    pub fn acquire(&self) -> Result<Permit<'_>> {
        self.tokens_rx
            .recv()
            .map_err(|_| HasherError::ThreadPoolError("admission gate closed".to_string()))?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Ok(Permit { gate: self })
    }

    /// Maximum concurrent holders
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Holders right now
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous holders observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.tokens_rx.len()
    }
}

/// A held gate slot; released on drop
pub struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::SeqCst);
        let _ = self.gate.tokens_tx.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_permits_return_slots() {
        let gate = AdmissionGate::new(2);
        assert_eq!(gate.available(), 2);

        let a = gate.acquire().unwrap();
        let b = gate.acquire().unwrap();
        assert_eq!(gate.available(), 0);
        assert_eq!(gate.in_flight(), 2);

        drop(a);
        assert_eq!(gate.available(), 1);
        drop(b);
        assert_eq!(gate.available(), 2);
        assert_eq!(gate.peak(), 2);
    }

    #[test]
    fn test_zero_capacity_becomes_one() {
        assert_eq!(AdmissionGate::new(0).capacity(), 1);
    }

    #[test]
    fn test_peak_never_exceeds_capacity() {
        let gate = Arc::new(AdmissionGate::new(3));

        let handles: Vec<_> = (0..12)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || {
                    let _permit = gate.acquire().unwrap();
                    std::thread::sleep(Duration::from_millis(5));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(gate.peak() <= 3);
        assert!(gate.peak() >= 1);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.available(), 3);
    }

    #[test]
    fn test_slot_released_when_holder_panics() {
        let gate = Arc::new(AdmissionGate::new(1));
        let worker = {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || {
                let _permit = gate.acquire().unwrap();
                panic!("read failed mid-stream");
            })
        };
        assert!(worker.join().is_err());

        assert_eq!(gate.available(), 1);
        assert!(gate.acquire().is_ok());
    }
}
