// src/fetch/gate.rs
// =============================================================================
// A counting gate that bounds how many pages are rendered at once.
//
// Every page fetch acquires a permit before touching the browser and holds it
// until it is done. The permit is released when it is dropped, so the slot
// comes back on every exit path: success, error, or the fetch future being
// cancelled by a timeout.
//
// No fairness is promised: waiters are woken in whatever order tokio's
// semaphore picks.
// =============================================================================

use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

// Holding one of these means one slot is in use
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    // A zero capacity would block every fetch forever, so it is raised to 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    // Waits until a slot is free
    pub async fn acquire(&self) -> Result<GatePermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| anyhow!("concurrency gate closed: {}", e))?;

        Ok(GatePermit { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // Number of permits currently held
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why not a plain counter?
//    - A counter needs manual decrement on every return path
//    - A permit object is released by Drop, which Rust always runs when the
//      value goes out of scope, including early returns with ?
//
// 2. Why acquire_owned() with an Arc?
//    - acquire() borrows the semaphore, so the permit can't outlive it
//    - acquire_owned() keeps its own Arc, so the permit can be stored in a
//      struct and moved around freely
// -----------------------------------------------------------------------------
