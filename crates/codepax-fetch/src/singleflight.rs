//! Single-flight coalescing for in-flight fetches.
//!
//! Concurrent requests for the same key must not duplicate network or
//! function work: the first caller performs the retrieval, later callers
//! block on its result and receive a clone.

use crate::FetchError;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

#[derive(Default)]
struct Flight {
    slot: Mutex<Option<Result<Vec<u8>, FetchError>>>,
    done: Condvar,
}

#[derive(Default)]
pub struct SingleFlight {
    inflight: Mutex<HashMap<String, Arc<Flight>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or wait for an identical in-flight call.
    ///
    /// Exactly one caller (the leader) executes `work`; every concurrent
    /// caller for the same key gets a clone of the leader's result.
    pub fn run<F>(&self, key: &str, work: F) -> Result<Vec<u8>, FetchError>
    where
        F: FnOnce() -> Result<Vec<u8>, FetchError>,
    {
        let (flight, leader) = {
            let mut inflight = match self.inflight.lock() {
                Ok(guard) => guard,
                // Lock poisoning means a leader panicked mid-fetch; fall
                // back to doing the work ourselves.
                Err(_) => return work(),
            };
            match inflight.get(key) {
                Some(existing) => (Arc::clone(existing), false),
                None => {
                    let flight = Arc::new(Flight::default());
                    inflight.insert(key.to_owned(), Arc::clone(&flight));
                    (flight, true)
                }
            }
        };

        if leader {
            let result = work();

            // Deregister before publishing so a fresh caller arriving after
            // completion starts a new flight instead of reading stale state.
            if let Ok(mut inflight) = self.inflight.lock() {
                inflight.remove(key);
            }
            if let Ok(mut slot) = flight.slot.lock() {
                *slot = Some(result.clone());
            }
            flight.done.notify_all();
            result
        } else {
            tracing::debug!("coalescing fetch for '{key}' onto in-flight request");
            let mut slot = match flight.slot.lock() {
                Ok(guard) => guard,
                Err(_) => return work(),
            };
            loop {
                if let Some(result) = slot.as_ref() {
                    return result.clone();
                }
                slot = match flight.done.wait(slot) {
                    Ok(guard) => guard,
                    Err(_) => return work(),
                };
            }
        }
    }
}
