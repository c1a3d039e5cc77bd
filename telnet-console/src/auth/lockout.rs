//! Per-address failure tracking with time-boxed lockouts
//!
//! One mutex guards the whole failure map. It is held only for the map
//! mutation itself, never across I/O.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::warn;

use crate::config::canonical_ip;

/// Failure history for one source address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub count: u32,
    pub last_failure: Instant,
    /// Set once `count` reaches the threshold
    pub locked_until: Option<Instant>,
}

/// What `record_failure` did to the address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Counted; `count` failures so far
    Counted { count: u32 },
    /// This failure reached the threshold and started a lockout
    LockedOut { count: u32 },
}

/// Lockout tracker keyed by source address
pub struct LockoutTracker {
    threshold: u32,
    lockout: Duration,
    records: Mutex<HashMap<IpAddr, FailureRecord>>,
}

impl LockoutTracker {
    pub fn new(threshold: u32, lockout: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            lockout,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn record_failure(&self, addr: IpAddr) -> FailureOutcome {
        self.record_failure_at(addr, Instant::now())
    }

    pub fn record_failure_at(&self, addr: IpAddr, now: Instant) -> FailureOutcome {
        let addr = canonical_ip(addr);
        let mut records = self.records.lock();
        let record = records.entry(addr).or_insert(FailureRecord {
            count: 0,
            last_failure: now,
            locked_until: None,
        });

        // An elapsed lockout starts the count over
        if record.locked_until.is_some_and(|until| now >= until) {
            record.count = 0;
            record.locked_until = None;
        }

        record.count += 1;
        record.last_failure = now;

        if record.count >= self.threshold && record.locked_until.is_none() {
            record.locked_until = Some(now + self.lockout);
            let count = record.count;
            drop(records);
            warn!(
                addr = %addr,
                failures = count,
                lockout_secs = self.lockout.as_secs(),
                "Address locked out"
            );
            return FailureOutcome::LockedOut { count };
        }

        FailureOutcome::Counted { count: record.count }
    }

    pub fn is_locked_out(&self, addr: IpAddr) -> bool {
        self.is_locked_out_at(addr, Instant::now())
    }

    /// True while `now` is before the address's lockout expiry.
    ///
    /// An expired lockout is cleared here, so the next failure counts as #1.
    pub fn is_locked_out_at(&self, addr: IpAddr, now: Instant) -> bool {
        let addr = canonical_ip(addr);
        let mut records = self.records.lock();
        let Some(record) = records.get_mut(&addr) else {
            return false;
        };

        match record.locked_until {
            Some(until) if now < until => true,
            Some(_) => {
                record.count = 0;
                record.locked_until = None;
                false
            }
            None => false,
        }
    }

    /// Drop accumulated failures after a successful login
    pub fn reset(&self, addr: IpAddr) {
        self.records.lock().remove(&canonical_ip(addr));
    }

    /// Evict records whose last failure is older than `retention`.
    ///
    /// Returns the number of evicted records.
    pub fn evict_stale(&self, retention: Duration) -> usize {
        self.evict_stale_at(retention, Instant::now())
    }

    pub fn evict_stale_at(&self, retention: Duration, now: Instant) -> usize {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, r| now.saturating_duration_since(r.last_failure) <= retention);
        before - records.len()
    }

    pub fn failure_count(&self, addr: IpAddr) -> u32 {
        self.records
            .lock()
            .get(&canonical_ip(addr))
            .map(|r| r.count)
            .unwrap_or(0)
    }

    pub fn record(&self, addr: IpAddr) -> Option<FailureRecord> {
        self.records.lock().get(&canonical_ip(addr)).cloned()
    }

    /// Number of addresses with a failure record
    pub fn tracked(&self) -> usize {
        self.records.lock().len()
    }
}
