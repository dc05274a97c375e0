//! Flood and misbehaviour suppression.
//!
//! Every handled request scores its source; a once-per-second tick decays
//! the scores. Sources that burst past the threshold are throttled until
//! they calm down; sources that misbehave outright (unparseable packets,
//! rejected by a hook, unknown to every resolver) are blocked for a fixed
//! time regardless of traffic.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;

use eui48::MacAddress;

/// Sources are tracked per MAC and relay; malformed packets carry no
/// parseable MAC and are tracked by source address alone.
pub type SourceKey = (Option<[u8; 6]>, Option<Ipv4Addr>);

/// Builds the tracking key for a request.
pub fn source_key(mac: Option<&MacAddress>, relay: Option<Ipv4Addr>) -> SourceKey {
    let mac = mac.map(|mac| {
        let mut octets = [0u8; 6];
        octets.copy_from_slice(mac.as_bytes());
        octets
    });
    (mac, relay)
}

/// A source's standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Processed normally.
    Allowed,
    /// Dropped silently until its score decays below the threshold.
    Throttled,
    /// Dropped for a fixed number of seconds, then re-evaluated.
    Blocked,
}

#[derive(Default)]
struct Counters {
    scores: HashMap<SourceKey, u32>,
    blocked: HashMap<SourceKey, u64>,
}

/// The per-source counter table. One per server; both the DHCP and the
/// PXE paths score into it.
pub struct Suspender {
    enabled: bool,
    threshold: u32,
    counters: Mutex<Counters>,
}

impl Suspender {
    pub fn new(enabled: bool, threshold: u32) -> Self {
        Suspender {
            enabled,
            threshold,
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Scores one handled request and reports the source's standing.
    ///
    /// Explicit blocks apply even when scoring is disabled.
    pub fn note(&self, key: &SourceKey) -> SourceState {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if counters.blocked.contains_key(key) {
            return SourceState::Blocked;
        }
        if !self.enabled {
            return SourceState::Allowed;
        }
        let score = counters.scores.entry(key.to_owned()).or_insert(0);
        *score += 1;
        if *score > self.threshold {
            SourceState::Throttled
        } else {
            SourceState::Allowed
        }
    }

    /// The source's standing without scoring it.
    pub fn state(&self, key: &SourceKey) -> SourceState {
        let counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if counters.blocked.contains_key(key) {
            return SourceState::Blocked;
        }
        match counters.scores.get(key) {
            Some(score) if self.enabled && *score > self.threshold => SourceState::Throttled,
            _ => SourceState::Allowed,
        }
    }

    /// Marks a source as misbehaving for `seconds`.
    pub fn block(&self, key: &SourceKey, seconds: u64) {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let timeout = counters.blocked.entry(key.to_owned()).or_insert(0);
        if *timeout < seconds {
            *timeout = seconds;
        }
        warn!("Ignoring {:?} for {} seconds", key, seconds);
    }

    /// One second of decay; driven by the server's ticker.
    pub fn tick(&self) {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        counters.scores.retain(|_, score| {
            *score -= 1;
            *score > 0
        });
        counters.blocked.retain(|_, remaining| {
            *remaining = remaining.saturating_sub(1);
            *remaining > 0
        });
    }
}
