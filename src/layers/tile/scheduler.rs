//! Request ordering for the tiles of one update pass.

use super::types::{TileKey, TileRange};
use crate::core::constants::UPDATE_INTERVAL;
use crate::prelude::{Duration, Instant};

/// Grid positions of `range` that still need a tile, nearest to the range
/// center first. Ties keep row-major order.
pub fn center_out_queue<F>(range: &TileRange, is_present: F) -> Vec<TileKey>
where
    F: Fn(&TileKey) -> bool,
{
    let center = range.center();
    let mut queue: Vec<TileKey> = range.iter().filter(|key| !is_present(key)).collect();

    // stable sort
    queue.sort_by(|a, b| a.distance_to(&center).total_cmp(&b.distance_to(&center)));
    queue
}

/// Rate limiter for updates driven by continuous `Move` events.
///
/// The first request runs immediately and locks for the interval. Requests
/// arriving while locked collapse into a single trailing run, which fires
/// from [`UpdateThrottle::poll`] once the lock expires.
#[derive(Debug, Clone)]
pub struct UpdateThrottle {
    interval: Duration,
    locked_until: Option<Instant>,
    pending: bool,
}

impl Default for UpdateThrottle {
    fn default() -> Self {
        Self::new(UPDATE_INTERVAL)
    }
}

impl UpdateThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            locked_until: None,
            pending: false,
        }
    }

    /// Returns true when the caller should run now
    pub fn request(&mut self, now: Instant) -> bool {
        if let Some(until) = self.locked_until {
            if now < until {
                self.pending = true;
                return false;
            }
        }
        self.lock(now);
        true
    }

    /// Returns true when a deferred run is due
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.locked_until {
            Some(until) if self.pending && now >= until => {
                self.lock(now);
                true
            }
            _ => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending
    }

    fn lock(&mut self, now: Instant) {
        self.locked_until = Some(now + self.interval);
        self.pending = false;
    }
}
