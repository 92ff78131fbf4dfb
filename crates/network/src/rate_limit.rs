//! Per-session packet rate limiting

use realm_config::RateLimitTable;
use realm_protocol::PacketId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Tracks when each (category, action) pair was last processed.
///
/// A pair is rejected while less than its configured interval has passed
/// since it was last recorded. Rejections are not recorded, so a flood of
/// rejected packets never pushes the window forward.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    table: Arc<RateLimitTable>,
    last: HashMap<PacketId, Instant>,
}

impl RateLimiter {
    pub fn new(table: Arc<RateLimitTable>) -> Self {
        Self { table, last: HashMap::new() }
    }

    pub fn should_reject(&self, id: PacketId) -> bool {
        self.should_reject_at(id, Instant::now())
    }

    pub fn should_reject_at(&self, id: PacketId, now: Instant) -> bool {
        match (self.table.interval(id), self.last.get(&id)) {
            (Some(interval), Some(last)) => now.saturating_duration_since(*last) < interval,
            _ => false,
        }
    }

    pub fn record(&mut self, id: PacketId) {
        self.record_at(id, Instant::now());
    }

    pub fn record_at(&mut self, id: PacketId, now: Instant) {
        if self.table.interval(id).is_some() {
            self.last.insert(id, now);
        }
    }
}
