//! Minimum intervals between packets of the same kind

use realm_protocol::{PacketAction, PacketCategory, PacketId};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;

/// Static (category, action) → minimum interval table.
///
/// Pairs without an entry are never rate limited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitTable {
    limits: HashMap<PacketId, Duration>,
}

impl RateLimitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits applied when the configuration file names none
    pub fn standard() -> Self {
        let mut table = Self::new();
        table.set(PacketId::new(PacketCategory::Talk, PacketAction::Report), Duration::from_millis(500));
        table.set(PacketId::new(PacketCategory::Talk, PacketAction::Message), Duration::from_millis(1000));
        table.set(PacketId::new(PacketCategory::Refresh, PacketAction::Request), Duration::from_millis(1000));
        table
    }

    /// A zero interval removes the entry.
    pub fn set(&mut self, id: PacketId, interval: Duration) {
        if interval.is_zero() {
            self.limits.remove(&id);
        } else {
            self.limits.insert(id, interval);
        }
    }

    pub fn interval(&self, id: PacketId) -> Option<Duration> {
        self.limits.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    /// Apply a `ratelimit.<Category>.<Action> = <ms>` option.
    pub(crate) fn parse_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidOption { key: key.to_string(), reason };

        let mut parts = key.split('.').skip(1);
        let (Some(category), Some(action), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid("expected ratelimit.<Category>.<Action>".into()));
        };
        let category: PacketCategory = category.parse().map_err(invalid)?;
        let action: PacketAction = action.parse().map_err(invalid)?;
        let millis: u64 = value
            .parse()
            .map_err(|_| invalid(format!("'{}' is not a number of milliseconds", value)))?;

        self.set(PacketId::new(category, action), Duration::from_millis(millis));
        Ok(())
    }
}
