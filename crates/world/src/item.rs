//! Items lying on the ground

use realm_core::{ItemId, ItemSlot, SessionId, TilePosition};
use realm_protocol::ItemInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedItem {
    pub slot: ItemSlot,
    pub item_id: ItemId,
    pub amount: u32,
    pub position: TilePosition,
    pub owner: Option<SessionId>,
    /// While nonzero only `owner` may pick the item up
    pub protection_ticks: u32,
}

impl DroppedItem {
    pub fn can_be_taken_by(&self, session: SessionId) -> bool {
        self.protection_ticks == 0 || self.owner.map_or(true, |owner| owner == session)
    }

    pub fn info(&self) -> ItemInfo {
        ItemInfo {
            slot: self.slot,
            item_id: self.item_id,
            position: self.position,
            amount: self.amount,
        }
    }
}

/// Why a pickup was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupRefusal {
    /// No item in that slot (already taken)
    Missing,
    /// Still reserved for another character
    Protected,
    TooFar,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protection_rule() {
        let mut item = DroppedItem {
            slot: 1,
            item_id: 1,
            amount: 10,
            position: TilePosition::new(0, 0),
            owner: Some(SessionId::new(1)),
            protection_ticks: 2,
        };
        assert!(item.can_be_taken_by(SessionId::new(1)));
        assert!(!item.can_be_taken_by(SessionId::new(2)));
        item.protection_ticks = 0;
        assert!(item.can_be_taken_by(SessionId::new(2)));
    }
}
