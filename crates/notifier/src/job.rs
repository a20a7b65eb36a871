use common::{TravelOrderId, TravelOrderStatus};
use serde::{Deserialize, Serialize};

/// Work item telling the owner of `order_id` that its status moved `from` → `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangedJob {
    pub order_id: TravelOrderId,
    pub from: TravelOrderStatus,
    pub to: TravelOrderStatus,
}

impl StatusChangedJob {
    pub fn new(order_id: TravelOrderId, from: TravelOrderStatus, to: TravelOrderStatus) -> Self {
        Self { order_id, from, to }
    }
}
