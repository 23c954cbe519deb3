use serde::{Deserialize, Serialize};

use crate::domain::LocationId;

pub const DEFAULT_SCHEDULER_URL: &str = "https://ttp.cbp.dhs.gov/schedulerapi/slots";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOrder {
    Soonest,
}

/// Query string sent with every slot request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub order_by: SlotOrder,
    pub limit: u32,
    pub location_id: LocationId,
    pub minimum: u32,
}

impl SlotQuery {
    pub fn for_location(location_id: LocationId) -> Self {
        Self {
            order_by: SlotOrder::Soonest,
            limit: 1000,
            location_id,
            minimum: 1,
        }
    }
}
