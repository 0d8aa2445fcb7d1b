use serde::{Deserialize, Serialize};

use crate::db_types::Deal;

/// Published after a deal leaves `pending` for `confirmed`, either through a matching notification or a manual close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealConfirmedEvent {
    pub deal: Deal,
}

impl DealConfirmedEvent {
    pub fn new(deal: Deal) -> Self {
        Self { deal }
    }

    /// True if a notification confirmed the deal, false for a manual close.
    pub fn is_matched(&self) -> bool {
        self.deal.match_info.is_some()
    }
}

/// Published after a deal leaves `pending` for `rejected`, by an operator or by the auto-reject timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealRejectedEvent {
    pub deal: Deal,
}

impl DealRejectedEvent {
    pub fn new(deal: Deal) -> Self {
        Self { deal }
    }
}
