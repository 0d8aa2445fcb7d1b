use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db_types::Deal;

pub const DEFAULT_AUTO_REJECT_TIMEOUT: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_INSTRUCTION_TEMPLATE: &str = "Transfer {amount} to {account}. Payment reference: deal #{deal_id}";

/// Rules applied to every deal created through [`crate::DealFlowApi`].
#[derive(Debug, Clone)]
pub struct DealPolicy {
    /// Pending deals are rejected once this much time has passed without a matching notification.
    pub auto_reject_timeout: Duration,
    /// If true, deals must name the account that receives the payment.
    pub require_account: bool,
    /// Template for [`Deal::payment_instruction`]. See [`crate::db_types::DealDraft::render_instruction`].
    pub instruction_template: String,
}

impl Default for DealPolicy {
    fn default() -> Self {
        Self {
            auto_reject_timeout: DEFAULT_AUTO_REJECT_TIMEOUT,
            require_account: false,
            instruction_template: DEFAULT_INSTRUCTION_TEMPLATE.to_string(),
        }
    }
}

/// The outcome of ingesting one notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    /// The normalized amount taken from the notification, if any
    pub amount: Option<String>,
    /// The deal this notification confirmed
    pub matched: Option<Deal>,
}

impl IngestResult {
    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }
}
