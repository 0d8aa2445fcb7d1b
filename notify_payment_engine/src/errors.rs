use thiserror::Error;

use crate::db_types::{AccountId, DealId, DealStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DealEngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Deal {id} is {status}, but it must be pending for this operation")]
    InvalidState { id: DealId, status: DealStatus },
    #[error("Deal {0} does not exist")]
    DealNotFound(DealId),
    #[error("Device {0} does not exist")]
    DeviceNotFound(String),
    #[error("Account {0} does not exist")]
    AccountNotFound(AccountId),
}
