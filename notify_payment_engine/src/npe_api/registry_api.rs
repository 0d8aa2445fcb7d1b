use std::fmt::Debug;

use log::*;
use npg_common::parse_optional_string;

use crate::{
    db::Registry,
    db_types::{Account, AccountId, Device, DeviceUpdate, NewAccount},
    errors::DealEngineError,
};

/// Manages the devices that forward bank notifications and the accounts that receive payments.
#[derive(Clone)]
pub struct RegistryApi {
    registry: Registry,
}

impl Debug for RegistryApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RegistryApi")
    }
}

impl RegistryApi {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Creates a payout account. Name, bank and account number are all required.
    pub async fn create_account(&self, account: NewAccount) -> Result<Account, DealEngineError> {
        for (field, value) in [("name", &account.name), ("bank", &account.bank), ("number", &account.number)] {
            if value.trim().is_empty() {
                return Err(DealEngineError::InvalidInput(format!("The account {field} must not be empty")));
            }
        }
        let account = self.registry.insert_account(account).await;
        info!("📇️ Account {} created: {}", account.id, account.label);
        Ok(account)
    }

    pub async fn account(&self, id: AccountId) -> Result<Account, DealEngineError> {
        self.registry.fetch_account(id).await.ok_or(DealEngineError::AccountNotFound(id))
    }

    pub async fn accounts(&self) -> Vec<Account> {
        self.registry.fetch_accounts().await
    }

    /// Registers a device, or updates the label and account link of a known one. Manual registration does not
    /// activate the device.
    pub async fn register_device(
        &self,
        id: &str,
        label: Option<String>,
        account_id: Option<AccountId>,
    ) -> Result<Device, DealEngineError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(DealEngineError::InvalidInput("The device id must not be empty".to_string()));
        }
        let mut update = DeviceUpdate::manual(id);
        update.label = parse_optional_string(label);
        update.account_id = account_id;
        self.registry.upsert_device(update).await
    }

    pub async fn activate_device(&self, id: &str) -> Result<Device, DealEngineError> {
        let device = self.registry.activate_device(id).await?;
        debug!("📇️ Device {id} activated");
        Ok(device)
    }

    pub async fn device(&self, id: &str) -> Result<Device, DealEngineError> {
        self.registry.fetch_device(id).await.ok_or_else(|| DealEngineError::DeviceNotFound(id.to_string()))
    }

    /// All devices, sorted by id.
    pub async fn devices(&self) -> Vec<Device> {
        self.registry.fetch_devices().await
    }
}
