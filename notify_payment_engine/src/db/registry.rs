use std::{
    collections::{hash_map::Entry, BTreeMap, HashMap},
    sync::Arc,
};

use chrono::Utc;
use log::*;
use tokio::sync::RwLock;

use crate::{
    db_types::{Account, AccountId, Device, DeviceSource, DeviceUpdate, NewAccount},
    errors::DealEngineError,
};

/// Side tables for registered devices and payout accounts.
///
/// Devices and accounts each have their own lock, and neither is ever held together with the deal store's lock.
#[derive(Clone, Default)]
pub struct Registry {
    devices: Arc<RwLock<HashMap<String, Device>>>,
    accounts: Arc<RwLock<AccountTable>>,
}

#[derive(Default)]
struct AccountTable {
    last_id: u64,
    accounts: BTreeMap<AccountId, Account>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    //-----------------------------------------   Accounts   ----------------------------------------------------------
    pub async fn insert_account(&self, account: NewAccount) -> Account {
        let label = account.label();
        let mut table = self.accounts.write().await;
        table.last_id += 1;
        let id = AccountId::new(table.last_id);
        let account = Account {
            id,
            name: account.name.trim().to_string(),
            bank: account.bank.trim().to_string(),
            number: account.number.trim().to_string(),
            label,
            created_at: Utc::now(),
        };
        table.accounts.insert(id, account.clone());
        account
    }

    pub async fn fetch_account(&self, id: AccountId) -> Option<Account> {
        self.accounts.read().await.accounts.get(&id).cloned()
    }

    pub async fn fetch_accounts(&self) -> Vec<Account> {
        self.accounts.read().await.accounts.values().cloned().collect()
    }

    //-----------------------------------------   Devices    ----------------------------------------------------------
    /// Inserts or merges a device record. Fields that are present in the update overwrite the stored ones, absent
    /// fields are left alone, and `last_seen` is always refreshed. The provenance of the first registration is kept.
    ///
    /// If the update links an account, the account must exist, and its label replaces the device's account label.
    /// Linking an unknown account is an `InvalidInput` error and leaves the registry untouched.
    pub async fn upsert_device(&self, update: DeviceUpdate) -> Result<Device, DealEngineError> {
        let linked_account = match update.account_id {
            Some(id) => Some(
                self.fetch_account(id)
                    .await
                    .ok_or_else(|| DealEngineError::InvalidInput(format!("Account {id} does not exist")))?,
            ),
            None => None,
        };
        let now = Utc::now();
        let mut devices = self.devices.write().await;
        let device = match devices.entry(update.id.clone()) {
            Entry::Occupied(entry) => {
                let device = entry.into_mut();
                if let Some(label) = update.label {
                    device.label = label;
                }
                match (linked_account, update.account_label) {
                    (Some(account), _) => {
                        device.account_id = Some(account.id);
                        device.account_label = Some(account.label);
                    },
                    // A label declared on a notification never overrides an explicitly linked account
                    (None, Some(label)) if device.account_id.is_none() || update.source == DeviceSource::Manual => {
                        device.account_label = Some(label);
                    },
                    (None, Some(label)) => {
                        if device.account_label.as_deref() != Some(label.as_str()) {
                            debug!("📇️ Device {} declared account '{label}' but is linked to another account", device.id);
                        }
                    },
                    (None, None) => {},
                }
                device.last_seen = now;
                if update.activate && device.activated_at.is_none() {
                    device.activated_at = Some(now);
                }
                device.clone()
            },
            Entry::Vacant(entry) => {
                let device = Device {
                    id: update.id.clone(),
                    label: update.label.unwrap_or_else(|| update.id.clone()),
                    account_id: linked_account.as_ref().map(|a| a.id),
                    account_label: linked_account.map(|a| a.label).or(update.account_label),
                    last_seen: now,
                    activated_at: update.activate.then_some(now),
                    source: update.source,
                };
                info!("📇️ New device {} registered ({})", device.id, device.source);
                entry.insert(device).clone()
            },
        };
        Ok(device)
    }

    /// Marks the device as activated. Activating an already active device keeps the original activation time.
    pub async fn activate_device(&self, id: &str) -> Result<Device, DealEngineError> {
        let mut devices = self.devices.write().await;
        let device = devices.get_mut(id).ok_or_else(|| DealEngineError::DeviceNotFound(id.to_string()))?;
        let now = Utc::now();
        device.activated_at.get_or_insert(now);
        device.last_seen = now;
        Ok(device.clone())
    }

    pub async fn fetch_device(&self, id: &str) -> Option<Device> {
        self.devices.read().await.get(id).cloned()
    }

    /// All devices, sorted by id.
    pub async fn fetch_devices(&self) -> Vec<Device> {
        let mut devices = self.devices.read().await.values().cloned().collect::<Vec<Device>>();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }
}
