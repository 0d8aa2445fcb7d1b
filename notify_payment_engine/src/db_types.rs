use std::{fmt::Display, num::ParseIntError, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::helpers::normalize_amount;

#[derive(Debug, Clone, Error)]
#[error("Invalid identifier: {0}")]
pub struct IdParseError(String);

impl From<ParseIntError> for IdParseError {
    fn from(e: ParseIntError) -> Self {
        Self(e.to_string())
    }
}

//--------------------------------------        DealId         ---------------------------------------------------------
/// Deal identifiers are handed out in strictly increasing order, so ordering by id is ordering by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DealId(u64);

impl DealId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Display for DealId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DealId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse::<u64>()?))
    }
}

impl From<DealId> for String {
    fn from(id: DealId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for DealId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------       AccountId       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct AccountId(u64);

impl AccountId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse::<u64>()?))
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for AccountId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

//--------------------------------------      DealStatus       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    /// The deal is waiting for a matching payment notification.
    Pending,
    /// A notification matched the deal, or an operator closed it by hand.
    Confirmed,
    /// An operator rejected the deal, or it timed out.
    Rejected,
}

impl DealStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DealStatus::Pending)
    }
}

impl Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DealStatus::Pending => write!(f, "pending"),
            DealStatus::Confirmed => write!(f, "confirmed"),
            DealStatus::Rejected => write!(f, "rejected"),
        }
    }
}

//--------------------------------------     RejectReason      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "note", rename_all = "lowercase")]
pub enum RejectReason {
    /// No matching notification arrived before the auto-reject timer fired.
    Timeout,
    /// Rejected by an operator, with an optional explanation.
    Manual(Option<String>),
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Timeout => write!(f, "timeout"),
            RejectReason::Manual(None) => write!(f, "manual"),
            RejectReason::Manual(Some(note)) => write!(f, "manual ({note})"),
        }
    }
}

//--------------------------------------   NotificationTuple   ---------------------------------------------------------
/// A single notification as captured on a device. It is consumed once by the match engine and never stored, except as
/// the [`MatchSnapshot`] of the deal it confirms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationTuple {
    /// The package / app id that posted the notification
    pub source_package: String,
    pub title: String,
    pub text: String,
    /// When the notification was posted on the device
    pub posted_at: Option<DateTime<Utc>>,
    /// The amount, if the capture side already extracted one. If absent, the amount is extracted from `text`.
    pub amount: Option<String>,
    pub device_id: Option<String>,
    /// The account label the device was paired with, if any
    pub account_label: Option<String>,
}

impl NotificationTuple {
    pub fn new<S: Into<String>>(source_package: S, title: S, text: S) -> Self {
        Self { source_package: source_package.into(), title: title.into(), text: text.into(), ..Default::default() }
    }

    pub fn with_amount<S: Into<String>>(mut self, amount: S) -> Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn with_device_id<S: Into<String>>(mut self, device_id: S) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_account_label<S: Into<String>>(mut self, label: S) -> Self {
        self.account_label = Some(label.into());
        self
    }

    pub fn posted_at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = Some(posted_at);
        self
    }
}

//--------------------------------------     MatchSnapshot     ---------------------------------------------------------
/// A copy of the notification that confirmed a deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
    pub package: String,
    pub title: String,
    pub text: String,
    pub posted_at: Option<DateTime<Utc>>,
    pub device_id: Option<String>,
    pub account_label: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl MatchSnapshot {
    pub fn from_tuple(tuple: &NotificationTuple, received_at: DateTime<Utc>) -> Self {
        Self {
            package: tuple.source_package.clone(),
            title: tuple.title.clone(),
            text: tuple.text.clone(),
            posted_at: tuple.posted_at,
            device_id: tuple.device_id.clone(),
            account_label: tuple.account_label.clone(),
            received_at,
        }
    }
}

//--------------------------------------     MatchCriteria     ---------------------------------------------------------
/// The correlation key derived from a notification: a normalized amount plus the optional device and account label
/// the notification was sent from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCriteria {
    pub amount: String,
    pub device_id: Option<String>,
    pub account_label: Option<String>,
}

impl MatchCriteria {
    /// Returns `None` when the amount does not normalize to a usable token.
    pub fn new(amount: &str, device_id: Option<String>, account_label: Option<String>) -> Option<Self> {
        let amount = normalize_amount(amount)?;
        Some(Self { amount, device_id, account_label })
    }

    /// A deal is eligible when it is pending, the amounts are equal, and each constraint the deal carries (device,
    /// account label) is either absent or equal to what the notification declared.
    pub fn is_satisfied_by(&self, deal: &Deal) -> bool {
        deal.status == DealStatus::Pending
            && deal.amount == self.amount
            && constraint_holds(deal.device_id.as_deref(), self.device_id.as_deref())
            && constraint_holds(deal.account_label.as_deref(), self.account_label.as_deref())
    }
}

fn constraint_holds(required: Option<&str>, declared: Option<&str>) -> bool {
    match required {
        None => true,
        Some(required) => declared == Some(required),
    }
}

//--------------------------------------          Deal         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: DealId,
    /// The normalized amount token. This is the correlation key.
    pub amount: String,
    pub device_id: Option<String>,
    pub account_id: Option<AccountId>,
    /// Snapshot of the account label at the time the deal was created.
    pub account_label: Option<String>,
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub reject_reason: Option<RejectReason>,
    #[serde(rename = "match")]
    pub match_info: Option<MatchSnapshot>,
    pub payment_instruction: String,
}

impl Deal {
    pub fn is_pending(&self) -> bool {
        self.status == DealStatus::Pending
    }
}

//--------------------------------------        NewDeal        ---------------------------------------------------------
/// A request to create a deal, as received from a client. Nothing here has been validated yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDeal {
    pub amount: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

impl NewDeal {
    pub fn new<S: Into<String>>(amount: S) -> Self {
        Self { amount: amount.into(), ..Default::default() }
    }

    pub fn with_device_id<S: Into<String>>(mut self, device_id: S) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }
}

/// A validated deal, ready to be inserted into the store. The store assigns the id and the creation time.
#[derive(Debug, Clone)]
pub struct DealDraft {
    pub amount: String,
    pub device_id: Option<String>,
    pub account: Option<Account>,
    pub instruction_template: String,
}

impl DealDraft {
    /// Renders the payment instruction for the deal with the given id. Supported placeholders are `{amount}`,
    /// `{account}` and `{deal_id}`.
    pub fn render_instruction(&self, id: DealId) -> String {
        let account = self.account.as_ref().map(|a| a.number.as_str()).unwrap_or("the merchant account");
        self.instruction_template
            .replace("{amount}", &self.amount)
            .replace("{account}", account)
            .replace("{deal_id}", &id.to_string())
    }
}

//--------------------------------------       Account         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub bank: String,
    pub number: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub name: String,
    pub bank: String,
    pub number: String,
}

impl NewAccount {
    pub fn new<S: Into<String>>(name: S, bank: S, number: S) -> Self {
        Self { name: name.into(), bank: bank.into(), number: number.into() }
    }

    /// The display label, e.g. `Ivan Petrov (Sber *4321)`. Devices paired with this account report this label with
    /// every notification.
    pub fn label(&self) -> String {
        let digits = self.number.chars().filter(|c| !c.is_whitespace()).collect::<Vec<char>>();
        let last4 = digits[digits.len().saturating_sub(4)..].iter().collect::<String>();
        format!("{} ({} *{last4})", self.name.trim(), self.bank.trim())
    }
}

//--------------------------------------        Device         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSource {
    /// Registered by an operator
    Manual,
    /// First seen on an incoming notification
    Notify,
}

impl Display for DeviceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceSource::Manual => write!(f, "manual"),
            DeviceSource::Notify => write!(f, "notify"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub label: String,
    pub account_id: Option<AccountId>,
    pub account_label: Option<String>,
    pub last_seen: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub source: DeviceSource,
}

/// An upsert request for a device. Absent fields leave the stored values untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceUpdate {
    pub id: String,
    pub label: Option<String>,
    pub account_id: Option<AccountId>,
    pub account_label: Option<String>,
    pub source: DeviceSource,
    /// Marks the device as activated if it is not already
    pub activate: bool,
}

impl DeviceUpdate {
    pub fn manual<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            label: None,
            account_id: None,
            account_label: None,
            source: DeviceSource::Manual,
            activate: false,
        }
    }

    /// The update applied when a notification arrives from the device. First contact activates the device.
    pub fn from_notification<S: Into<String>>(id: S, account_label: Option<String>) -> Self {
        Self { account_label, source: DeviceSource::Notify, activate: true, ..Self::manual(id) }
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = Some(label.into());
        self
    }
}
