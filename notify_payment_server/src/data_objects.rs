use chrono::{DateTime, Utc};
use log::debug;
use notify_payment_engine::{
    db_types::{AccountId, Deal, DealId, NewDeal, NotificationTuple},
    IngestResult,
};
use serde::{Deserialize, Serialize};

/// A captured notification, as posted by a forwarding device to `/notify`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// The amount, if the device already extracted one
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub title: String,
    /// The package name of the app that posted the notification
    #[serde(default)]
    pub package: String,
    /// RFC 3339 timestamp. Values that cannot be parsed are dropped rather than failing the request.
    #[serde(default)]
    pub posted_at: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    /// The account label the device was paired with
    #[serde(default)]
    pub account: Option<String>,
}

impl From<NotificationPayload> for NotificationTuple {
    fn from(payload: NotificationPayload) -> Self {
        let posted_at = payload.posted_at.as_deref().and_then(|s| match DateTime::parse_from_rfc3339(s) {
            Ok(t) => Some(t.with_timezone(&Utc)),
            Err(e) => {
                debug!("💻️ Ignoring unparseable postedAt value '{s}'. {e}");
                None
            },
        });
        NotificationTuple {
            source_package: payload.package,
            title: payload.title,
            text: payload.text,
            posted_at,
            amount: payload.amount,
            device_id: payload.device_id,
            account_label: payload.account,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyResponse {
    pub received: bool,
    pub matched: bool,
    pub deal_id: Option<DealId>,
    /// The normalized amount found in the notification
    pub amount: Option<String>,
}

impl From<IngestResult> for NotifyResponse {
    fn from(result: IngestResult) -> Self {
        Self {
            received: true,
            matched: result.matched.is_some(),
            deal_id: result.matched.map(|d| d.id),
            amount: result.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub deals: Vec<Deal>,
}

/// Amounts may be sent as JSON strings or as bare numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountValue {
    Text(String),
    Number(serde_json::Number),
}

impl AmountValue {
    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealRequest {
    pub amount: AmountValue,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

impl From<CreateDealRequest> for NewDeal {
    fn from(req: CreateDealRequest) -> Self {
        NewDeal { amount: req.amount.into_string(), device_id: req.device_id, account_id: req.account_id }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequest {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub account_id: Option<AccountId>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn android_payload() {
        let json = r#"{
            "package": "ru.sberbankmobile",
            "title": "Зачисление",
            "text": "Поступление 1 500 ₽",
            "postedAt": "2024-05-01T12:30:00.000+03:00",
            "amount": "1 500",
            "deviceId": "a1b2",
            "account": "Ivan (Sber *4312)"
        }"#;
        let payload = serde_json::from_str::<NotificationPayload>(json).unwrap();
        let tuple = NotificationTuple::from(payload);
        assert_eq!(tuple.source_package, "ru.sberbankmobile");
        assert_eq!(tuple.amount.as_deref(), Some("1 500"));
        assert_eq!(tuple.device_id.as_deref(), Some("a1b2"));
        assert_eq!(tuple.account_label.as_deref(), Some("Ivan (Sber *4312)"));
        assert_eq!(tuple.posted_at.unwrap().to_rfc3339(), "2024-05-01T09:30:00+00:00");
    }

    #[test]
    fn numeric_amounts() {
        let req = serde_json::from_str::<CreateDealRequest>(r#"{"amount": 1500, "deviceId": "d1"}"#).unwrap();
        let deal = NewDeal::from(req);
        assert_eq!(deal.amount, "1500");
        assert_eq!(deal.device_id.as_deref(), Some("d1"));
        let req = serde_json::from_str::<CreateDealRequest>(r#"{"amount": "12,50", "accountId": "3"}"#).unwrap();
        let deal = NewDeal::from(req);
        assert_eq!(deal.amount, "12,50");
        assert_eq!(deal.account_id, Some(AccountId::new(3)));
    }

    #[test]
    fn minimal_payload() {
        let payload = serde_json::from_str::<NotificationPayload>(r#"{"text": "Paid 10", "postedAt": "yesterday"}"#)
            .unwrap();
        let tuple = NotificationTuple::from(payload);
        assert_eq!(tuple.text, "Paid 10");
        assert!(tuple.posted_at.is_none());
        assert!(tuple.amount.is_none());
    }
}
