use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    RentalCreated,
    RentalCompleted,
    PaymentReceived,
    PaymentSent,
    NewReview,
    RentalReminder,
    GpsAlert,
    #[serde(other)]
    Other,
}

impl NotificationType {
    /// Short label used when listing notifications
    pub fn label(&self) -> &'static str {
        match self {
            NotificationType::RentalCreated | NotificationType::RentalCompleted => "rental",
            NotificationType::PaymentReceived | NotificationType::PaymentSent => "payment",
            NotificationType::NewReview => "review",
            NotificationType::RentalReminder => "reminder",
            NotificationType::GpsAlert => "gps",
            NotificationType::Other => "notice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default)]
    pub reference_id: Option<String>,
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notification() {
        let json = r#"{"id":"n1","userId":"0xabc","title":"Rental started","message":"Your rental began","type":"RENTAL_CREATED","referenceId":"r1","timestamp":"2025-03-01T10:15:30","read":false}"#;
        let n: Notification = serde_json::from_str(json).expect("Failed to parse notification test JSON");
        assert_eq!(n.kind, NotificationType::RentalCreated);
        assert_eq!(n.kind.label(), "rental");
        assert!(!n.read);
    }

    #[test]
    fn test_unknown_notification_type() {
        let json = r#"{"id":"n2","title":"t","message":"m","type":"SOMETHING_NEW","timestamp":"2025-03-01T10:15:30"}"#;
        let n: Notification = serde_json::from_str(json).expect("Failed to parse notification test JSON");
        assert_eq!(n.kind, NotificationType::Other);
    }
}
