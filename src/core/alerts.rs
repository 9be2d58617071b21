//! Bill alert suppression.
//!
//! A customer receives at most one bill alert per cooldown window. The sent alerts
//! themselves are the state: no separate "last alerted" column is kept.

use crate::{
    entities::{CustomerMessage, customer_message},
    errors::Result,
    models::MessageKind,
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::prelude::*;

/// Whether a new bill alert may be sent given the customer's message history.
///
/// True iff no `bill_alert` in `messages` was sent less than `cooldown` before `now`.
/// Other message kinds are ignored.
#[must_use]
pub fn is_alert_eligible(
    messages: &[customer_message::Model],
    now: DateTime<Utc>,
    cooldown: Duration,
) -> bool {
    !messages.iter().any(|message| {
        message.message_type == MessageKind::BillAlert.as_str() && now - message.sent_at < cooldown
    })
}

/// Loads the customer's bill alerts and applies [`is_alert_eligible`].
pub async fn is_customer_alert_eligible<C>(
    db: &C,
    customer_id: i64,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let alerts = CustomerMessage::find()
        .filter(customer_message::Column::CustomerId.eq(customer_id))
        .filter(customer_message::Column::MessageType.eq(MessageKind::BillAlert.as_str()))
        .filter(customer_message::Column::SentAt.gt(now - cooldown))
        .all(db)
        .await?;

    Ok(is_alert_eligible(&alerts, now, cooldown))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn message(kind: MessageKind, sent_at: DateTime<Utc>) -> customer_message::Model {
        customer_message::Model {
            id: 1,
            customer_id: 1,
            customer_name: "Alice".to_string(),
            subject: String::new(),
            body: String::new(),
            message_type: kind.as_str().to_string(),
            sent_by: "system".to_string(),
            sent_at,
            is_read: false,
        }
    }

    #[test]
    fn test_no_history_is_eligible() {
        assert!(is_alert_eligible(&[], Utc::now(), Duration::hours(24)));
    }

    #[test]
    fn test_recent_alert_suppresses() {
        let now = Utc::now();
        let history = [message(MessageKind::BillAlert, now - Duration::hours(2))];
        assert!(!is_alert_eligible(&history, now, Duration::hours(24)));
    }

    #[test]
    fn test_old_alert_does_not_suppress() {
        let now = Utc::now();
        let history = [message(MessageKind::BillAlert, now - Duration::hours(25))];
        assert!(is_alert_eligible(&history, now, Duration::hours(24)));

        // Exactly one cooldown ago is no longer inside the window
        let history = [message(MessageKind::BillAlert, now - Duration::hours(24))];
        assert!(is_alert_eligible(&history, now, Duration::hours(24)));
    }

    #[test]
    fn test_other_message_kinds_are_ignored() {
        let now = Utc::now();
        let history = [
            message(MessageKind::General, now),
            message(MessageKind::Suspension, now),
            message(MessageKind::Credentials, now),
        ];
        assert!(is_alert_eligible(&history, now, Duration::hours(24)));
    }
}
