//! Customer messaging - notification templates and the message store.
//!
//! Core code hands notices to a [`Messenger`]; the default [`DbMessenger`] writes them
//! to the customer message table, where operators read them back.

use crate::{
    core::{
        customer::get_scoped_customer,
        policy::{Actor, Capability},
    },
    entities::{CustomerMessage, customer, customer_message},
    errors::{Error, Result},
    models::MessageKind,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// A notice ready to be delivered to a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub customer_id: i64,
    pub customer_name: String,
    pub subject: String,
    pub body: String,
    pub kind: MessageKind,
    /// Operator username, or `"system"`
    pub sent_by: String,
    pub sent_at: DateTime<Utc>,
}

impl OutgoingMessage {
    /// Stamps the message with the caller's clock instead of the wall clock.
    #[must_use]
    pub fn at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = sent_at;
        self
    }

    /// Login details sent after a customer is created.
    #[must_use]
    pub fn credentials(customer: &customer::Model, package_name: &str, sent_by: &str) -> Self {
        Self {
            customer_id: customer.id,
            customer_name: customer.full_name.clone(),
            subject: "Your Internet Connection Credentials".to_string(),
            body: format!(
                "Dear {},\n\nYour internet connection has been activated!\n\n\
                 Username: {}\nPassword: {}\nPackage: {package_name}\n\n\
                 Please keep these credentials safe.\n\nThank you for choosing our service!",
                customer.full_name, customer.username, customer.password
            ),
            kind: MessageKind::Credentials,
            sent_by: sent_by.to_string(),
            sent_at: Utc::now(),
        }
    }

    /// Low balance reminder.
    #[must_use]
    pub fn bill_alert(
        customer: &customer::Model,
        package_price: f64,
        days_remaining: i64,
        sent_by: &str,
    ) -> Self {
        Self {
            customer_id: customer.id,
            customer_name: customer.full_name.clone(),
            subject: "Bill Payment Reminder".to_string(),
            body: format!(
                "Dear {},\n\nThis is a reminder about your internet bill.\n\n\
                 Current Balance: {:.2}\nMonthly Package: {package_price:.2}\n\
                 Estimated Days Remaining: {days_remaining}\n\n\
                 Please recharge your account to avoid service interruption.\n\nThank you!",
                customer.full_name, customer.balance
            ),
            kind: MessageKind::BillAlert,
            sent_by: sent_by.to_string(),
            sent_at: Utc::now(),
        }
    }

    /// Notice that service was cut for lack of balance.
    #[must_use]
    pub fn suspension(customer: &customer::Model, sent_by: &str) -> Self {
        Self {
            customer_id: customer.id,
            customer_name: customer.full_name.clone(),
            subject: "Service Suspended - Low Balance".to_string(),
            body: format!(
                "Dear {},\n\nYour internet service has been suspended due to insufficient balance.\n\n\
                 Please recharge your account immediately to resume service.\n\n\
                 For assistance, please contact our support team.\n\nThank you!",
                customer.full_name
            ),
            kind: MessageKind::Suspension,
            sent_by: sent_by.to_string(),
            sent_at: Utc::now(),
        }
    }
}

/// Sink for customer notifications.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Delivers one message.
    async fn send(&self, message: OutgoingMessage) -> Result<()>;
}

/// Messenger that stores notices in the customer message table.
#[derive(Debug, Clone)]
pub struct DbMessenger {
    db: DatabaseConnection,
}

impl DbMessenger {
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Messenger for DbMessenger {
    async fn send(&self, message: OutgoingMessage) -> Result<()> {
        send_message(&self.db, message).await.map(|_| ())
    }
}

/// Persists a message, unread.
pub async fn send_message<C>(db: &C, message: OutgoingMessage) -> Result<customer_message::Model>
where
    C: ConnectionTrait,
{
    let stored = customer_message::ActiveModel {
        customer_id: Set(message.customer_id),
        customer_name: Set(message.customer_name),
        subject: Set(message.subject),
        body: Set(message.body),
        message_type: Set(message.kind.as_str().to_string()),
        sent_by: Set(message.sent_by),
        sent_at: Set(message.sent_at),
        is_read: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await?;

    debug!(customer_id = stored.customer_id, kind = %stored.message_type, "Stored customer message");
    Ok(stored)
}

/// Sends a free-form operator message to a customer.
pub async fn send_general_message(
    db: &DatabaseConnection,
    actor: &Actor,
    customer_id: i64,
    subject: &str,
    body: &str,
) -> Result<customer_message::Model> {
    actor.require(Capability::SendMessages)?;
    if subject.trim().is_empty() || body.trim().is_empty() {
        return Err(Error::Validation {
            message: "subject and message body are required".to_string(),
        });
    }

    let customer = get_scoped_customer(db, actor, customer_id).await?;
    let stored = send_message(
        db,
        OutgoingMessage {
            customer_id: customer.id,
            customer_name: customer.full_name.clone(),
            subject: subject.trim().to_string(),
            body: body.trim().to_string(),
            kind: MessageKind::General,
            sent_by: actor.username.clone(),
            sent_at: Utc::now(),
        },
    )
    .await?;

    info!(customer = %customer.username, by = %actor.username, "Sent message");
    Ok(stored)
}

/// All stored messages, newest first.
pub async fn get_all_messages(
    db: &DatabaseConnection,
    actor: &Actor,
) -> Result<Vec<customer_message::Model>> {
    actor.require(Capability::SendMessages)?;

    CustomerMessage::find()
        .order_by_desc(customer_message::Column::SentAt)
        .order_by_desc(customer_message::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Messages of one customer, newest first.
pub async fn get_customer_messages<C>(
    db: &C,
    customer_id: i64,
) -> Result<Vec<customer_message::Model>>
where
    C: ConnectionTrait,
{
    CustomerMessage::find()
        .filter(customer_message::Column::CustomerId.eq(customer_id))
        .order_by_desc(customer_message::Column::SentAt)
        .order_by_desc(customer_message::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn find_message(
    db: &DatabaseConnection,
    message_id: i64,
) -> Result<customer_message::Model> {
    CustomerMessage::find_by_id(message_id)
        .one(db)
        .await?
        .ok_or(Error::MessageNotFound { id: message_id })
}

pub async fn mark_as_read(db: &DatabaseConnection, actor: &Actor, message_id: i64) -> Result<()> {
    actor.require(Capability::SendMessages)?;

    let message = find_message(db, message_id).await?;
    let mut active_model: customer_message::ActiveModel = message.into();
    active_model.is_read = Set(true);
    active_model.update(db).await?;
    Ok(())
}

pub async fn delete_message(
    db: &DatabaseConnection,
    actor: &Actor,
    message_id: i64,
) -> Result<()> {
    actor.require(Capability::SendMessages)?;

    let message = find_message(db, message_id).await?;
    message.delete(db).await?;
    info!(message_id, by = %actor.username, "Deleted message");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_templates() -> Result<()> {
        let db = setup_test_db().await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "alice", &package, 40.0).await?;

        let credentials = OutgoingMessage::credentials(&customer, "Basic", "admin");
        assert_eq!(credentials.subject, "Your Internet Connection Credentials");
        assert!(credentials.body.contains("Username: alice"));
        assert!(credentials.body.contains(&format!("Password: {}", customer.password)));
        assert_eq!(credentials.kind, MessageKind::Credentials);

        let alert = OutgoingMessage::bill_alert(&customer, 300.0, 3, "system");
        assert_eq!(alert.subject, "Bill Payment Reminder");
        assert!(alert.body.contains("Current Balance: 40.00"));
        assert!(alert.body.contains("Estimated Days Remaining: 3"));

        let suspension = OutgoingMessage::suspension(&customer, "system");
        assert_eq!(suspension.subject, "Service Suspended - Low Balance");
        assert_eq!(suspension.kind, MessageKind::Suspension);
        Ok(())
    }

    #[tokio::test]
    async fn test_db_messenger_persists() -> Result<()> {
        let db = setup_test_db().await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "alice", &package, 40.0).await?;

        let sent_at = DateTime::parse_from_rfc3339("2024-03-01T06:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let messenger = DbMessenger::new(db.clone());
        messenger
            .send(OutgoingMessage::suspension(&customer, "system").at(sent_at))
            .await?;

        let stored = get_customer_messages(&db, customer.id).await?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kind()?, MessageKind::Suspension);
        assert!(!stored[0].is_read);
        assert_eq!(stored[0].sent_at, sent_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_general_message_read_and_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let package = create_test_package(&db, "Basic", 300.0, 30).await?;
        let customer = create_test_customer(&db, "alice", &package, 40.0).await?;

        let sent = send_general_message(&db, &admin, customer.id, "Maintenance", "Tonight").await?;
        assert_eq!(sent.sent_by, "admin");

        mark_as_read(&db, &admin, sent.id).await?;
        assert!(get_all_messages(&db, &admin).await?[0].is_read);

        delete_message(&db, &admin, sent.id).await?;
        assert!(get_all_messages(&db, &admin).await?.is_empty());

        let result = delete_message(&db, &admin, sent.id).await;
        assert!(matches!(result, Err(Error::MessageNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_general_message_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = setup_admin(&db).await?;
        let result = send_general_message(&db, &admin, 1, "  ", "body").await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = send_general_message(&db, &admin, 404, "Hi", "body").await;
        assert!(matches!(result, Err(Error::CustomerNotFound { .. })));
        Ok(())
    }
}
