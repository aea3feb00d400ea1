use crate::change::{describe_changes, TouchedFields};
use crate::dispatcher::direct_email_job;
use crate::executor::{DeliveryExecutor, DispatchHandle};
use crate::message::EmailMessage;
use crate::snapshot::UserSnapshot;
use harmony_core::EmailGateway;
use std::sync::Arc;
use tracing::debug;

/// Email-only messages about a user's own account.
///
/// These go to the account holder directly, so no roster or directory
/// lookup is involved.
#[derive(Clone)]
pub struct AccountMailer {
    email: Arc<dyn EmailGateway>,
    executor: Arc<dyn DeliveryExecutor>,
}

impl AccountMailer {
    pub fn new(email: Arc<dyn EmailGateway>, executor: Arc<dyn DeliveryExecutor>) -> Self {
        Self { email, executor }
    }

    pub async fn account_created(&self, user: &UserSnapshot, password: &str) -> DispatchHandle {
        self.send(
            user,
            EmailMessage::AccountCreated {
                name: user.name.clone(),
                password: password.to_string(),
            },
        )
        .await
    }

    /// `None` when none of the touched fields changed.
    pub async fn account_updated(
        &self,
        old: &UserSnapshot,
        new: &UserSnapshot,
        touched: &TouchedFields,
    ) -> Option<DispatchHandle> {
        let changes = describe_changes(Some(old), new, touched);
        if changes.is_empty() {
            debug!(user = %new.id, "account unchanged, no email");
            return None;
        }
        let message = EmailMessage::AccountUpdated {
            name: new.name.clone(),
            changes,
        };
        Some(self.send(new, message).await)
    }

    pub async fn account_deleted(&self, user: &UserSnapshot) -> DispatchHandle {
        self.send(
            user,
            EmailMessage::AccountDeleted {
                name: user.name.clone(),
            },
        )
        .await
    }

    async fn send(&self, user: &UserSnapshot, message: EmailMessage) -> DispatchHandle {
        let job = direct_email_job(Arc::clone(&self.email), user.id, user.email.clone(), message);
        self.executor.execute(vec![job]).await
    }
}
