use crate::templates::{RenderedEmail, Templates};
use async_trait::async_trait;
use harmony_core::{EmailGateway, NotificationId, Result};
use uuid::Uuid;

/// Moves one rendered email to `to`.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// [`EmailGateway`] that renders every category with [`Templates`] and
/// hands the result to a [`MailTransport`].
#[derive(Debug)]
pub struct TemplatedGateway<T> {
    transport: T,
    templates: Templates,
}

impl<T: MailTransport> TemplatedGateway<T> {
    pub fn new(transport: T, templates: Templates) -> Self {
        Self {
            transport,
            templates,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    async fn deliver(&self, to: &str, email: RenderedEmail) -> Result<()> {
        self.transport.deliver(to, &email.subject, &email.body).await
    }
}

#[async_trait]
impl<T: MailTransport> EmailGateway for TemplatedGateway<T> {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.transport.deliver(to, subject, body).await
    }

    async fn send_user_created(&self, to: &str, name: &str, password: &str) -> Result<()> {
        self.deliver(to, self.templates.user_created(name, to, password))
            .await
    }

    async fn send_user_updated(&self, to: &str, name: &str, changes: &[String]) -> Result<()> {
        self.deliver(to, self.templates.user_updated(name, changes))
            .await
    }

    async fn send_user_deleted(&self, to: &str, name: &str) -> Result<()> {
        self.deliver(to, self.templates.user_deleted(name)).await
    }

    async fn send_issue_created(&self, to: &str, issue_title: &str, issue_id: Uuid) -> Result<()> {
        self.deliver(to, self.templates.issue_created(issue_title, issue_id))
            .await
    }

    async fn send_issue_updated(
        &self,
        to: &str,
        issue_title: &str,
        issue_id: Uuid,
        changes: &[String],
    ) -> Result<()> {
        self.deliver(to, self.templates.issue_updated(issue_title, issue_id, changes))
            .await
    }

    async fn send_issue_assigned(
        &self,
        to: &str,
        issue_title: &str,
        issue_id: Uuid,
        assigner_name: &str,
    ) -> Result<()> {
        self.deliver(
            to,
            self.templates
                .issue_assigned(issue_title, issue_id, assigner_name),
        )
        .await
    }

    async fn send_project_created(
        &self,
        to: &str,
        project_name: &str,
        _project_id: Uuid,
    ) -> Result<()> {
        self.deliver(to, self.templates.project_created(project_name))
            .await
    }

    async fn send_project_updated(
        &self,
        to: &str,
        project_name: &str,
        _project_id: Uuid,
        changes: &[String],
    ) -> Result<()> {
        self.deliver(to, self.templates.project_updated(project_name, changes))
            .await
    }

    async fn send_notification(
        &self,
        to: &str,
        title: &str,
        message: &str,
        _notification_id: NotificationId,
    ) -> Result<()> {
        self.deliver(to, self.templates.notification(title, message))
            .await
    }
}
