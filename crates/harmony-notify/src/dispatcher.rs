//! Notification Dispatcher: turns a [`ChangeEvent`] into persisted
//! notifications and emails without making the caller wait for either.

use crate::change::{describe_changes, TouchedFields};
use crate::error::ResolveError;
use crate::event::{ChangeEvent, EventSnapshot};
use crate::executor::{DeliveryExecutor, DeliveryJob, DispatchHandle, JobOutcome, Sink};
use crate::message::{compose, email_for, EmailMessage};
use crate::resolver::{resolve, Resolution};
use crate::roster::RoleRoster;
use crate::snapshot::{ClientSnapshot, IssueSnapshot, ProjectSnapshot};
use harmony_core::{
    EmailGateway, EntityRef, Notification, NotificationStore, UserDirectory, UserId,
};
use metrics::counter;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// An update or status change where nothing actually changed.
    NoChanges,
    /// Every candidate recipient was filtered out (usually: only the actor).
    NoRecipients,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoChanges => f.write_str("no changes"),
            SkipReason::NoRecipients => f.write_str("no recipients"),
        }
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    Dispatched(DispatchHandle),
    Skipped(SkipReason),
    Aborted(ResolveError),
}

impl DispatchOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchOutcome::Dispatched(_))
    }

    pub fn handle(self) -> Option<DispatchHandle> {
        match self {
            DispatchOutcome::Dispatched(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Fan-out engine. Cheap to clone; every clone shares the collaborators.
#[derive(Clone)]
pub struct NotificationEngine {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn UserDirectory>,
    email: Arc<dyn EmailGateway>,
    executor: Arc<dyn DeliveryExecutor>,
}

impl NotificationEngine {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn UserDirectory>,
        email: Arc<dyn EmailGateway>,
        executor: Arc<dyn DeliveryExecutor>,
    ) -> Self {
        Self {
            store,
            directory,
            email,
            executor,
        }
    }

    pub fn store(&self) -> &Arc<dyn NotificationStore> {
        &self.store
    }

    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    pub fn email(&self) -> &Arc<dyn EmailGateway> {
        &self.email
    }

    pub fn executor(&self) -> &Arc<dyn DeliveryExecutor> {
        &self.executor
    }

    /// Resolves recipients for `event` and hands the deliveries to the executor.
    ///
    /// Only the roster read happens before this returns; with a spawning
    /// executor no store or email call has necessarily completed yet.
    #[instrument(skip(self, event), fields(event = %event, actor = %event.actor()))]
    pub async fn publish(&self, event: ChangeEvent) -> DispatchOutcome {
        if event.kind().requires_change_tags() && event.change_tags().is_empty() {
            debug!("nothing changed, skipping");
            counter!("harmony_events_skipped").increment(1);
            return DispatchOutcome::Skipped(SkipReason::NoChanges);
        }

        let roster = match RoleRoster::load(self.directory.as_ref()).await {
            Ok(roster) => roster,
            Err(e) => return self.abort(ResolveError::from(e)),
        };

        let resolution = match resolve(&event, &roster) {
            Ok(resolution) => resolution,
            Err(e) => return self.abort(e),
        };

        if resolution.is_empty() {
            debug!("no recipients, skipping");
            counter!("harmony_events_skipped").increment(1);
            return DispatchOutcome::Skipped(SkipReason::NoRecipients);
        }

        let jobs = self.jobs_for(&event, &resolution, &roster);
        info!(
            notifications = resolution.notification_count(),
            jobs = jobs.len(),
            executor = self.executor.name(),
            "dispatching"
        );
        DispatchOutcome::Dispatched(self.executor.execute(jobs).await)
    }

    fn abort(&self, error: ResolveError) -> DispatchOutcome {
        warn!(error = %error, "aborting dispatch");
        counter!("harmony_events_aborted").increment(1);
        DispatchOutcome::Aborted(error)
    }

    fn jobs_for(
        &self,
        event: &ChangeEvent,
        resolution: &Resolution,
        roster: &RoleRoster,
    ) -> Vec<DeliveryJob> {
        let related_id = Some(event.entity().id);
        let mut jobs = Vec::with_capacity(resolution.notification_count() * 2);

        for delivery in &resolution.deliveries {
            let message = compose(event, delivery.rule, roster);
            for &recipient in &delivery.recipients {
                // Allocated up front so the email never waits for the store.
                let notification_id = Uuid::new_v4();
                let notification = Notification::new(
                    recipient,
                    delivery.notification_type,
                    message.title.clone(),
                    message.body.clone(),
                    related_id,
                )
                .with_id(notification_id);
                jobs.push(persist_job(Arc::clone(&self.store), notification));

                let email = email_for(event, delivery.rule, &message, notification_id, roster);
                jobs.push(email_job(
                    Arc::clone(&self.directory),
                    Arc::clone(&self.email),
                    recipient,
                    email,
                ));
            }
        }
        jobs
    }

    /// New issue: creation broadcast, project members, and the initial assignee.
    ///
    /// `project_members` is empty for issues outside a project.
    pub async fn issue_created(
        &self,
        actor: UserId,
        issue: &IssueSnapshot,
        project_members: &[UserId],
    ) -> Vec<DispatchOutcome> {
        let entity = EntityRef::issue(issue.id);
        let mut snapshot = EventSnapshot::from(issue);
        snapshot.project_members = project_members.to_vec();

        let mut outcomes = vec![
            self.publish(ChangeEvent::created(actor, entity, snapshot.clone()))
                .await,
        ];
        if let Some(assignee) = issue.assigned_to {
            outcomes.push(
                self.publish(ChangeEvent::assigned(actor, entity, None, assignee, snapshot))
                    .await,
            );
        }
        outcomes
    }

    /// Issue edit: an `Updated` event for the touched fields, plus an
    /// `Assigned` event when the assignee moved to someone new.
    pub async fn issue_updated(
        &self,
        actor: UserId,
        old: &IssueSnapshot,
        new: &IssueSnapshot,
        touched: &TouchedFields,
    ) -> Vec<DispatchOutcome> {
        let entity = EntityRef::issue(new.id);
        let snapshot = EventSnapshot::from(new);
        let tags = describe_changes(Some(old), new, touched);

        let mut outcomes = vec![
            self.publish(ChangeEvent::updated(actor, entity, tags, snapshot.clone()))
                .await,
        ];
        if let Some(assignee) = new.assigned_to.filter(|a| old.assigned_to != Some(*a)) {
            outcomes.push(
                self.publish(ChangeEvent::assigned(
                    actor,
                    entity,
                    old.assigned_to,
                    assignee,
                    snapshot,
                ))
                .await,
            );
        }
        outcomes
    }

    pub async fn issue_status_changed(
        &self,
        actor: UserId,
        old: &IssueSnapshot,
        new: &IssueSnapshot,
    ) -> DispatchOutcome {
        let event = ChangeEvent::status_changed(
            actor,
            EntityRef::issue(new.id),
            old.status,
            new.status,
            EventSnapshot::from(new),
        );
        self.publish(event).await
    }

    pub async fn project_created(&self, actor: UserId, project: &ProjectSnapshot) -> DispatchOutcome {
        let event = ChangeEvent::created(
            actor,
            EntityRef::project(project.id),
            EventSnapshot::from(project),
        );
        self.publish(event).await
    }

    pub async fn project_updated(
        &self,
        actor: UserId,
        old: &ProjectSnapshot,
        new: &ProjectSnapshot,
        touched: &TouchedFields,
    ) -> DispatchOutcome {
        let tags = describe_changes(Some(old), new, touched);
        let event = ChangeEvent::updated(
            actor,
            EntityRef::project(new.id),
            tags,
            EventSnapshot::from(new),
        );
        self.publish(event).await
    }

    pub async fn client_created(&self, actor: UserId, client: &ClientSnapshot) -> DispatchOutcome {
        let event = ChangeEvent::created(
            actor,
            EntityRef::client(client.id),
            EventSnapshot::from(client),
        );
        self.publish(event).await
    }

    pub async fn member_added(
        &self,
        actor: UserId,
        project: &ProjectSnapshot,
        member: UserId,
    ) -> DispatchOutcome {
        let event = ChangeEvent::member_added(actor, project.id, project.name.clone(), member);
        self.publish(event).await
    }
}

impl fmt::Debug for NotificationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationEngine")
            .field("executor", &self.executor.name())
            .finish_non_exhaustive()
    }
}

pub(crate) fn persist_job(store: Arc<dyn NotificationStore>, notification: Notification) -> DeliveryJob {
    let recipient = notification.user_id;
    DeliveryJob::new(Sink::Store, recipient, async move {
        let id = notification.id;
        match store.create(notification).await {
            Ok(()) => {
                counter!("harmony_notifications_persisted").increment(1);
                debug!(%recipient, notification = %id, "notification persisted");
                JobOutcome::Delivered
            }
            Err(e) => {
                counter!("harmony_notifications_failed").increment(1);
                warn!(%recipient, sink = "store", error = %e, "failed to persist notification");
                JobOutcome::Failed(e.to_string())
            }
        }
    })
}

/// Looks the recipient up in the directory, then sends `message` to their address.
pub(crate) fn email_job(
    directory: Arc<dyn UserDirectory>,
    gateway: Arc<dyn EmailGateway>,
    recipient: UserId,
    message: EmailMessage,
) -> DeliveryJob {
    DeliveryJob::new(Sink::Email, recipient, async move {
        let address = match directory.get_by_id(recipient).await {
            Ok(Some(user)) if !user.email.is_empty() => user.email,
            Ok(_) => {
                debug!(%recipient, "no email address, skipping");
                return JobOutcome::Skipped;
            }
            Err(e) => {
                counter!("harmony_emails_failed").increment(1);
                warn!(%recipient, sink = "email", error = %e, "recipient lookup failed");
                return JobOutcome::Failed(e.to_string());
            }
        };
        send_email(gateway.as_ref(), recipient, &address, &message).await
    })
}

/// Sends straight to a known address.
pub(crate) fn direct_email_job(
    gateway: Arc<dyn EmailGateway>,
    recipient: UserId,
    address: String,
    message: EmailMessage,
) -> DeliveryJob {
    DeliveryJob::new(Sink::Email, recipient, async move {
        send_email(gateway.as_ref(), recipient, &address, &message).await
    })
}

async fn send_email(
    gateway: &dyn EmailGateway,
    recipient: UserId,
    address: &str,
    message: &EmailMessage,
) -> JobOutcome {
    let category = message.category();
    match message.send(gateway, address).await {
        Ok(()) => {
            counter!("harmony_emails_sent").increment(1);
            debug!(%recipient, category, "email sent");
            JobOutcome::Delivered
        }
        Err(e) => {
            counter!("harmony_emails_failed").increment(1);
            warn!(%recipient, category, sink = "email", error = %e, "failed to send email");
            JobOutcome::Failed(e.to_string())
        }
    }
}
