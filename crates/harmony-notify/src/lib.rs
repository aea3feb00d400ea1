//! Change-notification fan-out for the Harmony tracker.
//!
//! A mutation handler describes what changed ([`change`]), wraps it in a
//! [`ChangeEvent`] and calls [`NotificationEngine::publish`]. The engine reads
//! the role roster, resolves recipients ([`resolver`]) and hands one persist
//! job and one email job per recipient to a [`DeliveryExecutor`].

pub mod account;
pub mod change;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod executor;
pub mod feed;
pub mod message;
pub mod resolver;
pub mod roster;
pub mod snapshot;

pub use account::AccountMailer;
pub use change::{describe_changes, Describe, Field, TouchedFields};
pub use dispatcher::{DispatchOutcome, NotificationEngine, SkipReason};
pub use error::ResolveError;
pub use event::{ChangeEvent, EventKind, EventSnapshot};
pub use executor::{
    executor_from_config, DeliveryExecutor, DeliveryJob, DeliveryReport, DispatchHandle,
    InlineExecutor, JobOutcome, Sink, SpawningExecutor,
};
pub use feed::NotificationFeed;
pub use message::{compose, EmailMessage, Message};
pub use resolver::{resolve, Delivery, Resolution, Rule};
pub use roster::RoleRoster;
pub use snapshot::{ClientSnapshot, IssuePriority, IssueSnapshot, IssueStatus, ProjectSnapshot, UserSnapshot};
