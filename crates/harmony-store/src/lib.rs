//! Adapters for the collaborators the notification engine talks to.

pub mod gateway;
pub mod memory;
pub mod recording;
pub mod smtp;
pub mod templates;

pub use gateway::{MailTransport, TemplatedGateway};
pub use memory::{InMemoryNotificationStore, InMemoryUserDirectory};
pub use recording::{RecordingEmailGateway, RecordingMailer, SentEmail};
pub use smtp::{SmtpEmailGateway, SmtpMailer};
pub use templates::{RenderedEmail, Templates};
