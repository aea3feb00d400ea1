use crate::gateway::{MailTransport, TemplatedGateway};
use crate::templates::Templates;
use async_trait::async_trait;
use harmony_core::{HarmonyError, Result, Settings, SmtpConfig};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info};

/// Email gateway backed by an SMTP relay.
pub type SmtpEmailGateway = TemplatedGateway<SmtpMailer>;

impl TemplatedGateway<SmtpMailer> {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            SmtpMailer::new(&settings.smtp)?,
            Templates::new(settings.frontend_url.clone()),
        ))
    }
}

struct Connected {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

/// STARTTLS SMTP transport. Without credentials every send is a silent no-op.
pub struct SmtpMailer {
    connected: Option<Connected>,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let Some(password) = config.password.as_ref().filter(|_| config.is_configured()) else {
            info!("SMTP credentials not configured, emails will be skipped");
            return Ok(Self {
                connected: None,
                timeout,
            });
        };

        let address: Address = config.sender_address().parse().map_err(|e| {
            HarmonyError::Config(format!(
                "invalid sender address {:?}: {}",
                config.sender_address(),
                e
            ))
        })?;
        let sender = Mailbox::new(Some(config.from_name.clone()), address);

        let credentials = Credentials::new(
            config.user.clone(),
            password.expose_secret().to_string(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| HarmonyError::Config(format!("SMTP relay configuration error: {}", e)))?
            .port(config.port)
            .credentials(credentials)
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            connected: Some(Connected { transport, sender }),
            timeout,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.connected.is_some()
    }

    /// Opens a connection and authenticates without sending anything.
    pub async fn test_connection(&self) -> Result<bool> {
        let Some(connected) = &self.connected else {
            return Ok(false);
        };
        connected
            .transport
            .test_connection()
            .await
            .map_err(|e| HarmonyError::Email(e.to_string()))
    }
}

impl std::fmt::Debug for SmtpMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailer")
            .field("configured", &self.is_configured())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let Some(connected) = &self.connected else {
            debug!(to, subject, "SMTP not configured, skipping email");
            return Ok(());
        };

        let recipient: Mailbox = to
            .parse()
            .map_err(|e| HarmonyError::InvalidInput(format!("invalid email address {:?}: {}", to, e)))?;
        let message = Message::builder()
            .from(connected.sender.clone())
            .to(recipient)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| HarmonyError::Email(format!("failed to build email: {}", e)))?;

        match tokio::time::timeout(self.timeout, connected.transport.send(message)).await {
            Ok(Ok(_)) => {
                debug!(to, subject, "email sent");
                Ok(())
            }
            Ok(Err(e)) => Err(HarmonyError::Email(format!("failed to send email: {}", e))),
            Err(_) => Err(HarmonyError::Timeout(format!(
                "sending to {} took longer than {:?}",
                to, self.timeout
            ))),
        }
    }
}
