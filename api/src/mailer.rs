//! Outbound mail delivery
//!
//! A `TransportFactory` turns `SmtpSettings` into a `MailTransport`, failing
//! with a `ConfigError` before any network activity when a required value is
//! missing. `Mailer` wraps the factory and decides whether a transport is
//! rebuilt per request (the default) or reused.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::config::{ConfigError, SmtpSettings};

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid {field} address `{value}`: {reason}")]
    Address {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to build message: {0}")]
    Message(String),
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),
}

/// One email ready to hand to a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

/// Something that can deliver a single email
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), DeliveryError>;
}

/// Builds transports from SMTP settings
pub trait TransportFactory: Send + Sync {
    fn build(&self, settings: &SmtpSettings) -> Result<Arc<dyn MailTransport>, ConfigError>;
}

/// Factory for real SMTP transports
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpTransportFactory;

impl TransportFactory for SmtpTransportFactory {
    fn build(&self, settings: &SmtpSettings) -> Result<Arc<dyn MailTransport>, ConfigError> {
        let host = settings.host()?;

        // `secure` means TLS from the first byte; otherwise upgrade with
        // STARTTLS when the server offers it.
        let builder = if settings.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| ConfigError::InvalidConfig(format!("SMTP_HOST `{host}`: {e}")))?
        } else {
            let tls = TlsParameters::new(host.to_string())
                .map_err(|e| ConfigError::InvalidConfig(format!("SMTP_HOST `{host}`: {e}")))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .tls(Tls::Opportunistic(tls))
        };

        let mut builder = builder.port(settings.port);
        if let Some((user, password)) = settings.credentials() {
            builder = builder.credentials(Credentials::new(user.to_string(), password.to_string()));
        }

        tracing::debug!(
            host,
            port = settings.port,
            secure = settings.secure,
            "SMTP transport built"
        );

        Ok(Arc::new(SmtpTransport {
            inner: builder.build(),
        }))
    }
}

struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, email: OutboundEmail) -> Result<(), DeliveryError> {
        let message = build_message(email)?;
        self.inner
            .send(message)
            .await
            .map_err(|e| DeliveryError::Smtp(e.to_string()))?;
        Ok(())
    }
}

fn build_message(email: OutboundEmail) -> Result<Message, DeliveryError> {
    Message::builder()
        .from(parse_mailbox("from", &email.from)?)
        .to(parse_mailbox("to", &email.to)?)
        .reply_to(parse_mailbox("reply-to", &email.reply_to)?)
        .subject(email.subject)
        .header(ContentType::TEXT_PLAIN)
        .body(email.body)
        .map_err(|e| DeliveryError::Message(e.to_string()))
}

fn parse_mailbox(field: &'static str, value: &str) -> Result<Mailbox, DeliveryError> {
    value.parse::<Mailbox>().map_err(|e| DeliveryError::Address {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Entry point used by handlers to obtain a ready-to-send mailer
pub struct Mailer {
    settings: SmtpSettings,
    factory: Arc<dyn TransportFactory>,
    cached: Mutex<Option<Arc<dyn MailTransport>>>,
}

impl Mailer {
    pub fn new(settings: SmtpSettings, factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            settings,
            factory,
            cached: Mutex::new(None),
        }
    }

    /// Resolve addresses and a transport. Fails only on configuration problems.
    pub fn prepare(&self) -> Result<PreparedMailer, ConfigError> {
        let transport = self.transport()?;
        let to = checked_address("SMTP_TO", self.settings.to_address()?)?;
        let from = checked_address("SMTP_FROM", self.settings.from_address()?)?;

        Ok(PreparedMailer {
            transport,
            from,
            to,
        })
    }

    fn transport(&self) -> Result<Arc<dyn MailTransport>, ConfigError> {
        if !self.settings.reuse_transport {
            return self.factory.build(&self.settings);
        }

        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(transport) = cached.as_ref() {
            return Ok(Arc::clone(transport));
        }

        let transport = self.factory.build(&self.settings)?;
        *cached = Some(Arc::clone(&transport));
        Ok(transport)
    }
}

fn checked_address(key: &'static str, value: &str) -> Result<String, ConfigError> {
    value
        .parse::<Mailbox>()
        .map_err(|e| ConfigError::InvalidConfig(format!("{key} `{value}`: {e}")))?;
    Ok(value.to_string())
}

/// A transport plus the relay's fixed sender and recipient
pub struct PreparedMailer {
    transport: Arc<dyn MailTransport>,
    from: String,
    to: String,
}

impl PreparedMailer {
    /// Deliver one message, replies going to `reply_to`. Exactly one attempt.
    pub async fn send(
        &self,
        reply_to: &str,
        subject: String,
        body: String,
    ) -> Result<(), DeliveryError> {
        self.transport
            .send(OutboundEmail {
                from: self.from.clone(),
                to: self.to.clone(),
                reply_to: reply_to.to_string(),
                subject,
                body,
            })
            .await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that records every email instead of sending it
    #[derive(Default)]
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<OutboundEmail>>,
        pub fail: bool,
    }

    impl RecordingTransport {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn sent(&self) -> Vec<OutboundEmail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, email: OutboundEmail) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(email);
            if self.fail {
                return Err(DeliveryError::Smtp("connection refused".to_string()));
            }
            Ok(())
        }
    }

    /// Factory that checks the host like the real one and hands out a shared
    /// recording transport
    pub struct RecordingFactory {
        pub transport: Arc<RecordingTransport>,
        pub builds: AtomicUsize,
    }

    impl RecordingFactory {
        pub fn new(transport: RecordingTransport) -> Self {
            Self {
                transport: Arc::new(transport),
                builds: AtomicUsize::new(0),
            }
        }

        pub fn builds(&self) -> usize {
            self.builds.load(Ordering::SeqCst)
        }
    }

    impl TransportFactory for RecordingFactory {
        fn build(&self, settings: &SmtpSettings) -> Result<Arc<dyn MailTransport>, ConfigError> {
            settings.host()?;
            self.builds.fetch_add(1, Ordering::SeqCst);
            Ok(self.transport.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: Some("smtp.example.com".to_string()),
            port: 587,
            from: Some("pilot999 <no-reply@pilot999.example>".to_string()),
            to: Some("inbox@pilot999.example".to_string()),
            ..SmtpSettings::default()
        }
    }

    #[test]
    fn missing_host_fails_before_building() {
        let factory = Arc::new(RecordingFactory::new(RecordingTransport::default()));
        let mailer = Mailer::new(
            SmtpSettings {
                host: None,
                ..settings()
            },
            factory.clone(),
        );

        let result = mailer.prepare();

        assert!(matches!(result, Err(ConfigError::MissingEnv("SMTP_HOST"))));
        assert_eq!(factory.builds(), 0);
    }

    #[test]
    fn missing_addresses_are_configuration_errors() {
        let factory = Arc::new(RecordingFactory::new(RecordingTransport::default()));

        let no_to = Mailer::new(SmtpSettings { to: None, ..settings() }, factory.clone());
        let no_from = Mailer::new(SmtpSettings { from: None, ..settings() }, factory.clone());

        assert!(matches!(no_to.prepare(), Err(ConfigError::MissingEnv("SMTP_TO"))));
        assert!(matches!(no_from.prepare(), Err(ConfigError::MissingEnv("SMTP_FROM"))));
    }

    #[test]
    fn unparsable_sender_is_a_configuration_error() {
        let factory = Arc::new(RecordingFactory::new(RecordingTransport::default()));
        let mailer = Mailer::new(
            SmtpSettings {
                from: Some("not-an-address".to_string()),
                ..settings()
            },
            factory,
        );

        assert!(matches!(mailer.prepare(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn rebuilds_transport_per_request_by_default() {
        let factory = Arc::new(RecordingFactory::new(RecordingTransport::default()));
        let mailer = Mailer::new(settings(), factory.clone());

        mailer.prepare().unwrap();
        mailer.prepare().unwrap();

        assert_eq!(factory.builds(), 2);
    }

    #[test]
    fn reuses_transport_when_enabled() {
        let factory = Arc::new(RecordingFactory::new(RecordingTransport::default()));
        let mailer = Mailer::new(
            SmtpSettings {
                reuse_transport: true,
                ..settings()
            },
            factory.clone(),
        );

        mailer.prepare().unwrap();
        mailer.prepare().unwrap();

        assert_eq!(factory.builds(), 1);
    }

    #[tokio::test]
    async fn prepared_mailer_sends_with_reply_to() {
        let factory = Arc::new(RecordingFactory::new(RecordingTransport::default()));
        let mailer = Mailer::new(settings(), factory.clone());

        mailer
            .prepare()
            .unwrap()
            .send("ada@example.com", "subject".to_string(), "body".to_string())
            .await
            .unwrap();

        let sent = factory.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reply_to, "ada@example.com");
        assert_eq!(sent[0].from, "pilot999 <no-reply@pilot999.example>");
        assert_eq!(sent[0].to, "inbox@pilot999.example");
    }

    #[test]
    fn smtp_factory_requires_host() {
        let result = SmtpTransportFactory.build(&SmtpSettings {
            host: None,
            ..settings()
        });
        assert!(matches!(result, Err(ConfigError::MissingEnv("SMTP_HOST"))));
    }

    #[test]
    fn build_message_uses_plain_text_and_reply_to() {
        let message = build_message(OutboundEmail {
            from: "pilot999 <no-reply@pilot999.example>".to_string(),
            to: "inbox@pilot999.example".to_string(),
            reply_to: "ada@example.com".to_string(),
            subject: "pilot999: new message from Ada".to_string(),
            body: "Name: Ada\n".to_string(),
        })
        .unwrap();

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Reply-To: ada@example.com"));
        assert!(formatted.contains("Content-Type: text/plain"));
        assert!(formatted.contains("Subject: pilot999: new message from Ada"));
    }

    #[test]
    fn build_message_rejects_bad_reply_to() {
        let result = build_message(OutboundEmail {
            from: "no-reply@pilot999.example".to_string(),
            to: "inbox@pilot999.example".to_string(),
            reply_to: "not-an-address".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        });
        assert!(matches!(result, Err(DeliveryError::Address { field: "reply-to", .. })));
    }
}
