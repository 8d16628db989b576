//! # Mail listener and its delivery backends.
//!
//! [`MailListener`] formats the current error into a mail; a [`MailAdapter`]
//! delivers it. [`SmtpAdapter`] (feature `mail`) sends through an SMTP relay
//! with `lettre`.
//!
//! ```text
//! notify() ─► MailListener::update() ─► MailAdapter::send(subject, body)
//!                                            ├─► SmtpAdapter (lettre)
//!                                            └─► custom adapter
//! ```
//!
//! Every adapter addresses a [`Recipient`], which can only be obtained through
//! validation, so no backend can be built around a malformed address.

use std::fmt;
use std::str::FromStr;

use super::observer::Observer;
use crate::error::ListenerError;
use crate::handler::ErrorHandler;

/// Default prefix of the mail subject line.
pub const DEFAULT_SUBJECT_PREFIX: &str = "[error]";

/// A validated mail address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Recipient(String);

impl Recipient {
    /// Validates `raw` as `local@domain`.
    ///
    /// # Errors
    /// [`ListenerError::InvalidArgument`] for anything else: missing parts,
    /// whitespace, or an empty domain label.
    pub fn parse(raw: &str) -> Result<Self, ListenerError> {
        let invalid = || ListenerError::invalid_argument(format!("invalid email address {raw:?}"));

        let (local, domain) = raw.rsplit_once('@').ok_or_else(invalid)?;
        let printable = raw.chars().all(|c| !c.is_whitespace() && !c.is_control());
        let labels_ok = domain.split('.').all(|label| !label.is_empty());
        if local.is_empty() || domain.is_empty() || !printable || !labels_ok {
            return Err(invalid());
        }
        Ok(Self(raw.to_string()))
    }

    /// The address as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Recipient {
    type Err = ListenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery backend for [`MailListener`].
pub trait MailAdapter: Send + Sync + 'static {
    /// Sends one mail to the adapter's recipient.
    fn send(&self, subject: &str, body: &str) -> Result<(), ListenerError>;

    /// Recipient address.
    fn recipient(&self) -> &Recipient;
}

/// Listener mailing every captured error.
///
/// Nothing is sent when there is no current error (e.g. an earlier observer
/// already consumed it under `clear_after_send`).
#[derive(Debug)]
pub struct MailListener<A> {
    adapter: A,
    subject_prefix: String,
}

impl<A: MailAdapter> MailListener<A> {
    /// Creates a listener delivering through `adapter`.
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
        }
    }

    /// Replaces the subject prefix.
    #[must_use]
    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    /// Delivery backend.
    pub fn adapter(&self) -> &A {
        &self.adapter
    }
}

impl<A: MailAdapter> Observer for MailListener<A> {
    fn update(&self, subject: &ErrorHandler) -> Result<(), ListenerError> {
        let Some(record) = subject.current() else {
            return Ok(());
        };
        let title = format!("{} {}", self.subject_prefix, record.message);
        self.adapter.send(&title, &record.to_string())
    }

    fn name(&self) -> &'static str {
        "mail"
    }
}

#[cfg(feature = "mail")]
pub use smtp::{DEFAULT_SENDER, SmtpAdapter};

#[cfg(feature = "mail")]
pub(crate) use smtp::smtp_listener_from_args;

#[cfg(feature = "mail")]
mod smtp {
    use std::fmt;

    use lettre::message::Mailbox;
    use lettre::{Address, Message, SmtpTransport, Transport};

    use super::{MailAdapter, MailListener, Recipient};
    use crate::error::ListenerError;
    use crate::listeners::factory::{ListenerArg, str_arg};

    /// Sender used when none is given.
    pub const DEFAULT_SENDER: &str = "errvisor@localhost";

    /// SMTP delivery through a relay, no TLS.
    ///
    /// The recipient is validated as a [`Recipient`] when the adapter is built: a
    /// malformed address is an [`ListenerError::InvalidArgument`]. No connection is opened until the
    /// first [`MailAdapter::send`].
    pub struct SmtpAdapter {
        to: Mailbox,
        from: Mailbox,
        recipient: Recipient,
        relay: String,
        transport: SmtpTransport,
    }

    impl SmtpAdapter {
        /// Builds an adapter for `to` through `relay` (`host` or `host:port`).
        pub fn new(to: &str, relay: &str) -> Result<Self, ListenerError> {
            Self::with_sender(to, relay, DEFAULT_SENDER)
        }

        /// Same as [`SmtpAdapter::new`] with an explicit sender.
        pub fn with_sender(to: &str, relay: &str, from: &str) -> Result<Self, ListenerError> {
            let recipient = Recipient::parse(to)?;
            let to = parse_address(recipient.as_str())?;
            let sender = parse_address(from)?;

            let transport = match relay.rsplit_once(':') {
                Some((host, port)) => {
                    let port: u16 = port.parse().map_err(|_| {
                        ListenerError::invalid_argument(format!("invalid relay port in {relay:?}"))
                    })?;
                    SmtpTransport::builder_dangerous(host).port(port).build()
                }
                None => SmtpTransport::builder_dangerous(relay).build(),
            };

            Ok(Self {
                to: Mailbox::new(None, to),
                from: Mailbox::new(None, sender),
                recipient,
                relay: relay.to_string(),
                transport,
            })
        }

        /// Relay the adapter sends through.
        pub fn relay(&self) -> &str {
            &self.relay
        }
    }

    impl MailAdapter for SmtpAdapter {
        fn send(&self, subject: &str, body: &str) -> Result<(), ListenerError> {
            let message = Message::builder()
                .from(self.from.clone())
                .to(self.to.clone())
                .subject(subject)
                .body(body.to_string())
                .map_err(|e| ListenerError::Delivery { error: e.to_string() })?;

            self.transport
                .send(&message)
                .map(|_| ())
                .map_err(|e| ListenerError::Delivery { error: e.to_string() })
        }

        fn recipient(&self) -> &Recipient {
            &self.recipient
        }
    }

    impl fmt::Debug for SmtpAdapter {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("SmtpAdapter")
                .field("to", &self.recipient.as_str())
                .field("relay", &self.relay)
                .finish_non_exhaustive()
        }
    }

    fn parse_address(raw: &str) -> Result<Address, ListenerError> {
        raw.parse::<Address>()
            .map_err(|e| ListenerError::invalid_argument(format!("invalid email address {raw:?}: {e}")))
    }

    /// Factory form: `[to, relay?, from?]`.
    pub(crate) fn smtp_listener_from_args(
        args: &[ListenerArg],
    ) -> Result<MailListener<SmtpAdapter>, ListenerError> {
        let to = str_arg(args, 0, "recipient")?
            .ok_or_else(|| ListenerError::invalid_argument("mail listener needs a recipient"))?;
        let relay = str_arg(args, 1, "relay")?.unwrap_or("localhost");
        let from = str_arg(args, 2, "sender")?.unwrap_or(DEFAULT_SENDER);
        Ok(MailListener::new(SmtpAdapter::with_sender(to, relay, from)?))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_invalid_recipient_rejected() {
            let err = SmtpAdapter::new("not-an-address", "localhost").err();
            assert!(matches!(err, Some(ListenerError::InvalidArgument { .. })));
        }

        #[test]
        fn test_relay_with_port() {
            let adapter = SmtpAdapter::new("ops@example.com", "mail.example.com:2525").unwrap();
            assert_eq!(adapter.relay(), "mail.example.com:2525");
            assert_eq!(adapter.recipient().as_str(), "ops@example.com");
        }

        #[test]
        fn test_bad_port_rejected() {
            assert!(SmtpAdapter::new("ops@example.com", "mail.example.com:smtp").is_err());
        }

        #[test]
        fn test_factory_args() {
            assert!(smtp_listener_from_args(&[]).is_err());
            assert!(smtp_listener_from_args(&[ListenerArg::Int(1)]).is_err());
            let listener = smtp_listener_from_args(&["ops@example.com".into()]).unwrap();
            assert_eq!(listener.adapter().relay(), "localhost");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    struct Outbox {
        recipient: Recipient,
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Outbox {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                recipient: Recipient::parse("ops@example.com").unwrap(),
                sent: Mutex::default(),
            })
        }
    }

    impl MailAdapter for Arc<Outbox> {
        fn send(&self, subject: &str, body: &str) -> Result<(), ListenerError> {
            self.sent.lock().unwrap().push((subject.to_string(), body.to_string()));
            Ok(())
        }

        fn recipient(&self) -> &Recipient {
            &self.recipient
        }
    }

    #[test]
    fn test_recipient_validation() {
        assert_eq!("ops@example.com".parse::<Recipient>().unwrap().to_string(), "ops@example.com");
        for bad in ["", "ops", "@example.com", "ops@", "ops@example..com", "o ps@example.com", "ops@.com"] {
            assert!(
                matches!(Recipient::parse(bad), Err(ListenerError::InvalidArgument { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_sends_rendered_error() {
        let outbox = Outbox::new();
        let mut handler = ErrorHandler::new();
        handler.attach_one(Arc::new(MailListener::new(Arc::clone(&outbox)).with_subject_prefix("[app]")));
        handler.capture(2, "Foo!", "test.src", 10);

        assert_eq!(handler.notify().unwrap(), 1);
        let sent = outbox.sent.lock().unwrap();
        assert_eq!(
            sent.as_slice(),
            &[(
                "[app] Foo!".to_string(),
                "Error 2: Foo!, in file test.src at line 10".to_string()
            )]
        );
    }

    #[test]
    fn test_nothing_sent_without_error() {
        let outbox = Outbox::new();
        let handler = ErrorHandler::new();
        let listener = MailListener::new(Arc::clone(&outbox));

        assert!(listener.update(&handler).is_ok());
        assert!(outbox.sent.lock().unwrap().is_empty());
    }
}
