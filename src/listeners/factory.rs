//! # Listener factory
//!
//! [`ListenerFactory`] turns a symbolic listener name plus constructor arguments into
//! an [`ObserverRef`]. The name table is built up front; nothing is reflected at runtime.
//!
//! ## Resolution rules
//! - Names are case-insensitive (`"Mail"`, `"mail"` and `"MAIL"` are one listener).
//! - Unknown name → `Ok(None)`, a quiet sentinel.
//! - Known name, rejected arguments → `Err(ListenerError)`, never swallowed.
//!
//! ## Built-in listeners
//! | name   | arguments                    | listener                               |
//! |--------|------------------------------|----------------------------------------|
//! | `log`  | `[level?]`                   | [`LogListener`](super::LogListener)    |
//! | `mail` | `[to, relay?, from?]`        | [`MailListener`](super::MailListener) over SMTP (`mail` feature) |

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::observer::ObserverRef;
use crate::error::ListenerError;

/// One constructor-style argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerArg {
    /// Text argument.
    Str(String),
    /// Integer argument.
    Int(i64),
}

impl ListenerArg {
    /// Returns the text value, if this is a [`ListenerArg::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ListenerArg::Str(s) => Some(s),
            ListenerArg::Int(_) => None,
        }
    }
}

impl fmt::Display for ListenerArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerArg::Str(s) => write!(f, "{s:?}"),
            ListenerArg::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for ListenerArg {
    fn from(value: &str) -> Self {
        ListenerArg::Str(value.to_string())
    }
}

impl From<String> for ListenerArg {
    fn from(value: String) -> Self {
        ListenerArg::Str(value)
    }
}

impl From<i64> for ListenerArg {
    fn from(value: i64) -> Self {
        ListenerArg::Int(value)
    }
}

/// Reads an optional text argument at `index`.
///
/// A present argument of another kind is an [`ListenerError::InvalidArgument`].
pub fn str_arg<'a>(args: &'a [ListenerArg], index: usize, what: &str) -> Result<Option<&'a str>, ListenerError> {
    match args.get(index) {
        None => Ok(None),
        Some(arg) => arg
            .as_str()
            .map(Some)
            .ok_or_else(|| ListenerError::invalid_argument(format!("{what} must be a string, got {arg}"))),
    }
}

/// Constructor registered under a listener name.
pub type Constructor = Arc<dyn Fn(&[ListenerArg]) -> Result<ObserverRef, ListenerError> + Send + Sync>;

/// Name → constructor table.
#[derive(Clone, Default)]
pub struct ListenerFactory {
    constructors: BTreeMap<String, Constructor>,
}

impl ListenerFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory with the built-in listeners registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        factory.register("log", |args| {
            let listener = super::LogListener::from_args(args)?;
            Ok(Arc::new(listener) as ObserverRef)
        });

        #[cfg(feature = "mail")]
        factory.register("mail", |args| {
            let listener = super::mail::smtp_listener_from_args(args)?;
            Ok(Arc::new(listener) as ObserverRef)
        });

        factory
    }

    /// Registers (or replaces) the constructor for `name`.
    pub fn register<F>(&mut self, name: &str, ctor: F) -> &mut Self
    where
        F: Fn(&[ListenerArg]) -> Result<ObserverRef, ListenerError> + Send + Sync + 'static,
    {
        self.constructors.insert(Self::normalize(name), Arc::new(ctor));
        self
    }

    /// Resolves `name` and constructs the listener with `args`.
    ///
    /// Returns `Ok(None)` when no listener is registered under `name`.
    pub fn create(&self, name: &str, args: &[ListenerArg]) -> Result<Option<ObserverRef>, ListenerError> {
        match self.constructors.get(&Self::normalize(name)) {
            Some(ctor) => ctor(args).map(Some),
            None => Ok(None),
        }
    }

    /// True if a listener is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(&Self::normalize(name))
    }

    /// Registered names, normalized, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub(crate) fn normalize(name: &str) -> String {
        name.to_ascii_lowercase()
    }
}

impl fmt::Debug for ListenerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerFactory")
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
