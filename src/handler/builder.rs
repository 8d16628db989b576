use crate::listeners::{ListenerFactory, ObserverRef};

use super::{config::DispatcherPolicy, dispatcher::ErrorHandler, observers::ObserverSet, shared::SharedHandler};

/// Builder for constructing an [`ErrorHandler`] with optional pieces.
pub struct ErrorHandlerBuilder {
    policy: DispatcherPolicy,
    factory: Option<ListenerFactory>,
    observers: Vec<ObserverRef>,
}

impl ErrorHandlerBuilder {
    /// Creates a new builder with the default policy.
    pub fn new() -> Self {
        Self {
            policy: DispatcherPolicy::default(),
            factory: None,
            observers: Vec::new(),
        }
    }

    /// Sets the dispatcher policy.
    pub fn with_policy(mut self, policy: DispatcherPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the listener factory.
    ///
    /// Without this call the handler uses [`ListenerFactory::with_builtins`].
    pub fn with_factory(mut self, factory: ListenerFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Sets the observers attached from the start.
    ///
    /// Duplicate handles are attached once.
    pub fn with_observers(mut self, observers: Vec<ObserverRef>) -> Self {
        self.observers = observers;
        self
    }

    /// Builds the handler.
    pub fn build(self) -> ErrorHandler {
        let mut set = ObserverSet::new();
        for observer in self.observers {
            set.insert(observer);
        }
        let factory = self.factory.unwrap_or_else(ListenerFactory::with_builtins);
        ErrorHandler::from_parts(self.policy, factory, set)
    }

    /// Builds the handler behind a [`SharedHandler`], ready to be started.
    pub fn build_shared(self) -> SharedHandler {
        SharedHandler::new(self.build())
    }
}

impl Default for ErrorHandlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
