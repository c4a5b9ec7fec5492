//! Ordered, named steps grouped into lifecycle phases.
//!
//! A [`Service`](crate::service::Service) owns the registry every request
//! starts from. Each [`Request`] clones it at construction, so steps added to
//! or removed from one request never show up in another. Cloning duplicates
//! the lists only; the step functions themselves are shared behind `Arc`.

use crate::request::Request;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// Signature of a step: inspects and mutates the request in place.
pub type HandlerFn = dyn Fn(&mut Request) + Send + Sync;

/// A step with a name, so it can be located and removed later.
#[derive(Clone)]
pub struct NamedHandler {
    /// Identifier used by [`HandlerList::remove`]
    pub name: String,
    /// The step itself
    pub func: Arc<HandlerFn>,
}

impl NamedHandler {
    /// Wrap a closure as a named step.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for NamedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedHandler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Steps of one phase, run in order.
#[derive(Debug, Clone, Default)]
pub struct HandlerList {
    list: SmallVec<[NamedHandler; 4]>,
}

impl HandlerList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn push_back<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        self.list.push(NamedHandler::new(name, func));
    }

    /// Prepend a step.
    pub fn push_front<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        self.list.insert(0, NamedHandler::new(name, func));
    }

    /// Append an existing step.
    pub fn push_back_named(&mut self, handler: NamedHandler) {
        self.list.push(handler);
    }

    /// Prepend an existing step.
    pub fn push_front_named(&mut self, handler: NamedHandler) {
        self.list.insert(0, handler);
    }

    /// Remove every step called `name`. Returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.list.len();
        self.list.retain(|handler| handler.name != name);
        before - self.list.len()
    }

    /// Remove all steps.
    pub fn clear(&mut self) {
        self.list.clear();
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns true if there are no steps
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Step names, in execution order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.list.iter().map(|handler| handler.name.as_str()).collect()
    }

    /// Run every step in order.
    ///
    /// Steps are not skipped when an earlier one records an error; each step
    /// decides for itself whether `request.error` matters to it.
    pub fn run(&self, request: &mut Request) {
        for handler in &self.list {
            tracing::trace!(handler = %handler.name, "Running handler");
            (handler.func)(request);
        }
    }
}

/// The named stages of a request's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Check input parameters
    Validate,
    /// Assemble the outgoing message
    Build,
    /// Sign the outgoing message
    Sign,
    /// Perform the transport exchange
    Send,
    /// Turn failing responses into errors
    ValidateResponse,
    /// Decide whether a failed attempt is retried
    Retry,
    /// Bookkeeping after the retry decision
    AfterRetry,
    /// Decode a successful response into Data
    Unmarshal,
    /// Capture response metadata
    UnmarshalMeta,
    /// Decode a failing response into a structured error
    UnmarshalError,
}

impl Phase {
    /// All phases, in declaration order
    pub const ALL: [Self; 10] = [
        Self::Validate,
        Self::Build,
        Self::Sign,
        Self::Send,
        Self::ValidateResponse,
        Self::Retry,
        Self::AfterRetry,
        Self::Unmarshal,
        Self::UnmarshalMeta,
        Self::UnmarshalError,
    ];

    /// Phase name as used in logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Validate => "Validate",
            Self::Build => "Build",
            Self::Sign => "Sign",
            Self::Send => "Send",
            Self::ValidateResponse => "ValidateResponse",
            Self::Retry => "Retry",
            Self::AfterRetry => "AfterRetry",
            Self::Unmarshal => "Unmarshal",
            Self::UnmarshalMeta => "UnmarshalMeta",
            Self::UnmarshalError => "UnmarshalError",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One [`HandlerList`] per phase.
#[derive(Debug, Clone, Default)]
pub struct Handlers {
    /// Validate phase
    pub validate: HandlerList,
    /// Build phase
    pub build: HandlerList,
    /// Sign phase
    pub sign: HandlerList,
    /// Send phase
    pub send: HandlerList,
    /// ValidateResponse phase
    pub validate_response: HandlerList,
    /// Retry phase
    pub retry: HandlerList,
    /// AfterRetry phase
    pub after_retry: HandlerList,
    /// Unmarshal phase
    pub unmarshal: HandlerList,
    /// UnmarshalMeta phase
    pub unmarshal_meta: HandlerList,
    /// UnmarshalError phase
    pub unmarshal_error: HandlerList,
}

impl Handlers {
    /// Create a registry with every phase empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps of `phase`
    #[must_use]
    pub const fn phase(&self, phase: Phase) -> &HandlerList {
        match phase {
            Phase::Validate => &self.validate,
            Phase::Build => &self.build,
            Phase::Sign => &self.sign,
            Phase::Send => &self.send,
            Phase::ValidateResponse => &self.validate_response,
            Phase::Retry => &self.retry,
            Phase::AfterRetry => &self.after_retry,
            Phase::Unmarshal => &self.unmarshal,
            Phase::UnmarshalMeta => &self.unmarshal_meta,
            Phase::UnmarshalError => &self.unmarshal_error,
        }
    }

    /// Mutable steps of `phase`
    pub fn phase_mut(&mut self, phase: Phase) -> &mut HandlerList {
        match phase {
            Phase::Validate => &mut self.validate,
            Phase::Build => &mut self.build,
            Phase::Sign => &mut self.sign,
            Phase::Send => &mut self.send,
            Phase::ValidateResponse => &mut self.validate_response,
            Phase::Retry => &mut self.retry,
            Phase::AfterRetry => &mut self.after_retry,
            Phase::Unmarshal => &mut self.unmarshal,
            Phase::UnmarshalMeta => &mut self.unmarshal_meta,
            Phase::UnmarshalError => &mut self.unmarshal_error,
        }
    }

    /// Empty every phase.
    pub fn clear(&mut self) {
        for phase in Phase::ALL {
            self.phase_mut(phase).clear();
        }
    }
}
