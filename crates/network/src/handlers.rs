//! # Message Handler System
//!
//! Routing from a decoded [`MessageKind`] to its handler function.
//!
//! # Architecture
//!
//! The table is built once at startup and never changes, so sessions read
//! it without locking. Each handler receives the shared context, its own
//! session and the decoded message, and runs on the session's task: a
//! session's messages are handled strictly in arrival order.
//!
//! # Example
//!
//! ```no_run
//! use realm_network::HandlerRegistry;
//! use realm_protocol::MessageKind;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register_function(MessageKind::RefreshRequest, |_ctx, session, _message| async move {
//!     tracing::debug!("Session {} asked for a refresh", session.id());
//!     Ok(())
//! });
//! ```

use futures::future::BoxFuture;
use realm_core::Result;
use realm_protocol::{ClientMessage, MessageKind};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::context::ServerContext;
use crate::session::Session;

/// Type for message handler functions
///
/// # Type Parameters
/// - `'static` - The future owns its context and session handles
/// - `Send` - The future must be safe to send between threads
/// - `Result<()>` - An error is fatal for the session
pub type HandlerFunction =
    Arc<dyn Fn(Arc<ServerContext>, Arc<Session>, ClientMessage) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Registry of message handlers
///
/// # Purpose
/// Maps every message kind to at most one handler. Kinds without a handler
/// are logged and dropped by the session.
pub struct HandlerRegistry {
    handlers: HashMap<MessageKind, HandlerFunction>,
}

impl HandlerRegistry {
    /// Create an empty registry
    #[inline]
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Register a function-based handler
    ///
    /// # Arguments
    /// * `kind` - The message kind to handle
    /// * `handler` - Function to call for messages of this kind
    ///
    /// # Notes
    /// A second registration for the same kind replaces the first.
    pub fn register_function<F, Fut>(&mut self, kind: MessageKind, handler: F)
    where
        F: Fn(Arc<ServerContext>, Arc<Session>, ClientMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: HandlerFunction = Arc::new(move |ctx, session, message| -> BoxFuture<'static, Result<()>> {
            Box::pin(handler(ctx, session, message))
        });

        tracing::debug!("Registered handler for {:?}", kind);
        self.handlers.insert(kind, handler);
    }

    /// Look up the handler for a kind
    ///
    /// # Returns
    /// `Some(handler)` if registered, `None` otherwise
    pub fn handler(&self, kind: MessageKind) -> Option<HandlerFunction> {
        self.handlers.get(&kind).cloned()
    }

    /// Check if a handler is registered for a kind
    pub fn has_handler(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Get the number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
