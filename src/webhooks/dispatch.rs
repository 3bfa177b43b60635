use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::error::WebhookError;
use super::event::{WebhookEvent, WebhookEventKind};

/// Trait for handling verified webhook events
///
/// Handlers may do I/O. The dispatcher awaits each one before starting the
/// next and before the delivery is answered.
///
/// # Example
///
/// ```rust,ignore
/// use vortex_axum::webhooks::{WebhookEvent, WebhookHandler};
///
/// struct RecordAcceptance {
///     db: DatabaseConnection,
/// }
///
/// #[async_trait]
/// impl WebhookHandler for RecordAcceptance {
///     async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<()> {
///         let invitation_id = event.data["invitationId"].as_str().unwrap_or_default();
///         self.db.mark_accepted(invitation_id).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<()>;
}

/// Adapter that turns an async closure into a [`WebhookHandler`].
///
/// The closure receives its own copy of the event.
pub struct FnHandler<F>(F);

/// Wrap an async closure as a handler.
///
/// ```rust,ignore
/// let audit = handler_fn(|event: WebhookEvent| async move {
///     tracing::info!(event_id = %event.id, "received");
///     Ok(())
/// });
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(WebhookEvent) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> WebhookHandler for FnHandler<F>
where
    F: Fn(WebhookEvent) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<()> {
        (self.0)(event.clone()).await
    }
}

/// Notification sink for failed deliveries.
///
/// Called for signature, payload and handler failures. It cannot change the
/// response and its own failures are not handled: a panic here propagates like
/// any other bug in caller code.
#[async_trait]
pub trait WebhookErrorHook: Send + Sync {
    async fn on_error(&self, error: &WebhookError);
}

/// Adapter that turns a plain closure into a [`WebhookErrorHook`].
pub struct FnErrorHook<F>(F);

pub fn error_hook_fn<F>(f: F) -> FnErrorHook<F>
where
    F: Fn(&WebhookError) + Send + Sync,
{
    FnErrorHook(f)
}

#[async_trait]
impl<F> WebhookErrorHook for FnErrorHook<F>
where
    F: Fn(&WebhookError) + Send + Sync,
{
    async fn on_error(&self, error: &WebhookError) {
        (self.0)(error)
    }
}

/// Caller-supplied handlers, fixed once built.
///
/// Holds at most one generic handler, at most one handler per event kind, and
/// an optional error hook. Every slot is optional.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    any: Option<Arc<dyn WebhookHandler>>,
    by_kind: HashMap<WebhookEventKind, Arc<dyn WebhookHandler>>,
    error_hook: Option<Arc<dyn WebhookErrorHook>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handler that sees every event before any type-specific one.
    pub fn with_any(mut self, handler: impl WebhookHandler + 'static) -> Self {
        self.any = Some(Arc::new(handler));
        self
    }

    /// Set the handler for one event kind, replacing any earlier one.
    pub fn with_handler(
        mut self,
        kind: impl Into<WebhookEventKind>,
        handler: impl WebhookHandler + 'static,
    ) -> Self {
        let kind = kind.into();
        if self.by_kind.insert(kind.clone(), Arc::new(handler)).is_some() {
            tracing::warn!(
                target: "vortex::webhooks",
                event_type = %kind,
                "Replacing previously registered webhook handler"
            );
        }
        self
    }

    pub fn with_error_hook(mut self, hook: impl WebhookErrorHook + 'static) -> Self {
        self.error_hook = Some(Arc::new(hook));
        self
    }

    pub fn has_handler(&self, kind: &WebhookEventKind) -> bool {
        self.by_kind.contains_key(kind)
    }

    /// Run the generic handler, then the handler for the event's kind.
    ///
    /// Handlers run one after another on the caller's task. The first failure
    /// stops dispatch. An event kind without a handler succeeds untouched.
    pub async fn dispatch(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        let handler_failed = |source: anyhow::Error| WebhookError::HandlerFailed {
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            source,
        };

        if let Some(any) = &self.any {
            any.handle(event).await.map_err(handler_failed)?;
        }

        match self.by_kind.get(&event.kind()) {
            Some(handler) => handler.handle(event).await.map_err(handler_failed)?,
            None => {
                tracing::debug!(
                    target: "vortex::webhooks",
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "No handler registered for webhook event type"
                );
            }
        }

        Ok(())
    }

    /// Tell the error hook about a failed delivery, if one is registered.
    pub async fn notify_error(&self, error: &WebhookError) {
        if let Some(hook) = &self.error_hook {
            hook.on_error(error).await;
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("any", &self.any.is_some())
            .field("by_kind", &self.by_kind.keys().collect::<Vec<_>>())
            .field("error_hook", &self.error_hook.is_some())
            .finish()
    }
}
