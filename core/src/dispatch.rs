//! Authorized request dispatch over an injected transport.
//!
//! # Design
//! `Dispatcher::send` runs the authorizer synchronously. A request that needs
//! a refresh never reaches the transport. Otherwise the transport runs on a
//! tokio task and its outcome is relayed through a `DispatchHandle` as zero or
//! more `Progress` events followed by exactly one terminal event.
//!
//! The transport only borrows its `ProgressSink` for the duration of
//! `execute`, so it cannot report progress after the terminal outcome.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::authorizer::{Authorization, Authorizer};
use crate::error::{DispatchError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::request::ApiRequest;
use crate::storage::KeyValueStore;

/// Transfer progress reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed_bytes: u64,
    /// `None` when the transport does not know the total size.
    pub total_bytes: Option<u64>,
}

impl Progress {
    /// Completed share in `0.0..=1.0`, when the total is known and non-zero.
    pub fn fraction(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) | None => None,
            Some(total) => Some((self.completed_bytes as f64 / total as f64).min(1.0)),
        }
    }
}

/// One observable outcome of a dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Progress(Progress),
    Completed(HttpResponse),
    Failed(TransportError),
}

impl DispatchEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DispatchEvent::Progress(_))
    }
}

/// Where a transport reports progress while executing a request.
#[derive(Debug)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<DispatchEvent>,
}

impl ProgressSink {
    /// A sink whose reports go nowhere, for driving a transport directly.
    pub fn discard() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    pub fn report(&mut self, progress: Progress) {
        // The receiver may be gone if the caller dropped or cancelled the handle.
        let _ = self.tx.send(DispatchEvent::Progress(progress));
    }
}

/// The HTTP capability the host provides.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        request: HttpRequest,
        progress: &mut ProgressSink,
    ) -> Result<HttpResponse, TransportError>;
}

/// Result of `Dispatcher::send`.
#[derive(Debug)]
pub enum Dispatch {
    /// The session is expired; nothing was sent.
    RefreshRequired,
    Started(DispatchHandle),
}

impl Dispatch {
    pub fn is_refresh_required(&self) -> bool {
        matches!(self, Dispatch::RefreshRequired)
    }

    pub fn into_handle(self) -> Option<DispatchHandle> {
        match self {
            Dispatch::Started(handle) => Some(handle),
            Dispatch::RefreshRequired => None,
        }
    }
}

/// Authorizes requests and hands approved ones to the transport.
pub struct Dispatcher<S, T> {
    authorizer: Authorizer<S>,
    transport: Arc<T>,
}

impl<S: KeyValueStore, T: Transport + 'static> Dispatcher<S, T> {
    pub fn new(authorizer: Authorizer<S>, transport: Arc<T>) -> Self {
        Self {
            authorizer,
            transport,
        }
    }

    pub fn authorizer(&self) -> &Authorizer<S> {
        &self.authorizer
    }

    /// Authorize `request` and, if allowed, start it on the current tokio
    /// runtime.
    ///
    /// # Errors
    /// `DispatchError::NoRuntime` when called outside a tokio runtime. The
    /// authorization decision is made first, so an expired session still
    /// reports `RefreshRequired`.
    pub fn send(&self, request: ApiRequest) -> Result<Dispatch, DispatchError> {
        let http = match self.authorizer.authorize(request) {
            Authorization::RefreshRequired => return Ok(Dispatch::RefreshRequired),
            Authorization::Proceed(http) => http,
        };
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;

        let request_id = Uuid::new_v4();
        let span = info_span!("dispatch", %request_id, method = %http.method, url = %http.url);
        let (tx, events) = mpsc::unbounded_channel();
        let transport = Arc::clone(&self.transport);

        let task = runtime.spawn(
            async move {
                let mut sink = ProgressSink { tx: tx.clone() };
                let outcome = transport.execute(http, &mut sink).await;
                let event = match outcome {
                    Ok(response) => {
                        debug!(status = response.status, "request completed");
                        DispatchEvent::Completed(response)
                    }
                    Err(error) => {
                        warn!(%error, "request failed");
                        DispatchEvent::Failed(error)
                    }
                };
                let _ = tx.send(event);
            }
            .instrument(span),
        );

        Ok(Dispatch::Started(DispatchHandle {
            request_id,
            events,
            task,
            cancelled: false,
            terminated: false,
        }))
    }
}

/// Cancellable handle to one in-flight request.
///
/// Dropping the handle detaches the request; it keeps running to completion
/// and its events are discarded.
#[derive(Debug)]
pub struct DispatchHandle {
    request_id: Uuid,
    events: mpsc::UnboundedReceiver<DispatchEvent>,
    task: JoinHandle<()>,
    cancelled: bool,
    terminated: bool,
}

impl DispatchHandle {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// `true` once the terminal event has been handed out.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Next event, or `None` after the terminal one.
    pub async fn next_event(&mut self) -> Option<DispatchEvent> {
        if self.terminated {
            return None;
        }
        if self.cancelled {
            self.terminated = true;
            return Some(DispatchEvent::Failed(TransportError::Cancelled));
        }
        match self.events.recv().await {
            Some(event) => {
                self.terminated = event.is_terminal();
                Some(event)
            }
            None => {
                // Every sender is gone without a terminal event: the task
                // ended abnormally, most likely a panicking transport.
                self.terminated = true;
                let reason = match (&mut self.task).await {
                    Err(e) if e.is_panic() => format!("transport panicked: {}", panic_message(e)),
                    Err(e) => format!("dispatch task failed: {e}"),
                    Ok(()) => "dispatch ended without a response".to_string(),
                };
                warn!(request_id = %self.request_id, %reason, "dispatch ended abnormally");
                Some(DispatchEvent::Failed(TransportError::Other(reason)))
            }
        }
    }

    /// Abort the request. Buffered events are discarded and the next call to
    /// `next_event` yields `Failed(TransportError::Cancelled)`. No effect
    /// once the terminal event was delivered.
    pub fn cancel(&mut self) {
        if self.terminated || self.cancelled {
            return;
        }
        self.task.abort();
        self.events.close();
        self.cancelled = true;
        debug!(request_id = %self.request_id, "dispatch cancelled");
    }

    /// Skip progress and wait for the terminal outcome.
    pub async fn finish(mut self) -> Result<HttpResponse, DispatchError> {
        loop {
            match self.next_event().await {
                Some(DispatchEvent::Progress(_)) => continue,
                Some(DispatchEvent::Completed(response)) => return Ok(response),
                Some(DispatchEvent::Failed(error)) => return Err(error.into()),
                // `next_event` always hands out a terminal event before `None`,
                // and `finish` owns the handle from the start.
                None => {
                    return Err(TransportError::Other(
                        "dispatch ended without a response".to_string(),
                    )
                    .into())
                }
            }
        }
    }
}

fn panic_message(error: JoinError) -> String {
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
