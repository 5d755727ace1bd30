//! Consumption of one completion stream.
//!
//! A single forward pass: every text fragment is rendered the moment it
//! arrives and appended to the accumulated reply.  The pass is not
//! restartable; a failure part way through leaves already-rendered text on
//! screen and returns the error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::StreamExt;

use crate::error::{Error, Result};
use crate::observability::{STREAM_ERRORS, STREAM_EVENTS, STREAM_UNKNOWN_EVENTS};
use crate::render::{Renderer, SessionEvent};
use crate::service::{CompletionRequest, CompletionService, EventStream};
use crate::types::{MessageRole, StreamEvent};

/// How often a waiting stream checks for an interrupt.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

/// Out-of-band request to abandon the response in flight.
///
/// Cloned into a signal handler, which calls [`Interrupt::request`].  Only a
/// response that is streaming can be interrupted; the caller decides what to
/// do with a request that arrives at any other time.
#[derive(Clone, Debug, Default)]
pub struct Interrupt {
    requested: Arc<AtomicBool>,
    streaming: Arc<AtomicBool>,
}

impl Interrupt {
    /// Creates a handle with nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the response in flight to stop.
    ///
    /// Returns false when there is no response to stop, or when one was
    /// already asked to stop and has not yet done so.
    pub fn request(&self) -> bool {
        self.streaming.load(Ordering::SeqCst) && !self.requested.swap(true, Ordering::SeqCst)
    }

    /// True once an interrupt was requested for the current response.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn begin(&self) {
        self.requested.store(false, Ordering::SeqCst);
        self.streaming.store(true, Ordering::SeqCst);
    }

    fn end(&self) {
        self.streaming.store(false, Ordering::SeqCst);
    }

    async fn wait(&self) {
        while !self.is_requested() {
            tokio::time::sleep(INTERRUPT_POLL).await;
        }
    }
}

fn interrupted(received: usize) -> Error {
    STREAM_ERRORS.click();
    tracing::info!(received, "response interrupted");
    Error::streaming("response interrupted", None)
}

/// Drains `events`, rendering fragments as they arrive.
///
/// Returns the full assistant text once the stream ends.  A transport error,
/// a renderer that refuses a fragment, or an interrupt ends the pass with an
/// error.
pub async fn consume(
    mut events: EventStream,
    renderer: &mut dyn Renderer,
    interrupt: &Interrupt,
) -> Result<String> {
    let mut reply = String::new();
    loop {
        if interrupt.is_requested() {
            return Err(interrupted(reply.len()));
        }
        let next = tokio::select! {
            event = events.next() => event,
            () = interrupt.wait() => return Err(interrupted(reply.len())),
        };
        let Some(event) = next else {
            break;
        };
        STREAM_EVENTS.click();
        let event = match event {
            Ok(event) => event,
            Err(err) => {
                STREAM_ERRORS.click();
                tracing::debug!(error = %err, received = reply.len(), "stream failed");
                return Err(err);
            }
        };
        match event {
            StreamEvent::TurnStarted { role } => {
                if role != MessageRole::Assistant {
                    tracing::warn!(%role, "stream started a turn for an unexpected role");
                }
            }
            StreamEvent::TextDelta { fragment } => {
                renderer
                    .render(SessionEvent::Fragment(fragment.clone()))
                    .map_err(|err| Error::render("could not display response", Some(err)))?;
                reply.push_str(&fragment);
            }
            StreamEvent::Unknown { tag } => {
                STREAM_UNKNOWN_EVENTS.click();
                tracing::debug!(tag = %tag, "skipping stream event");
            }
        }
    }
    Ok(reply)
}

/// Opens a stream for `request` and consumes it.
///
/// `interrupt` can stop the exchange while the request is being sent or
/// while the response streams.
pub async fn send_and_consume(
    service: &dyn CompletionService,
    request: CompletionRequest,
    renderer: &mut dyn Renderer,
    interrupt: &Interrupt,
) -> Result<String> {
    interrupt.begin();
    let result = async {
        let events = tokio::select! {
            events = service.stream(request) => events?,
            () = interrupt.wait() => return Err(interrupted(0)),
        };
        consume(events, renderer, interrupt).await
    }
    .await;
    interrupt.end();
    result
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;
    use crate::render::RecordingRenderer;

    fn scripted(events: Vec<Result<StreamEvent>>) -> EventStream {
        Box::pin(stream::iter(events))
    }

    #[tokio::test]
    async fn fragments_render_in_order_and_accumulate() {
        let events = scripted(vec![
            Ok(StreamEvent::TurnStarted {
                role: MessageRole::Assistant,
            }),
            Ok(StreamEvent::text("Hel")),
            Ok(StreamEvent::unknown("ping")),
            Ok(StreamEvent::text("lo")),
            Ok(StreamEvent::unknown("message_stop")),
        ]);
        let mut renderer = RecordingRenderer::new();
        let reply = consume(events, &mut renderer, &Interrupt::new()).await.unwrap();
        assert_eq!(reply, "Hello");
        assert_eq!(renderer.fragments(), vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn empty_stream_is_empty_reply() {
        let mut renderer = RecordingRenderer::new();
        let reply = consume(scripted(vec![]), &mut renderer, &Interrupt::new()).await.unwrap();
        assert_eq!(reply, "");
        assert!(renderer.events().is_empty());
    }

    #[tokio::test]
    async fn unexpected_role_is_tolerated() {
        let events = scripted(vec![
            Ok(StreamEvent::TurnStarted {
                role: MessageRole::User,
            }),
            Ok(StreamEvent::text("x")),
        ]);
        let mut renderer = RecordingRenderer::new();
        assert_eq!(consume(events, &mut renderer, &Interrupt::new()).await.unwrap(), "x");
    }

    #[tokio::test]
    async fn transport_error_keeps_rendered_text() {
        let events = scripted(vec![
            Ok(StreamEvent::text("partial")),
            Err(Error::streaming("connection reset", None)),
            Ok(StreamEvent::text("never")),
        ]);
        let mut renderer = RecordingRenderer::new();
        let err = consume(events, &mut renderer, &Interrupt::new()).await.unwrap_err();
        assert!(matches!(err, Error::Streaming { .. }));
        assert_eq!(renderer.text(), "partial");
    }

    #[tokio::test]
    async fn renderer_failure_aborts() {
        let events = scripted(vec![
            Ok(StreamEvent::text("one")),
            Ok(StreamEvent::text("two")),
        ]);
        let mut renderer = RecordingRenderer::failing_after(1);
        let err = consume(events, &mut renderer, &Interrupt::new()).await.unwrap_err();
        assert!(err.is_render());
        assert_eq!(renderer.text(), "one");
    }

    #[test]
    fn interrupt_needs_a_response_in_flight() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.request());
        assert!(!interrupt.is_requested());

        interrupt.begin();
        assert!(interrupt.request());
        assert!(!interrupt.request());
        interrupt.end();
        assert!(!interrupt.request());
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_stops_a_silent_stream() {
        let interrupt = Interrupt::new();
        interrupt.begin();
        let events: EventStream = Box::pin(
            stream::iter(vec![Ok(StreamEvent::text("partial"))]).chain(stream::pending()),
        );
        let trigger = interrupt.clone();
        let signal = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.request()
        });

        let mut renderer = RecordingRenderer::new();
        let err = consume(events, &mut renderer, &interrupt).await.unwrap_err();
        assert!(matches!(err, Error::Streaming { .. }));
        assert!(signal.await.unwrap());
        assert_eq!(renderer.text(), "partial");
    }
}
