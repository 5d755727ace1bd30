use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("colloquy.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("colloquy.client.request_errors");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("colloquy.stream.events");
pub(crate) static STREAM_UNKNOWN_EVENTS: Counter = Counter::new("colloquy.stream.unknown_events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("colloquy.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("colloquy.stream.bytes");
pub(crate) static STREAM_DURATION: Moments = Moments::new("colloquy.stream.duration_seconds");

pub(crate) static STORE_OPERATIONS: Counter = Counter::new("colloquy.store.operations");
pub(crate) static STORE_RETRIES: Counter = Counter::new("colloquy.store.retries");
pub(crate) static STORE_EXHAUSTED: Counter = Counter::new("colloquy.store.retries_exhausted");
pub(crate) static STORE_RETRY_BACKOFF: Moments =
    Moments::new("colloquy.store.retry_backoff_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("colloquy.session.turns");
pub(crate) static SESSION_TURN_FAILURES: Counter = Counter::new("colloquy.session.turn_failures");
pub(crate) static SESSION_MODEL_SWAPS: Counter = Counter::new("colloquy.session.model_swaps");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_UNKNOWN_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&STORE_OPERATIONS);
    collector.register_counter(&STORE_RETRIES);
    collector.register_counter(&STORE_EXHAUSTED);
    collector.register_moments(&STORE_RETRY_BACKOFF);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_TURN_FAILURES);
    collector.register_counter(&SESSION_MODEL_SWAPS);
}
