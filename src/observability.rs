use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("griseo.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("griseo.client.request_errors");

pub(crate) static RETRY_ATTEMPTS: Counter = Counter::new("griseo.retry.attempts");
pub(crate) static RETRY_RATE_LIMITED: Counter = Counter::new("griseo.retry.rate_limited");
pub(crate) static RETRY_BACKOFF: Moments = Moments::new("griseo.retry.backoff_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("griseo.stream.chunks");
pub(crate) static STREAM_BYTES: Counter = Counter::new("griseo.stream.bytes");
pub(crate) static STREAM_DURATION: Moments = Moments::new("griseo.stream.duration_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("griseo.session.turns");
pub(crate) static SESSION_FAILURES: Counter = Counter::new("griseo.session.failures");
pub(crate) static SESSION_INTERRUPTS: Counter = Counter::new("griseo.session.interrupts");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&RETRY_ATTEMPTS);
    collector.register_counter(&RETRY_RATE_LIMITED);
    collector.register_moments(&RETRY_BACKOFF);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_FAILURES);
    collector.register_counter(&SESSION_INTERRUPTS);
}
