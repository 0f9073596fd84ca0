//! Event batching and bulk delivery.

use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};

use beacon_config::Config;

use crate::delivery::{DeliveryClient, ServiceError};
use crate::event::Event;

/// Callback receiving delivery errors for batched events.
///
/// Batched delivery is fire-and-forget for the producer, so this handler is
/// the only place such failures become observable.
pub type DeliveryErrorHandler = Box<dyn Fn(&ServiceError) + Send + Sync>;

/// Shared batch state guarded by the batcher's mutex.
#[derive(Debug)]
struct Batch {
    events: Vec<Event>,
    last_dispatch: Instant,
}

/// Accumulates accepted events and delivers them in bulk.
///
/// Producer threads append events; a flush is triggered when the batch
/// reaches the configured threshold or when the configured interval has
/// elapsed since the last dispatch. Delivery is best effort: a failed batch
/// is dropped after its single delivery attempt and the error is handed to
/// the configured handler.
pub struct EventBatcher {
    batch: Mutex<Batch>,
    /// Serializes deliveries so only one is in flight per batcher.
    delivery: Mutex<()>,
    client: Arc<DeliveryClient>,
    bulk_threshold: usize,
    dispatch_interval: Duration,
    on_error: Option<DeliveryErrorHandler>,
}

impl EventBatcher {
    /// Creates a batcher flushing through the given delivery client.
    pub fn new(
        config: &Config,
        client: Arc<DeliveryClient>,
        on_error: Option<DeliveryErrorHandler>,
    ) -> Self {
        Self {
            batch: Mutex::new(Batch {
                events: Vec::new(),
                last_dispatch: Instant::now(),
            }),
            delivery: Mutex::new(()),
            client,
            bulk_threshold: config.bulk_threshold().max(1),
            dispatch_interval: config.dispatch_interval(),
            on_error,
        }
    }

    /// Appends an event, flushing if either trigger fires.
    ///
    /// The append and the trigger check happen under one lock, so the
    /// count-based trigger fires exactly when the batch reaches the
    /// threshold.
    pub fn add_event(&self, event: Event) {
        let trigger = {
            let mut batch = self.batch.lock();
            batch.events.push(event);
            batch.events.len() >= self.bulk_threshold
                || batch.last_dispatch.elapsed() >= self.dispatch_interval
        };

        if trigger {
            self.try_flush();
        }
    }

    /// Returns `true` if events are waiting for delivery.
    pub fn has_events(&self) -> bool {
        !self.batch.lock().events.is_empty()
    }

    /// Unconditionally delivers all pending events.
    ///
    /// Blocks until any delivery already in flight has finished, then
    /// performs its own. A no-op when the batch is empty.
    pub fn flush_events(&self) {
        let guard = self.delivery.lock();
        self.deliver(guard);
    }

    /// Flushes unless a delivery is already in flight.
    ///
    /// A flush in progress is never re-entered; events accumulating
    /// meanwhile are picked up by the next trigger.
    fn try_flush(&self) {
        if let Some(guard) = self.delivery.try_lock() {
            self.deliver(guard);
        }
    }

    /// Delivers the current batch while holding the delivery guard.
    ///
    /// The batch is taken out under its own lock and cleared in the same
    /// step, so producers keep appending to a fresh batch while the network
    /// call runs.
    fn deliver(&self, _guard: MutexGuard<'_, ()>) {
        let events = {
            let mut batch = self.batch.lock();
            if batch.events.is_empty() {
                return;
            }
            batch.last_dispatch = Instant::now();
            mem::take(&mut batch.events)
        };

        match self.client.send_events(&events) {
            Ok(()) => beacon_log::debug!("delivered {} batched events", events.len()),
            Err(error) => {
                beacon_log::error!(
                    "dropping {} batched events: {}",
                    events.len(),
                    beacon_log::LogError(&error)
                );
                if let Some(on_error) = &self.on_error {
                    on_error(&error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use serde_json::json;
    use similar_asserts::assert_eq;

    use crate::testutils::{test_config, MockTransport};
    use crate::transport::{Response, StatusCode};

    use super::*;

    fn batcher_with(
        mock: &MockTransport,
        events_config: serde_json::Value,
        on_error: Option<DeliveryErrorHandler>,
    ) -> EventBatcher {
        let config = test_config(json!({"events": events_config}));
        let client = Arc::new(
            DeliveryClient::new(&config, Box::new(mock.clone())).unwrap(),
        );
        EventBatcher::new(&config, client, on_error)
    }

    fn event(value: serde_json::Value) -> Event {
        Event::from(value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_count_trigger_fires_exactly_at_threshold() {
        beacon_log::init_test!();

        let mock = MockTransport::new();
        // A large interval keeps the time trigger out of the way.
        let batcher = batcher_with(
            &mock,
            json!({"enabled": true, "bulk_threshold": 5, "dispatch_interval_ms": 60_000}),
            None,
        );

        for i in 0..4 {
            batcher.add_event(event(json!({"n": i})));
            assert_eq!(mock.request_count(), 0, "flushed before the threshold");
        }

        batcher.add_event(event(json!({"n": 4})));
        assert_eq!(mock.request_count(), 1);
        assert!(!batcher.has_events());

        let body: serde_json::Value =
            serde_json::from_slice(mock.requests()[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body.as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_time_trigger() {
        let mock = MockTransport::new();
        // A zero interval makes every append exceed the elapsed-time check.
        let batcher = batcher_with(
            &mock,
            json!({"enabled": true, "bulk_threshold": 1000, "dispatch_interval_ms": 0}),
            None,
        );

        batcher.add_event(event(json!({"n": 0})));
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_batch_preserves_order() {
        let mock = MockTransport::new();
        let batcher = batcher_with(
            &mock,
            json!({"enabled": true, "bulk_threshold": 1000, "dispatch_interval_ms": 60_000}),
            None,
        );

        for i in 0..10 {
            batcher.add_event(event(json!({"n": i})));
        }
        batcher.flush_events();

        let body: serde_json::Value =
            serde_json::from_slice(mock.requests()[0].body.as_ref().unwrap()).unwrap();
        let order: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|event| event["n"].as_i64().unwrap())
            .collect();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_flush_on_empty_batch_is_noop() {
        let mock = MockTransport::new();
        let batcher = batcher_with(
            &mock,
            json!({"enabled": true, "bulk_threshold": 1000, "dispatch_interval_ms": 60_000}),
            None,
        );

        assert!(!batcher.has_events());
        batcher.flush_events();
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_failed_delivery_drops_batch_and_reports() {
        let failures = Arc::new(AtomicUsize::new(0));
        let failures_clone = Arc::clone(&failures);

        let mock = MockTransport::new();
        mock.respond_with(Response {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Vec::new(),
        });
        let batcher = batcher_with(
            &mock,
            json!({"enabled": true, "bulk_threshold": 1000, "dispatch_interval_ms": 60_000}),
            Some(Box::new(move |error| {
                assert!(matches!(error, ServiceError::Server(_)));
                failures_clone.fetch_add(1, Ordering::SeqCst);
            })),
        );

        batcher.add_event(event(json!({"n": 0})));
        batcher.flush_events();

        assert_eq!(failures.load(Ordering::SeqCst), 1);
        // The failed batch is dropped, not requeued.
        assert!(!batcher.has_events());
        batcher.flush_events();
        assert_eq!(mock.request_count(), 1);
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        let mock = MockTransport::new();
        let batcher = Arc::new(batcher_with(
            &mock,
            json!({"enabled": true, "bulk_threshold": 100_000, "dispatch_interval_ms": 60_000}),
            None,
        ));

        let producers: usize = 8;
        let per_producer: usize = 25;

        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let batcher = Arc::clone(&batcher);
                thread::spawn(move || {
                    for i in 0..per_producer {
                        batcher.add_event(event(json!({"producer": p, "n": i})));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        batcher.flush_events();

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);

        let body: serde_json::Value =
            serde_json::from_slice(requests[0].body.as_ref().unwrap()).unwrap();
        let delivered = body.as_array().unwrap();
        assert_eq!(delivered.len(), producers * per_producer);

        // No duplicates: every (producer, n) pair appears exactly once.
        let mut seen: Vec<(i64, i64)> = delivered
            .iter()
            .map(|event| (event["producer"].as_i64().unwrap(), event["n"].as_i64().unwrap()))
            .collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), producers * per_producer);
    }

    #[test]
    fn test_zero_threshold_behaves_like_one() {
        let mock = MockTransport::new();
        let batcher = batcher_with(
            &mock,
            json!({"enabled": true, "bulk_threshold": 0, "dispatch_interval_ms": 60_000}),
            None,
        );

        batcher.add_event(event(json!({"n": 0})));
        assert_eq!(mock.request_count(), 1);
    }
}
