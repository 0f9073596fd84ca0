//! The client facade.

use std::error::Error;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use beacon_config::{Config, ConfigError};

use crate::batcher::{DeliveryErrorHandler, EventBatcher};
use crate::breadcrumbs::{Breadcrumb, EvictingQueue};
use crate::delivery::{DeliveryClient, NoticeId, ServiceError};
use crate::event::Event;
use crate::filter::{FilterChain, Verdict};
use crate::notice::{BreadcrumbTrail, Notice, RequestInfo};
use crate::sampling;
use crate::transport::{HttpError, HttpTransport, Transport};

/// Error raised when a [`Client`] cannot be constructed.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP transport could not be initialized.
    #[error("could not initialize HTTP transport")]
    Transport(#[source] HttpError),
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    config: Config,
    transport: Option<Box<dyn Transport>>,
    on_delivery_error: Option<DeliveryErrorHandler>,
}

impl ClientBuilder {
    /// Starts a builder from the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            transport: None,
            on_delivery_error: None,
        }
    }

    /// Replaces the default HTTP transport.
    pub fn transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Installs a handler receiving delivery errors for batched events.
    ///
    /// Batched delivery is fire-and-forget for producers; this handler is
    /// the only way such failures become observable.
    pub fn on_delivery_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ServiceError) + Send + Sync + 'static,
    {
        self.on_delivery_error = Some(Box::new(handler));
        self
    }

    /// Builds the client, failing fast on invalid configuration.
    ///
    /// Failures are additionally reported through
    /// [`beacon_log::ensure_error`], so they reach `stderr` when the host
    /// has not installed a logger yet.
    pub fn build(self) -> Result<Client, BuildError> {
        match self.try_build() {
            Ok(client) => Ok(client),
            Err(error) => {
                beacon_log::ensure_error(&error);
                Err(error)
            }
        }
    }

    fn try_build(self) -> Result<Client, BuildError> {
        let Self {
            config,
            transport,
            on_delivery_error,
        } = self;

        let transport = match transport {
            Some(transport) => transport,
            None => Box::new(HttpTransport::new(&config).map_err(BuildError::Transport)?),
        };

        let delivery = Arc::new(DeliveryClient::new(&config, transport)?);
        let batcher = EventBatcher::new(&config, Arc::clone(&delivery), on_delivery_error);
        let breadcrumbs = Mutex::new(EvictingQueue::new(config.max_breadcrumbs()));

        Ok(Client {
            config,
            context: Mutex::new(Map::new()),
            event_context: Mutex::new(Map::new()),
            breadcrumbs,
            before_notify: FilterChain::new(),
            before_event: FilterChain::new(),
            delivery,
            batcher,
        })
    }
}

/// The public entry point of the library.
///
/// A `Client` owns its configuration, context maps, breadcrumb trail,
/// filter chains and batcher. Host applications construct one instance and
/// share it explicitly; there is no process-global state.
///
/// # Example
///
/// ```no_run
/// use beacon::{Client, Config};
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::from_json_value(json!({
///     "api_key": "hbp_xxxxxxxx",
///     "events": {"enabled": true},
/// }))?;
///
/// let client = Client::builder(config).build()?;
/// client.event("checkout", json!({"cart_total": 42}).as_object().cloned().unwrap());
/// client.flush_events();
/// # Ok(())
/// # }
/// ```
pub struct Client {
    config: Config,
    context: Mutex<Map<String, Value>>,
    event_context: Mutex<Map<String, Value>>,
    breadcrumbs: Mutex<EvictingQueue<Breadcrumb>>,
    before_notify: FilterChain<Notice>,
    before_event: FilterChain<Event>,
    delivery: Arc<DeliveryClient>,
    batcher: EventBatcher,
}

impl Client {
    /// Starts building a client from the given configuration.
    pub fn builder(config: Config) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Reports an error as a notice, synchronously.
    ///
    /// The notice carries the error's type path as its class and its
    /// `Display` output as the message. Returns the identifier assigned by
    /// the collection service, or `Ok(None)` when the notice was suppressed:
    /// by a registered filter, by the configured exclusions, or because the
    /// error is this library's own delivery error (which is never
    /// self-reported).
    pub fn notify<E>(&self, error: &E) -> Result<Option<NoticeId>, ServiceError>
    where
        E: Error + 'static,
    {
        let dyn_error: &(dyn Error + 'static) = error;
        if dyn_error.is::<ServiceError>() {
            beacon_log::debug!("refusing to report internal delivery error");
            return Ok(None);
        }

        self.notify_notice(Notice::new(
            std::any::type_name::<E>(),
            error.to_string(),
        ))
    }

    /// Reports an error together with data about the request being handled.
    pub fn notify_with<E>(
        &self,
        error: &E,
        request: RequestInfo,
    ) -> Result<Option<NoticeId>, ServiceError>
    where
        E: Error + 'static,
    {
        let dyn_error: &(dyn Error + 'static) = error;
        if dyn_error.is::<ServiceError>() {
            beacon_log::debug!("refusing to report internal delivery error");
            return Ok(None);
        }

        self.notify_notice(
            Notice::new(std::any::type_name::<E>(), error.to_string()).with_request(request),
        )
    }

    /// Reports a prebuilt notice, synchronously.
    ///
    /// Host integrations use this entry point to attach backtraces and
    /// request data before reporting.
    pub fn notify_notice(&self, mut notice: Notice) -> Result<Option<NoticeId>, ServiceError> {
        if self
            .config
            .exclusions()
            .iter()
            .any(|class| *class == notice.error.class)
        {
            beacon_log::debug!("skipping excluded error class {}", notice.error.class);
            return Ok(None);
        }

        // Persistent context fills in under request-specific values.
        for (key, value) in self.context.lock().clone() {
            notice.request.context.entry(key).or_insert(value);
        }

        notice.server.environment_name = self.config.environment().map(str::to_owned);
        notice.server.hostname = self.config.hostname().map(str::to_owned);

        if self.config.breadcrumbs_enabled() {
            notice.breadcrumbs = BreadcrumbTrail {
                enabled: true,
                trail: self.breadcrumbs.lock().to_vec(),
            };
        }

        if self.before_notify.apply(&mut notice) == Verdict::Suppress {
            beacon_log::debug!("notice suppressed by filter");
            return Ok(None);
        }

        self.delivery.send_notice(&notice)
    }

    /// Records a telemetry event with an explicit type tag.
    ///
    /// Fire-and-forget: delivery failures are only observable through the
    /// handler installed with [`ClientBuilder::on_delivery_error`].
    pub fn event(&self, event_type: &str, payload: Map<String, Value>) {
        self.push_event(Some(event_type), payload);
    }

    /// Records a telemetry event from a bare payload, without a type tag.
    pub fn event_payload(&self, payload: Map<String, Value>) {
        self.push_event(None, payload);
    }

    fn push_event(&self, event_type: Option<&str>, payload: Map<String, Value>) {
        if !self.config.events_enabled() {
            return;
        }

        let context = self.event_context.lock().clone();
        let mut event = Event::build(event_type, &context, payload);

        if self.before_event.apply(&mut event) == Verdict::Suppress {
            beacon_log::trace!("event suppressed by filter");
            return;
        }

        // Filters may inject a per-event rate; the override key never
        // reaches the wire.
        let rate = event
            .take_sample_rate()
            .unwrap_or_else(|| self.config.sample_rate());

        if event.is_empty() {
            return;
        }

        if !sampling::is_sampled(event.stable_id(), rate) {
            return;
        }

        self.batcher.add_event(event);
    }

    /// Sends a liveness check-in ping for the given identifier.
    pub fn check_in(&self, id: &str) -> Result<(), ServiceError> {
        self.delivery.send_check_in(id)
    }

    /// Reports a free-form payload over the notice path, synchronously.
    ///
    /// The persistent notice context fills in under the payload's own keys.
    pub fn custom_notification(
        &self,
        mut payload: Map<String, Value>,
    ) -> Result<Option<NoticeId>, ServiceError> {
        for (key, value) in self.context.lock().clone() {
            payload.entry(key).or_insert(value);
        }

        self.delivery.send_custom(&payload)
    }

    /// Merges a key into the persistent notice context.
    pub fn context(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.context.lock().insert(key.into(), value.into());
        self
    }

    /// Merges a mapping into the persistent notice context.
    pub fn context_map(&self, map: Map<String, Value>) -> &Self {
        self.context.lock().extend(map);
        self
    }

    /// Empties the persistent notice context.
    pub fn reset_context(&self) -> &Self {
        self.context.lock().clear();
        self
    }

    /// Merges a key into the persistent event context.
    ///
    /// The event context is merged into every subsequent event before the
    /// event's own payload, so payload keys win on collision.
    pub fn event_context(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.event_context.lock().insert(key.into(), value.into());
        self
    }

    /// Merges a mapping into the persistent event context.
    pub fn event_context_map(&self, map: Map<String, Value>) -> &Self {
        self.event_context.lock().extend(map);
        self
    }

    /// Empties the persistent event context.
    ///
    /// Events already queued keep the context they were built with.
    pub fn clear_event_context(&self) -> &Self {
        self.event_context.lock().clear();
        self
    }

    /// Records a breadcrumb.
    ///
    /// Breadcrumbs with an empty message are silently discarded, as is
    /// everything when breadcrumb collection is disabled.
    pub fn add_breadcrumb(
        &self,
        message: impl Into<String>,
        metadata: Map<String, Value>,
        category: Option<&str>,
    ) -> &Self {
        if !self.config.breadcrumbs_enabled() {
            return self;
        }

        let message = message.into();
        if message.is_empty() {
            return self;
        }

        self.breadcrumbs
            .lock()
            .add(Breadcrumb::new(message, metadata, category));
        self
    }

    /// Registers a filter that runs before a notice is delivered.
    pub fn before_notify<F>(&self, filter: F) -> &Self
    where
        F: Fn(&mut Notice) -> Verdict + Send + Sync + 'static,
    {
        self.before_notify.register(filter);
        self
    }

    /// Registers a filter that runs before an event is queued.
    pub fn before_event<F>(&self, filter: F) -> &Self
    where
        F: Fn(&mut Event) -> Verdict + Send + Sync + 'static,
    {
        self.before_event.register(filter);
        self
    }

    /// Returns `true` if batched events are waiting for delivery.
    pub fn has_events(&self) -> bool {
        self.batcher.has_events()
    }

    /// Delivers all pending batched events.
    ///
    /// Intended for shutdown hooks; also runs when the client is dropped.
    pub fn flush_events(&self) {
        self.batcher.flush_events();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.batcher.flush_events();
    }
}
