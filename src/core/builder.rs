use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Span;

use super::{
    config::Config,
    registry::Registry,
    reporter::ReporterContext,
    supervisor::Supervisor,
};
use crate::{
    events::Bus,
    populators::PopulatorRegistry,
    store::StatusClientRef,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`Supervisor`].
///
/// The node name, datastore client and populator registry are required;
/// configuration, subscribers and the tracing span are optional.
pub struct SupervisorBuilder {
    node: String,
    client: StatusClientRef,
    populators: PopulatorRegistry,
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    span: Option<Span>,
}

impl SupervisorBuilder {
    /// Creates a builder with the default [`Config`] and no subscribers.
    pub fn new(node: impl Into<String>, client: StatusClientRef, populators: PopulatorRegistry) -> Self {
        Self {
            node: node.into(),
            client,
            populators,
            cfg: Config::default(),
            subscribers: Vec::new(),
            span: None,
        }
    }

    /// Replaces the runtime configuration.
    pub fn with_config(mut self, cfg: Config) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (reporter lifecycle, cycle outcomes)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the span every log line of the supervisor and its reporters is
    /// recorded under. Defaults to `nodestatus{node = <node>}`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Builds the supervisor.
    ///
    /// Must be called from within a tokio runtime: subscriber workers and the
    /// bus listener are spawned here.
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let runtime_token = CancellationToken::new();
        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("nodestatus", node = %self.node));

        let ctx = ReporterContext {
            client: self.client,
            populators: Arc::new(self.populators),
            bus: bus.clone(),
            retry: self.cfg.retry,
            mailbox_capacity: self.cfg.mailbox_capacity_clamped(),
        };
        let registry = Registry::new(ctx, runtime_token.clone(), span.clone());

        Arc::new(Supervisor::new_internal(
            self.node,
            self.cfg,
            bus,
            subs,
            registry,
            runtime_token,
            span,
        ))
    }
}
