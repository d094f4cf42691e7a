//! Event types for the ESG selection bus
//!
//! Provides the closed event vocabulary shared by every surface and the
//! `SelectionBus` that carries it.

// Sub-modules (supporting types)
mod report_types;
mod selection_types;

pub use report_types::{
    Category, CategoryScore, EntityScore, MatchKind, OverallScores, Priority, Recommendation,
    Report, ResolvedIndicatorInfo, ScoreValue, SourceMeta,
};
pub use selection_types::{AnalysisMode, AnalysisTypeInfo, Selection, SelectionState};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::broadcast;

/// Bus topic
///
/// Every `BusEvent` belongs to exactly one topic; handlers subscribe per topic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    ParametersChanged,
    EntitiesChanged,
    AnalysisTypeChanged,
    FetchProgress,
    ReportReady,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::ParametersChanged,
        Topic::EntitiesChanged,
        Topic::AnalysisTypeChanged,
        Topic::FetchProgress,
        Topic::ReportReady,
    ];

    /// Topic name as used on the wire (SSE `event:` field)
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::ParametersChanged => "parameters-changed",
            Topic::EntitiesChanged => "entities-changed",
            Topic::AnalysisTypeChanged => "analysis-type-changed",
            Topic::FetchProgress => "fetch-progress",
            Topic::ReportReady => "report-ready",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events carried on the selection bus
///
/// Selection events carry the full snapshot taken right after the mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BusEvent {
    /// Parameter set changed
    ///
    /// Produced by: parameter picker (via the selection store)
    /// Consumed by: dashboard, SSE clients
    ParametersChanged {
        selection: Arc<SelectionState>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Entity set changed
    ///
    /// Produced by: map (via the selection store)
    EntitiesChanged {
        selection: Arc<SelectionState>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Analysis mode changed
    ///
    /// Produced by: analysis-type picker (via the selection store)
    AnalysisTypeChanged {
        selection: Arc<SelectionState>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// One external request of a fetch cycle settled
    ///
    /// `completed` never decreases within a cycle and equals `total` only once
    /// every request has settled.
    FetchProgress {
        cycle_id: u64,
        completed: usize,
        total: usize,
    },

    /// A fetch cycle produced its report
    ReportReady { report: Arc<Report> },
}

impl BusEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BusEvent::ParametersChanged { .. } => Topic::ParametersChanged,
            BusEvent::EntitiesChanged { .. } => Topic::EntitiesChanged,
            BusEvent::AnalysisTypeChanged { .. } => Topic::AnalysisTypeChanged,
            BusEvent::FetchProgress { .. } => Topic::FetchProgress,
            BusEvent::ReportReady { .. } => Topic::ReportReady,
        }
    }

    /// Selection snapshot carried by selection events
    pub fn selection(&self) -> Option<&Arc<SelectionState>> {
        match self {
            BusEvent::ParametersChanged { selection, .. }
            | BusEvent::EntitiesChanged { selection, .. }
            | BusEvent::AnalysisTypeChanged { selection, .. } => Some(selection),
            _ => None,
        }
    }
}

/// Completion percentage of a fetch cycle; an empty cycle counts as complete
pub fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed.min(total) * 100) / total) as u8
}

// ========================================
// SelectionBus Implementation
// ========================================

type Handler = Arc<dyn Fn(&BusEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<Topic, Vec<(u64, Handler)>>,
}

struct BusInner {
    registry: Mutex<Registry>,
    tx: broadcast::Sender<BusEvent>,
    capacity: usize,
}

impl BusInner {
    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, topic: Topic, id: u64) {
        let mut registry = self.registry();
        if let Some(handlers) = registry.handlers.get_mut(&topic) {
            handlers.retain(|(handler_id, _)| *handler_id != id);
        }
    }
}

/// Topic-keyed publish/subscribe channel shared by all surfaces
///
/// Two kinds of consumers:
/// - Synchronous handlers registered per topic with [`SelectionBus::subscribe`].
///   `publish` invokes them before returning, in subscription order. Handlers run
///   outside the registry lock, so they may publish or (un)subscribe themselves.
/// - Async receivers from [`SelectionBus::stream`], fed through a bounded
///   `tokio::sync::broadcast` channel. Slow receivers lag and drop old events;
///   producers never block.
///
/// Cloning the bus yields another handle to the same channel.
///
/// # Examples
///
/// ```
/// use esg_common::events::{BusEvent, SelectionBus, Topic};
///
/// let bus = SelectionBus::new(100);
/// let subscription = bus.subscribe(Topic::FetchProgress, |event| {
///     if let BusEvent::FetchProgress { completed, total, .. } = event {
///         println!("{}/{}", completed, total);
///     }
/// });
///
/// bus.publish(BusEvent::FetchProgress { cycle_id: 1, completed: 1, total: 4 });
/// subscription.unsubscribe();
/// ```
#[derive(Clone)]
pub struct SelectionBus {
    inner: Arc<BusInner>,
}

impl SelectionBus {
    /// Creates a new bus whose async fan-out buffers `capacity` events
    ///
    /// Recommended values:
    /// - Service: 100-1000
    /// - Testing: 10-100
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(BusInner {
                registry: Mutex::new(Registry::default()),
                tx,
                capacity,
            }),
        }
    }

    /// Register a handler for one topic
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// unsubscribed or dropped.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&BusEvent) + Send + Sync + 'static,
    {
        let mut registry = self.inner.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .handlers
            .entry(topic)
            .or_default()
            .push((id, Arc::new(handler)));

        tracing::trace!(topic = %topic, subscription_id = id, "Bus handler subscribed");

        Subscription {
            id,
            topic,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Publish an event to its topic
    ///
    /// Returns the number of synchronous handlers invoked. Async receivers are
    /// fed afterwards; having none is not an error.
    pub fn publish(&self, event: BusEvent) -> usize {
        let topic = event.topic();
        let handlers: Vec<Handler> = self
            .inner
            .registry()
            .handlers
            .get(&topic)
            .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(&event);
        }

        tracing::trace!(topic = %topic, handlers = handlers.len(), "Bus event published");

        let _ = self.inner.tx.send(event);
        handlers.len()
    }

    /// Subscribe to every future event as an async stream
    ///
    /// Events published before this call are not received.
    pub fn stream(&self) -> broadcast::Receiver<BusEvent> {
        self.inner.tx.subscribe()
    }

    /// Number of synchronous handlers registered for `topic`
    pub fn handler_count(&self, topic: Topic) -> usize {
        self.inner
            .registry()
            .handlers
            .get(&topic)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Number of live async receivers
    pub fn stream_subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }

    /// Configured async channel capacity
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

/// Handle to a registered bus handler
///
/// Dropping the handle unsubscribes the handler.
#[must_use = "dropping a Subscription unsubscribes its handler immediately"]
pub struct Subscription {
    id: u64,
    topic: Topic,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Remove the handler from the bus
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.topic, self.id);
            tracing::trace!(topic = %self.topic, subscription_id = self.id, "Bus handler unsubscribed");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .finish()
    }
}
