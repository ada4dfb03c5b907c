//! Per-location construction queues.
//!
//! Each location (a planet name, a station id) owns one FIFO queue. Only the
//! head of a queue is under construction; everything behind it waits. On
//! every tick the queues are processed concurrently, each under its own
//! lock, and finished items are handed to the completion handler once the
//! whole pass is done.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use sf_core::{BuildingKind, PlayerId, ShipKind};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::base::BaseSystem;
use crate::effect::EffectSink;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::parallel::{self, DEFAULT_WORKERS};
use crate::registry::panic_message;
use crate::sync::{SyncCounter, SyncMap};
use crate::system::System;

/// What a construction item produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "kind")]
pub enum ConstructionKind {
    /// A building on the queue's planet.
    Building(BuildingKind),
    /// A ship launched from the queue's planet.
    Ship(ShipKind),
}

impl ConstructionKind {
    /// Build time in ticks.
    pub fn build_ticks(self) -> u32 {
        match self {
            Self::Building(kind) => kind.build_ticks(),
            Self::Ship(kind) => kind.build_ticks(),
        }
    }

    /// Price in credits.
    pub fn cost(self) -> f64 {
        match self {
            Self::Building(kind) => kind.cost(),
            Self::Ship(kind) => kind.cost(),
        }
    }
}

impl fmt::Display for ConstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Building(kind) => write!(f, "{kind}"),
            Self::Ship(kind) => write!(f, "{kind}"),
        }
    }
}

/// One unit of work in a construction queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionItem {
    /// Unique identifier.
    pub id: String,
    /// What is being built.
    pub kind: ConstructionKind,
    /// Display name.
    pub name: String,
    /// The queue this item lives in.
    pub location: String,
    /// The player who ordered it.
    pub owner: PlayerId,
    /// Completion percentage, `0.0..=100.0`.
    pub progress: f64,
    /// Ticks needed from start to finish.
    pub total_ticks: u32,
    /// Ticks still to go.
    pub remaining_ticks: u32,
    /// Credits paid for the item.
    pub cost: f64,
    /// Tick on which the item was ordered.
    pub started_tick: u64,
}

impl ConstructionItem {
    /// Create an item whose duration and cost come from its kind.
    pub fn new(
        kind: ConstructionKind,
        location: impl Into<String>,
        owner: PlayerId,
        started_tick: u64,
    ) -> Self {
        let total_ticks = kind.build_ticks();
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            name: kind.to_string(),
            location: location.into(),
            owner,
            progress: 0.0,
            total_ticks,
            remaining_ticks: total_ticks,
            cost: kind.cost(),
            started_tick,
        }
    }

    /// Override the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the duration; remaining ticks restart at `total`.
    pub fn with_ticks(mut self, total: u32) -> Self {
        self.total_ticks = total;
        self.remaining_ticks = total;
        self.progress = 0.0;
        self
    }

    /// Override the remaining ticks, capped at the total.
    pub fn with_remaining(mut self, remaining: u32) -> Self {
        self.remaining_ticks = remaining.min(self.total_ticks);
        self.progress = self.progress_percent();
        self
    }

    /// `(total - remaining) / total` as a percentage; 100 for zero-length items.
    pub fn progress_percent(&self) -> f64 {
        if self.total_ticks == 0 {
            return 100.0;
        }
        let done = self.total_ticks - self.remaining_ticks.min(self.total_ticks);
        f64::from(done) / f64::from(self.total_ticks) * 100.0
    }

    /// Returns `true` once no ticks remain.
    pub fn is_complete(&self) -> bool {
        self.remaining_ticks == 0
    }
}

/// A just-finished item, delivered once to the completion handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionCompletion {
    /// The finished item, already removed from its queue.
    pub item: ConstructionItem,
    /// The queue it finished in.
    pub location: String,
    /// The player who ordered it.
    pub owner: PlayerId,
    /// The tick it finished on.
    pub tick: u64,
}

/// Callback receiving every completion.
pub type CompletionHandler = Arc<dyn Fn(ConstructionCompletion) + Send + Sync>;

/// Tuning for [`ConstructionSystem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionConfig {
    /// Launch-order priority.
    pub priority: i32,
    /// Upper bound on queues processed at once.
    pub workers: usize,
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        Self {
            priority: 10,
            workers: DEFAULT_WORKERS,
        }
    }
}

/// One location's FIFO queue and the name it is displayed under.
#[derive(Debug)]
struct LocationQueue {
    name: String,
    items: Mutex<VecDeque<ConstructionItem>>,
}

type Queue = Arc<LocationQueue>;

/// Queues are keyed case-insensitively, matching planet lookup.
fn queue_key(location: &str) -> String {
    location.trim().to_ascii_lowercase()
}

/// Advances every construction queue by one tick.
pub struct ConstructionSystem {
    base: BaseSystem,
    queues: SyncMap<String, Queue>,
    workers: usize,
    tx: Sender<ConstructionCompletion>,
    rx: Receiver<ConstructionCompletion>,
    handler: RwLock<CompletionHandler>,
    completed: SyncCounter,
}

impl fmt::Debug for ConstructionSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructionSystem")
            .field("base", &self.base)
            .field("locations", &self.queues.len())
            .field("workers", &self.workers)
            .field("completed", &self.completed.get())
            .finish_non_exhaustive()
    }
}

impl ConstructionSystem {
    /// Name under which the system registers.
    pub const NAME: &'static str = "construction";

    /// Create the system with the given tuning.
    pub fn new(config: ConstructionConfig) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            base: BaseSystem::new(Self::NAME, config.priority),
            queues: SyncMap::new(),
            workers: config.workers.max(1),
            tx,
            rx,
            handler: RwLock::new(Arc::new(|_| {})),
            completed: SyncCounter::new(),
        }
    }

    /// Create the system with default tuning.
    pub fn with_default_config() -> Self {
        Self::new(ConstructionConfig::default())
    }

    fn queue(&self, location: &str) -> Option<Queue> {
        self.queues.get(&queue_key(location))
    }

    /// The planet's own spelling of `location` once a game is attached.
    fn display_name(&self, location: &str) -> String {
        let location = location.trim();
        self.base
            .context()
            .ok()
            .and_then(|ctx| {
                ctx.read(|game| game.find_planet(location).map(|p| p.name.clone()))
                    .ok()
                    .flatten()
            })
            .unwrap_or_else(|| location.to_string())
    }

    /// Append `item` to the queue at `location`, creating the queue if needed.
    ///
    /// Locations differing only in case share one queue.
    pub fn add_to_queue(&self, location: &str, mut item: ConstructionItem) {
        let queue = self.queues.get_or_insert_with(queue_key(location), || {
            Arc::new(LocationQueue {
                name: self.display_name(location),
                items: Mutex::default(),
            })
        });
        item.location = queue.name.clone();
        let mut items = queue.items.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(
            location = %queue.name,
            item = %item.id,
            name = %item.name,
            position = items.len(),
            "queued construction"
        );
        items.push_back(item);
    }

    /// Remove the item with `item_id`. Returns `false` if it is not queued there.
    pub fn remove_from_queue(&self, location: &str, item_id: &str) -> bool {
        let Some(queue) = self.queue(location) else {
            return false;
        };
        let mut queue = queue.items.lock().unwrap_or_else(PoisonError::into_inner);
        match queue.iter().position(|item| item.id == item_id) {
            Some(index) => {
                queue.remove(index);
                true
            }
            None => false,
        }
    }

    /// Copy of the queue at `location`; empty if there is none.
    pub fn get_queue(&self, location: &str) -> Vec<ConstructionItem> {
        self.queue(location)
            .map(|queue| {
                queue
                    .items
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The item currently being built at `location`.
    pub fn get_active_construction(&self, location: &str) -> Option<ConstructionItem> {
        let queue = self.queue(location)?;
        let queue = queue.items.lock().unwrap_or_else(PoisonError::into_inner);
        queue.front().cloned()
    }

    /// Number of items across all queues.
    pub fn total_constructions(&self) -> usize {
        self.queues
            .snapshot()
            .iter()
            .map(|(_, queue)| queue.items.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Every queued item ordered by `owner`, grouped by location.
    pub fn constructions_by_owner(&self, owner: PlayerId) -> Vec<ConstructionItem> {
        let mut items = Vec::new();
        self.queues.for_each(|_, queue| {
            let queue = queue.items.lock().unwrap_or_else(PoisonError::into_inner);
            items.extend(queue.iter().filter(|item| item.owner == owner).cloned());
        });
        items
    }

    /// Empty the queue at `location`. The queue itself stays registered.
    pub fn clear_queue(&self, location: &str) {
        if let Some(queue) = self.queue(location) {
            queue.items.lock().unwrap_or_else(PoisonError::into_inner).clear();
        }
    }

    /// Every location that has ever had a queue.
    pub fn locations(&self) -> Vec<String> {
        self.queues
            .snapshot()
            .into_iter()
            .map(|(_, queue)| queue.name.clone())
            .collect()
    }

    /// Drop every queue and any undelivered completion, as when a different
    /// game is loaded.
    pub fn reset(&self) {
        self.queues.clear();
        let dropped = self.rx.try_iter().count();
        if dropped > 0 {
            warn!(dropped, "discarded undelivered completions");
        }
    }

    /// Replace the completion handler. The handler runs on the dispatching
    /// thread at the end of the construction tick.
    pub fn set_completion_handler<F>(&self, handler: F)
    where
        F: Fn(ConstructionCompletion) + Send + Sync + 'static,
    {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(handler);
    }

    /// Items completed since the system was created.
    pub fn completed_count(&self) -> u64 {
        self.completed.get()
    }

    /// Advance the head of one queue, popping it if it finished.
    fn advance(&self, queue: &Queue, tick: u64) {
        let location = queue.name.as_str();
        let mut queue = queue.items.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(head) = queue.front_mut() else {
            return;
        };
        head.remaining_ticks = head.remaining_ticks.saturating_sub(1);
        head.progress = head.progress_percent();
        if !head.is_complete() {
            return;
        }
        if let Some(item) = queue.pop_front() {
            debug!(location, item = %item.id, tick, "construction finished");
            let completion = ConstructionCompletion {
                owner: item.owner,
                location: location.to_string(),
                item,
                tick,
            };
            if self.tx.send(completion).is_err() {
                warn!(location, "completion channel closed");
            }
        }
    }
}

impl System for ConstructionSystem {
    fn base(&self) -> &BaseSystem {
        &self.base
    }

    fn on_tick(&self, tick: u64, sink: &mut EffectSink) -> SimResult<()> {
        let queues = self.queues.snapshot();
        parallel::for_each(&queues, self.workers, |(_, queue)| {
            self.advance(queue, tick);
        });

        let finished: Vec<ConstructionCompletion> = self.rx.try_iter().collect();
        for completion in &finished {
            self.completed.increment();
            info!(
                location = %completion.location,
                item = %completion.item.name,
                owner = %completion.owner,
                tick,
                "construction completed"
            );
            sink.emit(
                SimEventKind::ConstructionCompleted {
                    item: completion.item.id.clone(),
                    location: completion.location.clone(),
                    owner: completion.owner,
                },
                format!(
                    "{} completed at {}",
                    completion.item.name, completion.location
                ),
            );
        }

        let handler = Arc::clone(&*self.handler.read().unwrap_or_else(PoisonError::into_inner));
        for completion in finished {
            let item = completion.item.id.clone();
            let location = completion.location.clone();
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(completion))) {
                error!(
                    %location,
                    %item,
                    tick,
                    reason = %panic_message(payload.as_ref()),
                    "completion handler panicked"
                );
            }
        }
        Ok(())
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
