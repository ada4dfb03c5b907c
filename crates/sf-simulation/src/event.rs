use sf_core::{PlanetId, PlayerId, ShipId, StarSystemId};

/// What kind of simulation event occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEventKind {
    // Construction
    /// A queued item finished and left its queue.
    ConstructionCompleted {
        /// Identifier of the finished item.
        item: String,
        /// Queue location the item was built at.
        location: String,
        /// The player who ordered it.
        owner: PlayerId,
    },

    // Ships
    /// A ship began moving along a hyperlane.
    ShipDeparted {
        /// The ship.
        ship: ShipId,
        /// Its owner.
        owner: PlayerId,
        /// Origin system.
        from: StarSystemId,
        /// Destination system.
        to: StarSystemId,
    },
    /// A ship reached its destination and entered orbit.
    ShipArrived {
        /// The ship.
        ship: ShipId,
        /// Its owner.
        owner: PlayerId,
        /// The system it arrived at.
        at: StarSystemId,
    },
    /// A ship ran out of fuel mid-transit.
    ShipStranded {
        /// The ship.
        ship: ShipId,
        /// Its owner.
        owner: PlayerId,
        /// The system it had departed from.
        near: StarSystemId,
    },

    // Population
    /// A planet's population reached zero.
    PopulationCollapsed {
        /// The planet.
        planet: PlanetId,
    },

    // Scheduler
    /// A system returned an error or panicked; its effects were discarded.
    SystemFailed {
        /// Name of the failing system.
        system: String,
        /// Error text or panic message.
        reason: String,
    },

    /// A user-defined event.
    Custom {
        /// A label identifying the custom event type.
        label: String,
    },
}

impl SimEventKind {
    /// Check whether a given player is the subject of this event.
    pub fn involves_player(&self, id: PlayerId) -> bool {
        match self {
            Self::ConstructionCompleted { owner, .. }
            | Self::ShipDeparted { owner, .. }
            | Self::ShipArrived { owner, .. }
            | Self::ShipStranded { owner, .. } => *owner == id,
            Self::PopulationCollapsed { .. } | Self::SystemFailed { .. } | Self::Custom { .. } => {
                false
            }
        }
    }
}

/// A record of something that happened during simulation.
#[derive(Debug, Clone)]
pub struct SimEvent {
    /// The simulation tick when this event occurred.
    pub tick: u64,
    /// The specific kind of event that occurred.
    pub kind: SimEventKind,
    /// A human-readable description of the event.
    pub description: String,
}

impl SimEvent {
    /// Create a new simulation event with the given tick, kind, and description.
    pub fn new(tick: u64, kind: SimEventKind, description: impl Into<String>) -> Self {
        Self {
            tick,
            kind,
            description: description.into(),
        }
    }
}

/// Accumulates events during a simulation run.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Append several events in order.
    pub fn extend(&mut self, events: impl IntoIterator<Item = SimEvent>) {
        for event in events {
            self.push(event);
        }
    }

    /// Return a slice of all recorded events.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Return all events that occurred at the given tick.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Return all events whose subject is the given player.
    pub fn events_for_player(&self, id: PlayerId) -> Vec<&SimEvent> {
        self.events
            .iter()
            .filter(|e| e.kind.involves_player(id))
            .collect()
    }

    /// Return the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Return `true` if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
