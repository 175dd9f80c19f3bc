//! Device events with synchronous observers and bounded history.
//!
//! Events are emitted by the device module whenever a device changes power
//! state or APC membership. Delivery is synchronous: every matching listener
//! runs before [`EventBus::emit`] returns. Each event kind additionally keeps
//! a fixed-capacity [`EventBuffer`] so callers can poll recent history.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which skips
//! both recording and delivery for that kind.

use std::collections::VecDeque;

use crate::id::{ApcId, DeviceId};
use crate::state::PowerState;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Where a state change originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateOrigin {
    /// Derived locally from a voltage sample.
    Local,
    /// Received from the authoritative participant.
    Replicated,
}

/// A device event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    StateChanged {
        device: DeviceId,
        from: PowerState,
        to: PowerState,
        origin: StateOrigin,
    },
    ApcAssigned {
        device: DeviceId,
        apc: ApcId,
        environmental: bool,
    },
    ApcDetached {
        device: DeviceId,
        apc: ApcId,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StateChanged,
    ApcAssigned,
    ApcDetached,
}

const EVENT_KIND_COUNT: usize = 3;

impl DeviceEvent {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            DeviceEvent::StateChanged { .. } => EventKind::StateChanged,
            DeviceEvent::ApcAssigned { .. } => EventKind::ApcAssigned,
            DeviceEvent::ApcDetached { .. } => EventKind::ApcDetached,
        }
    }

    /// The device this event concerns.
    pub fn device(&self) -> DeviceId {
        match self {
            DeviceEvent::StateChanged { device, .. }
            | DeviceEvent::ApcAssigned { device, .. }
            | DeviceEvent::ApcDetached { device, .. } => *device,
        }
    }
}

impl EventKind {
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// Bounded event history. When full, the oldest event is dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<DeviceEvent>,
    capacity: usize,
    /// Total events ever written, including dropped ones.
    total_written: u64,
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: DeviceEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.total_written += 1;
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceEvent> + '_ {
        self.events.iter()
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type Listener = Box<dyn FnMut(&DeviceEvent)>;

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&DeviceEvent) -> bool>;

struct ListenerEntry {
    listener: Listener,
    filter: Option<EventFilter>,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default number of events retained per kind.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Holds one history buffer per event kind, listener lists, and suppression flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listener_counts: Vec<usize> = self.listeners.iter().map(Vec::len).collect();
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("listeners", &listener_counts)
            .field("default_capacity", &self.default_capacity)
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    /// Create a bus retaining up to `default_capacity` events per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
        }
    }

    /// Suppress an event kind. Its buffer is dropped and listeners stop firing.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn unsuppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = false;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Register a listener for an event kind. Listeners run in registration order.
    pub fn on(&mut self, kind: EventKind, listener: Listener) {
        self.on_filtered(kind, None, listener);
    }

    /// Register a listener that only sees events accepted by `filter`.
    pub fn on_filtered(&mut self, kind: EventKind, filter: Option<EventFilter>, listener: Listener) {
        self.listeners[kind.index()].push(ListenerEntry { listener, filter });
    }

    /// Record an event and deliver it to every matching listener.
    pub fn emit(&mut self, event: DeviceEvent) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }

        for entry in &mut self.listeners[idx] {
            if let Some(ref filter) = entry.filter
                && !filter(&event)
            {
                continue;
            }
            (entry.listener)(&event);
        }

        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Read-only access to the history buffer for a kind.
    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Events of a kind currently retained, oldest first.
    pub fn recent(&self, kind: EventKind) -> Vec<&DeviceEvent> {
        self.buffer(kind).map(|b| b.iter().collect()).unwrap_or_default()
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map(EventBuffer::total_written).unwrap_or(0)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
