//! Event types and sinks for observing growth.
//!
//! This module defines [`GrowthEvent`] and a set of sinks to emit, collect, or forward
//! events while running [`crate::engine::Assemblage::update_with_events`],
//! [`crate::engine::Assemblage::remove_with_events`] or
//! [`crate::engine::Assemblage::rescan_with_events`].
use crate::assembly::ModuleId;
use crate::engine::Placement;

/// Describes events emitted by the growth engine.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum GrowthEvent {
    /// Emitted when a receiver produced at least one surviving candidate.
    ReceiverSelected {
        /// The receiver identity.
        receiver: ModuleId,
        /// Number of candidates that survived filtering.
        candidates: usize,
    },

    /// Emitted when a receiver produced no candidate and was moved to unreachable.
    ReceiverUnreachable {
        /// The receiver identity.
        receiver: ModuleId,
    },

    /// Emitted when a module was attached.
    ModulePlaced {
        /// The placement data.
        placement: Placement,
    },

    /// Emitted after the obstruction pass changed port occupancy.
    PortsObstructed {
        /// The newly placed module.
        module: ModuleId,
        /// Ports newly marked occluded, on both sides.
        occluded: usize,
        /// Port pairs newly marked in contact.
        contacts: usize,
    },

    /// Emitted when an update found no available receiver.
    Exhausted {
        /// Number of unreachable modules at that point.
        unreachable: usize,
    },

    /// Emitted when a module was removed.
    ModuleRemoved {
        /// The removed identity.
        id: ModuleId,
        /// Ports on other modules released back to available.
        released_ports: usize,
    },

    /// Emitted after an availability rescan.
    Rescanned {
        /// Size of the available list.
        available: usize,
        /// Size of the unreachable list.
        unreachable: usize,
    },

    /// Non-fatal warning generated during growth.
    Warning {
        /// Context string (e.g. module id, setting name).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

impl GrowthEvent {
    pub fn kind(&self) -> GrowthEventKind {
        match self {
            GrowthEvent::ReceiverSelected { .. } => GrowthEventKind::ReceiverSelected,
            GrowthEvent::ReceiverUnreachable { .. } => GrowthEventKind::ReceiverUnreachable,
            GrowthEvent::ModulePlaced { .. } => GrowthEventKind::ModulePlaced,
            GrowthEvent::PortsObstructed { .. } => GrowthEventKind::PortsObstructed,
            GrowthEvent::Exhausted { .. } => GrowthEventKind::Exhausted,
            GrowthEvent::ModuleRemoved { .. } => GrowthEventKind::ModuleRemoved,
            GrowthEvent::Rescanned { .. } => GrowthEventKind::Rescanned,
            GrowthEvent::Warning { .. } => GrowthEventKind::Warning,
        }
    }
}

/// Discriminant of [`GrowthEvent`], used by sinks to skip building events they ignore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrowthEventKind {
    ReceiverSelected,
    ReceiverUnreachable,
    ModulePlaced,
    PortsObstructed,
    Exhausted,
    ModuleRemoved,
    Rescanned,
    Warning,
}

/// A generic event sink that accepts [`GrowthEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: GrowthEvent);

    /// Whether events of `kind` should be built and sent at all.
    #[inline]
    fn wants(&self, _kind: GrowthEventKind) -> bool {
        true
    }

    fn send_many<I>(&mut self, events: I)
    where
        Self: Sized,
        I: IntoIterator<Item = GrowthEvent>,
    {
        for e in events {
            self.send(e);
        }
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: GrowthEvent) {}

    #[inline]
    fn wants(&self, _kind: GrowthEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(GrowthEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(GrowthEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(GrowthEvent),
{
    #[inline]
    fn send(&mut self, event: GrowthEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<GrowthEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            events: Vec::with_capacity(cap),
        }
    }

    pub fn into_inner(self) -> Vec<GrowthEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[GrowthEvent] {
        &self.events
    }

    /// Number of collected events of `kind`.
    pub fn count(&self, kind: GrowthEventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: GrowthEvent) {
        self.events.push(event);
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: GrowthEvent) {
        if self.sinks.is_empty() {
            return;
        }
        let last_idx = self.sinks.len() - 1;
        for i in 0..last_idx {
            self.sinks[i].send(event.clone());
        }
        self.sinks[last_idx].send(event);
    }

    fn wants(&self, kind: GrowthEventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}
