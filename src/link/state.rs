//! Link state and target cells.
//!
//! The link's state is a single process-wide value. It is stored in an
//! atomic cell so any context (interrupt handlers included) can take a
//! snapshot, but it is only ever written by the runtime worker — the
//! transition job writes `Transitioning`, and registration-event handling
//! writes `Connected`/`Disconnected`. Both run on the same worker thread,
//! so the two writers are serialized.
//!
//! The *target* is the state the controller should converge to next. Any
//! producer may write it; the transition job consumes it destructively at
//! the start of a run. Multiple writes before the job runs coalesce to the
//! last one — an accepted race, since the worker always reads the latest
//! target.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Current state of the wide-area link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Link usable; transmissions permitted.
    Connected,
    /// Link intentionally brought down; transmissions withheld.
    Disconnected,
    /// A state change is in progress.
    Transitioning,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Connected => "connected",
            LinkState::Disconnected => "disconnected",
            LinkState::Transitioning => "transitioning",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally requestable link targets.
///
/// `Transitioning` is deliberately absent: it is an internal transient
/// value of the controller, never a target a caller may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    Connected,
    Disconnected,
}

const STATE_CONNECTED: u8 = 0;
const STATE_DISCONNECTED: u8 = 1;
const STATE_TRANSITIONING: u8 = 2;

/// Atomic cell holding the process-wide [`LinkState`].
pub struct LinkStateCell(AtomicU8);

impl LinkStateCell {
    pub fn new(initial: LinkState) -> Self {
        LinkStateCell(AtomicU8::new(encode_state(initial)))
    }

    pub fn get(&self) -> LinkState {
        decode_state(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: LinkState) {
        self.0.store(encode_state(state), Ordering::Release);
    }
}

fn encode_state(state: LinkState) -> u8 {
    match state {
        LinkState::Connected => STATE_CONNECTED,
        LinkState::Disconnected => STATE_DISCONNECTED,
        LinkState::Transitioning => STATE_TRANSITIONING,
    }
}

fn decode_state(raw: u8) -> LinkState {
    match raw {
        STATE_CONNECTED => LinkState::Connected,
        STATE_DISCONNECTED => LinkState::Disconnected,
        _ => LinkState::Transitioning,
    }
}

const TARGET_NONE: u8 = 0;
const TARGET_CONNECTED: u8 = 1;
const TARGET_DISCONNECTED: u8 = 2;

/// Atomic cell holding the pending [`LinkTarget`], if any.
///
/// Many producers store, exactly one consumer (the transition job) takes.
/// `take` is a swap-to-empty, so a target is consumed at most once.
pub struct TargetCell(AtomicU8);

impl TargetCell {
    pub fn new() -> Self {
        TargetCell(AtomicU8::new(TARGET_NONE))
    }

    pub fn set(&self, target: LinkTarget) {
        let raw = match target {
            LinkTarget::Connected => TARGET_CONNECTED,
            LinkTarget::Disconnected => TARGET_DISCONNECTED,
        };
        self.0.store(raw, Ordering::Release);
    }

    /// Consume the pending target, leaving the cell empty.
    pub fn take(&self) -> Option<LinkTarget> {
        match self.0.swap(TARGET_NONE, Ordering::AcqRel) {
            TARGET_CONNECTED => Some(LinkTarget::Connected),
            TARGET_DISCONNECTED => Some(LinkTarget::Disconnected),
            _ => None,
        }
    }
}

impl Default for TargetCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Live power-saving feature toggles.
///
/// Written by the input dispatcher (interrupt context) and the startup
/// path; read by the runtime worker when (re)applying configuration and by
/// the transmit job for the last-packet hint. The dispatcher keeps its own
/// shadow copies for edge detection — those never live here.
pub struct FeatureFlags {
    power_save: AtomicBool,
    release_assist: AtomicBool,
}

impl FeatureFlags {
    pub fn new(power_save: bool, release_assist: bool) -> Self {
        FeatureFlags {
            power_save: AtomicBool::new(power_save),
            release_assist: AtomicBool::new(release_assist),
        }
    }

    pub fn power_save(&self) -> bool {
        self.power_save.load(Ordering::Acquire)
    }

    pub fn set_power_save(&self, enabled: bool) {
        self.power_save.store(enabled, Ordering::Release);
    }

    pub fn release_assist(&self) -> bool {
        self.release_assist.load(Ordering::Acquire)
    }

    pub fn set_release_assist(&self, enabled: bool) {
        self.release_assist.store(enabled, Ordering::Release);
    }
}
