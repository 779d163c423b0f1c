//! # Link Lifecycle Adapter
//!
//! Boundary to the underlying radio subsystem. The core consumes the
//! [`LinkLifecycle`] trait and never touches modem I/O directly: bring-up
//! and registration signaling live behind it, and asynchronous status
//! changes arrive as [`ModemEvent`]s over a channel the core hands the
//! adapter at connect time.
//!
//! Production deployments implement this over their modem control plane
//! (AT commands, QMI, vendor library). [`crate::sim::SimModem`] provides a
//! host-side simulation for the daemon binary; tests use in-module mocks.

use anyhow::Result;
use crossbeam_channel::Sender;

/// Network registration status reported by the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// Registered on the home network.
    Home,
    /// Registered while roaming.
    Roaming,
    /// Actively searching for a network.
    Searching,
    /// Not registered and no further search in progress.
    NotRegistered,
}

/// Radio resource control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioResourceMode {
    Connected,
    Idle,
}

/// System mode the radio is attached with.
///
/// Release assistance is only negotiable in the LTE-M / NB-IoT family
/// modes; [`SystemMode::supports_release_assist`] encodes that set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMode {
    LteM,
    LteMGnss,
    NbIot,
    NbIotGnss,
    LteMNbIot,
    LteMNbIotGnss,
    Unknown,
}

impl SystemMode {
    pub fn supports_release_assist(&self) -> bool {
        !matches!(self, SystemMode::Unknown)
    }
}

/// Asynchronous notifications from the radio subsystem.
///
/// Only registration-status changes mutate link state (see the runtime
/// worker); every other variant is informational and merely logged.
#[derive(Debug, Clone, PartialEq)]
pub enum ModemEvent {
    RegistrationStatus(RegistrationStatus),
    /// Negotiated power-save parameters changed.
    PowerSaveParamsUpdated {
        active_time_s: i32,
        periodic_tau_s: i32,
    },
    /// Negotiated idle-receive (discontinuous reception) parameters changed.
    IdleReceiveParamsUpdated { cycle_s: f32, window_s: f32 },
    RadioResourceMode(RadioResourceMode),
    /// The serving cell changed.
    CellUpdate { cell_id: u32, tracking_area: u32 },
}

/// Bring-up, teardown, and low-power negotiation primitives of the radio.
///
/// All calls are synchronous from the caller's point of view; confirmation
/// that the network actually attached arrives later as a
/// [`ModemEvent::RegistrationStatus`] on the channel passed to
/// [`LinkLifecycle::connect`].
pub trait LinkLifecycle: Send + Sync {
    /// Initialize the radio subsystem. Failure here is fatal to startup.
    fn init(&self) -> Result<()>;

    /// Begin asynchronous network attach, delivering status events on
    /// `events` from now on.
    fn connect(&self, events: Sender<ModemEvent>) -> Result<()>;

    /// Return the radio to normal (online) operation.
    fn bring_up(&self) -> Result<()>;

    /// Take the radio offline.
    fn take_down(&self) -> Result<()>;

    /// Negotiate power-save mode on or off.
    fn request_power_save(&self, enable: bool) -> Result<()>;

    /// Negotiate idle-receive (discontinuous reception) on or off.
    fn request_idle_receive(&self, enable: bool) -> Result<()>;

    /// Enable the radio-side release-assistance feature set. Idempotent.
    fn request_release_assist_feature_enable(&self) -> Result<()>;

    /// Negotiate release assistance on or off.
    fn request_release_assist(&self, enable: bool) -> Result<()>;

    /// Current system mode, used to gate release-assistance requests.
    fn system_mode(&self) -> Result<SystemMode>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_assist_supported_modes() {
        assert!(SystemMode::LteM.supports_release_assist());
        assert!(SystemMode::NbIotGnss.supports_release_assist());
        assert!(SystemMode::LteMNbIotGnss.supports_release_assist());
        assert!(!SystemMode::Unknown.supports_release_assist());
    }
}
