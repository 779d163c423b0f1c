//! # Feature Configuration Manager
//!
//! Applies the power-saving feature set to the radio. Runs once at
//! startup (before the initial attach) and again on every transition to
//! connected, so a toggle flipped while the link is up takes effect
//! through the full reconnect path.
//!
//! Each feature has a *configured* enable (fixed at load time, from
//! [`crate::config::UplinkConfig`]) and, for the two switch-backed
//! features, a *live* toggle. A feature that is configured out is
//! explicitly negotiated off rather than skipped, so a previous run's
//! negotiation cannot linger in the radio.

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::UplinkConfig;
use crate::link::state::FeatureFlags;
use crate::modem::{LinkLifecycle, SystemMode};

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("release assist not supported for system mode {0:?}")]
    UnsupportedMode(SystemMode),
    #[error("adapter call failed: {0}")]
    Adapter(#[from] anyhow::Error),
}

pub struct FeatureManager {
    power_save_configured: bool,
    idle_receive_configured: bool,
    release_assist_configured: bool,
}

impl FeatureManager {
    pub fn from_config(config: &UplinkConfig) -> Self {
        FeatureManager {
            power_save_configured: config.power_save_configured,
            idle_receive_configured: config.idle_receive_configured,
            release_assist_configured: config.release_assist_configured,
        }
    }

    /// Negotiate power-save mode. A device without power save configured
    /// negotiates it off regardless of the live toggle.
    pub fn apply_power_save(
        &self,
        modem: &dyn LinkLifecycle,
        enabled: bool,
    ) -> Result<(), FeatureError> {
        let effective = self.power_save_configured && enabled;
        modem.request_power_save(effective)?;
        debug!(enabled = effective, "power save negotiated");
        Ok(())
    }

    /// Negotiate idle receive. Configured-only; there is no live toggle.
    pub fn apply_idle_receive(&self, modem: &dyn LinkLifecycle) -> Result<(), FeatureError> {
        modem.request_idle_receive(self.idle_receive_configured)?;
        debug!(
            enabled = self.idle_receive_configured,
            "idle receive negotiated"
        );
        Ok(())
    }

    /// Negotiate release assistance. Requires a compatible system mode;
    /// an incompatible mode is a skip for the caller, not a fatal error.
    pub fn apply_release_assist(
        &self,
        modem: &dyn LinkLifecycle,
        enabled: bool,
    ) -> Result<(), FeatureError> {
        if !self.release_assist_configured {
            debug!("release assist not configured; skipping");
            return Ok(());
        }

        let mode = modem.system_mode()?;
        if !mode.supports_release_assist() {
            return Err(FeatureError::UnsupportedMode(mode));
        }

        modem.request_release_assist_feature_enable()?;
        modem.request_release_assist(enabled)?;
        debug!(enabled, "release assist negotiated");
        Ok(())
    }

    /// Apply the full feature set in order: power save, idle receive,
    /// release assist. Failures are logged and skipped — a feature the
    /// radio rejects must not block the rest of the transition.
    pub fn apply_all(&self, modem: &dyn LinkLifecycle, flags: &FeatureFlags) {
        if let Err(e) = self.apply_power_save(modem, flags.power_save()) {
            warn!(error = %e, "power save negotiation failed");
        }
        if let Err(e) = self.apply_idle_receive(modem) {
            warn!(error = %e, "idle receive negotiation failed");
        }
        match self.apply_release_assist(modem, flags.release_assist()) {
            Ok(()) => {}
            Err(FeatureError::UnsupportedMode(mode)) => {
                warn!(?mode, "release assist unsupported in current mode; skipping");
            }
            Err(e) => warn!(error = %e, "release assist negotiation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use crossbeam_channel::Sender;
    use std::sync::Mutex;

    use crate::modem::ModemEvent;

    struct RecordingModem {
        calls: Mutex<Vec<String>>,
        mode: SystemMode,
        fail_power_save: bool,
    }

    impl RecordingModem {
        fn new(mode: SystemMode) -> Self {
            RecordingModem {
                calls: Mutex::new(Vec::new()),
                mode,
                fail_power_save: false,
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LinkLifecycle for RecordingModem {
        fn init(&self) -> anyhow::Result<()> {
            Ok(())
        }
        fn connect(&self, _events: Sender<ModemEvent>) -> anyhow::Result<()> {
            Ok(())
        }
        fn bring_up(&self) -> anyhow::Result<()> {
            self.record("bring_up");
            Ok(())
        }
        fn take_down(&self) -> anyhow::Result<()> {
            self.record("take_down");
            Ok(())
        }
        fn request_power_save(&self, enable: bool) -> anyhow::Result<()> {
            if self.fail_power_save {
                bail!("radio rejected power save");
            }
            self.record(format!("power_save({enable})"));
            Ok(())
        }
        fn request_idle_receive(&self, enable: bool) -> anyhow::Result<()> {
            self.record(format!("idle_receive({enable})"));
            Ok(())
        }
        fn request_release_assist_feature_enable(&self) -> anyhow::Result<()> {
            self.record("release_assist_feature_enable");
            Ok(())
        }
        fn request_release_assist(&self, enable: bool) -> anyhow::Result<()> {
            self.record(format!("release_assist({enable})"));
            Ok(())
        }
        fn system_mode(&self) -> anyhow::Result<SystemMode> {
            Ok(self.mode)
        }
    }

    fn manager(power_save: bool, idle: bool, release: bool) -> FeatureManager {
        FeatureManager {
            power_save_configured: power_save,
            idle_receive_configured: idle,
            release_assist_configured: release,
        }
    }

    #[test]
    fn power_save_honors_live_toggle() {
        let modem = RecordingModem::new(SystemMode::LteM);
        let mgr = manager(true, false, true);

        mgr.apply_power_save(&modem, true).unwrap();
        mgr.apply_power_save(&modem, false).unwrap();
        assert_eq!(modem.calls(), vec!["power_save(true)", "power_save(false)"]);
    }

    #[test]
    fn unconfigured_power_save_negotiates_off() {
        let modem = RecordingModem::new(SystemMode::LteM);
        let mgr = manager(false, false, true);

        mgr.apply_power_save(&modem, true).unwrap();
        assert_eq!(modem.calls(), vec!["power_save(false)"]);
    }

    #[test]
    fn release_assist_enables_feature_then_negotiates() {
        let modem = RecordingModem::new(SystemMode::NbIot);
        let mgr = manager(true, false, true);

        mgr.apply_release_assist(&modem, true).unwrap();
        assert_eq!(
            modem.calls(),
            vec!["release_assist_feature_enable", "release_assist(true)"]
        );
    }

    #[test]
    fn release_assist_rejected_for_unknown_mode() {
        let modem = RecordingModem::new(SystemMode::Unknown);
        let mgr = manager(true, false, true);

        let err = mgr.apply_release_assist(&modem, true).unwrap_err();
        assert!(matches!(err, FeatureError::UnsupportedMode(_)));
        assert!(
            modem.calls().is_empty(),
            "no negotiation attempted in an unsupported mode"
        );
    }

    #[test]
    fn unconfigured_release_assist_is_a_noop() {
        let modem = RecordingModem::new(SystemMode::LteM);
        let mgr = manager(true, false, false);

        mgr.apply_release_assist(&modem, true).unwrap();
        assert!(modem.calls().is_empty());
    }

    #[test]
    fn apply_all_continues_past_failures() {
        let mut modem = RecordingModem::new(SystemMode::LteM);
        modem.fail_power_save = true;
        let mgr = manager(true, true, true);
        let flags = FeatureFlags::new(true, true);

        mgr.apply_all(&modem, &flags);
        let calls = modem.calls();
        assert!(
            calls.contains(&"idle_receive(true)".to_string()),
            "idle receive still applied after power-save failure: {calls:?}"
        );
        assert!(calls.contains(&"release_assist(true)".to_string()));
    }
}
