//! Simulated radio for host-side runs of the daemon.
//!
//! A development host has no modem control plane, so this one is faked:
//! `connect` and `bring_up` report a home-network registration after a
//! configurable attach delay, `take_down` reports deregistration
//! immediately. Negotiation primitives log and succeed.

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::Sender;
use tracing::info;

use crate::modem::{LinkLifecycle, ModemEvent, RegistrationStatus, SystemMode};

pub struct SimModem {
    attach_delay: Duration,
    events: Mutex<Option<Sender<ModemEvent>>>,
}

impl SimModem {
    pub fn new(attach_delay: Duration) -> Self {
        SimModem {
            attach_delay,
            events: Mutex::new(None),
        }
    }

    fn attach_later(&self) {
        let Some(tx) = self.events.lock().unwrap().as_ref().cloned() else {
            return;
        };
        let delay = self.attach_delay;
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = tx.send(ModemEvent::RegistrationStatus(RegistrationStatus::Searching));
            let _ = tx.send(ModemEvent::RegistrationStatus(RegistrationStatus::Home));
        });
    }
}

impl LinkLifecycle for SimModem {
    fn init(&self) -> Result<()> {
        info!("sim modem initialized");
        Ok(())
    }

    fn connect(&self, events: Sender<ModemEvent>) -> Result<()> {
        *self.events.lock().unwrap() = Some(events);
        info!(delay = ?self.attach_delay, "sim modem attaching");
        self.attach_later();
        Ok(())
    }

    fn bring_up(&self) -> Result<()> {
        info!("sim modem going online");
        self.attach_later();
        Ok(())
    }

    fn take_down(&self) -> Result<()> {
        info!("sim modem going offline");
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(ModemEvent::RegistrationStatus(
                RegistrationStatus::NotRegistered,
            ));
        }
        Ok(())
    }

    fn request_power_save(&self, enable: bool) -> Result<()> {
        info!(enable, "sim modem: power save request");
        Ok(())
    }

    fn request_idle_receive(&self, enable: bool) -> Result<()> {
        info!(enable, "sim modem: idle receive request");
        Ok(())
    }

    fn request_release_assist_feature_enable(&self) -> Result<()> {
        info!("sim modem: release assist feature enabled");
        Ok(())
    }

    fn request_release_assist(&self, enable: bool) -> Result<()> {
        info!(enable, "sim modem: release assist request");
        Ok(())
    }

    fn system_mode(&self) -> Result<SystemMode> {
        Ok(SystemMode::LteM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn attach_reports_searching_then_home() {
        let modem = SimModem::new(Duration::from_millis(10));
        let (tx, rx) = bounded(8);
        modem.connect(tx).unwrap();

        let first = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(
            first,
            ModemEvent::RegistrationStatus(RegistrationStatus::Searching)
        );
        let second = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(
            second,
            ModemEvent::RegistrationStatus(RegistrationStatus::Home)
        );
    }

    #[test]
    fn take_down_reports_deregistration() {
        let modem = SimModem::new(Duration::from_millis(10));
        let (tx, rx) = bounded(8);
        modem.connect(tx).unwrap();
        // Drain the attach events first.
        let _ = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        let _ = rx.recv_timeout(Duration::from_millis(500)).unwrap();

        modem.take_down().unwrap();
        let event = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(
            event,
            ModemEvent::RegistrationStatus(RegistrationStatus::NotRegistered)
        );
    }
}
