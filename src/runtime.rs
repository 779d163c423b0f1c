//! # Uplink Runtime
//!
//! Owns the single worker thread that executes every link transition,
//! every transmission, and all modem event handling. Producers (input
//! dispatcher, startup, modem event source) never touch radio or
//! transport I/O — they write atomic cells and post non-blocking messages
//! over a bounded channel; the worker is the only consumer.
//!
//! Two jobs exist: the aperiodic link transition and the periodic
//! transmission. Each has exactly one pending fire-time slot; scheduling
//! an already-pending job replaces its fire time, never duplicates it.
//!
//! Dropping the runtime triggers a graceful shutdown of the worker.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::config::{UplinkConfig, UDP_IP_HEADER_SIZE};
use crate::link::{
    FeatureFlags, FeatureManager, LinkControl, LinkState, LinkStateCell, LinkTarget, TargetCell,
};
use crate::modem::{LinkLifecycle, ModemEvent, RegistrationStatus};
use crate::transport::Transport;

/// Worker idle tick when no job is pending.
const IDLE_TICK: Duration = Duration::from_millis(100);

/// Jobs executed by the worker. Index doubles as the pending-slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobId {
    LinkTransition = 0,
    Transmit = 1,
}

const JOB_COUNT: usize = 2;

enum ControlMsg {
    Schedule { job: JobId, delay: Duration },
    Shutdown,
}

/// Transmission counters, updated by the worker, readable from anywhere.
#[derive(Default)]
pub struct UplinkStats {
    sent_packets: AtomicU64,
    sent_bytes: AtomicU64,
    failed_sends: AtomicU64,
    registrations: AtomicU64,
}

/// Point-in-time copy of [`UplinkStats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsSnapshot {
    pub sent_packets: u64,
    pub sent_bytes: u64,
    pub failed_sends: u64,
    pub registrations: u64,
}

impl UplinkStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent_packets: self.sent_packets.load(Ordering::Relaxed),
            sent_bytes: self.sent_bytes.load(Ordering::Relaxed),
            failed_sends: self.failed_sends.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
        }
    }
}

/// Cheap, cloneable producer-side handle to the runtime.
///
/// Safe to use from interrupt-like contexts: every operation is an atomic
/// store plus a non-blocking channel send.
#[derive(Clone)]
pub struct UplinkHandle {
    control_tx: Sender<ControlMsg>,
    state: Arc<LinkStateCell>,
    target: Arc<TargetCell>,
    flags: Arc<FeatureFlags>,
    stats: Arc<UplinkStats>,
}

impl UplinkHandle {
    fn schedule(&self, job: JobId, delay: Duration) {
        if let Err(e) = self.control_tx.try_send(ControlMsg::Schedule { job, delay }) {
            // The queue only saturates under a message burst, in which
            // case a schedule for this job is already in flight.
            warn!(?job, error = %e, "control queue saturated; schedule dropped");
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl LinkControl for UplinkHandle {
    fn state(&self) -> LinkState {
        self.state.get()
    }

    fn request_transition(&self, target: LinkTarget) {
        self.target.set(target);
        self.schedule(JobId::LinkTransition, Duration::ZERO);
    }

    fn transmit_now(&self) {
        self.schedule(JobId::Transmit, Duration::ZERO);
    }

    fn flags(&self) -> &FeatureFlags {
        &self.flags
    }
}

/// The connectivity-lifecycle controller and its worker thread.
pub struct UplinkRuntime {
    handle: UplinkHandle,
    config: UplinkConfig,
    shutdown: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl UplinkRuntime {
    /// Initialize the radio, apply the initial low-power configuration,
    /// begin the asynchronous attach, and spawn the worker.
    ///
    /// `initial_power_save` / `initial_release_assist` are the live
    /// toggle values sampled before startup (switch positions on a
    /// physical device, configured enables for the daemon).
    ///
    /// The link starts `Transitioning`; call [`Self::wait_until_ready`]
    /// before arming the periodic transmit job with
    /// [`Self::arm_transmit`].
    pub fn start(
        config: UplinkConfig,
        modem: Arc<dyn LinkLifecycle>,
        transport: Arc<dyn Transport>,
        initial_power_save: bool,
        initial_release_assist: bool,
    ) -> Result<Self> {
        modem.init().context("radio subsystem initialization failed")?;

        let state = Arc::new(LinkStateCell::new(LinkState::Transitioning));
        let target = Arc::new(TargetCell::new());
        let flags = Arc::new(FeatureFlags::new(
            initial_power_save,
            initial_release_assist,
        ));
        let stats = Arc::new(UplinkStats::default());
        let features = FeatureManager::from_config(&config);

        // Low-power configuration must precede the attach: release-assist
        // availability depends on the system mode fixed at radio init.
        features.apply_all(&*modem, &flags);

        let (control_tx, control_rx) = bounded(64);
        let (event_tx, event_rx) = bounded(64);
        modem
            .connect(event_tx)
            .context("starting network attach failed")?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            config: config.clone(),
            modem,
            transport,
            features,
            state: state.clone(),
            target: target.clone(),
            flags: flags.clone(),
            stats: stats.clone(),
            control_rx,
            event_rx,
            shutdown: shutdown.clone(),
            pending: [None; JOB_COUNT],
        };
        let join = thread::Builder::new()
            .name("uplink-worker".into())
            .spawn(move || worker.run())
            .context("failed to spawn uplink worker")?;

        info!(dest = %config.destination(), "uplink runtime started; waiting for registration");

        Ok(UplinkRuntime {
            handle: UplinkHandle {
                control_tx,
                state,
                target,
                flags,
                stats,
            },
            config,
            shutdown,
            worker: Some(join),
        })
    }

    /// Block until the initial transition leaves `Transitioning`, polling
    /// at the configured fixed interval. Times out as a startup failure.
    ///
    /// This is the only synchronous wait in the system; it guarantees the
    /// transmit job is never armed before the link subsystem settled.
    pub fn wait_until_ready(&self) -> Result<()> {
        let started = Instant::now();
        loop {
            let state = self.handle.state.get();
            if state != LinkState::Transitioning {
                info!(%state, "link settled");
                return Ok(());
            }
            if started.elapsed() > self.config.startup_timeout() {
                bail!(
                    "link did not settle within {}s",
                    self.config.startup_timeout_secs
                );
            }
            info!("link transition in progress; waiting");
            thread::sleep(self.config.startup_poll());
        }
    }

    /// Arm the periodic transmit job, firing immediately.
    pub fn arm_transmit(&self) {
        self.handle.schedule(JobId::Transmit, Duration::ZERO);
    }

    /// Cheap handle for producers (input dispatcher, supervisors).
    pub fn handle(&self) -> UplinkHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> LinkState {
        self.handle.state.get()
    }

    pub fn request_transition(&self, target: LinkTarget) {
        self.handle.request_transition(target);
    }

    pub fn transmit_now(&self) {
        self.handle.transmit_now();
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.handle.stats()
    }

    /// Gracefully stops the worker thread. Idempotent.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.handle.control_tx.try_send(ControlMsg::Shutdown);
        if let Some(join) = self.worker.take() {
            let _ = join.join();
        }
    }
}

impl Drop for UplinkRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─── Worker ─────────────────────────────────────────────────────────────────

struct Worker {
    config: UplinkConfig,
    modem: Arc<dyn LinkLifecycle>,
    transport: Arc<dyn Transport>,
    features: FeatureManager,
    state: Arc<LinkStateCell>,
    target: Arc<TargetCell>,
    flags: Arc<FeatureFlags>,
    stats: Arc<UplinkStats>,
    control_rx: Receiver<ControlMsg>,
    event_rx: Receiver<ModemEvent>,
    shutdown: Arc<AtomicBool>,
    pending: [Option<Instant>; JOB_COUNT],
}

impl Worker {
    fn run(mut self) {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            let timeout = self.next_wakeup();
            let control_rx = self.control_rx.clone();
            let event_rx = self.event_rx.clone();
            crossbeam_channel::select! {
                recv(control_rx) -> msg => match msg {
                    Ok(ControlMsg::Schedule { job, delay }) => self.schedule(job, delay),
                    Ok(ControlMsg::Shutdown) | Err(_) => break,
                },
                recv(event_rx) -> evt => match evt {
                    Ok(evt) => self.on_event(evt),
                    Err(_) => {
                        // Modem event source went away; keep serving
                        // control messages without spinning.
                        self.event_rx = crossbeam_channel::never();
                    }
                },
                default(timeout) => {}
            }

            // Drain everything already queued before firing, so a burst
            // of schedule requests collapses into the single pending slot
            // per job.
            loop {
                match self.control_rx.try_recv() {
                    Ok(ControlMsg::Schedule { job, delay }) => self.schedule(job, delay),
                    Ok(ControlMsg::Shutdown) => return,
                    Err(_) => break,
                }
            }
            while let Ok(evt) = self.event_rx.try_recv() {
                self.on_event(evt);
            }

            self.fire_due();
        }
        debug!("uplink worker stopped");
    }

    fn schedule(&mut self, job: JobId, delay: Duration) {
        // Replaces any pending fire time for this job.
        self.pending[job as usize] = Some(Instant::now() + delay);
    }

    fn next_wakeup(&self) -> Duration {
        let now = Instant::now();
        self.pending
            .iter()
            .flatten()
            .map(|due| due.saturating_duration_since(now))
            .min()
            .unwrap_or(IDLE_TICK)
    }

    fn fire_due(&mut self) {
        let now = Instant::now();
        if self.due(JobId::LinkTransition, now) {
            self.pending[JobId::LinkTransition as usize] = None;
            self.run_transition();
        }
        if self.due(JobId::Transmit, now) {
            self.pending[JobId::Transmit as usize] = None;
            self.run_transmit();
        }
    }

    fn due(&self, job: JobId, now: Instant) -> bool {
        matches!(self.pending[job as usize], Some(due) if due <= now)
    }

    /// The link transition job. Consumes the pending target first: two
    /// racing requests for one target can fire the job twice, and the
    /// firing that finds the cell empty must leave the settled state
    /// untouched. Only with a target in hand is the link marked busy, so
    /// the transmit job withholds sends mid-transition. `Connected` is
    /// never written here — only a registration event may declare the
    /// link usable.
    fn run_transition(&mut self) {
        let Some(target) = self.target.take() else {
            debug!("transition job ran with no pending target");
            return;
        };
        self.state.set(LinkState::Transitioning);
        match target {
            LinkTarget::Disconnected => {
                info!("taking link down");
                if let Err(e) = self.modem.take_down() {
                    warn!(error = %e, "take down failed; awaiting next transition request");
                }
            }
            LinkTarget::Connected => {
                info!("connecting link with current feature configuration");
                // Offline first: a clean state is required before
                // re-negotiating the low-power features.
                if let Err(e) = self.modem.take_down() {
                    warn!(error = %e, "take down before reconnect failed");
                }
                self.features.apply_all(&*self.modem, &self.flags);
                if let Err(e) = self.modem.bring_up() {
                    warn!(error = %e, "bring up failed; awaiting next transition request");
                }
            }
        }
    }

    /// The periodic transmission job. Honored only while the link is
    /// connected; every exit path reschedules at the normal period so the
    /// cadence survives offline stretches and send failures alike.
    fn run_transmit(&mut self) {
        self.schedule(JobId::Transmit, self.config.upload_period());

        let state = self.state.get();
        if state != LinkState::Connected {
            debug!(%state, "link not connected; withholding transmission");
            return;
        }

        let dest = self.config.destination();
        let mut handle = match self.transport.open(dest) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, %dest, "transport open failed; retrying next period");
                self.stats.failed_sends.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        if self.flags.release_assist() {
            if let Err(e) = handle.set_last_packet_hint() {
                warn!(error = %e, "last-packet hint failed");
            }
        }

        let payload = vec![0u8; self.config.payload_size_bytes];
        match handle.send(&payload) {
            Ok(n) => {
                self.stats.sent_packets.fetch_add(1, Ordering::Relaxed);
                self.stats.sent_bytes.fetch_add(n as u64, Ordering::Relaxed);
                info!(
                    bytes = n,
                    on_wire = n + UDP_IP_HEADER_SIZE,
                    %dest,
                    "telemetry payload sent"
                );
            }
            Err(e) => {
                warn!(error = %e, "transmission failed; retrying next period");
                self.stats.failed_sends.fetch_add(1, Ordering::Relaxed);
            }
        }
        handle.close();
    }

    /// Registration events are the only writers of `Connected` and
    /// `Disconnected`; everything else is informational.
    fn on_event(&mut self, event: ModemEvent) {
        match event {
            ModemEvent::RegistrationStatus(status) => match status {
                RegistrationStatus::Home | RegistrationStatus::Roaming => {
                    info!(?status, "network registered; link connected");
                    self.state.set(LinkState::Connected);
                    self.stats.registrations.fetch_add(1, Ordering::Relaxed);
                }
                RegistrationStatus::NotRegistered => {
                    info!("network deregistered; link offline");
                    self.state.set(LinkState::Disconnected);
                }
                RegistrationStatus::Searching => {
                    debug!("searching for network");
                }
            },
            ModemEvent::PowerSaveParamsUpdated {
                active_time_s,
                periodic_tau_s,
            } => {
                info!(active_time_s, periodic_tau_s, "power save parameters updated");
            }
            ModemEvent::IdleReceiveParamsUpdated { cycle_s, window_s } => {
                info!(cycle_s, window_s, "idle receive parameters updated");
            }
            ModemEvent::RadioResourceMode(mode) => {
                debug!(?mode, "radio resource mode changed");
            }
            ModemEvent::CellUpdate {
                cell_id,
                tracking_area,
            } => {
                info!(cell_id, tracking_area, "serving cell changed");
            }
        }
    }
}
