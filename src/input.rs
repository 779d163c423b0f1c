//! # Debounced Input Dispatcher
//!
//! Converts physical input edges into semantic link commands. The line
//! provider reports "one or more lines changed" with a bitmask; the
//! dispatcher samples each changed line once and acts on the level. It
//! never touches radio or transport I/O itself — it only flips flags and
//! posts non-blocking commands through [`LinkControl`].
//!
//! Debounce is the provider's job: the dispatcher trusts one callback per
//! logical edge.

use anyhow::Result;
use tracing::{debug, info};

use crate::link::{LinkControl, LinkState, LinkTarget};

/// Monitored input lines and their roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Line {
    /// Momentary action: request an immediate transmission.
    TransmitNow = 0,
    /// Momentary action: toggle the link up or down.
    LinkToggle = 1,
    /// Level toggle: power-save feature.
    PowerSave = 2,
    /// Level toggle: release-assist feature.
    ReleaseAssist = 3,
}

pub const ALL_LINES: [Line; 4] = [
    Line::TransmitNow,
    Line::LinkToggle,
    Line::PowerSave,
    Line::ReleaseAssist,
];

/// Bitmask of lines reported changed by one edge callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineMask(u8);

impl LineMask {
    pub const fn empty() -> Self {
        LineMask(0)
    }

    pub const fn all() -> Self {
        LineMask(0b1111)
    }

    pub fn single(line: Line) -> Self {
        LineMask(1 << line as u8)
    }

    pub fn with(self, line: Line) -> Self {
        LineMask(self.0 | (1 << line as u8))
    }

    pub fn contains(self, line: Line) -> bool {
        self.0 & (1 << line as u8) != 0
    }
}

/// Discrete input line provider: configuration and level reads.
///
/// The edge callback is modeled as the owner invoking
/// [`Dispatcher::dispatch`] with the mask of changed lines.
pub trait InputLines: Send + Sync {
    fn configure_as_input(&self, line: Line) -> Result<()>;
    fn configure_edge_interrupt(&self, line: Line) -> Result<()>;
    fn read_level(&self, line: Line) -> bool;
}

/// Sample the feature toggle lines, returning their levels as
/// `(power_save, release_assist)`. Used once at startup, before the
/// runtime exists, to capture the initial switch positions.
pub fn sample_feature_levels(lines: &dyn InputLines) -> (bool, bool) {
    (
        lines.read_level(Line::PowerSave),
        lines.read_level(Line::ReleaseAssist),
    )
}

/// Edge-to-command dispatcher with per-feature shadow values.
///
/// The shadows detect toggle changes (edge rather than level); each shadow
/// equals its live flag except during the dispatch cycle that observes a
/// change.
pub struct Dispatcher<C: LinkControl, L: InputLines> {
    control: C,
    lines: L,
    power_save_shadow: bool,
    release_assist_shadow: bool,
}

impl<C: LinkControl, L: InputLines> Dispatcher<C, L> {
    pub fn new(control: C, lines: L) -> Self {
        Dispatcher {
            control,
            lines,
            power_save_shadow: false,
            release_assist_shadow: false,
        }
    }

    /// Configure every monitored line for edge interrupts and seed the
    /// shadows from the current live flags.
    pub fn init(&mut self) -> Result<()> {
        for line in ALL_LINES {
            self.lines.configure_as_input(line)?;
            self.lines.configure_edge_interrupt(line)?;
        }
        self.power_save_shadow = self.control.flags().power_save();
        self.release_assist_shadow = self.control.flags().release_assist();
        Ok(())
    }

    /// Handle one edge callback covering the lines in `mask`.
    pub fn dispatch(&mut self, mask: LineMask) {
        let state = self.control.state();
        debug!(?mask, %state, "input edge");

        if mask.contains(Line::TransmitNow) && self.lines.read_level(Line::TransmitNow) {
            if state == LinkState::Connected {
                info!("transmit-now pressed; scheduling immediate upload");
                self.control.transmit_now();
            } else {
                debug!(%state, "transmit-now ignored while link not connected");
            }
        }

        if mask.contains(Line::LinkToggle) && self.lines.read_level(Line::LinkToggle) {
            match state {
                LinkState::Connected => {
                    info!("link-toggle pressed; taking link down");
                    self.control.request_transition(LinkTarget::Disconnected);
                }
                LinkState::Disconnected => {
                    info!("link-toggle pressed; bringing link up");
                    self.control.request_transition(LinkTarget::Connected);
                }
                LinkState::Transitioning => {
                    debug!("link-toggle ignored during transition");
                }
            }
        }

        // Feature toggles update live flags unconditionally; two changes
        // in one cycle still trigger at most one reconnection.
        let mut reconfigure = false;

        if mask.contains(Line::PowerSave) {
            let level = self.lines.read_level(Line::PowerSave);
            if level != self.power_save_shadow {
                info!(enabled = level, "power-save toggle changed");
                self.control.flags().set_power_save(level);
                self.power_save_shadow = level;
                reconfigure = true;
            }
        }

        if mask.contains(Line::ReleaseAssist) {
            let level = self.lines.read_level(Line::ReleaseAssist);
            if level != self.release_assist_shadow {
                info!(enabled = level, "release-assist toggle changed");
                self.control.flags().set_release_assist(level);
                self.release_assist_shadow = level;
                reconfigure = true;
            }
        }

        if reconfigure {
            if state == LinkState::Connected {
                info!("feature toggles changed; reconfiguring through reconnect");
                self.control.request_transition(LinkTarget::Connected);
            } else {
                debug!(%state, "feature change recorded; applied on next connect");
            }
        }
    }
}
