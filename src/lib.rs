//! Connectivity-lifecycle controller for a battery-powered telemetry
//! device.
//!
//! The crate manages exactly one wide-area radio link and one periodic
//! upload job bound to that link's availability:
//!
//! - **Link state machine** — every transition runs on a single worker
//!   thread ([`runtime::UplinkRuntime`]); producers only write atomic
//!   cells and post non-blocking messages, so requests may come from
//!   interrupt-like contexts.
//! - **Transmission scheduler** — a periodic job that opens a datagram
//!   transport, sends one fixed-size payload, and reschedules itself;
//!   honored only while the link is registered.
//! - **Feature configuration** — power-save / idle-receive /
//!   release-assist negotiation, re-applied through a full reconnect
//!   whenever a toggle changes on an active link ([`link::features`]).
//! - **Input dispatch** — physical edge-triggered controls mapped to
//!   semantic commands ([`input::Dispatcher`]).
//!
//! External collaborators sit behind traits: [`modem::LinkLifecycle`]
//! (radio bring-up and registration events), [`transport::Transport`]
//! (datagram socket), and [`input::InputLines`] (discrete input lines).
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use uplink::config::UplinkConfig;
//! use uplink::runtime::UplinkRuntime;
//! use uplink::sim::SimModem;
//! use uplink::transport::UdpTransport;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = UplinkConfig::default();
//! let modem = Arc::new(SimModem::new(Duration::from_secs(2)));
//! let runtime = UplinkRuntime::start(config, modem, Arc::new(UdpTransport), true, true)?;
//! runtime.wait_until_ready()?;
//! runtime.arm_transmit();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod input;
pub mod link;
pub mod modem;
pub mod runtime;
pub mod sim;
pub mod transport;

pub use config::UplinkConfig;
pub use link::{FeatureError, FeatureFlags, FeatureManager, LinkControl, LinkState, LinkTarget};
pub use runtime::{StatsSnapshot, UplinkHandle, UplinkRuntime};
