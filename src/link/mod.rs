//! Link state machine building blocks: the state/target/flag cells and
//! the feature configuration manager. The state machine itself runs in
//! [`crate::runtime`].

pub mod features;
pub mod state;

pub use features::{FeatureError, FeatureManager};
pub use state::{FeatureFlags, LinkState, LinkStateCell, LinkTarget, TargetCell};

/// Commands the input dispatcher issues against the link.
///
/// Implemented by [`crate::runtime::UplinkHandle`]; tests substitute a
/// recording implementation.
pub trait LinkControl {
    /// Snapshot of the current link state.
    fn state(&self) -> LinkState;

    /// Ask the controller to converge to `target`. Non-blocking.
    fn request_transition(&self, target: LinkTarget);

    /// Ask for an immediate out-of-cycle transmission. Non-blocking.
    fn transmit_now(&self);

    /// Live feature toggles.
    fn flags(&self) -> &FeatureFlags;
}
