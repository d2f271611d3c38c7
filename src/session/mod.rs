//! Session lifecycle: device initialization, connection sequencing and the
//! worker that runs them.

pub mod controller;
pub mod initializer;
pub mod sequencer;

pub use controller::{SessionController, SessionHandle};
pub use initializer::DeviceInitializer;
pub use sequencer::ConnectionSequencer;
