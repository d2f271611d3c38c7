pub mod config;
pub mod devices;
pub mod error;
pub mod session;
pub mod state;
pub mod transport;
pub mod ui;

pub use config::DemoConfig;
pub use error::{DemoError, Result};
pub use session::{SessionController, SessionHandle};
pub use state::{AppState, SessionCommand, SessionEvent, SessionSnapshot, MAX_RETRIES};
pub use transport::{SimulatedTransport, SimulationConfig, TransportState, VoiceTransport};
