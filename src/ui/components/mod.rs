//! UI components module
//!
//! One component per screen. Components render from a session snapshot and
//! report what the user did as a [`UiAction`](crate::ui::UiAction); they never
//! touch the session directly.

pub mod configure_card;
pub mod error_banner;
pub mod session_panel;

pub use configure_card::ConfigureCard;
pub use error_banner::ErrorBanner;
pub use session_panel::SessionPanel;
