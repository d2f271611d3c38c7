//! GUI implementation with egui/eframe
//!
//! Renders the voice demo front-end: configuration card, live session panel
//! and the terminal error banner.

mod app;
pub mod components;
mod theme;
mod view;

pub use app::{DemoApp, SessionFactory};
pub use components::{ConfigureCard, ErrorBanner, SessionPanel};
pub use theme::Theme;
pub use view::{start_label, status_text, ActiveView, UiAction};

use crate::config::DemoConfig;

/// Run the voice demo window
pub fn run(config: DemoConfig, factory: SessionFactory) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 640.0])
            .with_min_inner_size([520.0, 480.0])
            .with_title("Voice Agent Demo"),
        ..Default::default()
    };

    eframe::run_native(
        "Voice Demo",
        options,
        Box::new(move |cc| Ok(Box::new(DemoApp::new(cc, &config, factory)))),
    )
}
