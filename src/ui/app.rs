//! Main application struct and eframe integration
//!
//! `DemoApp` owns the current session worker and renders whichever view the
//! session snapshot selects. Leaving a session ends in a reload: the worker
//! is shut down and a brand new one is built from the session factory, so
//! nothing from the previous session survives.

use crate::config::DemoConfig;
use crate::error::Result;
use crate::session::SessionHandle;
use crate::state::{SessionEvent, SessionSnapshot};
use crate::ui::components::{ConfigureCard, ErrorBanner, SessionPanel};
use crate::ui::theme::Theme;
use crate::ui::view::{ActiveView, UiAction};
use egui::{CentralPanel, RichText};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Builds a fresh session worker
pub type SessionFactory = Box<dyn Fn() -> Result<SessionHandle>>;

/// Main voice demo application
pub struct DemoApp {
    theme: Theme,
    factory: SessionFactory,
    session: Option<SessionHandle>,
    /// Set when the factory itself failed
    startup_error: Option<String>,
    reloads: u32,
}

impl DemoApp {
    /// Create the application for eframe
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: &DemoConfig,
        factory: SessionFactory,
    ) -> Self {
        let theme = Theme::from_choice(config.theme);
        theme.apply(&cc.egui_ctx);
        Self::with_theme(theme, factory)
    }

    /// Create the application without an eframe context
    pub fn with_theme(theme: Theme, factory: SessionFactory) -> Self {
        let mut app = Self {
            theme,
            factory,
            session: None,
            startup_error: None,
            reloads: 0,
        };
        app.open_session();
        app
    }

    fn open_session(&mut self) {
        match (self.factory)() {
            Ok(handle) => {
                self.session = Some(handle);
                self.startup_error = None;
            }
            Err(e) => {
                error!("Failed to start session worker: {}", e);
                self.startup_error = Some(e.user_message());
            }
        }
    }

    /// Throw the current session away and start over
    pub fn reload(&mut self) {
        info!("Reloading application");
        if let Some(mut session) = self.session.take() {
            session.shutdown();
        }
        self.open_session();
        self.reloads += 1;
    }

    /// How many reloads have happened
    pub fn reloads(&self) -> u32 {
        self.reloads
    }

    /// Current session handle
    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// Snapshot the view is rendered from
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = self
            .session
            .as_ref()
            .map(SessionHandle::snapshot)
            .unwrap_or_default();
        if snapshot.error.is_none() {
            snapshot.error = self.startup_error.clone();
        }
        snapshot
    }

    /// Process pending worker events; reloads if one was requested
    ///
    /// The reload request is read from the shared state, so a dropped event
    /// can't lose it.
    pub fn poll_events(&mut self) {
        let (events, mut reload) = match &self.session {
            Some(session) => (
                session.drain_events(),
                session.state().is_reload_requested(),
            ),
            None => return,
        };

        for event in events {
            match event {
                SessionEvent::StateChanged(state) => debug!("Transport state: {}", state),
                SessionEvent::Retrying { attempt, max } => {
                    debug!("Start retry {}/{}", attempt, max)
                }
                SessionEvent::Started => debug!("Session started"),
                SessionEvent::Failed(e) => warn!("Session failed: {}", e),
                SessionEvent::ReloadRequested => reload = true,
                SessionEvent::Shutdown => debug!("Session worker stopped"),
            }
        }

        if reload {
            self.reload();
        }
    }

    fn dispatch(&self, action: UiAction) {
        debug!("UI action: {:?}", action);
        if let Some(session) = &self.session {
            if let Err(e) = session.send_command(action.into_command()) {
                warn!("Failed to send UI action: {}", e);
            }
        }
    }

    /// Render one frame
    pub fn show(&mut self, ctx: &egui::Context) {
        let snapshot = self.snapshot();
        let view = ActiveView::select(&snapshot);

        let mut action = None;
        CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(self.theme.spacing_lg * 2.0);
                ui.label(
                    RichText::new("Voice Agent Demo")
                        .size(28.0)
                        .strong()
                        .color(self.theme.text_primary),
                );
                ui.add_space(self.theme.spacing_lg);

                match &view {
                    ActiveView::Error(message) => {
                        ErrorBanner::new(message, &self.theme).show(ui);
                    }
                    ActiveView::Session => {
                        action = SessionPanel::new(&snapshot, &self.theme).show(ui);
                    }
                    ActiveView::Configure => {
                        action = ConfigureCard::new(&snapshot, &self.theme).show(ui);
                    }
                }
            });
        });

        if let Some(action) = action {
            self.dispatch(action);
        }
    }

    fn needs_polling(&self) -> bool {
        self.session.is_some() && self.startup_error.is_none()
    }
}

impl eframe::App for DemoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events();
        self.show(ctx);

        // The worker changes state off-thread; keep checking while it runs
        if self.needs_polling() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Voice demo shutting down");
        if let Some(mut session) = self.session.take() {
            session.shutdown();
        }
    }
}
