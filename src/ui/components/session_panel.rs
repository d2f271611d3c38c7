//! Active session view

use crate::state::SessionSnapshot;
use crate::transport::TransportState;
use crate::ui::theme::Theme;
use crate::ui::view::UiAction;
use egui::{Color32, RichText, Sense, Vec2};

/// Screen shown while a session is connected
pub struct SessionPanel<'a> {
    snapshot: &'a SessionSnapshot,
    theme: &'a Theme,
}

impl<'a> SessionPanel<'a> {
    pub fn new(snapshot: &'a SessionSnapshot, theme: &'a Theme) -> Self {
        Self { snapshot, theme }
    }

    /// Show the panel and return the user's action, if any
    pub fn show(self, ui: &mut egui::Ui) -> Option<UiAction> {
        let mut action = None;

        self.theme.card_frame().show(ui, |ui| {
            ui.set_max_width(self.theme.card_width);

            ui.heading(RichText::new("Session").color(self.theme.text_primary));
            ui.add_space(self.theme.spacing_sm);

            self.show_agent_status(ui);
            ui.label(
                RichText::new(format!("Transport: {}", self.snapshot.transport))
                    .small()
                    .color(self.theme.text_muted),
            );
            ui.add_space(self.theme.spacing);

            let devices = &self.snapshot.devices;
            ui.label(format!(
                "Microphone: {}",
                devices.selected_mic.as_deref().unwrap_or("none")
            ));
            ui.label(format!(
                "Speaker: {}",
                devices.selected_speaker.as_deref().unwrap_or("none")
            ));
            if self.snapshot.start_audio_off {
                ui.label(
                    RichText::new("Joined with audio off")
                        .small()
                        .color(self.theme.text_muted),
                );
            }

            ui.add_space(self.theme.spacing);
            ui.separator();
            ui.add_space(self.theme.spacing_sm);

            ui.horizontal(|ui| {
                let mic_on = self.snapshot.mic_enabled;
                let mic_text = if mic_on { "Mute" } else { "Unmute" };
                let mic = ui.add(
                    egui::Button::new(mic_text)
                        .min_size(Vec2::new(100.0, 32.0))
                        .rounding(self.theme.button_rounding),
                );
                mic.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Toggle microphone")
                });
                if mic.clicked() {
                    action = Some(UiAction::SetMic(!mic_on));
                }

                let leave = ui.add(
                    egui::Button::new(RichText::new("Leave").color(Color32::WHITE))
                        .fill(self.theme.error)
                        .min_size(Vec2::new(100.0, 32.0))
                        .rounding(self.theme.button_rounding),
                );
                leave.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::Button, true, "Leave session")
                });
                if leave.clicked() {
                    action = Some(UiAction::Leave);
                }
            });
        });

        action
    }

    fn show_agent_status(&self, ui: &mut egui::Ui) {
        let (text, color) = match self.snapshot.transport {
            TransportState::Ready => ("Agent ready", self.theme.success),
            _ => ("Waiting for agent...", self.theme.warning),
        };

        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(Vec2::splat(12.0), Sense::hover());
            ui.painter().circle_filled(rect.center(), 5.0, color);

            let response = ui.label(RichText::new(text).color(color));
            response.widget_info(|| {
                egui::WidgetInfo::labeled(egui::WidgetType::Label, true, text)
            });
        });
    }
}
