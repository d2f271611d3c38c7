//! Configuration card
//!
//! Device pickers, the "start with audio off" preference and the start
//! control. The start control is only clickable when the session can start;
//! otherwise it shows a spinner next to the current transport status.

use crate::state::SessionSnapshot;
use crate::transport::AudioDeviceInfo;
use crate::ui::theme::Theme;
use crate::ui::view::{start_label, UiAction};
use egui::{RichText, Vec2};

/// Configuration screen shown before a session is active
pub struct ConfigureCard<'a> {
    snapshot: &'a SessionSnapshot,
    theme: &'a Theme,
}

impl<'a> ConfigureCard<'a> {
    pub fn new(snapshot: &'a SessionSnapshot, theme: &'a Theme) -> Self {
        Self { snapshot, theme }
    }

    /// Show the card and return the user's action, if any
    pub fn show(self, ui: &mut egui::Ui) -> Option<UiAction> {
        let mut action = None;

        self.theme.card_frame().show(ui, |ui| {
            ui.set_max_width(self.theme.card_width);

            ui.heading(RichText::new("Configuration").color(self.theme.text_primary));
            ui.label(
                RichText::new("Please configure your devices and pipeline settings below")
                    .color(self.theme.text_muted),
            );
            ui.add_space(self.theme.spacing);

            self.show_hint(ui);
            ui.add_space(self.theme.spacing);

            let devices = &self.snapshot.devices;
            if let Some(name) = device_select(
                ui,
                "Microphone",
                &devices.mics,
                devices.selected_mic.as_deref(),
            ) {
                action = Some(UiAction::SelectMic(name));
            }
            if let Some(name) = device_select(
                ui,
                "Speaker",
                &devices.speakers,
                devices.selected_speaker.as_deref(),
            ) {
                action = Some(UiAction::SelectSpeaker(name));
            }

            ui.add_space(self.theme.spacing_sm);

            let mut audio_off = self.snapshot.start_audio_off;
            if ui.checkbox(&mut audio_off, "Start with audio off").changed() {
                action = Some(UiAction::SetStartAudioOff(audio_off));
            }

            ui.add_space(self.theme.spacing);
            ui.separator();
            ui.add_space(self.theme.spacing_sm);

            if self.show_start_button(ui) {
                action = Some(UiAction::Start);
            }
        });

        action
    }

    fn show_hint(&self, ui: &mut egui::Ui) {
        egui::Frame::none()
            .fill(self.theme.hint_bg)
            .rounding(self.theme.button_rounding)
            .inner_margin(egui::Margin::symmetric(self.theme.spacing, self.theme.spacing_sm))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.vertical_centered(|ui| {
                    ui.label(
                        RichText::new("Works best in a quiet environment with a good internet.")
                            .size(13.0)
                            .color(self.theme.text_secondary),
                    );
                });
            });
    }

    /// Returns true when the start control was clicked
    fn show_start_button(&self, ui: &mut egui::Ui) -> bool {
        let enabled = self.snapshot.can_start();
        let label = start_label(self.snapshot);

        ui.horizontal(|ui| {
            if !enabled {
                ui.add(egui::Spinner::new().size(18.0));
            }

            let button = egui::Button::new(RichText::new(label).size(16.0))
                .min_size(Vec2::new(160.0, 36.0))
                .rounding(self.theme.button_rounding);
            let response = ui.add_enabled(enabled, button);
            response.widget_info(|| {
                egui::WidgetInfo::labeled(egui::WidgetType::Button, enabled, "Start session")
            });
            response.on_hover_text(label).clicked()
        })
        .inner
    }
}

/// Labelled device picker; returns a newly chosen device name
fn device_select(
    ui: &mut egui::Ui,
    label: &str,
    devices: &[AudioDeviceInfo],
    selected: Option<&str>,
) -> Option<String> {
    let mut chosen = None;

    ui.horizontal(|ui| {
        ui.add_sized([90.0, 20.0], egui::Label::new(label));
        egui::ComboBox::from_id_salt(label)
            .width(260.0)
            .selected_text(selected.unwrap_or("No device"))
            .show_ui(ui, |ui| {
                for device in devices {
                    let is_selected = selected == Some(device.name.as_str());
                    let text = if device.is_default {
                        format!("{} (default)", device.name)
                    } else {
                        device.name.clone()
                    };
                    if ui.selectable_label(is_selected, text).clicked() && !is_selected {
                        chosen = Some(device.name.clone());
                    }
                }
            });
    });

    chosen
}
