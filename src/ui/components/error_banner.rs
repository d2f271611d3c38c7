//! Terminal error banner

use crate::ui::theme::Theme;
use egui::{RichText, Stroke};

/// Persistent banner shown once a session has failed
pub struct ErrorBanner<'a> {
    message: &'a str,
    theme: &'a Theme,
}

impl<'a> ErrorBanner<'a> {
    pub fn new(message: &'a str, theme: &'a Theme) -> Self {
        Self { message, theme }
    }

    pub fn show(self, ui: &mut egui::Ui) -> egui::Response {
        egui::Frame::none()
            .fill(self.theme.error.gamma_multiply(0.12))
            .stroke(Stroke::new(1.0, self.theme.error))
            .rounding(self.theme.card_rounding)
            .inner_margin(self.theme.spacing)
            .show(ui, |ui| {
                ui.set_max_width(self.theme.card_width);
                ui.label(
                    RichText::new("An error occurred")
                        .size(16.0)
                        .strong()
                        .color(self.theme.error),
                );
                ui.add_space(self.theme.spacing_sm);

                let response = ui.label(
                    RichText::new(self.message).color(self.theme.text_primary),
                );
                let label = format!("Error: {}", self.message);
                response.widget_info(|| {
                    egui::WidgetInfo::labeled(egui::WidgetType::Label, true, &label)
                });
            })
            .response
    }
}
