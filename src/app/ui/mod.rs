// src/app/ui/mod.rs
pub mod grid;
pub mod topbar;

use eframe::egui as eg;

use super::types::DialogKind;

impl crate::app::MovieScraperApp {
    pub(crate) fn ui_render_status(&self, ui: &mut eg::Ui) {
        ui.horizontal(|ui| {
            ui.label(&self.state.status);
            if !self.state.slots.is_empty() {
                ui.with_layout(eg::Layout::right_to_left(eg::Align::Center), |ui| {
                    ui.weak(format!(
                        "{}/{} posters",
                        self.state.terminal_count(),
                        self.state.slots.len()
                    ));
                });
            }
        });
    }

    /// Oldest pending dialog, centred, until OK is pressed.
    pub(crate) fn ui_render_dialog(&mut self, ctx: &eg::Context) {
        let Some(dialog) = self.state.dialogs.front() else {
            return;
        };

        let mut dismissed = false;
        eg::Window::new(dialog.kind.title())
            .id(eg::Id::new("message_dialog"))
            .collapsible(false)
            .resizable(false)
            .anchor(eg::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                let text = eg::RichText::new(&dialog.message);
                let text = match dialog.kind {
                    DialogKind::Error => text.color(ui.visuals().error_fg_color),
                    DialogKind::Info => text,
                };
                ui.label(text);
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            });

        if dismissed {
            self.state.dialogs.pop_front();
        }
    }
}
