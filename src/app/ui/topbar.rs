// src/app/ui/topbar.rs
use eframe::egui as eg;

use crate::app::data::ListKind;

impl crate::app::MovieScraperApp {
    // ---------- TOP BAR ----------
    pub(crate) fn ui_render_topbar(&mut self, ui: &mut eg::Ui) {
        let mut submit = false;

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label(eg::RichText::new("Enter Username:").size(15.0));
            let resp = ui.add(
                eg::TextEdit::singleline(&mut self.username)
                    .hint_text("mustapp username")
                    .desired_width(260.0),
            );
            if resp.lost_focus() && ui.input(|i| i.key_pressed(eg::Key::Enter)) {
                submit = true;
            }

            ui.separator();

            for kind in [ListKind::Want, ListKind::Watched] {
                ui.radio_value(&mut self.list_kind, kind, kind.label());
            }

            ui.separator();

            let search = ui
                .add_enabled(self.state.search_enabled, eg::Button::new("Search"))
                .on_hover_text("Scrape the selected list and load its posters");
            if search.clicked() {
                submit = true;
            }

            if self.state.progress_active {
                ui.add(eg::Spinner::new().size(16.0));
            }
        });
        ui.add_space(6.0);

        // The trigger is disabled while a search runs; Enter must respect that too.
        if submit && self.state.search_enabled {
            self.start_search();
        }
    }
}
