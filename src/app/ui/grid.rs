// src/app/ui/grid.rs
use eframe::egui as eg;

use crate::app::gfx;
use crate::app::types::SlotState;

const H_SPACING: f32 = 8.0;
const V_SPACING: f32 = 10.0;
const TITLE_H: f32 = 40.0;

impl crate::app::MovieScraperApp {
    /// Poster cards in search order: card `i` sits at row `i / cols`, column `i % cols`.
    pub(crate) fn ui_render_gallery(&mut self, ui: &mut eg::Ui, ctx: &eg::Context) {
        if self.state.slots.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.weak("Enter a username and press Search.");
            });
            return;
        }

        let cols = self.cfg.grid_columns.max(1);
        let poster_w = self.cfg.thumb_max_width as f32;
        let poster_h = self.cfg.thumb_max_height as f32;
        let card_w = poster_w * 2.0;

        let mut uploads_left = super::super::MAX_UPLOADS_PER_FRAME;
        let mut uploads_waiting = false;

        eg::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .show(ui, |ui| {
                eg::Grid::new("poster_grid")
                    .num_columns(cols)
                    .spacing([H_SPACING, V_SPACING])
                    .min_col_width(card_w)
                    .show(ui, |ui| {
                        for (i, slot) in self.state.slots.iter_mut().enumerate() {
                            // bounded texture uploads per frame
                            if let SlotState::Image(poster) = &mut slot.state {
                                if poster.tex.is_none() && uploads_left > 0 {
                                    let name = format!(
                                        "{}_{}_{}",
                                        gfx::texture_key(&slot.record.poster_url),
                                        slot.id.search,
                                        slot.id.index
                                    );
                                    poster.tex = Some(gfx::upload_poster(ctx, &poster.image, &name));
                                    uploads_left -= 1;
                                } else if poster.tex.is_none() {
                                    uploads_waiting = true;
                                }
                            }

                            ui.allocate_ui_with_layout(
                                eg::vec2(card_w, poster_h + TITLE_H),
                                eg::Layout::top_down(eg::Align::Center),
                                |ui| {
                                    ui.set_width(card_w);
                                    ui.add(
                                        eg::Label::new(eg::RichText::new(&slot.record.title).strong())
                                            .wrap(),
                                    );

                                    match &slot.state {
                                        SlotState::Image(poster) => {
                                            let size = eg::vec2(
                                                poster.image.size[0] as f32,
                                                poster.image.size[1] as f32,
                                            );
                                            let (rect, _) =
                                                ui.allocate_exact_size(size, eg::Sense::hover());
                                            match &poster.tex {
                                                Some(tex) => ui.painter().image(
                                                    tex.id(),
                                                    rect,
                                                    eg::Rect::from_min_max(
                                                        eg::pos2(0.0, 0.0),
                                                        eg::pos2(1.0, 1.0),
                                                    ),
                                                    eg::Color32::WHITE,
                                                ),
                                                None => ui.painter().rect_filled(
                                                    rect,
                                                    4.0,
                                                    eg::Color32::from_gray(40),
                                                ),
                                            };
                                        }
                                        SlotState::Loading => {
                                            let (rect, _) = ui.allocate_exact_size(
                                                eg::vec2(poster_w, poster_h),
                                                eg::Sense::hover(),
                                            );
                                            ui.painter().rect_filled(
                                                rect,
                                                4.0,
                                                eg::Color32::from_gray(40),
                                            );
                                            ui.put(rect, eg::Spinner::new().size(14.0));
                                        }
                                        SlotState::Error(msg) => {
                                            ui.add(
                                                eg::Label::new(
                                                    eg::RichText::new(msg)
                                                        .small()
                                                        .color(ui.visuals().error_fg_color),
                                                )
                                                .wrap(),
                                            );
                                        }
                                    }
                                },
                            );

                            if (i + 1) % cols == 0 {
                                ui.end_row();
                            }
                        }
                        ui.end_row();
                    });
            });

        // Decoded posters past the budget still need a frame to get painted.
        if uploads_waiting {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::app::data::{ListKind, MovieRecord};
    use crate::app::types::SlotState;
    use crate::app::MovieScraperApp;
    use crate::config::AppConfig;
    use crate::error::FetchError;
    use crate::scrape::PageFetcher;
    use eframe::egui::{self as eg, ColorImage, Color32, ViewportId};
    use std::sync::Arc;
    use std::time::Duration;

    struct NoPages;

    impl PageFetcher for NoPages {
        fn fetch(&self, _username: &str, _kind: ListKind) -> Result<Vec<MovieRecord>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn untextured(app: &MovieScraperApp) -> usize {
        app.state
            .slots
            .iter()
            .filter(|s| matches!(&s.state, SlotState::Image(p) if p.tex.is_none()))
            .count()
    }

    #[test]
    fn posters_past_the_upload_budget_get_another_frame() {
        let ctx = eg::Context::default();
        let mut app =
            MovieScraperApp::with_fetcher(&ctx, AppConfig::default(), Arc::new(NoPages)).unwrap();

        let search = app.state.begin_search();
        for i in 0..20 {
            let record = MovieRecord::new(format!("m{i}"), format!("http://x/{i}.jpg"));
            let id = app.state.create_slot(search, i, record).unwrap();
            assert!(app
                .state
                .resolve_slot(id, Ok(ColorImage::new([75, 125], Color32::GRAY))));
        }

        let mut frames = 0;
        while untextured(&app) > 0 {
            assert!(frames < 5, "posters never finished uploading");
            let output = ctx.run(eg::RawInput::default(), |ctx| {
                eg::CentralPanel::default().show(ctx, |ui| app.ui_render_gallery(ui, ctx));
            });
            frames += 1;
            if untextured(&app) > 0 {
                let delay = output.viewport_output[&ViewportId::ROOT].repaint_delay;
                assert_eq!(delay, Duration::ZERO, "frame {frames} left posters waiting");
            }
        }
        assert_eq!(frames, 3);
    }
}
