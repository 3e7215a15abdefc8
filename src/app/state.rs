// src/app/state.rs
use std::collections::VecDeque;
use std::time::Duration;

use eframe::egui::ColorImage;
use tracing::debug;

use super::data::MovieRecord;
use super::types::{Dialog, DialogKind, PosterImage, PosterSlot, SlotId, SlotState};

pub const APP_TITLE: &str = "Movie Scraper";

/// Everything the window shows. Owned by the UI thread; background threads
/// only reach it through `UiPoster::post`.
pub struct UiState {
    pub search_enabled: bool,
    pub progress_active: bool,
    pub status: String,
    pub window_title: String,
    pub dialogs: VecDeque<Dialog>,
    pub slots: Vec<PosterSlot>,
    search_id: u64,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            search_enabled: true,
            progress_active: false,
            status: "Ready".into(),
            window_title: APP_TITLE.into(),
            dialogs: VecDeque::new(),
            slots: Vec::new(),
            search_id: 0,
        }
    }
}

impl UiState {
    pub fn set_status<S: Into<String>>(&mut self, s: S) {
        self.status = s.into();
    }

    pub fn show_error<S: Into<String>>(&mut self, message: S) {
        self.dialogs.push_back(Dialog {
            kind: DialogKind::Error,
            message: message.into(),
        });
    }

    pub fn show_info<S: Into<String>>(&mut self, message: S) {
        self.dialogs.push_back(Dialog {
            kind: DialogKind::Info,
            message: message.into(),
        });
    }

    pub const fn search_id(&self) -> u64 {
        self.search_id
    }

    /// Lock the trigger, wipe the gallery and hand out a fresh search id.
    pub fn begin_search(&mut self) -> u64 {
        self.search_id += 1;
        self.search_enabled = false;
        self.progress_active = true;
        self.slots.clear();
        self.set_status("Searching…");
        self.search_id
    }

    pub fn finish_search(&mut self, elapsed: Duration) {
        self.search_enabled = true;
        self.progress_active = false;
        self.window_title = format!(
            "{APP_TITLE} (Search time: {:.2} seconds)",
            elapsed.as_secs_f64()
        );
    }

    /// Add a loading slot for the current search. `None` if `search` is stale.
    pub fn create_slot(
        &mut self,
        search: u64,
        index: usize,
        record: MovieRecord,
    ) -> Option<SlotId> {
        if search != self.search_id {
            debug!("dropping slot {index} of stale search {search}");
            return None;
        }
        let id = SlotId { search, index };
        self.slots.push(PosterSlot {
            id,
            record,
            state: SlotState::Loading,
        });
        Some(id)
    }

    /// Move a slot out of `Loading`. Returns false when the slot is gone or
    /// already resolved.
    pub fn resolve_slot(&mut self, id: SlotId, outcome: Result<ColorImage, String>) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.id == id) else {
            debug!("no slot {id:?} to resolve");
            return false;
        };
        if slot.state.is_terminal() {
            debug!("slot {id:?} already resolved");
            return false;
        }
        slot.state = match outcome {
            Ok(image) => SlotState::Image(PosterImage { image, tex: None }),
            Err(msg) => SlotState::Error(msg),
        };
        true
    }

    pub fn terminal_count(&self) -> usize {
        self.slots.iter().filter(|s| s.state.is_terminal()).count()
    }
}
