// src/app/types.rs
use eframe::egui::{ColorImage, TextureHandle};

use super::data::MovieRecord;

// ---- cross-thread messages ----

/// Items on a search's handoff queue. Exactly one `End` closes every queue.
#[derive(Debug)]
pub enum Handoff {
    Movie(MovieRecord),
    End(SearchEnd),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchEnd {
    Completed { total: usize },
    Empty,
    Failed,
}

/// Work handed to the image pool; the pool paints exactly one slot per task.
#[derive(Clone, Debug)]
pub struct ImageTask {
    pub movie: MovieRecord,
    pub slot: SlotId,
}

// ---- poster slots (UI thread only) ----

/// `search` ties the slot to the search that created it so that late image
/// results from an earlier search land nowhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotId {
    pub search: u64,
    pub index: usize,
}

pub struct PosterImage {
    pub image: ColorImage,
    pub tex: Option<TextureHandle>,
}

pub enum SlotState {
    Loading,
    Image(PosterImage),
    Error(String),
}

impl SlotState {
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }
}

pub struct PosterSlot {
    pub id: SlotId,
    pub record: MovieRecord,
    pub state: SlotState,
}

// ---- dialogs ----

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogKind {
    Error,
    Info,
}

impl DialogKind {
    pub const fn title(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Info => "Info",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dialog {
    pub kind: DialogKind,
    pub message: String,
}
