// src/app/mod.rs

use std::sync::Arc;
use std::time::Duration;

use eframe::egui as eg;
use tracing::info;

use crate::config::AppConfig;
use crate::error::StartupError;
use crate::scrape::{PageFetcher, RenderedPageFetcher};

pub mod data;
pub mod dispatch;
pub mod gfx;
pub mod pool;
pub mod search;
pub mod state;
pub mod types;
mod ui;

pub use self::data::{ListKind, MovieRecord, SearchRequest};
pub use self::dispatch::{ui_channel, UiInbox, UiPoster};
pub use self::pool::{HttpPosterSource, ImagePool, PosterSource};
pub use self::search::{SearchHandles, Searcher};
pub use self::state::{UiState, APP_TITLE};

// ---- Tunables ----
const MAX_JOBS_PER_FRAME: usize = 64;
const MAX_UPLOADS_PER_FRAME: usize = 8;

pub struct MovieScraperApp {
    cfg: AppConfig,
    state: UiState,
    inbox: UiInbox,
    searcher: Searcher,

    // input widgets
    username: String,
    list_kind: ListKind,

    // last title pushed to the window
    applied_title: String,
}

impl MovieScraperApp {
    pub fn new(ctx: &eg::Context, cfg: AppConfig) -> Result<Self, StartupError> {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(RenderedPageFetcher::http(&cfg)?);
        Self::with_fetcher(ctx, cfg, fetcher)
    }

    /// Same as `new` with a caller-supplied page fetcher (e.g. a browser backend).
    pub fn with_fetcher(
        ctx: &eg::Context,
        cfg: AppConfig,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Result<Self, StartupError> {
        let (ui, inbox) = ui_channel(Some(ctx.clone()));
        let source = HttpPosterSource::new(
            &cfg.user_agent,
            Duration::from_secs(cfg.image_timeout_secs),
        )?;
        let pool = ImagePool::start(
            cfg.image_workers,
            Arc::new(source),
            gfx::ThumbBounds {
                max_w: cfg.thumb_max_width,
                max_h: cfg.thumb_max_height,
            },
            ui.clone(),
        )?;

        Ok(Self {
            list_kind: cfg.default_list_kind,
            cfg,
            state: UiState::default(),
            inbox,
            searcher: Searcher::new(fetcher, pool, ui),
            username: String::new(),
            applied_title: APP_TITLE.to_string(),
        })
    }

    pub(crate) fn start_search(&mut self) {
        let request = SearchRequest::new(self.username.clone(), self.list_kind);
        // Threads run detached; the trigger stays disabled until they report back.
        let _ = self.searcher.start_search(&mut self.state, request);
    }

    fn sync_window_title(&mut self, ctx: &eg::Context) {
        if self.applied_title != self.state.window_title {
            self.applied_title = self.state.window_title.clone();
            ctx.send_viewport_cmd(eg::ViewportCommand::Title(self.applied_title.clone()));
        }
    }
}

impl Drop for MovieScraperApp {
    fn drop(&mut self) {
        info!("window closing; releasing image pool");
        self.searcher.pool().shutdown();
    }
}

impl eframe::App for MovieScraperApp {
    fn update(&mut self, ctx: &eg::Context, _frame: &mut eframe::Frame) {
        // Background results first, so this frame paints them.
        let ran = self.inbox.drain(&mut self.state, MAX_JOBS_PER_FRAME);
        if ran == MAX_JOBS_PER_FRAME {
            ctx.request_repaint();
        }
        self.sync_window_title(ctx);

        eg::TopBottomPanel::top("search_bar").show(ctx, |ui| self.ui_render_topbar(ui));
        eg::TopBottomPanel::bottom("status_bar").show(ctx, |ui| self.ui_render_status(ui));
        eg::CentralPanel::default().show(ctx, |ui| self.ui_render_gallery(ui, ctx));
        self.ui_render_dialog(ctx);
    }
}
