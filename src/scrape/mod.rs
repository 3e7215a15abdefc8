// src/scrape/mod.rs
pub mod extract;
pub mod session;

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::app::data::{ListKind, MovieRecord};
use crate::config::AppConfig;
use crate::error::FetchError;

pub use self::extract::extract_movies;
pub use self::session::{
    scroll_until_stable, HttpSession, HttpSessionFactory, PageSession, ScrollPolicy,
    SessionFactory,
};

pub const DEBUG_PAGE_SOURCE_FILE: &str = "debug_page_source.html";

/// Turns a username and list kind into that list's movies.
///
/// `Ok(vec![])` means the page rendered but listed nothing; `Err` means it
/// could not be fetched or read at all.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, username: &str, kind: ListKind) -> Result<Vec<MovieRecord>, FetchError>;
}

pub fn profile_list_url(base_url: &str, username: &str, kind: ListKind) -> String {
    format!(
        "{}/@{}/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(username),
        kind.as_str()
    )
}

/// Open, scroll, extract.
pub struct RenderedPageFetcher<F: SessionFactory> {
    sessions: F,
    base_url: String,
    scroll: ScrollPolicy,
    debug_dump: Option<PathBuf>,
}

impl<F: SessionFactory> RenderedPageFetcher<F> {
    pub fn new(sessions: F, cfg: &AppConfig) -> Self {
        Self {
            sessions,
            base_url: cfg.base_url.clone(),
            scroll: ScrollPolicy {
                max_scrolls: cfg.max_scrolls,
                pause: Duration::from_millis(cfg.scroll_pause_ms),
            },
            debug_dump: cfg
                .debug_save_page_source
                .then(|| PathBuf::from(DEBUG_PAGE_SOURCE_FILE)),
        }
    }
}

impl RenderedPageFetcher<HttpSessionFactory> {
    pub fn http(cfg: &AppConfig) -> Result<Self, FetchError> {
        let sessions = HttpSessionFactory::new(
            &cfg.user_agent,
            Duration::from_secs(cfg.page_timeout_secs),
        )?;
        Ok(Self::new(sessions, cfg))
    }
}

impl<F: SessionFactory> PageFetcher for RenderedPageFetcher<F> {
    fn fetch(&self, username: &str, kind: ListKind) -> Result<Vec<MovieRecord>, FetchError> {
        let url = profile_list_url(&self.base_url, username, kind);
        let started = Instant::now();
        info!("Fetching {url}");

        let mut session = self.sessions.open(&url)?;
        session.select_list(kind)?;
        let grown = scroll_until_stable(&mut session, self.scroll)?;
        let html = session.html()?;

        if let Some(path) = &self.debug_dump {
            match fs::write(path, &html) {
                Ok(()) => info!("Page source saved to {}", path.display()),
                Err(e) => warn!("failed to save page source to {}: {e}", path.display()),
            }
        }

        let movies = extract_movies(&html)?;
        info!(
            "{} movies in '{}' list of {username} ({} scrolls, {:.2}s)",
            movies.len(),
            kind.as_str(),
            grown,
            started.elapsed().as_secs_f32()
        );
        Ok(movies)
    }
}
