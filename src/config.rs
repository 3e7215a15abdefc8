use std::{env, fs, path::Path, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::app::data::ListKind;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "MOVIESCRAPE_CONFIG";
pub const DEFAULT_BASE_URL: &str = "https://mustapp.com";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub base_url: String,
    pub user_agent: String,
    pub page_timeout_secs: u64,
    pub max_scrolls: u32,
    pub scroll_pause_ms: u64,
    pub image_workers: usize,
    pub image_timeout_secs: u64,
    pub thumb_max_width: u32,
    pub thumb_max_height: u32,
    pub grid_columns: usize,
    pub default_list_kind: ListKind,
    pub debug_save_page_source: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: format!("moviescrape/{}", env!("CARGO_PKG_VERSION")),
            page_timeout_secs: 30,
            max_scrolls: 10,
            scroll_pause_ms: 1000,
            image_workers: 8,
            image_timeout_secs: 10,
            thumb_max_width: 75,
            thumb_max_height: 125,
            grid_columns: 4,
            default_list_kind: ListKind::Want,
            debug_save_page_source: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    base_url: Option<String>,
    user_agent: Option<String>,
    page_timeout_secs: Option<u64>,
    max_scrolls: Option<u32>,
    scroll_pause_ms: Option<u64>,
    #[serde(alias = "workers")]
    image_workers: Option<usize>,
    image_timeout_secs: Option<u64>,
    thumb_max_width: Option<u32>,
    thumb_max_height: Option<u32>,
    grid_columns: Option<usize>,
    default_list_kind: Option<String>,
    debug_save_page_source: Option<bool>,
}

/// Load `config.json` (or `$MOVIESCRAPE_CONFIG`) over the defaults.
pub fn load_config() -> AppConfig {
    let cfg_path = env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    load_config_from(&cfg_path)
}

pub fn load_config_from(cfg_path: &Path) -> AppConfig {
    let mut cfg = AppConfig::default();

    match fs::read_to_string(cfg_path) {
        Ok(raw) => match serde_json::from_str::<RawConfig>(&raw) {
            Ok(parsed) => {
                cfg.apply(parsed);
                info!("Loaded config from {}", cfg_path.display());
            }
            Err(err) => {
                warn!(
                    "Failed to parse {} ({}). Using defaults.",
                    cfg_path.display(),
                    err
                );
            }
        },
        Err(_) => {
            info!("No {} found; using defaults", cfg_path.display());
        }
    }

    cfg
}

impl AppConfig {
    fn apply(&mut self, parsed: RawConfig) {
        if let Some(url) = parsed.base_url {
            let url = url.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                self.base_url = url.to_string();
            } else {
                warn!("Ignoring base_url `{url}` in config; it must start with http:// or https://.");
            }
        }
        if let Some(ua) = parsed.user_agent.filter(|s| !s.trim().is_empty()) {
            self.user_agent = ua;
        }
        if let Some(n) = parsed.page_timeout_secs {
            self.page_timeout_secs = n.clamp(1, 300);
        }
        if let Some(n) = parsed.max_scrolls {
            self.max_scrolls = n.min(100);
        }
        if let Some(n) = parsed.scroll_pause_ms {
            self.scroll_pause_ms = n.min(10_000);
        }
        if let Some(n) = parsed.image_workers {
            self.image_workers = n.clamp(1, 32);
        }
        if let Some(n) = parsed.image_timeout_secs {
            self.image_timeout_secs = n.clamp(1, 120);
        }
        if let Some(n) = parsed.thumb_max_width {
            self.thumb_max_width = n.clamp(16, 1024);
        }
        if let Some(n) = parsed.thumb_max_height {
            self.thumb_max_height = n.clamp(16, 1024);
        }
        if let Some(n) = parsed.grid_columns {
            self.grid_columns = n.clamp(1, 16);
        }
        if let Some(kind) = parsed.default_list_kind {
            match ListKind::parse(&kind) {
                Some(k) => self.default_list_kind = k,
                None => warn!(
                    "Unknown default_list_kind `{kind}` in config; falling back to `want`."
                ),
            }
        }
        if let Some(flag) = parsed.debug_save_page_source {
            self.debug_save_page_source = flag;
        }
    }
}
