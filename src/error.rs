// src/error.rs
use thiserror::Error;

/// Why a profile page could not be turned into a movie list.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("page session failed: {0}")]
    Session(String),

    #[error("could not parse page: {0}")]
    Parse(String),
}

impl FetchError {
    /// Log label separating "could not reach" from "could not read".
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) | Self::Http { .. } | Self::Session(_) => "transport",
            Self::Parse(_) => "parse",
        }
    }
}

/// Failure of a single poster download; never leaves its slot.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{0}")]
    Fetch(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Decode(#[from] image::ImageError),
}

impl ImageError {
    /// Inline text shown in the poster slot.
    pub fn slot_message(&self) -> String {
        match self {
            Self::Fetch(_) | Self::Status(_) => format!("Error loading image: {self}"),
            Self::Decode(_) => format!("Error: {self}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("image pool is shut down")]
    Closed,

    #[error("failed to spawn image worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("http client build failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// Anything that stops the window from opening.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Fetcher(#[from] FetchError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}
