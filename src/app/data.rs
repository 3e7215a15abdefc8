// src/app/data.rs
/// One entry scraped from a profile list.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MovieRecord {
    pub title: String,
    pub poster_url: String,
}

impl MovieRecord {
    pub fn new(title: impl Into<String>, poster_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            poster_url: poster_url.into(),
        }
    }

    /// Both fields must carry something besides whitespace.
    pub fn is_well_formed(&self) -> bool {
        !self.title.trim().is_empty() && !self.poster_url.trim().is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ListKind {
    #[default]
    Want,
    Watched,
}

impl ListKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Want => "want",
            Self::Watched => "watched",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Want => "Want to Watch",
            Self::Watched => "Watched",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "want" => Some(Self::Want),
            "watched" => Some(Self::Watched),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRequest {
    pub username: String,
    pub list_kind: ListKind,
}

impl SearchRequest {
    pub fn new(username: impl Into<String>, list_kind: ListKind) -> Self {
        Self {
            username: username.into(),
            list_kind,
        }
    }
}
