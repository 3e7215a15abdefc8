// src/scrape/session.rs
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::app::data::ListKind;
use crate::error::FetchError;

/// A rendered page we can scroll and read back.
///
/// A real browser backend grows the document as it scrolls; the plain HTTP
/// backend has a fixed document and stops the scroll loop right away.
pub trait PageSession {
    /// Switch to the tab listing `kind` if the page shows tabs.
    fn select_list(&mut self, _kind: ListKind) -> Result<(), FetchError> {
        Ok(())
    }
    fn scroll_height(&mut self) -> Result<u64, FetchError>;
    fn scroll_to_bottom(&mut self) -> Result<(), FetchError>;
    fn html(&mut self) -> Result<String, FetchError>;
}

/// Opens one session per fetch.
pub trait SessionFactory: Send + Sync {
    type Session: PageSession;
    fn open(&self, url: &str) -> Result<Self::Session, FetchError>;
}

#[derive(Clone, Copy, Debug)]
pub struct ScrollPolicy {
    pub max_scrolls: u32,
    pub pause: Duration,
}

/// Scroll until the height stops changing or `max_scrolls` is spent.
/// Returns the number of scrolls that grew the page.
pub fn scroll_until_stable<S: PageSession + ?Sized>(
    session: &mut S,
    policy: ScrollPolicy,
) -> Result<u32, FetchError> {
    let mut last_height = session.scroll_height()?;
    let mut grown = 0u32;
    while grown < policy.max_scrolls {
        session.scroll_to_bottom()?;
        if !policy.pause.is_zero() {
            std::thread::sleep(policy.pause);
        }
        let new_height = session.scroll_height()?;
        debug!(
            "scroll attempt {}: last height = {last_height}, new height = {new_height}",
            grown + 1
        );
        if new_height == last_height {
            break;
        }
        last_height = new_height;
        grown += 1;
    }
    Ok(grown)
}

// ---- static HTTP backend ----

pub struct HttpSessionFactory {
    client: Client,
}

impl HttpSessionFactory {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl SessionFactory for HttpSessionFactory {
    type Session = HttpSession;

    fn open(&self, url: &str) -> Result<HttpSession, FetchError> {
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = resp.text()?;
        debug!("fetched {url}: {} bytes", body.len());
        Ok(HttpSession { body })
    }
}

/// Server-rendered HTML only; nothing loads on scroll.
pub struct HttpSession {
    body: String,
}

impl PageSession for HttpSession {
    fn scroll_height(&mut self) -> Result<u64, FetchError> {
        Ok(self.body.len() as u64)
    }

    fn scroll_to_bottom(&mut self) -> Result<(), FetchError> {
        Ok(())
    }

    fn html(&mut self) -> Result<String, FetchError> {
        Ok(self.body.clone())
    }
}
