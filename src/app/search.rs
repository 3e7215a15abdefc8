// src/app/search.rs
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use itertools::Itertools;
use tracing::{debug, error, info, warn};

use super::data::{MovieRecord, SearchRequest};
use super::dispatch::UiPoster;
use super::pool::ImagePool;
use super::state::UiState;
use super::types::{Handoff, ImageTask, SearchEnd};
use crate::scrape::PageFetcher;

/// Runs searches: one fetch thread and one drain thread per search, image
/// work on the shared pool.
pub struct Searcher {
    fetcher: Arc<dyn PageFetcher>,
    pool: ImagePool,
    ui: UiPoster,
}

/// Threads of one running search. Dropping them detaches the threads.
pub struct SearchHandles {
    pub search_id: u64,
    pub fetch: JoinHandle<()>,
    pub drain: JoinHandle<()>,
}

impl Searcher {
    pub fn new(fetcher: Arc<dyn PageFetcher>, pool: ImagePool, ui: UiPoster) -> Self {
        Self { fetcher, pool, ui }
    }

    pub const fn pool(&self) -> &ImagePool {
        &self.pool
    }

    /// Kick off a search. UI thread only.
    ///
    /// Returns `None` when nothing was started (empty username or the
    /// threads could not be spawned); the reason is already on screen.
    pub fn start_search(
        &self,
        state: &mut UiState,
        request: SearchRequest,
    ) -> Option<SearchHandles> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            state.show_info("Please enter a username!");
            return None;
        }
        let request = SearchRequest::new(username, request.list_kind);

        let search_id = state.begin_search();
        info!(
            "search #{search_id}: '{}' list of {}",
            request.list_kind.as_str(),
            request.username
        );

        let (queue_tx, queue_rx) = mpsc::channel::<Handoff>();

        let drain = {
            let ui = self.ui.clone();
            let pool = self.pool.clone();
            std::thread::Builder::new()
                .name("search-drain".into())
                .spawn(move || drain_queue(&queue_rx, search_id, &ui, &pool))
        };
        let drain = match drain {
            Ok(h) => h,
            Err(e) => {
                abort_start(state, &e);
                return None;
            }
        };

        let fetch = {
            let ui = self.ui.clone();
            let fetcher = Arc::clone(&self.fetcher);
            std::thread::Builder::new()
                .name("search-fetch".into())
                .spawn(move || run_fetch(&*fetcher, &request, queue_tx, ui))
        };
        // A failed spawn drops the sender, so the drain thread ends on its own.
        let fetch = match fetch {
            Ok(h) => h,
            Err(e) => {
                abort_start(state, &e);
                return None;
            }
        };

        Some(SearchHandles {
            search_id,
            fetch,
            drain,
        })
    }
}

fn abort_start(state: &mut UiState, err: &std::io::Error) {
    error!("failed to start search thread: {err}");
    state.show_error(format!("An error occurred: {err}"));
    state.set_status(format!("Error: {err}"));
    state.finish_search(Duration::ZERO);
}

/// Owns the producer side of a search. Whatever happens to the fetch, the
/// drop sends the sentinel (if still owed) and restores the controls.
struct SearchGuard {
    queue: Sender<Handoff>,
    ui: UiPoster,
    started: Instant,
    ended: bool,
}

impl SearchGuard {
    fn push(&self, movie: MovieRecord) {
        if self.queue.send(Handoff::Movie(movie)).is_err() {
            warn!("display consumer is gone; record dropped");
        }
    }

    fn finish(&mut self, end: SearchEnd) {
        if self.ended {
            return;
        }
        self.ended = true;
        if self.queue.send(Handoff::End(end)).is_err() {
            warn!("display consumer is gone before {end:?}");
        }
    }
}

impl Drop for SearchGuard {
    fn drop(&mut self) {
        self.finish(SearchEnd::Failed);
        let elapsed = self.started.elapsed();
        info!("search finished in {:.2}s", elapsed.as_secs_f64());
        self.ui.post(move |state| state.finish_search(elapsed));
    }
}

fn run_fetch(
    fetcher: &dyn PageFetcher,
    request: &SearchRequest,
    queue: Sender<Handoff>,
    ui: UiPoster,
) {
    let mut guard = SearchGuard {
        queue,
        ui: ui.clone(),
        started: Instant::now(),
        ended: false,
    };
    let kind = request.list_kind.as_str();

    let fetched = panic::catch_unwind(AssertUnwindSafe(|| {
        fetcher.fetch(&request.username, request.list_kind)
    }));

    match fetched {
        Ok(Err(e)) => {
            error!("fetch failed ({}) for '{kind}' list: {e}", e.kind());
            let message = format!("Could not fetch movies: {e}");
            ui.post(move |state| {
                state.show_error(message);
                state.set_status("Search Error.");
            });
            guard.finish(SearchEnd::Failed);
        }
        Ok(Ok(movies)) if movies.is_empty() => {
            info!("no movies in '{kind}' list");
            let message = format!("No movies found for this user's '{kind}' list.");
            ui.post(move |state| {
                state.show_info(message);
                state.set_status("No movies found.");
            });
            guard.finish(SearchEnd::Empty);
        }
        Ok(Ok(movies)) => {
            let fetched_count = movies.len();
            let mut total = 0usize;
            for movie in movies.into_iter().unique() {
                if !movie.is_well_formed() {
                    warn!("Skipping invalid movie data: {movie:?}");
                    continue;
                }
                guard.push(movie);
                total += 1;
            }
            info!("queued {total} of {fetched_count} fetched movies");

            let status = format!("Found {total} movies in '{kind}' list, displaying…");
            ui.post(move |state| state.set_status(status));
            guard.finish(SearchEnd::Completed { total });
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!("fetch panicked: {reason}");
            ui.post(move |state| {
                state.show_error(format!("An error occurred: {reason}"));
                state.set_status(format!("Error: {reason}"));
            });
            guard.finish(SearchEnd::Failed);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected failure".into())
}

/// Display consumer: one slot per record, in queue order, until the sentinel.
fn drain_queue(queue: &Receiver<Handoff>, search_id: u64, ui: &UiPoster, pool: &ImagePool) {
    let mut index = 0usize;
    loop {
        match queue.recv() {
            Ok(Handoff::Movie(movie)) => {
                debug!("dequeued #{index}: {}", movie.title);
                let pool = pool.clone();
                let i = index;
                ui.post(move |state| add_movie_slot(state, &pool, search_id, i, movie));
                index += 1;
            }
            Ok(Handoff::End(SearchEnd::Completed { total })) => {
                debug!("queue drained after {index} movies");
                ui.post(move |state| show_display_complete(state, search_id, total));
                break;
            }
            Ok(Handoff::End(end)) => {
                debug!("queue closed with {end:?}");
                break;
            }
            Err(_) => {
                warn!("handoff queue disconnected without a sentinel");
                break;
            }
        }
    }
}

/// Not ordered with the fetch thread's cleanup, so a newer search may already own the status.
fn show_display_complete(state: &mut UiState, search_id: u64, total: usize) {
    if state.search_id() != search_id {
        debug!("dropping completion of stale search {search_id}");
        return;
    }
    state.set_status(format!("Display complete: {total} displayed"));
}

/// UI-thread half of slot creation: add the placeholder, then queue its image.
fn add_movie_slot(
    state: &mut UiState,
    pool: &ImagePool,
    search_id: u64,
    index: usize,
    movie: MovieRecord,
) {
    let Some(slot) = state.create_slot(search_id, index, movie.clone()) else {
        return;
    };
    if let Err(e) = pool.submit(ImageTask { movie, slot }) {
        warn!("could not queue poster #{index}: {e}");
        state.resolve_slot(slot, Err(format!("Error: {e}")));
    }
}

#[cfg(test)]
mod tests {
    use super::{show_display_complete, SearchHandles, Searcher};
    use crate::app::data::{ListKind, MovieRecord, SearchRequest};
    use crate::app::dispatch::{ui_channel, UiInbox};
    use crate::app::gfx::ThumbBounds;
    use crate::app::pool::{HttpPosterSource, ImagePool, PosterSource};
    use crate::app::state::UiState;
    use crate::app::types::{DialogKind, SlotState};
    use crate::error::{FetchError, ImageError};
    use crate::scrape::PageFetcher;
    use image::{DynamicImage, ImageFormat, RgbaImage};
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    const BOUNDS: ThumbBounds = ThumbBounds { max_w: 75, max_h: 125 };

    enum Script {
        Movies(Vec<MovieRecord>),
        Fail,
        Panic,
    }

    struct ScriptedFetcher {
        script: Script,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(script: Script) -> Arc<Self> {
            Arc::new(Self { script, calls: AtomicUsize::new(0) })
        }
    }

    impl PageFetcher for ScriptedFetcher {
        fn fetch(&self, username: &str, kind: ListKind) -> Result<Vec<MovieRecord>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Movies(m) => Ok(m.clone()),
                Script::Fail => Err(FetchError::Http {
                    status: 503,
                    url: format!("https://mustapp.com/@{username}/{}", kind.as_str()),
                }),
                Script::Panic => panic!("renderer exploded"),
            }
        }
    }

    struct PngSource;

    impl PosterSource for PngSource {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>, ImageError> {
            Ok(png(30, 45))
        }
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::new(w, h))
            .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn searcher(
        fetcher: Arc<dyn PageFetcher>,
        source: Arc<dyn PosterSource>,
    ) -> (Searcher, UiInbox, UiState) {
        let (ui, inbox) = ui_channel(None);
        let pool = ImagePool::start(4, source, BOUNDS, ui.clone()).unwrap();
        (Searcher::new(fetcher, pool, ui), inbox, UiState::default())
    }

    /// Stand-in for the egui frame loop.
    fn pump(inbox: &UiInbox, state: &mut UiState, until: impl Fn(&UiState) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            inbox.drain(state, 64);
            if until(state) {
                return;
            }
            assert!(Instant::now() < deadline, "timed out; status = {}", state.status);
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn wait_finished(handles: &SearchHandles) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !(handles.fetch.is_finished() && handles.drain.is_finished()) {
            assert!(Instant::now() < deadline, "search threads still running");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn titles(state: &UiState) -> Vec<&str> {
        state.slots.iter().map(|s| s.record.title.as_str()).collect()
    }

    #[test]
    fn duplicates_collapse_and_display_completes() {
        let fetcher = ScriptedFetcher::new(Script::Movies(vec![
            MovieRecord::new("Dune", "http://x/1.jpg"),
            MovieRecord::new("Dune", "http://x/1.jpg"),
            MovieRecord::new("Arrival", "http://x/2.jpg"),
        ]));
        let (searcher, inbox, mut state) = searcher(fetcher, Arc::new(PngSource));

        let handles = searcher
            .start_search(&mut state, SearchRequest::new("alice", ListKind::Want))
            .unwrap();
        assert!(!state.search_enabled);
        assert!(state.progress_active);
        assert_eq!(state.status, "Searching…");

        wait_finished(&handles);
        pump(&inbox, &mut state, |s| s.search_enabled && s.terminal_count() == 2);

        assert_eq!(titles(&state), ["Dune", "Arrival"]);
        assert_eq!(state.status, "Display complete: 2 displayed");
        assert!(!state.progress_active);
        assert!(state.window_title.starts_with("Movie Scraper (Search time: "));
        assert!(state.dialogs.is_empty());
        assert!(state
            .slots
            .iter()
            .all(|s| matches!(&s.state, SlotState::Image(p) if p.image.size == [30, 45])));
    }

    #[test]
    fn malformed_records_are_skipped_and_not_counted() {
        let fetcher = ScriptedFetcher::new(Script::Movies(vec![
            MovieRecord::new("", "http://x/0.jpg"),
            MovieRecord::new("Heat", "http://x/3.jpg"),
            MovieRecord::new("Alien", "   "),
        ]));
        let (searcher, inbox, mut state) = searcher(fetcher, Arc::new(PngSource));

        let handles = searcher
            .start_search(&mut state, SearchRequest::new("bob", ListKind::Watched))
            .unwrap();
        wait_finished(&handles);
        pump(&inbox, &mut state, |s| s.search_enabled && s.terminal_count() == 1);

        assert_eq!(titles(&state), ["Heat"]);
        assert_eq!(state.status, "Display complete: 1 displayed");
    }

    #[test]
    fn empty_username_starts_nothing_and_keeps_results() {
        let fetcher = ScriptedFetcher::new(Script::Movies(Vec::new()));
        let (searcher, inbox, mut state) = searcher(fetcher.clone(), Arc::new(PngSource));
        let search = state.begin_search();
        state.create_slot(search, 0, MovieRecord::new("Kept", "http://x/k.jpg"));
        state.finish_search(Duration::ZERO);
        state.set_status("Display complete: 1 displayed");

        let started = searcher.start_search(&mut state, SearchRequest::new("   ", ListKind::Want));
        assert!(started.is_none());
        assert_eq!(inbox.drain(&mut state, 64), 0);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert_eq!(titles(&state), ["Kept"]);
        assert_eq!(state.status, "Display complete: 1 displayed");
        assert!(state.search_enabled);
        assert_eq!(state.dialogs.len(), 1);
        assert_eq!(state.dialogs[0].kind, DialogKind::Info);
        assert_eq!(state.dialogs[0].message, "Please enter a username!");
    }

    #[test]
    fn fetch_failure_reports_once_and_releases_the_consumer() {
        let fetcher = ScriptedFetcher::new(Script::Fail);
        let (searcher, inbox, mut state) = searcher(fetcher, Arc::new(PngSource));

        let handles = searcher
            .start_search(&mut state, SearchRequest::new("alice", ListKind::Want))
            .unwrap();
        wait_finished(&handles);
        pump(&inbox, &mut state, |s| s.search_enabled);

        assert!(!state.progress_active);
        assert!(state.slots.is_empty());
        assert_eq!(state.status, "Search Error.");
        assert_eq!(state.dialogs.len(), 1);
        assert_eq!(state.dialogs[0].kind, DialogKind::Error);
        assert!(state.dialogs[0].message.contains("HTTP 503"));
    }

    #[test]
    fn empty_list_is_informational() {
        let fetcher = ScriptedFetcher::new(Script::Movies(Vec::new()));
        let (searcher, inbox, mut state) = searcher(fetcher, Arc::new(PngSource));

        let handles = searcher
            .start_search(&mut state, SearchRequest::new("alice", ListKind::Watched))
            .unwrap();
        wait_finished(&handles);
        pump(&inbox, &mut state, |s| s.search_enabled);

        assert!(state.slots.is_empty());
        assert_eq!(state.status, "No movies found.");
        assert_eq!(state.dialogs.len(), 1);
        assert_eq!(state.dialogs[0].kind, DialogKind::Info);
        assert!(state.dialogs[0].message.contains("'watched'"));
    }

    #[test]
    fn panicking_fetcher_still_cleans_up() {
        let fetcher = ScriptedFetcher::new(Script::Panic);
        let (searcher, inbox, mut state) = searcher(fetcher, Arc::new(PngSource));

        let handles = searcher
            .start_search(&mut state, SearchRequest::new("alice", ListKind::Want))
            .unwrap();
        wait_finished(&handles);
        pump(&inbox, &mut state, |s| s.search_enabled);

        assert!(!state.progress_active);
        assert!(state.slots.is_empty());
        assert_eq!(state.dialogs.len(), 1);
        assert_eq!(state.dialogs[0].message, "An error occurred: renderer exploded");
        assert_eq!(state.status, "Error: renderer exploded");
    }

    #[test]
    fn a_new_search_replaces_the_gallery() {
        let fetcher = ScriptedFetcher::new(Script::Movies(vec![MovieRecord::new(
            "Dune",
            "http://x/1.jpg",
        )]));
        let (searcher, inbox, mut state) = searcher(fetcher, Arc::new(PngSource));

        for _ in 0..2 {
            let handles = searcher
                .start_search(&mut state, SearchRequest::new("alice", ListKind::Want))
                .unwrap();
            wait_finished(&handles);
            pump(&inbox, &mut state, |s| s.search_enabled && s.terminal_count() == 1);
        }
        assert_eq!(state.search_id(), 2);
        assert_eq!(titles(&state), ["Dune"]);
    }

    #[test]
    fn shut_down_pool_marks_slots_as_errors() {
        let fetcher = ScriptedFetcher::new(Script::Movies(vec![MovieRecord::new(
            "Dune",
            "http://x/1.jpg",
        )]));
        let (searcher, inbox, mut state) = searcher(fetcher, Arc::new(PngSource));
        searcher.pool().shutdown();

        let handles = searcher
            .start_search(&mut state, SearchRequest::new("alice", ListKind::Want))
            .unwrap();
        wait_finished(&handles);
        pump(&inbox, &mut state, |s| s.search_enabled && s.terminal_count() == 1);

        assert!(
            matches!(&state.slots[0].state, SlotState::Error(m) if m == "Error: image pool is shut down")
        );
    }

    #[test]
    fn late_completion_of_an_old_search_keeps_the_new_status() {
        let mut state = UiState::default();
        let old = state.begin_search();
        state.finish_search(Duration::ZERO);
        let new = state.begin_search();

        show_display_complete(&mut state, old, 3);
        assert_eq!(state.status, "Searching…");

        show_display_complete(&mut state, new, 1);
        assert_eq!(state.status, "Display complete: 1 displayed");
    }

    /// Serves `/ok` as a png and never answers `/slow`.
    fn poster_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let mut parked = Vec::new();
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap_or_default();
                loop {
                    let mut header = String::new();
                    match reader.read_line(&mut header) {
                        Ok(0) => break,
                        Ok(_) if header == "\r\n" => break,
                        Ok(_) => continue,
                        Err(_) => break,
                    }
                }
                if request_line.contains("/slow") {
                    parked.push(stream);
                    continue;
                }
                let body = png(40, 60);
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&body);
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn slow_poster_times_out_without_affecting_siblings() {
        let base = poster_server();
        let fetcher = ScriptedFetcher::new(Script::Movies(vec![
            MovieRecord::new("Fast", format!("{base}/ok")),
            MovieRecord::new("Stuck", format!("{base}/slow")),
            MovieRecord::new("Also fast", format!("{base}/ok?2")),
        ]));
        let source = HttpPosterSource::new("moviescrape-test", Duration::from_millis(300)).unwrap();
        let (searcher, inbox, mut state) = searcher(fetcher, Arc::new(source));

        let handles = searcher
            .start_search(&mut state, SearchRequest::new("alice", ListKind::Want))
            .unwrap();
        wait_finished(&handles);
        pump(&inbox, &mut state, |s| s.search_enabled && s.terminal_count() == 3);

        assert!(matches!(&state.slots[0].state, SlotState::Image(p) if p.image.size == [40, 60]));
        assert!(
            matches!(&state.slots[1].state, SlotState::Error(m) if m.starts_with("Error loading image: "))
        );
        assert!(matches!(&state.slots[2].state, SlotState::Image(_)));
        assert_eq!(state.status, "Display complete: 3 displayed");
    }
}
