// src/app/pool.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use eframe::egui::ColorImage;
use reqwest::blocking::Client;
use tracing::{debug, error, info, warn};

use super::dispatch::UiPoster;
use super::gfx::{decode_thumbnail, ThumbBounds};
use super::types::ImageTask;
use crate::error::{ImageError, PoolError};

/// Where poster bytes come from.
pub trait PosterSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError>;
}

/// Shared blocking client; the timeout caps how long a worker can hang.
pub struct HttpPosterSource {
    client: Client,
}

impl HttpPosterSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, PoolError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .pool_max_idle_per_host(16)
            .default_headers({
                use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
                let mut h = HeaderMap::new();
                h.insert(
                    ACCEPT,
                    HeaderValue::from_static("image/avif,image/webp,image/*;q=0.8,*/*;q=0.5"),
                );
                h
            })
            .build()?;
        Ok(Self { client })
    }
}

impl PosterSource for HttpPosterSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        let resp = self.client.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }
        Ok(resp.bytes()?.to_vec())
    }
}

struct PoolShared {
    work_tx: Mutex<Option<Sender<ImageTask>>>,
    closed: Arc<AtomicBool>,
}

/// Fixed set of worker threads turning poster urls into slot paints.
///
/// Cloning shares the same workers. `shutdown` never waits for them: tasks
/// already downloading finish and post into the void, queued tasks are
/// dropped.
#[derive(Clone)]
pub struct ImagePool {
    shared: Arc<PoolShared>,
}

impl ImagePool {
    pub fn start(
        workers: usize,
        source: Arc<dyn PosterSource>,
        bounds: ThumbBounds,
        ui: UiPoster,
    ) -> Result<Self, PoolError> {
        let workers = workers.max(1);
        let (work_tx, work_rx) = mpsc::channel::<ImageTask>();
        let work_rx = Arc::new(Mutex::new(work_rx));
        let closed = Arc::new(AtomicBool::new(false));

        // Workers only hold the receiver; dropping the sender ends them.
        for n in 0..workers {
            let work_rx = Arc::clone(&work_rx);
            let source = Arc::clone(&source);
            let closed = Arc::clone(&closed);
            let ui = ui.clone();

            std::thread::Builder::new()
                .name(format!("poster-{n}"))
                .spawn(move || worker_loop(&work_rx, &*source, bounds, &closed, &ui))?;
        }

        info!("image pool started with {workers} workers");
        Ok(Self {
            shared: Arc::new(PoolShared {
                work_tx: Mutex::new(Some(work_tx)),
                closed,
            }),
        })
    }

    /// Queue a task; never blocks.
    pub fn submit(&self, task: ImageTask) -> Result<(), PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }
        let guard = self.shared.work_tx.lock().map_err(|_| PoolError::Closed)?;
        let tx = guard.as_ref().ok_or(PoolError::Closed)?;
        tx.send(task).map_err(|_| PoolError::Closed)
    }

    pub fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut tx) = self.shared.work_tx.lock() {
            tx.take();
        }
        info!("image pool shutdown initiated");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

fn worker_loop(
    work_rx: &Mutex<Receiver<ImageTask>>,
    source: &dyn PosterSource,
    bounds: ThumbBounds,
    closed: &AtomicBool,
    ui: &UiPoster,
) {
    loop {
        let job = match work_rx.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => {
                error!("image work queue lock poisoned; worker exiting");
                break;
            }
        };
        let Ok(task) = job else {
            break;
        };
        if closed.load(Ordering::SeqCst) {
            debug!("pool closed; discarding {}", task.movie.title);
            break;
        }

        let outcome = load_poster(source, &task, bounds).map_err(|e| e.slot_message());
        let slot = task.slot;
        ui.post(move |state| {
            state.resolve_slot(slot, outcome);
        });
    }
}

/// Download, decode and thumbnail one poster, logging each stage.
pub fn load_poster(
    source: &dyn PosterSource,
    task: &ImageTask,
    bounds: ThumbBounds,
) -> Result<ColorImage, ImageError> {
    let title = &task.movie.title;
    let url = &task.movie.poster_url;
    let started = Instant::now();
    debug!("image loading started for {title}: {url}");

    let result = source.fetch(url).and_then(|bytes| {
        let downloaded = started.elapsed();
        debug!(
            "downloaded {} bytes for {title} in {:.2}s",
            bytes.len(),
            downloaded.as_secs_f32()
        );
        let image = decode_thumbnail(&bytes, bounds)?;
        debug!(
            "thumbnail {}x{} for {title} in {:.2}s",
            image.size[0],
            image.size[1],
            (started.elapsed() - downloaded).as_secs_f32()
        );
        Ok(image)
    });

    match &result {
        Ok(_) => debug!(
            "image ready for {title} after {:.2}s",
            started.elapsed().as_secs_f32()
        ),
        Err(e) => warn!(
            "image failed for {title} ({url}) after {:.2}s: {e}",
            started.elapsed().as_secs_f32()
        ),
    }
    result
}
