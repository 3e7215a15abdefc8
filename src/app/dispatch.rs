// src/app/dispatch.rs
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use eframe::egui as eg;
use tracing::debug;

use super::state::UiState;

pub type UiJob = Box<dyn FnOnce(&mut UiState) + Send + 'static>;

/// The one way for a background thread to touch UI state: queue a closure
/// for the UI thread. Jobs posted from one thread run in posting order.
#[derive(Clone)]
pub struct UiPoster {
    tx: Sender<UiJob>,
    repaint: Option<eg::Context>,
}

impl UiPoster {
    pub fn post<F>(&self, work: F)
    where
        F: FnOnce(&mut UiState) + Send + 'static,
    {
        if self.tx.send(Box::new(work)).is_err() {
            debug!("UI inbox closed; dropping job");
            return;
        }
        if let Some(ctx) = &self.repaint {
            ctx.request_repaint();
        }
    }
}

/// UI-thread end of the channel.
pub struct UiInbox {
    rx: Receiver<UiJob>,
}

impl UiInbox {
    /// Run up to `max` queued jobs against `state`; returns how many ran.
    pub fn drain(&self, state: &mut UiState, max: usize) -> usize {
        let mut ran = 0usize;
        while ran < max {
            match self.rx.try_recv() {
                Ok(job) => {
                    job(state);
                    ran += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        ran
    }
}

/// `repaint` wakes the egui loop after each post; headless callers pass `None`.
pub fn ui_channel(repaint: Option<eg::Context>) -> (UiPoster, UiInbox) {
    let (tx, rx) = mpsc::channel();
    (UiPoster { tx, repaint }, UiInbox { rx })
}
