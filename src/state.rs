//! Shared state handed to every HTTP handler.

use crate::services::{admission::AdmissionGate, media_store::MediaStore};
use std::{sync::Arc, time::Instant};

#[derive(Clone)]
pub struct AppState {
    pub media: MediaStore,
    pub gate: Arc<AdmissionGate>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(media: MediaStore, gate: AdmissionGate) -> Self {
        Self {
            media,
            gate: Arc::new(gate),
            started_at: Instant::now(),
        }
    }
}
