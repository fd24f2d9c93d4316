use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct StoreMetrics {
    // Generation Stats
    pub total_chunks_generated: AtomicUsize,
    pub total_generation_time_us: AtomicU64,
    pub max_generation_time_us: AtomicU64,

    // Storage Read
    pub total_chunks_loaded: AtomicUsize,
    pub total_load_time_us: AtomicU64,
    pub total_chunks_missing: AtomicUsize,
    pub total_sections_skipped: AtomicUsize,

    // Storage Write
    pub total_chunks_saved: AtomicUsize,
    pub total_save_time_us: AtomicU64,
    pub max_save_time_us: AtomicU64,
    pub total_failed_saves: AtomicUsize,

    // Session
    pub start_time: Option<Instant>,
    pub config_summary: String,
}

impl StoreMetrics {
    pub fn new(config_summary: String) -> Self {
        Self {
            start_time: Some(Instant::now()),
            config_summary,
            ..Default::default()
        }
    }

    pub fn record_generation(&self, duration: Duration) {
        self.total_chunks_generated.fetch_add(1, Ordering::Relaxed);
        let us = duration.as_micros() as u64;
        self.total_generation_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_generation_time_us.fetch_max(us, Ordering::Relaxed);
    }

    /// `skipped_sections` counts sections left default because they could not be decoded.
    pub fn record_load(&self, duration: Duration, skipped_sections: usize) {
        self.total_chunks_loaded.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.total_sections_skipped.fetch_add(skipped_sections, Ordering::Relaxed);
    }

    pub fn record_missing(&self, duration: Duration) {
        self.total_chunks_missing.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_save(&self, duration: Duration) {
        self.total_chunks_saved.fetch_add(1, Ordering::Relaxed);
        let us = duration.as_micros() as u64;
        self.total_save_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_save_time_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn record_failed_save(&self) {
        self.total_failed_saves.fetch_add(1, Ordering::Relaxed);
    }

    pub fn generate_report(&self) -> String {
        let uptime = self.start_time.unwrap_or_else(Instant::now).elapsed();
        let ms = |counter: &AtomicU64| counter.load(Ordering::Relaxed) as f64 / 1000.0;
        let avg = |total: f64, n: usize| if n > 0 { total / n as f64 } else { 0.0 };

        let generated = self.total_chunks_generated.load(Ordering::Relaxed);
        let gen_total = ms(&self.total_generation_time_us);

        let loaded = self.total_chunks_loaded.load(Ordering::Relaxed);
        let missing = self.total_chunks_missing.load(Ordering::Relaxed);
        let load_total = ms(&self.total_load_time_us);

        let saved = self.total_chunks_saved.load(Ordering::Relaxed);
        let save_total = ms(&self.total_save_time_us);

        format!(
            "Stratum Store Report\n\
             ====================\n\
             Configuration: {}\n\
             Session Duration: {:.2?}\n\n\
             [Generation]\n\
             Chunks Generated: {}\n\
             Avg Time: {:.2} ms/chunk\n\
             Max Time: {:.2} ms\n\n\
             [Storage Read]\n\
             Chunks Loaded: {}\n\
             Chunks Not Found: {}\n\
             Sections Skipped: {}\n\
             Avg Time: {:.2} ms/request\n\n\
             [Storage Write]\n\
             Chunks Saved: {}\n\
             Failed Saves: {}\n\
             Avg Time: {:.2} ms/chunk\n\
             Max Time: {:.2} ms\n",
            self.config_summary,
            uptime,
            generated, avg(gen_total, generated), ms(&self.max_generation_time_us),
            loaded, missing, self.total_sections_skipped.load(Ordering::Relaxed),
            avg(load_total, loaded + missing),
            saved, self.total_failed_saves.load(Ordering::Relaxed),
            avg(save_total, saved), ms(&self.max_save_time_us),
        )
    }
}
