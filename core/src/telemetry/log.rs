use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Reports tool progress the way a geoprocessing host shows it: a label and a
/// percentage position. Safe to share across worker threads.
pub struct Progressor {
    position: AtomicUsize,
    label: Mutex<String>,
}

impl Progressor {
    pub fn new() -> Self {
        Self {
            position: AtomicUsize::new(0),
            label: Mutex::new(String::new()),
        }
    }

    pub fn set_label(&self, label: &str) {
        if let Ok(mut current) = self.label.lock() {
            current.clear();
            current.push_str(label);
        }
        info!("{}", label);
    }

    pub fn set_position(&self, percent: usize) {
        self.position.store(percent.min(100), Ordering::Relaxed);
    }

    /// Sets both position and label for item `index` (0-based) of `total`.
    pub fn step(&self, prefix: &str, index: usize, total: usize) {
        let total = total.max(1);
        self.set_position(index * 100 / total);
        self.set_label(&format!("{} {}/{}...", prefix, index + 1, total));
    }

    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    pub fn label(&self) -> String {
        self.label
            .lock()
            .map(|label| label.clone())
            .unwrap_or_default()
    }

    pub fn record(&self, message: &str) {
        info!("{}", message);
    }
}

impl Default for Progressor {
    fn default() -> Self {
        Self::new()
    }
}
