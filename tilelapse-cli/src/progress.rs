//! Terminal progress reporting
//!
//! One progress bar per grid download. The crawler fetches one version at a
//! time, so a new version number in an update means the previous bar is done.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use tilelapse::fetch::{ProgressObserver, ProgressUpdate};

pub struct ConsoleProgress {
    current: Mutex<Option<(u32, ProgressBar)>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    fn bar(total: usize, version: u32) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:>12} {bar:40.cyan/blue} {pos}/{len} tiles")
                .expect("Invalid progress bar template")
                .progress_chars("##-"),
        );
        bar.set_message(format!("version {}", version));
        bar
    }

    /// Finishes the bar of the grid currently in flight, if any.
    pub fn finish(&self) {
        if let Some((_, bar)) = self.current.lock().unwrap().take() {
            bar.finish();
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ConsoleProgress {
    fn tile_transition(&self, update: &ProgressUpdate) {
        let mut current = self.current.lock().unwrap();
        let version = update.address.version;
        match current.as_ref() {
            Some((v, _)) if *v == version => {}
            _ => {
                if let Some((_, old)) = current.take() {
                    old.finish();
                }
                *current = Some((version, Self::bar(update.counts.total, version)));
            }
        }
        if let Some((_, bar)) = current.as_ref() {
            bar.set_position((update.counts.downloaded + update.counts.errors) as u64);
        }
    }
}
