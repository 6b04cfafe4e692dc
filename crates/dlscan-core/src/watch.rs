//! Directory watching and per-file dispatch.

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, UNIX_EPOCH};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::error::Result;
use crate::models::config::WatchConfig;

/// Extensions accepted as license images.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Whether the path has an image extension (case-insensitive).
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|i| ext.eq_ignore_ascii_case(i)))
}

/// Bounded memory of which file versions were already dispatched.
///
/// Keys are `(path, mtime seconds)`. Entries older than `ttl` are dropped on
/// every insert; if the set is still over capacity, the oldest entry goes.
#[derive(Debug)]
pub struct SeenSet {
    entries: HashMap<(PathBuf, u64), Instant>,
    capacity: usize,
    ttl: Duration,
}

impl SeenSet {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(
            config.seen_capacity,
            Duration::from_secs(config.seen_ttl_secs),
        )
    }

    /// Record a file version. Returns `false` if it was already seen.
    pub fn insert(&mut self, path: &Path, mtime: u64) -> bool {
        self.insert_at(path, mtime, Instant::now())
    }

    fn insert_at(&mut self, path: &Path, mtime: u64, now: Instant) -> bool {
        let ttl = self.ttl;
        self.entries
            .retain(|_, seen| now.saturating_duration_since(*seen) < ttl);

        let key = (path.to_path_buf(), mtime);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, now);

        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, seen)| **seen)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    self.entries.remove(&k);
                }
                None => break,
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Starts one pipeline run for a file.
///
/// Implementations must return quickly; the run itself happens elsewhere
/// (a child process, a spawned task).
pub trait PipelineRunner {
    fn dispatch(&self, path: &Path);
}

/// Turns filesystem events into pipeline runs.
pub struct Dispatcher<R> {
    runner: R,
    seen: SeenSet,
    debounce: Duration,
}

impl<R: PipelineRunner> Dispatcher<R> {
    pub fn new(runner: R, config: &WatchConfig) -> Self {
        Self {
            runner,
            seen: SeenSet::from_config(config),
            debounce: Duration::from_millis(config.debounce_ms),
        }
    }

    /// Override the settle delay before a new file is read.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Handle one event. Returns how many pipeline runs were dispatched.
    pub async fn handle_event(&mut self, event: Event) -> usize {
        if !matches!(event.kind, EventKind::Create(_)) {
            trace!("Ignoring event {:?}", event.kind);
            return 0;
        }

        let candidates: Vec<PathBuf> = event
            .paths
            .into_iter()
            .filter(|p| is_image_path(p) && !p.is_dir())
            .collect();
        if candidates.is_empty() {
            return 0;
        }

        // Let the writer finish before the file is read.
        tokio::time::sleep(self.debounce).await;

        let mut dispatched = 0;
        for path in candidates {
            let Some(mtime) = modified_secs(&path) else {
                debug!("{} disappeared before processing", path.display());
                continue;
            };
            if !self.seen.insert(&path, mtime) {
                debug!("Already processed {} (mtime {})", path.display(), mtime);
                continue;
            }
            info!("Processing file: {}", path.display());
            self.runner.dispatch(&path);
            dispatched += 1;
        }
        dispatched
    }

    /// Handle events until the channel closes or `shutdown` completes.
    ///
    /// Shutdown also interrupts an event that is still in its debounce wait;
    /// that event is dropped without dispatching.
    pub async fn run<F>(&mut self, events: &mut mpsc::Receiver<notify::Result<Event>>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let event = tokio::select! {
                _ = &mut shutdown => break,
                event = events.recv() => event,
            };
            match event {
                Some(Ok(event)) => tokio::select! {
                    _ = &mut shutdown => break,
                    _ = self.handle_event(event) => {}
                },
                Some(Err(e)) => warn!("Watch error: {}", e),
                None => break,
            }
        }
        debug!("Dispatcher stopped");
    }
}

fn modified_secs(path: &Path) -> Option<u64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(
        modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    )
}

/// Watch `dir` (non-recursive), forwarding events to a channel.
///
/// The watcher stops when the returned handle is dropped.
pub fn watch_directory(
    dir: &Path,
) -> Result<(RecommendedWatcher, mpsc::Receiver<notify::Result<Event>>)> {
    let (tx, rx) = mpsc::channel(100);

    let mut watcher = notify::recommended_watcher(move |res| {
        if let Err(e) = tx.blocking_send(res) {
            error!("Failed to forward file event: {:?}", e);
        }
    })?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    info!("Watching {}", dir.display());

    Ok((watcher, rx))
}
