//! The `notify`-based debounce loop shared by the credential file and the
//! routing table (spec §4.2's "the credential file is watched" and §4.7's
//! routing-table reload), the file-watching half `gateway_pool::reload` and
//! `gateway_routing::loader` deliberately leave to this crate. Only the
//! watch + debounce lives here; diffing a credential set and migrating a
//! routing file stay pure functions the caller applies to each
//! [`WatchEvent`].

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedFile {
    Credentials,
    Routing,
}

#[derive(Debug)]
pub struct WatchEvent {
    pub file: WatchedFile,
}

/// Starts watching `credentials_path` and `routing_path` for changes,
/// coalescing bursts of filesystem events (editors often write-rename
/// several times for one logical save) into a single [`WatchEvent`] per
/// file once `debounce` has passed with no further activity.
pub fn spawn_watch(
    credentials_path: PathBuf,
    routing_path: PathBuf,
    debounce: Duration,
) -> (WatchHandle, mpsc::Receiver<WatchEvent>) {
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<PathBuf>();
    let (out_tx, out_rx) = mpsc::channel::<WatchEvent>(16);

    let watcher = spawn_raw_watcher(&credentials_path, &routing_path, raw_tx);

    let handle = tokio::spawn(async move {
        let mut pending: Option<(WatchedFile, Instant)> = None;
        loop {
            let timeout = pending
                .map(|(_, deadline)| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::from_secs(3600));

            tokio::select! {
                changed = raw_rx.recv() => {
                    let Some(path) = changed else { break; };
                    let Some(file) = classify(&path, &credentials_path, &routing_path) else { continue; };
                    pending = Some((file, Instant::now() + debounce));
                }
                _ = tokio::time::sleep(timeout), if pending.is_some() => {
                    if let Some((file, _)) = pending.take() {
                        if out_tx.send(WatchEvent { file }).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });

    (WatchHandle { _watcher: watcher, task: handle }, out_rx)
}

fn classify(changed: &Path, credentials_path: &Path, routing_path: &Path) -> Option<WatchedFile> {
    if changed == credentials_path {
        Some(WatchedFile::Credentials)
    } else if changed == routing_path {
        Some(WatchedFile::Routing)
    } else {
        None
    }
}

fn spawn_raw_watcher(
    credentials_path: &Path,
    routing_path: &Path,
    tx: mpsc::UnboundedSender<PathBuf>,
) -> RecommendedWatcher {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if let Ok(event) = res {
            for path in event.paths {
                let _ = tx.send(path);
            }
        }
    })
    .expect("the platform filesystem-event backend is available");

    for path in [credentials_path, routing_path] {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            let _ = watcher.watch(dir, RecursiveMode::NonRecursive);
        }
    }
    watcher
}

/// Keeps the `notify` watcher and the debounce task alive for as long as
/// this handle is held; dropping it stops watching.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
