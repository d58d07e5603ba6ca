//! Watches the engine config file and pushes reloaded configuration to the
//! run loop, debounced so a single save doesn't fire twice.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

use ledctl_engine::EngineConfig;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Starts a background thread that watches `config_path`'s parent directory
/// (so editors that write via a temp file + rename are still caught) and
/// sends a freshly-parsed [`EngineConfig`] down the returned channel on every
/// relevant change.
///
/// The `notify::RecommendedWatcher` must be kept alive for as long as
/// watching should continue; it is returned alongside the receiver.
///
/// # Errors
///
/// Returns an error if the underlying OS file watcher cannot be created or
/// the config file's parent directory cannot be watched.
pub fn watch(config_path: &Path) -> notify::Result<(RecommendedWatcher, Receiver<EngineConfig>)> {
    let (event_tx, event_rx): (Sender<notify::Result<Event>>, Receiver<notify::Result<Event>>) = channel();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        if event_tx.send(res).is_err() {
            debug!("config watcher channel closed; dropping file event");
        }
    })?;

    let watch_target = config_path.parent().filter(|p| p.exists()).unwrap_or(config_path);
    watcher.watch(watch_target, RecursiveMode::NonRecursive)?;
    info!(?watch_target, "watching for config changes");

    let (config_tx, config_rx) = channel();
    let config_path = config_path.to_path_buf();

    std::thread::spawn(move || run_event_loop(&config_path, &event_rx, &config_tx));

    Ok((watcher, config_rx))
}

fn run_event_loop(config_path: &Path, event_rx: &Receiver<notify::Result<Event>>, config_tx: &Sender<EngineConfig>) {
    let mut last_reload = None::<Instant>;

    while let Ok(event_result) = event_rx.recv() {
        let event = match event_result {
            Ok(event) => event,
            Err(err) => {
                warn!(%err, "config watcher received an error event");
                continue;
            }
        };

        if !is_relevant(&event) || !event.paths.iter().any(|p| paths_match(p, config_path)) {
            continue;
        }

        if last_reload.is_some_and(|t| t.elapsed() < DEBOUNCE) {
            continue;
        }
        last_reload = Some(Instant::now());

        match EngineConfig::load(config_path) {
            Ok(config) => {
                info!(?config_path, "reloaded config after file change");
                if config_tx.send(config).is_err() {
                    break;
                }
            }
            Err(err) => error!(%err, ?config_path, "failed to reload config after file change"),
        }
    }

    debug!("config watcher event loop exiting");
}

fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_))
}

fn paths_match(event_path: &Path, config_path: &Path) -> bool {
    event_path == config_path || event_path.file_name() == config_path.file_name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_same_file_name_in_different_representations() {
        let config_path = PathBuf::from("/etc/ledctl/config.json");
        assert!(paths_match(Path::new("/etc/ledctl/config.json"), &config_path));
        assert!(!paths_match(Path::new("/etc/ledctl/plugins.json"), &config_path));
    }
}
