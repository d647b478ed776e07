//! Hot reload of the main config file and per-board config files.
//!
//! File events arrive on notify's thread. A main config change is reloaded
//! and validated right there, swapped into the app context and followed by
//! an idempotent [`SchedulerManager::schedule_all`]. Board instances belong
//! to the render loop, so anything that touches them is queued as a
//! [`ReloadEvent`] and applied between passes.

use crossbeam_channel::Sender;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::context::AppContext;
use crate::error::Result;
use crate::scheduler::SchedulerManager;

/// File name of a per-board config inside `<board_config_dir>/<id>/`.
pub const BOARD_CONFIG_FILE: &str = "config.json";

/// Work queued for the render loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// The main config was swapped; sync board instances with its sequences.
    Config,
    /// `<id>/config.json` changed; drop the instance so it is rebuilt.
    Board(String),
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Turns file events into config swaps and queued reloads.
pub struct ReloadHandler {
    config_path: PathBuf,
    board_dir: Option<PathBuf>,
    app: Arc<AppContext>,
    scheduler: Option<Arc<SchedulerManager>>,
    reloads: Sender<ReloadEvent>,
}

impl ReloadHandler {
    pub fn new(
        config_path: impl AsRef<Path>,
        board_dir: Option<&Path>,
        app: Arc<AppContext>,
        reloads: Sender<ReloadEvent>,
    ) -> Self {
        Self {
            config_path: normalize(config_path.as_ref()),
            board_dir: board_dir.map(normalize),
            app,
            scheduler: None,
            reloads,
        }
    }

    /// Re-run worker scheduling after each successful reload.
    pub fn with_scheduler(mut self, scheduler: Arc<SchedulerManager>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn board_dir(&self) -> Option<&Path> {
        self.board_dir.as_deref()
    }

    /// Handle one file event. Returns the number of reloads it caused.
    pub fn handle(&self, event: &Event) -> usize {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return 0;
        }

        let mut handled = 0;
        let mut config_seen = false;
        for path in &event.paths {
            if self.is_config_file(path) {
                if !config_seen && self.reload_config() {
                    handled += 1;
                }
                config_seen = true;
            } else if let Some(board_id) = self.board_id(path) {
                log::info!("Board config for '{}' changed", board_id);
                self.send(ReloadEvent::Board(board_id));
                handled += 1;
            }
        }
        handled
    }

    fn is_config_file(&self, path: &Path) -> bool {
        if path.file_name() != self.config_path.file_name() {
            return false;
        }
        match (path.parent(), self.config_path.parent()) {
            (Some(dir), Some(config_dir)) => normalize(dir) == config_dir,
            _ => false,
        }
    }

    /// `<board_dir>/<id>/config.json` -> `id`.
    fn board_id(&self, path: &Path) -> Option<String> {
        let board_dir = self.board_dir.as_ref()?;
        if path.file_name() != Some(OsStr::new(BOARD_CONFIG_FILE)) {
            return None;
        }
        let board = path.parent()?;
        if normalize(board.parent()?) != *board_dir {
            return None;
        }
        board.file_name()?.to_str().map(str::to_string)
    }

    /// Reload, validate and swap the main config. A bad file keeps the
    /// running config.
    pub fn reload_config(&self) -> bool {
        let config = match Config::load_from_file(&self.config_path).and_then(|config| {
            config.validate()?;
            Ok(config)
        }) {
            Ok(config) => config,
            Err(e) => {
                log::error!(
                    "Config reload from {} failed, keeping current config: {}",
                    self.config_path.display(),
                    e
                );
                return false;
            }
        };

        log::info!("Config reloaded from {}", self.config_path.display());
        self.app.replace_config(config.clone());
        if let Some(scheduler) = &self.scheduler {
            scheduler.schedule_all(&config);
        }
        self.send(ReloadEvent::Config);
        true
    }

    fn send(&self, event: ReloadEvent) {
        if self.reloads.send(event).is_err() {
            log::debug!("Render loop is gone, dropping reload");
        }
    }
}

/// Keeps the underlying watcher alive; dropping it stops watching.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Watch the config file's directory and, if it exists, the board
    /// config directory.
    pub fn start(handler: ReloadHandler) -> Result<Self> {
        let config_dir = handler
            .config_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let board_dir = handler.board_dir().map(Path::to_path_buf);

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(event) => {
                handler.handle(&event);
            }
            Err(e) => log::error!("Watch error: {}", e),
        })?;

        watcher.watch(&config_dir, RecursiveMode::NonRecursive)?;
        log::info!("Watching {} for config changes", config_dir.display());

        if let Some(dir) = board_dir {
            if dir.is_dir() {
                watcher.watch(&dir, RecursiveMode::Recursive)?;
                log::info!("Watching {} for board config changes", dir.display());
            } else {
                log::warn!("Board config directory {} does not exist, not watching", dir.display());
            }
        }

        Ok(Self { _watcher: watcher })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{Receiver, unbounded};
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use tempfile::TempDir;

    fn setup(config_yaml: &str) -> (TempDir, ReloadHandler, Receiver<ReloadEvent>, Arc<AppContext>) {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("scoreboard.yml");
        fs::write(&config_path, config_yaml).unwrap();
        let board_dir = dir.path().join("boards");
        fs::create_dir_all(board_dir.join("standings")).unwrap();

        let app = Arc::new(AppContext::new(Config::default()));
        let (tx, rx) = unbounded();
        let handler = ReloadHandler::new(&config_path, Some(&board_dir), app.clone(), tx);
        (dir, handler, rx, app)
    }

    fn modified(path: PathBuf) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Any)).add_path(path)
    }

    #[test]
    fn test_config_change_swaps_config() {
        let (dir, handler, rx, app) = setup("boards:\n  off_day: [clock, standings]\n");

        assert_eq!(handler.handle(&modified(dir.path().join("scoreboard.yml"))), 1);
        assert_eq!(app.config().boards.off_day, vec!["clock", "standings"]);
        assert_eq!(rx.try_recv().unwrap(), ReloadEvent::Config);
    }

    #[test]
    fn test_invalid_config_keeps_current() {
        let (dir, handler, rx, app) = setup("boards:\n  off_day: []\n");

        assert_eq!(handler.handle(&modified(dir.path().join("scoreboard.yml"))), 0);
        assert_eq!(app.config().boards.off_day, vec!["clock"]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_board_config_queues_cleanup() {
        let (dir, handler, rx, _) = setup("{}\n");
        let path = dir.path().join("boards").join("standings").join(BOARD_CONFIG_FILE);
        fs::write(&path, "{}").unwrap();

        let event = Event::new(EventKind::Create(CreateKind::File)).add_path(path);
        assert_eq!(handler.handle(&event), 1);
        assert_eq!(rx.try_recv().unwrap(), ReloadEvent::Board("standings".to_string()));
    }

    #[test]
    fn test_unrelated_events_ignored() {
        let (dir, handler, rx, _) = setup("{}\n");

        assert_eq!(handler.handle(&modified(dir.path().join("notes.txt"))), 0);
        assert_eq!(
            handler.handle(&modified(dir.path().join("boards").join("standings").join("logo.png"))),
            0
        );
        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(dir.path().join("scoreboard.yml"));
        assert_eq!(handler.handle(&removed), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_duplicate_paths_reload_once() {
        let (dir, handler, rx, _) = setup("{}\n");
        let path = dir.path().join("scoreboard.yml");
        let event = modified(path.clone()).add_path(path);

        assert_eq!(handler.handle(&event), 1);
        assert_eq!(rx.try_iter().count(), 1);
    }
}
