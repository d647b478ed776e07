//! Board Manager - lazy lifecycle of board instances.
//!
//! Instances are created the first time a board id is rendered (or eagerly
//! initialized) and cached until configuration stops referencing them.
//! Only the render loop touches the manager.

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

use crate::board::{BoardCatalog, BoardContext, BoardInstance};
use crate::error::{Result, ScoreboardError};

/// What happened when a board was asked to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The board rendered to completion (or was cut short by the gate)
    Rendered,
    /// Construction failed; nothing was shown this cycle
    Unavailable,
    /// The board raised an error while rendering
    Failed,
}

struct Slot {
    instance: BoardInstance,
    serial: u64,
}

/// Caches at most one instance per board id.
pub struct BoardManager {
    catalog: BoardCatalog,
    instances: HashMap<String, Slot>,
    active: HashSet<String>,
    next_serial: u64,
}

impl BoardManager {
    pub fn new(catalog: BoardCatalog) -> Self {
        Self {
            catalog,
            instances: HashMap::new(),
            active: HashSet::new(),
            next_serial: 1,
        }
    }

    pub fn catalog(&self) -> &BoardCatalog {
        &self.catalog
    }

    fn ensure_instance(&mut self, board_id: &str, ctx: &BoardContext) -> Option<&mut Slot> {
        if self.instances.contains_key(board_id) {
            log::debug!("BoardManager: Using cached instance for board '{}'", board_id);
        } else {
            let catalog = &self.catalog;
            match panic::catch_unwind(AssertUnwindSafe(|| catalog.construct(board_id, ctx))) {
                Ok(Ok(instance)) => {
                    let serial = self.next_serial;
                    self.next_serial += 1;
                    self.instances.insert(board_id.to_string(), Slot { instance, serial });
                    log::info!("BoardManager: Initialized board '{}'", board_id);
                }
                Ok(Err(e)) => {
                    log::error!("BoardManager: Failed to initialize board '{}': {}", board_id, e);
                    return None;
                }
                Err(_) => {
                    log::error!("BoardManager: Board '{}' panicked while initializing", board_id);
                    return None;
                }
            }
        }
        self.instances.get_mut(board_id)
    }

    /// Render a board, constructing it first if needed.
    ///
    /// Fails only for ids missing from the catalog. Construction and render
    /// errors are logged and reported through [`RenderOutcome`].
    pub fn render(&mut self, board_id: &str, ctx: &BoardContext) -> Result<RenderOutcome> {
        if !self.catalog.contains(board_id) {
            return Err(ScoreboardError::UnknownBoard(format!(
                "{} (available: {})",
                board_id,
                self.catalog.ids().join(", ")
            )));
        }

        let Some(slot) = self.ensure_instance(board_id, ctx) else {
            return Ok(RenderOutcome::Unavailable);
        };

        let result = panic::catch_unwind(AssertUnwindSafe(|| slot.instance.show()));
        self.active.insert(board_id.to_string());

        match result {
            Ok(Ok(())) => Ok(RenderOutcome::Rendered),
            Ok(Err(e)) => {
                log::error!("BoardManager: Board '{}' failed to render: {}", board_id, e);
                Ok(RenderOutcome::Failed)
            }
            Err(_) => {
                log::error!("BoardManager: Board '{}' panicked while rendering; dropping instance", board_id);
                self.instances.remove(board_id);
                Ok(RenderOutcome::Failed)
            }
        }
    }

    /// Construct a board without rendering it, e.g. to start a warm-up fetch.
    ///
    /// Returns the existing instance when already constructed, `None` for
    /// unknown ids or failed construction.
    pub fn initialize_eagerly(&mut self, board_id: &str, ctx: &BoardContext) -> Option<&mut BoardInstance> {
        if !self.catalog.contains(board_id) {
            log::error!("BoardManager: Cannot initialize unknown board '{}'", board_id);
            return None;
        }
        self.ensure_instance(board_id, ctx).map(|slot| &mut slot.instance)
    }

    /// Run the board's cleanup and drop its instance.
    pub fn cleanup(&mut self, board_id: &str) {
        if let Some(mut slot) = self.instances.remove(board_id) {
            match slot.instance.cleanup() {
                Ok(()) => log::debug!("BoardManager: Called cleanup for board '{}'", board_id),
                Err(e) => log::error!("BoardManager: Error during cleanup of board '{}': {}", board_id, e),
            }
            log::info!("BoardManager: Unloaded board '{}'", board_id);
        }
        self.active.remove(board_id);
    }

    /// Drop every cached instance no sequence references any more.
    ///
    /// Never constructs anything; referenced instances are left as they are.
    pub fn sync_with_config<'a, I>(&mut self, sequences: I)
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let referenced: HashSet<String> = sequences.into_iter().flatten().cloned().collect();

        let mut removed: Vec<String> = self
            .instances
            .keys()
            .filter(|id| !referenced.contains(*id))
            .cloned()
            .collect();
        removed.sort();

        if !removed.is_empty() {
            log::info!("BoardManager: Config sync - removing boards no longer in config: {:?}", removed);
            for board_id in &removed {
                self.cleanup(board_id);
            }
        }

        self.active = referenced;
        log::debug!("BoardManager: Config sync complete, {} active boards", self.active.len());
    }

    /// Clean up every instance.
    pub fn clear_all(&mut self) {
        log::info!("BoardManager: Clearing all initialized boards");
        for board_id in self.initialized_boards() {
            self.cleanup(&board_id);
        }
        self.active.clear();
    }

    /// Ids with a live instance, sorted.
    pub fn initialized_boards(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.instances.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ids currently referenced by configuration or recently rendered.
    pub fn active_boards(&self) -> HashSet<String> {
        self.active.clone()
    }

    pub fn is_initialized(&self, board_id: &str) -> bool {
        self.instances.contains_key(board_id)
    }

    /// Construction serial of the cached instance; changes whenever the board is rebuilt.
    pub fn instance_serial(&self, board_id: &str) -> Option<u64> {
        self.instances.get(board_id).map(|slot| slot.serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, LegacyBoard};
    use crate::config::Config;
    use crate::context::AppContext;
    use crate::display::MemoryDisplay;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Counters {
        built: AtomicUsize,
        rendered: AtomicUsize,
        cleaned: Mutex<Vec<String>>,
    }

    struct Counting {
        id: String,
        counters: Arc<Counters>,
        fail: bool,
    }

    impl Board for Counting {
        fn render(&mut self) -> Result<()> {
            self.counters.rendered.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ScoreboardError::Render("no data".to_string()));
            }
            Ok(())
        }

        fn cleanup(&mut self) -> Result<()> {
            self.counters.cleaned.lock().unwrap().push(self.id.clone());
            if self.fail {
                return Err(ScoreboardError::Render("cleanup failed".to_string()));
            }
            Ok(())
        }
    }

    struct Drawn(Arc<Counters>);

    impl LegacyBoard for Drawn {
        fn draw(&mut self) -> Result<()> {
            self.0.rendered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn setup() -> (BoardManager, BoardContext, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let mut catalog = BoardCatalog::new();
        for id in ["clock", "standings", "scoreticker", "broken"] {
            let counters = counters.clone();
            catalog.register(id, move |_| {
                counters.built.fetch_add(1, Ordering::SeqCst);
                Ok(Counting {
                    id: id.to_string(),
                    counters: counters.clone(),
                    fail: id == "broken",
                })
            });
        }
        catalog.register("unbuildable", |_| -> Result<Counting> {
            Err(ScoreboardError::BoardInit {
                board: "unbuildable".to_string(),
                reason: "missing assets".to_string(),
            })
        });
        catalog.register("exploding", |_| -> Result<Counting> { panic!("font file missing") });
        {
            let counters = counters.clone();
            catalog.register_legacy("christmas", move |_| Ok(Drawn(counters.clone())));
        }
        let app = Arc::new(AppContext::new(Config::default()));
        let ctx = BoardContext::new(app, Arc::new(MemoryDisplay::new()));
        (BoardManager::new(catalog), ctx, counters)
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_constructs_once() {
        let (mut manager, ctx, counters) = setup();
        assert_eq!(manager.render("clock", &ctx).unwrap(), RenderOutcome::Rendered);
        assert_eq!(manager.render("clock", &ctx).unwrap(), RenderOutcome::Rendered);
        assert_eq!(counters.built.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rendered.load(Ordering::SeqCst), 2);
        assert!(manager.is_initialized("clock"));
        assert!(manager.active_boards().contains("clock"));
    }

    #[test]
    fn test_render_unknown_board() {
        let (mut manager, ctx, _) = setup();
        let err = manager.render("nope", &ctx).unwrap_err();
        assert!(matches!(err, ScoreboardError::UnknownBoard(_)));
    }

    #[test]
    fn test_render_construction_failure_is_unavailable() {
        let (mut manager, ctx, _) = setup();
        assert_eq!(manager.render("unbuildable", &ctx).unwrap(), RenderOutcome::Unavailable);
        assert!(!manager.is_initialized("unbuildable"));
    }

    #[test]
    fn test_construction_panic_is_unavailable() {
        let (mut manager, ctx, _) = setup();
        assert_eq!(manager.render("exploding", &ctx).unwrap(), RenderOutcome::Unavailable);
        assert!(!manager.is_initialized("exploding"));
        assert!(manager.initialize_eagerly("exploding", &ctx).is_none());
        // Other boards still build
        assert_eq!(manager.render("clock", &ctx).unwrap(), RenderOutcome::Rendered);
    }

    #[test]
    fn test_render_failure_is_contained() {
        let (mut manager, ctx, _) = setup();
        assert_eq!(manager.render("broken", &ctx).unwrap(), RenderOutcome::Failed);
        // The instance survives a failed render
        assert!(manager.is_initialized("broken"));
    }

    #[test]
    fn test_legacy_draw_board() {
        let (mut manager, ctx, counters) = setup();
        assert_eq!(manager.render("christmas", &ctx).unwrap(), RenderOutcome::Rendered);
        assert_eq!(counters.rendered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_initialize_eagerly_is_idempotent() {
        let (mut manager, ctx, counters) = setup();
        assert!(manager.initialize_eagerly("standings", &ctx).is_some());
        let serial = manager.instance_serial("standings");
        assert!(manager.initialize_eagerly("standings", &ctx).is_some());
        assert_eq!(manager.instance_serial("standings"), serial);
        assert_eq!(counters.built.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rendered.load(Ordering::SeqCst), 0);

        assert!(manager.initialize_eagerly("nope", &ctx).is_none());
        assert!(manager.initialize_eagerly("unbuildable", &ctx).is_none());
    }

    #[test]
    fn test_cleanup_then_render_rebuilds() {
        let (mut manager, ctx, counters) = setup();
        manager.render("clock", &ctx).unwrap();
        let before = manager.instance_serial("clock").unwrap();

        manager.cleanup("clock");
        assert!(!manager.is_initialized("clock"));
        assert!(!manager.active_boards().contains("clock"));
        assert_eq!(*counters.cleaned.lock().unwrap(), vec!["clock"]);

        manager.render("clock", &ctx).unwrap();
        assert_ne!(manager.instance_serial("clock").unwrap(), before);
        assert_eq!(counters.built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cleanup_error_still_unloads() {
        let (mut manager, ctx, _) = setup();
        manager.render("broken", &ctx).unwrap();
        manager.cleanup("broken");
        assert!(!manager.is_initialized("broken"));
    }

    #[test]
    fn test_cleanup_unknown_is_noop() {
        let (mut manager, _, counters) = setup();
        manager.cleanup("never-built");
        assert!(counters.cleaned.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sync_removes_only_unreferenced() {
        let (mut manager, ctx, counters) = setup();
        for id in ["clock", "standings", "scoreticker"] {
            manager.render(id, &ctx).unwrap();
        }
        let clock = manager.instance_serial("clock");
        let standings = manager.instance_serial("standings");

        let off_day = ids(&["clock"]);
        let scheduled = ids(&["standings", "team_summary"]);
        manager.sync_with_config([off_day.as_slice(), scheduled.as_slice()]);

        assert_eq!(manager.initialized_boards(), vec!["clock", "standings"]);
        assert_eq!(manager.instance_serial("clock"), clock);
        assert_eq!(manager.instance_serial("standings"), standings);
        assert_eq!(*counters.cleaned.lock().unwrap(), vec!["scoreticker"]);
        // Sync never constructs referenced-but-unbuilt boards
        assert!(!manager.is_initialized("team_summary"));
        assert!(manager.active_boards().contains("team_summary"));
    }

    #[test]
    fn test_clear_all() {
        let (mut manager, ctx, counters) = setup();
        manager.render("clock", &ctx).unwrap();
        manager.render("standings", &ctx).unwrap();
        manager.clear_all();
        assert!(manager.initialized_boards().is_empty());
        assert!(manager.active_boards().is_empty());
        assert_eq!(counters.cleaned.lock().unwrap().len(), 2);
    }
}
