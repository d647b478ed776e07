//! Board catalog - maps board ids to constructors.
//!
//! The catalog is assembled once at startup. Configured sequences are
//! checked against it then, instead of resolving board names per render.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::board::{Board, BoardContext, BoardInstance, LegacyBoard};
use crate::error::{Result, ScoreboardError};

/// Builds a fresh board instance.
pub type BoardConstructor = Arc<dyn Fn(&BoardContext) -> Result<BoardInstance> + Send + Sync>;

/// Registered board constructors, keyed by board id.
#[derive(Default, Clone)]
pub struct BoardCatalog {
    constructors: BTreeMap<String, BoardConstructor>,
}

impl BoardCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a board with a `render` capability. Re-registering an id replaces it.
    pub fn register<F, B>(&mut self, id: impl Into<String>, constructor: F)
    where
        F: Fn(&BoardContext) -> Result<B> + Send + Sync + 'static,
        B: Board + 'static,
    {
        let constructor: BoardConstructor =
            Arc::new(move |ctx| constructor(ctx).map(|board| BoardInstance::Render(Box::new(board))));
        self.constructors.insert(id.into(), constructor);
    }

    /// Register a board that only exposes `draw`.
    pub fn register_legacy<F, B>(&mut self, id: impl Into<String>, constructor: F)
    where
        F: Fn(&BoardContext) -> Result<B> + Send + Sync + 'static,
        B: LegacyBoard + 'static,
    {
        let constructor: BoardConstructor =
            Arc::new(move |ctx| constructor(ctx).map(|board| BoardInstance::Draw(Box::new(board))));
        self.constructors.insert(id.into(), constructor);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    /// Ids from `wanted` that have no constructor.
    pub fn missing<'a, I>(&self, wanted: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut missing: Vec<String> = wanted.into_iter().filter(|id| !self.contains(id)).cloned().collect();
        missing.sort();
        missing.dedup();
        missing
    }

    /// Run the constructor for `id`.
    pub fn construct(&self, id: &str, ctx: &BoardContext) -> Result<BoardInstance> {
        let constructor = self
            .constructors
            .get(id)
            .ok_or_else(|| ScoreboardError::UnknownBoard(id.to_string()))?;
        constructor(ctx)
    }
}
