/// Session controller: owns the ratings, ledger, selection config and the
/// pair currently on screen, and persists after every mutation.
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::constants::MAX_TOP_N;
use crate::error::StoreError;
use crate::history::History;
use crate::persist;
use crate::selector::choose_next_pair;
use crate::types::{
    Choice, HistoryEntry, Item, Mode, MuPriority, NMatchStrategy, Paper, RatingStore,
    SelectionState,
};

/// Where serialized session state lives. The session serializes; a store
/// only moves the payload.
pub trait StateStore {
    /// The last saved payload, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<String>, StoreError>;
    fn save(&mut self, payload: &str) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// In-process store, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    payload: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_payload(payload: impl Into<String>) -> Self {
        MemoryStore {
            payload: Some(payload.into()),
        }
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.payload.clone())
    }

    fn save(&mut self, payload: &str) -> Result<(), StoreError> {
        self.payload = Some(payload.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.payload = None;
        Ok(())
    }
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

pub struct Session<S: StateStore> {
    store: S,
    papers: Vec<Paper>,
    ratings: RatingStore,
    history: History,
    selection: SelectionState,
    current: Option<(String, String)>,
    rng: SmallRng,
}

impl<S: StateStore> Session<S> {
    /// Load state from `store` and show the first pair.
    pub fn open(store: S, papers: Vec<Paper>) -> Result<Self, StoreError> {
        Self::with_rng(store, papers, SmallRng::from_rng(&mut rand::rng()))
    }

    /// Like [`Session::open`] with a caller-supplied RNG, for reproducible
    /// selection.
    ///
    /// A payload that cannot be used at all is logged and ignored; the session
    /// starts fresh and overwrites it on the next save. If the stored
    /// `last_pair` is still eligible it becomes the current pair again, so a
    /// pair shown by one process can be voted on by the next.
    pub fn with_rng(store: S, papers: Vec<Paper>, rng: SmallRng) -> Result<Self, StoreError> {
        let snapshot = match store.load()? {
            None => persist::Snapshot::default(),
            Some(payload) => persist::decode(&payload).unwrap_or_else(|| {
                warn!("persisted state is unreadable, starting fresh");
                persist::Snapshot::default()
            }),
        };

        let ratings = snapshot.history.replay();
        info!(
            entries = snapshot.history.len(),
            rated = ratings.len(),
            papers = papers.len(),
            mode = %snapshot.selection.mode,
            "loaded session state"
        );

        let mut session = Session {
            store,
            papers,
            ratings,
            history: snapshot.history,
            selection: snapshot.selection,
            current: None,
            rng,
        };
        if !session.resume_last_pair() {
            session.reselect();
        }
        Ok(session)
    }

    fn resume_last_pair(&mut self) -> bool {
        let Some((a, b)) = self.selection.last_pair.clone() else {
            return false;
        };
        let eligible = |id: &str| {
            self.papers.iter().any(|p| p.id == id)
                && (!self.selection.wins_only || self.ratings.get(id).wins >= 1)
        };
        if eligible(&a) && eligible(&b) {
            debug!(%a, %b, "resuming last shown pair");
            self.current = Some((a, b));
            true
        } else {
            false
        }
    }

    /// Pick the next pair and record it as shown.
    fn reselect(&mut self) {
        let items = self.ratings.items_for(&self.papers);
        let pair = choose_next_pair(&items, &self.selection, &mut self.rng)
            .map(|(a, b)| (a.id.clone(), b.id.clone()));
        if pair.is_some() {
            self.selection.last_pair = pair.clone();
        }
        self.current = pair;
    }

    /// Write the full state to the store.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let payload = persist::encode(&self.ratings, &self.history, &self.selection)?;
        self.store.save(&payload)
    }

    /// Record `choice` for the current pair, then persist and move on.
    ///
    /// Returns `Ok(false)` without touching anything when no pair is shown.
    pub fn vote(&mut self, choice: Choice) -> Result<bool, StoreError> {
        let Some((a, b)) = self.current.take() else {
            debug!(%choice, "vote ignored, no current pair");
            return Ok(false);
        };
        let entry = HistoryEntry::for_vote(&a, &b, choice, now_millis());
        self.history.record(&mut self.ratings, entry);
        debug!(%a, %b, %choice, entries = self.history.len(), "recorded vote");

        self.reselect();
        self.save()?;
        Ok(true)
    }

    /// [`Session::vote`] with a textual label. Unknown labels are ignored.
    pub fn vote_label(&mut self, label: &str) -> Result<bool, StoreError> {
        match label.parse::<Choice>() {
            Ok(choice) => self.vote(choice),
            Err(e) => {
                debug!(error = %e, "vote ignored");
                Ok(false)
            }
        }
    }

    /// Remove the most recent entry and rebuild ratings from the rest.
    /// Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, StoreError> {
        if self.history.undo(&mut self.ratings).is_none() {
            return Ok(false);
        }
        self.reselect();
        self.save()?;
        Ok(true)
    }

    /// Forget every rating and ledger entry. The selection config survives.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        let dropped = self.history.len();
        self.history.clear();
        self.ratings.reset();
        self.selection.last_pair = None;
        info!(dropped, "reset all ratings and history");
        self.reselect();
        self.save()
    }

    /// Reset and also clear the selection config, leaving the store empty.
    pub fn wipe(&mut self) -> Result<(), StoreError> {
        self.history.clear();
        self.ratings.reset();
        self.selection = SelectionState::default();
        self.store.clear()?;
        info!("wiped persisted state");
        self.reselect();
        Ok(())
    }

    fn update_selection(&mut self, apply: impl FnOnce(&mut SelectionState)) -> Result<(), StoreError> {
        apply(&mut self.selection);
        self.reselect();
        self.save()
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), StoreError> {
        self.update_selection(|s| s.mode = mode)
    }

    pub fn set_mu_priority(&mut self, priority: MuPriority) -> Result<(), StoreError> {
        self.update_selection(|s| s.mu_priority = priority)
    }

    pub fn set_n_strategy(&mut self, strategy: NMatchStrategy) -> Result<(), StoreError> {
        self.update_selection(|s| s.resolve_tie_n_matches = strategy)
    }

    pub fn set_wins_only(&mut self, wins_only: bool) -> Result<(), StoreError> {
        self.update_selection(|s| s.wins_only = wins_only)
    }

    /// Bubble cutoff rank, clamped to `1..=MAX_TOP_N`.
    pub fn set_top_n(&mut self, top_n: usize) -> Result<(), StoreError> {
        self.update_selection(|s| s.top_n = top_n.clamp(1, MAX_TOP_N))
    }

    /// Replace the paper pool (a filter or search change) and reselect.
    pub fn set_pool(&mut self, papers: Vec<Paper>) {
        self.papers = papers;
        self.reselect();
    }

    pub fn current_pair(&self) -> Option<(&str, &str)> {
        self.current.as_ref().map(|(a, b)| (a.as_str(), b.as_str()))
    }

    /// The current pair's papers joined with their ratings.
    pub fn current_items(&self) -> Option<(Item, Item)> {
        let (a, b) = self.current_pair()?;
        let item = |id: &str| {
            let paper = self.papers.iter().find(|p| p.id == id);
            Item {
                id: id.to_string(),
                category: paper.and_then(|p| p.category.clone()),
                rating: self.ratings.get(id),
            }
        };
        Some((item(a), item(b)))
    }

    pub fn paper(&self, id: &str) -> Option<&Paper> {
        self.papers.iter().find(|p| p.id == id)
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    /// Every paper in the pool joined with its rating, in pool order.
    pub fn items(&self) -> Vec<Item> {
        self.ratings.items_for(&self.papers)
    }

    pub fn ratings(&self) -> &RatingStore {
        &self.ratings
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
