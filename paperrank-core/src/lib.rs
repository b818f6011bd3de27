/// paperrank-core: pairwise preference rating for conference papers.
///
/// Show two papers, record which one you prefer, repeat. Each vote updates an
/// Elo-style rating with per-item uncertainty; the selector picks the next
/// pair to be as informative as possible. Ratings are a pure replay of an
/// append-only ledger, so undo is exact. No filesystem, no network: persisted
/// state goes through a caller-provided `StateStore`.
///
/// # Quick start
///
/// ```rust
/// use paperrank_core::{standings, Choice, MemoryStore, Paper, Session};
///
/// let papers = vec![
///     Paper::new("2406.0001").with_category("cs.LG"),
///     Paper::new("2406.0002").with_category("cs.CL"),
///     Paper::new("2406.0003").with_category("cs.CV"),
/// ];
/// let mut session = Session::open(MemoryStore::new(), papers).unwrap();
///
/// let winner = session.current_pair().map(|(a, _)| a.to_string()).unwrap();
/// session.vote(Choice::StrongA).unwrap();
///
/// let table = standings(&session.items());
/// assert_eq!(table[0].id, winner);
/// ```

pub mod constants;
pub mod error;
pub mod history;
pub mod persist;
pub mod rating;
pub mod selector;
pub mod sequence;
pub mod session;
pub mod standings;
pub mod types;

// Re-export primary public API at crate root.
pub use error::{ParseLabelError, StoreError};
pub use history::{apply_entry, History, RawEntry};
pub use selector::{choose_next_pair, ItemPair};
pub use sequence::RequestSequence;
pub use session::{MemoryStore, Session, StateStore};
pub use standings::{preference_weights, standings, Standing};
pub use types::{
    Choice, HistoryEntry, Item, JointSignal, Mode, MuPriority, NMatchStrategy, Outcome, Paper,
    Rating, RatingStore, SelectionState,
};
