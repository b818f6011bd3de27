/// Append-only comparison ledger and deterministic replay.
///
/// Ratings are a pure function of the entry sequence: live votes and replay go
/// through the same `apply_entry`, and undo truncates the ledger and replays
/// from defaults instead of inverting anything.
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::BASE_K;
use crate::rating::{apply_joint, apply_legacy_neither_penalty, update};
use crate::types::{Choice, HistoryEntry, Outcome, RatingStore};

/// A ledger entry as found in persisted state, before normalization.
///
/// Every field is optional: older ledgers only stored `a`, `b`, `outcome` and
/// `timestamp`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEntry {
    pub a: Option<String>,
    pub b: Option<String>,
    pub outcome: Option<f64>,
    pub choice: Option<String>,
    pub k_mult: Option<f64>,
    pub neither_penalty_applied: Option<bool>,
    pub timestamp: Option<f64>,
}

impl From<&HistoryEntry> for RawEntry {
    fn from(entry: &HistoryEntry) -> Self {
        RawEntry {
            a: entry.a.clone(),
            b: entry.b.clone(),
            outcome: entry.outcome.map(Outcome::value),
            choice: Some(entry.choice.as_str().to_string()),
            k_mult: Some(entry.k_mult),
            neither_penalty_applied: Some(entry.neither_penalty_applied),
            timestamp: Some(entry.timestamp as f64),
        }
    }
}

/// Choice and multiplier implied by an outcome when the entry predates labels.
fn legacy_choice(outcome: Option<Outcome>) -> (Choice, f64) {
    match outcome {
        Some(Outcome::AWins) => (Choice::A, 1.0),
        Some(Outcome::BWins) => (Choice::B, 1.0),
        Some(Outcome::Tie) => (Choice::Both, 0.75),
        None => (Choice::Skip, 0.0),
    }
}

fn clean_id(id: Option<String>) -> Option<String> {
    id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Bring a raw entry into canonical shape, or `None` if it is unusable.
///
/// Dropped: outcomes other than 1.0/0.0/0.5, and entries with an outcome that
/// do not name two distinct items. Backfilled: a missing choice and a missing
/// multiplier from the outcome, an invalid multiplier from the choice.
/// NEITHER always carries the legacy penalty flag.
pub fn normalize_entry(raw: RawEntry) -> Option<HistoryEntry> {
    let outcome = match raw.outcome {
        None => None,
        Some(value) => match Outcome::from_value(value) {
            Some(o) => Some(o),
            None => {
                debug!(value, "dropping ledger entry with unrecognized outcome");
                return None;
            }
        },
    };

    let a = clean_id(raw.a);
    let b = clean_id(raw.b);
    if outcome.is_some() {
        match (&a, &b) {
            (Some(x), Some(y)) if x != y => {}
            _ => {
                debug!(?a, ?b, "dropping ledger entry without two distinct items");
                return None;
            }
        }
    }

    let parsed_choice = raw.choice.as_deref().and_then(|c| c.parse::<Choice>().ok());
    let (choice, default_k_mult) = match parsed_choice {
        Some(c) => (c, c.k_mult()),
        None => legacy_choice(outcome),
    };

    // A skip never carries an outcome.
    let outcome = if choice == Choice::Skip { None } else { outcome };

    // Missing multipliers are backfilled from the outcome, invalid ones from
    // the choice.
    let k_mult = match raw.k_mult {
        Some(k) if k.is_finite() && k >= 0.0 => k,
        Some(_) => default_k_mult,
        None => legacy_choice(outcome).1,
    };

    let neither_penalty_applied =
        choice == Choice::Neither || raw.neither_penalty_applied.unwrap_or(false);

    let timestamp = raw
        .timestamp
        .filter(|t| t.is_finite())
        .map(|t| t as i64)
        .unwrap_or(0);

    Some(HistoryEntry {
        a,
        b,
        outcome,
        choice,
        k_mult,
        neither_penalty_applied,
        timestamp,
    })
}

/// Apply one entry's rating work to `store`.
///
/// Skips are no-ops. BOTH/NEITHER adjust each item independently and count as
/// ties; every other label is a pairwise update at `BASE_K * k_mult`.
pub fn apply_entry(store: &mut RatingStore, entry: &HistoryEntry) {
    let Some(outcome) = entry.outcome else {
        return;
    };
    let Some((a, b)) = entry.pair() else {
        return;
    };

    match entry.choice.joint_signal() {
        Some(signal) => store.with_pair(a, b, |ra, rb| {
            for r in [ra, rb] {
                apply_joint(r, signal, entry.k_mult);
                if entry.neither_penalty_applied {
                    apply_legacy_neither_penalty(r);
                }
                r.ties += 1;
            }
        }),
        None => store.with_pair(a, b, |ra, rb| {
            update(ra, rb, outcome, BASE_K * entry.k_mult);
        }),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        History::default()
    }

    /// Build a ledger from raw entries, normalizing each and silently
    /// dropping the unusable ones.
    pub fn from_raw(raw: impl IntoIterator<Item = RawEntry>) -> Self {
        let entries: Vec<HistoryEntry> = raw.into_iter().filter_map(normalize_entry).collect();
        History { entries }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply `entry` to `store` and append it.
    pub fn record(&mut self, store: &mut RatingStore, entry: HistoryEntry) {
        apply_entry(store, &entry);
        self.entries.push(entry);
    }

    /// Reset `store` and rebuild it from the full ledger in order.
    pub fn replay_into(&self, store: &mut RatingStore) {
        store.reset();
        for entry in &self.entries {
            apply_entry(store, entry);
        }
    }

    pub fn replay(&self) -> RatingStore {
        let mut store = RatingStore::new();
        self.replay_into(&mut store);
        store
    }

    /// Drop the last entry and replay the rest into `store`.
    ///
    /// Returns the removed entry, or `None` (leaving `store` untouched) when
    /// the ledger is empty.
    pub fn undo(&mut self, store: &mut RatingStore) -> Option<HistoryEntry> {
        let removed = self.entries.pop()?;
        self.replay_into(store);
        info!(
            choice = %removed.choice,
            remaining = self.entries.len(),
            "undid last comparison"
        );
        Some(removed)
    }

    /// Forget every entry. Used by global reset together with the ratings.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rating;
    use proptest::prelude::*;

    fn vote(a: &str, b: &str, choice: Choice) -> HistoryEntry {
        HistoryEntry::for_vote(a, b, choice, 0)
    }

    fn raw(a: Option<&str>, b: Option<&str>, outcome: Option<f64>) -> RawEntry {
        RawEntry {
            a: a.map(str::to_string),
            b: b.map(str::to_string),
            outcome,
            ..RawEntry::default()
        }
    }

    #[test]
    fn test_replay_of_empty_history_is_default() {
        let store = History::new().replay();
        assert!(store.is_empty());
        assert_eq!(store.get("anything"), Rating::default());
    }

    #[test]
    fn test_record_matches_replay() {
        let mut live = RatingStore::new();
        let mut history = History::new();
        for entry in [
            vote("x", "y", Choice::A),
            vote("y", "z", Choice::StrongB),
            vote("x", "z", Choice::Both),
            vote("x", "y", Choice::Neither),
            vote("z", "y", Choice::Skip),
        ] {
            history.record(&mut live, entry);
        }
        assert_eq!(history.replay(), live);
    }

    #[test]
    fn test_both_vote_on_default_items() {
        let mut store = RatingStore::new();
        let mut history = History::new();
        history.record(&mut store, vote("x", "y", Choice::Both));

        for id in ["x", "y"] {
            let r = store.get(id);
            assert!((r.mu - 1511.52).abs() < 1e-9);
            assert!((r.sigma - 350.0 * 0.93 * 0.99).abs() < 1e-9);
            assert_eq!(r.n, 1);
            assert_eq!(r.ties, 1);
        }
    }

    #[test]
    fn test_neither_vote_carries_flat_penalty() {
        let mut store = RatingStore::new();
        let mut history = History::new();
        history.record(&mut store, vote("x", "y", Choice::Neither));
        // -11.52 joint, -10 legacy
        assert!((store.get("x").mu - 1478.48).abs() < 1e-9);
        assert!((store.get("y").mu - 1478.48).abs() < 1e-9);
    }

    #[test]
    fn test_skip_does_not_touch_ratings() {
        let mut store = RatingStore::new();
        let mut history = History::new();
        history.record(&mut store, vote("x", "y", Choice::Skip));
        assert!(store.is_empty());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_undo_restores_previous_state() {
        let mut store = RatingStore::new();
        let mut history = History::new();
        history.record(&mut store, vote("x", "y", Choice::A));
        history.record(&mut store, vote("y", "z", Choice::B));
        let before = store.clone();

        history.record(&mut store, vote("x", "z", Choice::StrongA));
        let removed = history.undo(&mut store).unwrap();

        assert_eq!(removed.choice, Choice::StrongA);
        assert_eq!(store, before);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_undo_on_empty_history_is_noop() {
        let mut store = RatingStore::new();
        store.get_mut("x").mu = 1700.0;
        let mut history = History::new();
        assert!(history.undo(&mut store).is_none());
        assert_eq!(store.get("x").mu, 1700.0);
    }

    #[test]
    fn test_legacy_entries_are_backfilled_from_outcome() {
        let history = History::from_raw([
            raw(Some("x"), Some("y"), Some(1.0)),
            raw(Some("x"), Some("y"), Some(0.0)),
            raw(Some("x"), Some("y"), Some(0.5)),
            raw(Some("x"), Some("y"), None),
        ]);
        let labels: Vec<(Choice, f64)> = history
            .entries()
            .iter()
            .map(|e| (e.choice, e.k_mult))
            .collect();
        assert_eq!(
            labels,
            vec![
                (Choice::A, 1.0),
                (Choice::B, 1.0),
                (Choice::Both, 0.75),
                (Choice::Skip, 0.0),
            ]
        );
    }

    #[test]
    fn test_malformed_entries_are_dropped() {
        let history = History::from_raw([
            raw(Some("x"), None, Some(1.0)),
            raw(None, Some("y"), Some(0.0)),
            raw(Some("x"), Some("x"), Some(1.0)),
            raw(Some("x"), Some("y"), Some(0.7)),
            raw(Some(" "), Some("y"), Some(0.5)),
            // A skip without ids is still a valid record.
            raw(None, None, None),
        ]);
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].choice, Choice::Skip);
    }

    #[test]
    fn test_neither_always_marked_for_penalty() {
        let entry = normalize_entry(RawEntry {
            choice: Some("NEITHER".into()),
            neither_penalty_applied: Some(false),
            ..raw(Some("x"), Some("y"), Some(0.5))
        })
        .unwrap();
        assert!(entry.neither_penalty_applied);
        assert_eq!(entry.k_mult, 0.75);
    }

    #[test]
    fn test_missing_k_mult_backfilled_from_outcome() {
        let strong = normalize_entry(RawEntry {
            choice: Some("STRONG_A".into()),
            ..raw(Some("x"), Some("y"), Some(1.0))
        })
        .unwrap();
        assert_eq!(strong.choice, Choice::StrongA);
        assert_eq!(strong.k_mult, 1.0);

        let both = normalize_entry(RawEntry {
            choice: Some("BOTH".into()),
            ..raw(Some("x"), Some("y"), Some(0.5))
        })
        .unwrap();
        assert_eq!(both.k_mult, 0.75);

        let skip = normalize_entry(raw(Some("x"), Some("y"), None)).unwrap();
        assert_eq!(skip.k_mult, 0.0);
    }

    #[test]
    fn test_invalid_k_mult_falls_back_to_choice_default() {
        let entry = normalize_entry(RawEntry {
            choice: Some("STRONG_A".into()),
            k_mult: Some(-3.0),
            ..raw(Some("x"), Some("y"), Some(1.0))
        })
        .unwrap();
        assert_eq!(entry.k_mult, 1.5);
    }

    #[test]
    fn test_skip_label_discards_outcome() {
        let entry = normalize_entry(RawEntry {
            choice: Some("SKIP".into()),
            ..raw(Some("x"), Some("y"), Some(1.0))
        })
        .unwrap();
        assert_eq!(entry.outcome, None);
    }

    fn arb_entry() -> impl Strategy<Value = HistoryEntry> {
        let ids = prop::sample::select(vec!["p1", "p2", "p3", "p4"]);
        let choice = prop::sample::select(Choice::ALL.to_vec());
        (ids.clone(), ids, choice)
            .prop_filter("distinct ids", |(a, b, _)| a != b)
            .prop_map(|(a, b, choice)| HistoryEntry::for_vote(a, b, choice, 0))
    }

    proptest! {
        #[test]
        fn prop_replay_is_deterministic(entries in prop::collection::vec(arb_entry(), 0..60)) {
            let mut history = History::new();
            let mut live = RatingStore::new();
            for e in entries {
                history.record(&mut live, e);
            }
            let first = history.replay();
            let second = history.replay();
            prop_assert_eq!(&first, &second);
            for (id, r) in first.iter() {
                let l = live.get(id);
                prop_assert!((r.mu - l.mu).abs() < 1e-9);
                prop_assert!((r.sigma - l.sigma).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_undo_inverts_push(
            prefix in prop::collection::vec(arb_entry(), 0..40),
            last in arb_entry(),
        ) {
            let mut history = History::new();
            let mut store = RatingStore::new();
            for e in prefix {
                history.record(&mut store, e);
            }
            let before = history.replay();
            history.record(&mut store, last.clone());
            let removed = history.undo(&mut store);
            prop_assert_eq!(removed, Some(last));
            prop_assert_eq!(store, before);
        }
    }
}
