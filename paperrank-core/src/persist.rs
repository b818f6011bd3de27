/// Serialized session state and lenient loading.
///
/// The canonical shape uses camelCase keys:
///
/// ```json
/// { "version": 1,
///   "ratings":   { "<id>": { "mu": 1516.0, "sigma": 325.5, "n": 1, ... } },
///   "history":   [ { "a": "...", "b": "...", "outcome": 1.0, "choice": "A",
///                    "kMult": 1.0, "neitherPenaltyApplied": false,
///                    "timestamp": 1760000000000 } ],
///   "selection": { "mode": "active", "muPriority": "highest",
///                  "resolveTieNMatches": "minimal", "winsOnly": false,
///                  "topN": 30, "lastPair": ["...", "..."] } }
/// ```
///
/// Ratings are written for consumers outside the core. On load they are
/// ignored and rebuilt by replaying the ledger.
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::constants::{DEFAULT_TOP_N, MAX_TOP_N, STATE_VERSION};
use crate::error::StoreError;
use crate::history::{History, RawEntry};
use crate::types::{Rating, RatingStore, SelectionState};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredSelection<'a> {
    mode: &'static str,
    mu_priority: &'static str,
    resolve_tie_n_matches: &'static str,
    wins_only: bool,
    top_n: usize,
    last_pair: Option<[&'a str; 2]>,
}

#[derive(Serialize)]
struct StoredState<'a> {
    version: u32,
    ratings: BTreeMap<&'a str, Rating>,
    history: Vec<RawEntry>,
    selection: StoredSelection<'a>,
}

/// What survives a save/load cycle. Ratings are derived from `history`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub history: History,
    pub selection: SelectionState,
}

/// Serialize the full session state.
pub fn encode(
    ratings: &RatingStore,
    history: &History,
    selection: &SelectionState,
) -> Result<String, StoreError> {
    let state = StoredState {
        version: STATE_VERSION,
        ratings: ratings.iter().map(|(id, r)| (id, *r)).collect(),
        history: history.entries().iter().map(RawEntry::from).collect(),
        selection: StoredSelection {
            mode: selection.mode.as_str(),
            mu_priority: selection.mu_priority.as_str(),
            resolve_tie_n_matches: selection.resolve_tie_n_matches.as_str(),
            wins_only: selection.wins_only,
            top_n: selection.top_n,
            last_pair: selection
                .last_pair
                .as_ref()
                .map(|(a, b)| [a.as_str(), b.as_str()]),
        },
    };
    serde_json::to_string_pretty(&state).map_err(|e| StoreError::Serialize(e.to_string()))
}

/// Parse persisted state into canonical shape.
///
/// Returns `None` when the payload is unusable as a whole (not JSON, not an
/// object, or a `history` that is not an array); callers start fresh. Within
/// a usable payload, bad ledger entries are dropped and bad selection fields
/// fall back to their defaults.
pub fn decode(payload: &str) -> Option<Snapshot> {
    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "persisted state is not valid JSON");
            return None;
        }
    };
    let root = value.as_object()?;

    let history = match root.get("history") {
        None | Some(Value::Null) => History::new(),
        Some(Value::Array(raw)) => History::from_raw(
            raw.iter()
                .filter_map(|v| serde_json::from_value::<RawEntry>(v.clone()).ok()),
        ),
        Some(_) => {
            debug!("persisted history is not an array");
            return None;
        }
    };

    let selection = root
        .get("selection")
        .map(normalize_selection)
        .unwrap_or_default();

    Some(Snapshot { history, selection })
}

fn parse_label<T: std::str::FromStr + Default>(obj: &Value, key: &str) -> T {
    obj.get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Canonical selection config from whatever was stored. Unknown labels and
/// out-of-range numbers fall back to defaults.
pub fn normalize_selection(value: &Value) -> SelectionState {
    let top_n = value
        .get("topN")
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite() && *n >= 1.0 && *n <= MAX_TOP_N as f64)
        .map(|n| n.floor() as usize)
        .unwrap_or(DEFAULT_TOP_N);

    let last_pair = value
        .get("lastPair")
        .and_then(Value::as_array)
        .and_then(|pair| match pair.as_slice() {
            [Value::String(a), Value::String(b)] if !a.is_empty() && !b.is_empty() && a != b => {
                Some((a.clone(), b.clone()))
            }
            _ => None,
        });

    SelectionState {
        mode: parse_label(value, "mode"),
        mu_priority: parse_label(value, "muPriority"),
        resolve_tie_n_matches: parse_label(value, "resolveTieNMatches"),
        wins_only: value.get("winsOnly").and_then(Value::as_bool).unwrap_or(false),
        top_n,
        last_pair,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::choose_next_pair;
    use crate::types::{Choice, HistoryEntry, Item, Mode, MuPriority, NMatchStrategy};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_encode_then_decode_keeps_ledger_and_selection() {
        let mut ratings = RatingStore::new();
        let mut history = History::new();
        history.record(&mut ratings, HistoryEntry::for_vote("x", "y", Choice::StrongA, 17));
        history.record(&mut ratings, HistoryEntry::for_vote("y", "z", Choice::Neither, 18));
        let selection = SelectionState {
            mode: Mode::Bubble,
            mu_priority: MuPriority::Lowest,
            resolve_tie_n_matches: NMatchStrategy::Maximal,
            wins_only: true,
            top_n: 12,
            last_pair: Some(("y".into(), "z".into())),
        };

        let payload = encode(&ratings, &history, &selection).unwrap();
        let snapshot = decode(&payload).unwrap();

        assert_eq!(snapshot.history, history);
        assert_eq!(snapshot.selection, selection);
        assert_eq!(snapshot.history.replay(), ratings);
    }

    #[test]
    fn test_encoded_keys_are_camel_case() {
        let payload = encode(&RatingStore::new(), &History::new(), &SelectionState::default()).unwrap();
        let value: Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["selection"]["muPriority"], "highest");
        assert_eq!(value["selection"]["resolveTieNMatches"], "minimal");
        assert_eq!(value["selection"]["topN"], 30);
        assert!(value["selection"]["lastPair"].is_null());
    }

    #[test]
    fn test_corrupt_payloads_decode_as_absent() {
        assert!(decode("").is_none());
        assert!(decode("{not json").is_none());
        assert!(decode("[1, 2, 3]").is_none());
        assert!(decode(r#"{"history": "oops"}"#).is_none());
    }

    #[test]
    fn test_empty_object_decodes_to_defaults() {
        let snapshot = decode("{}").unwrap();
        assert!(snapshot.history.is_empty());
        assert_eq!(snapshot.selection, SelectionState::default());
    }

    #[test]
    fn test_legacy_ledger_is_normalized_on_load() {
        let payload = r#"{
            "history": [
                {"a": "x", "b": "y", "outcome": 1, "timestamp": 5},
                {"a": "x", "outcome": 0},
                {"a": "x", "b": "y", "outcome": 0.5},
                {"a": 7, "b": "y", "outcome": 1},
                {"a": "x", "b": "y", "outcome": 0.5, "choice": "NEITHER", "kMult": 0.8},
                {"a": "x", "b": "y", "outcome": null}
            ]
        }"#;
        let snapshot = decode(payload).unwrap();
        let choices: Vec<Choice> = snapshot.history.entries().iter().map(|e| e.choice).collect();
        assert_eq!(choices, vec![Choice::A, Choice::Both, Choice::Neither, Choice::Skip]);
        assert_eq!(snapshot.history.entries()[0].timestamp, 5);
        assert!(snapshot.history.entries()[2].neither_penalty_applied);
    }

    #[test]
    fn test_selection_fields_fall_back_individually() {
        let value: Value = serde_json::json!({
            "mode": "sideways",
            "muPriority": "lowest",
            "resolveTieNMatches": 3,
            "winsOnly": "yes",
            "topN": -4,
            "lastPair": ["x", "x"],
        });
        let selection = normalize_selection(&value);
        assert_eq!(selection.mode, Mode::Active);
        assert_eq!(selection.mu_priority, MuPriority::Lowest);
        assert_eq!(selection.resolve_tie_n_matches, NMatchStrategy::Minimal);
        assert!(!selection.wins_only);
        assert_eq!(selection.top_n, DEFAULT_TOP_N);
        assert_eq!(selection.last_pair, None);
    }

    #[test]
    fn test_oversized_top_n_falls_back_and_bubble_still_selects() {
        let state = decode(r#"{"selection":{"mode":"bubble","topN":1e30}}"#).unwrap();
        assert_eq!(state.selection.mode, Mode::Bubble);
        assert_eq!(state.selection.top_n, DEFAULT_TOP_N);

        let items: Vec<Item> = ["x", "y", "z"]
            .iter()
            .map(|id| Item::new(*id, Rating::default()))
            .collect();
        let mut rng = SmallRng::seed_from_u64(5);
        assert!(choose_next_pair(&items, &state.selection, &mut rng).is_some());

        let capped = normalize_selection(&serde_json::json!({ "topN": MAX_TOP_N }));
        assert_eq!(capped.top_n, MAX_TOP_N);
    }
}
