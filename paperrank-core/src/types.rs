use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MU, DEFAULT_SIGMA, DEFAULT_TOP_N};
use crate::error::ParseLabelError;

/// Skill estimate, uncertainty and outcome counters for one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub mu: f64,
    pub sigma: f64,
    pub n: u32,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub ties: u32,
}

impl Default for Rating {
    fn default() -> Self {
        Rating {
            mu: DEFAULT_MU,
            sigma: DEFAULT_SIGMA,
            n: 0,
            wins: 0,
            losses: 0,
            ties: 0,
        }
    }
}

/// A catalog entry from the item pool provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Primary category, used by the selector's diversity constraint.
    #[serde(default)]
    pub category: Option<String>,
}

impl Paper {
    pub fn new(id: impl Into<String>) -> Self {
        Paper {
            id: id.into(),
            title: None,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A paper joined with its current rating. This is what the selector sees.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub category: Option<String>,
    pub rating: Rating,
}

impl Item {
    pub fn new(id: impl Into<String>, rating: Rating) -> Self {
        Item {
            id: id.into(),
            category: None,
            rating,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Ratings keyed by item id.
///
/// Ratings are created lazily: reading an unknown id yields the default
/// rating, and the first mutation materializes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingStore {
    ratings: BTreeMap<String, Rating>,
}

impl RatingStore {
    pub fn new() -> Self {
        RatingStore::default()
    }

    /// Current rating for `id`, or the default if it was never touched.
    pub fn get(&self, id: &str) -> Rating {
        self.ratings.get(id).copied().unwrap_or_default()
    }

    pub fn get_mut(&mut self, id: &str) -> &mut Rating {
        self.ratings.entry(id.to_string()).or_default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ratings.contains_key(id)
    }

    /// Run `f` over the ratings of two distinct items and store the results.
    pub fn with_pair<F>(&mut self, a: &str, b: &str, f: F)
    where
        F: FnOnce(&mut Rating, &mut Rating),
    {
        debug_assert_ne!(a, b, "a rating pair must name two distinct items");
        let mut rating_a = self.get(a);
        let mut rating_b = self.get(b);
        f(&mut rating_a, &mut rating_b);
        self.ratings.insert(a.to_string(), rating_a);
        self.ratings.insert(b.to_string(), rating_b);
    }

    pub fn insert(&mut self, id: impl Into<String>, rating: Rating) {
        self.ratings.insert(id.into(), rating);
    }

    /// Drop every rating; all items read as default afterwards.
    pub fn reset(&mut self) {
        self.ratings.clear();
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rating)> {
        self.ratings.iter().map(|(id, r)| (id.as_str(), r))
    }

    /// Join the catalog with current ratings, preserving catalog order.
    pub fn items_for(&self, papers: &[Paper]) -> Vec<Item> {
        papers
            .iter()
            .map(|p| Item {
                id: p.id.clone(),
                category: p.category.clone(),
                rating: self.get(&p.id),
            })
            .collect()
    }
}

/// Result of a decisive or drawn comparison, from A's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    AWins,
    BWins,
    Tie,
}

impl Outcome {
    /// Score for item A: 1.0, 0.0 or 0.5.
    pub fn value(self) -> f64 {
        match self {
            Outcome::AWins => 1.0,
            Outcome::BWins => 0.0,
            Outcome::Tie => 0.5,
        }
    }

    /// Only the three exact scores are accepted.
    pub fn from_value(value: f64) -> Option<Self> {
        if value == 1.0 {
            Some(Outcome::AWins)
        } else if value == 0.0 {
            Some(Outcome::BWins)
        } else if value == 0.5 {
            Some(Outcome::Tie)
        } else {
            None
        }
    }
}

/// The seven vote labels a user can pick for the current pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Choice {
    A,
    StrongA,
    B,
    StrongB,
    Both,
    Neither,
    Skip,
}

impl Choice {
    pub const ALL: [Choice; 7] = [
        Choice::A,
        Choice::StrongA,
        Choice::B,
        Choice::StrongB,
        Choice::Both,
        Choice::Neither,
        Choice::Skip,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::StrongA => "STRONG_A",
            Choice::B => "B",
            Choice::StrongB => "STRONG_B",
            Choice::Both => "BOTH",
            Choice::Neither => "NEITHER",
            Choice::Skip => "SKIP",
        }
    }

    /// Outcome recorded in the ledger for a fresh vote with this label.
    pub fn outcome(self) -> Option<Outcome> {
        match self {
            Choice::A | Choice::StrongA => Some(Outcome::AWins),
            Choice::B | Choice::StrongB => Some(Outcome::BWins),
            Choice::Both | Choice::Neither => Some(Outcome::Tie),
            Choice::Skip => None,
        }
    }

    /// Learning-rate multiplier recorded for a fresh vote with this label.
    pub fn k_mult(self) -> f64 {
        match self {
            Choice::A | Choice::B => 1.0,
            Choice::StrongA | Choice::StrongB => 1.5,
            Choice::Both | Choice::Neither => 0.8,
            Choice::Skip => 0.0,
        }
    }

    /// Joint endorsement/rejection labels that bypass the pairwise update.
    pub fn joint_signal(self) -> Option<JointSignal> {
        match self {
            Choice::Both => Some(JointSignal::Endorse),
            Choice::Neither => Some(JointSignal::Reject),
            _ => None,
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = ParseLabelError;

    /// Accepts the persisted labels (`STRONG_A`) as well as lowercase and
    /// kebab-case spellings (`strong-a`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Choice::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ParseLabelError::new("choice", s))
    }
}

/// Direction of a joint BOTH/NEITHER adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointSignal {
    Endorse,
    Reject,
}

impl JointSignal {
    pub fn direction(self) -> f64 {
        match self {
            JointSignal::Endorse => 1.0,
            JointSignal::Reject => -1.0,
        }
    }
}

/// One immutable ledger record.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub a: Option<String>,
    pub b: Option<String>,
    /// `None` for skips.
    pub outcome: Option<Outcome>,
    pub choice: Choice,
    pub k_mult: f64,
    pub neither_penalty_applied: bool,
    /// Unix milliseconds.
    pub timestamp: i64,
}

impl HistoryEntry {
    /// Entry for a fresh vote on `(a, b)`, with the label's fixed outcome and
    /// multiplier.
    pub fn for_vote(a: &str, b: &str, choice: Choice, timestamp: i64) -> Self {
        HistoryEntry {
            a: Some(a.to_string()),
            b: Some(b.to_string()),
            outcome: choice.outcome(),
            choice,
            k_mult: choice.k_mult(),
            neither_penalty_applied: choice == Choice::Neither,
            timestamp,
        }
    }

    /// Both ids, when the entry names two distinct items.
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (self.a.as_deref(), self.b.as_deref()) {
            (Some(a), Some(b)) if a != b => Some((a, b)),
            _ => None,
        }
    }
}

/// Selection mode. Each variant has its own selection routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Active,
    Random,
    Bubble,
    ResolveTies,
}

/// Ordering of the eligible pool before mode dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MuPriority {
    #[default]
    Highest,
    Lowest,
    Random,
}

/// Which comparison-count bucket to draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NMatchStrategy {
    #[default]
    Minimal,
    Maximal,
    Random,
}

macro_rules! label_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ParseLabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
                    $($label => Ok($ty::$variant),)+
                    _ => Err(ParseLabelError::new($kind, s)),
                }
            }
        }
    };
}

label_enum!(Mode, "mode", {
    Active => "active",
    Random => "random",
    Bubble => "bubble",
    ResolveTies => "resolve_ties",
});

label_enum!(MuPriority, "mu priority", {
    Highest => "highest",
    Lowest => "lowest",
    Random => "random",
});

label_enum!(NMatchStrategy, "n-match strategy", {
    Minimal => "minimal",
    Maximal => "maximal",
    Random => "random",
});

/// Process-wide selection configuration plus the most recently shown pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub mode: Mode,
    pub mu_priority: MuPriority,
    pub resolve_tie_n_matches: NMatchStrategy,
    pub wins_only: bool,
    /// Bubble-mode cutoff rank.
    pub top_n: usize,
    pub last_pair: Option<(String, String)>,
}

impl Default for SelectionState {
    fn default() -> Self {
        SelectionState {
            mode: Mode::default(),
            mu_priority: MuPriority::default(),
            resolve_tie_n_matches: NMatchStrategy::default(),
            wins_only: false,
            top_n: DEFAULT_TOP_N,
            last_pair: None,
        }
    }
}

impl SelectionState {
    /// True if `{a, b}` is the last shown pair, in either order.
    pub fn is_last_pair(&self, a: &str, b: &str) -> bool {
        match &self.last_pair {
            Some((x, y)) => (x == a && y == b) || (x == b && y == a),
            None => false,
        }
    }

    /// True if `id` was one half of the last shown pair.
    pub fn in_last_pair(&self, id: &str) -> bool {
        match &self.last_pair {
            Some((x, y)) => x == id || y == id,
            None => false,
        }
    }
}
