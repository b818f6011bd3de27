/// Next-pair selection.
///
/// The eligible pool is filtered, ordered by mu priority, then handed to one
/// routine per [`Mode`]. All routines share the n-bucket grouping and the
/// best-effort repeat avoidance helpers below, and all of them degrade to
/// *some* valid pair whenever at least two items are eligible.
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::constants::{
    BUBBLE_BUFFER, CANDIDATE_A_LIMIT, CANDIDATE_B_LIMIT, FOCUS_FRACTION, MIN_FOCUS, TIE_DECIMALS,
};
use crate::types::{Item, Mode, MuPriority, NMatchStrategy, SelectionState};

/// Two distinct items from the input pool, in display order (A, B).
pub type ItemPair<'a> = (&'a Item, &'a Item);

/// Choose the next pair to compare, or `None` if fewer than two items pass
/// the filters.
///
/// Never mutates `items` or `state`. Randomness (random priority, random
/// bucket choice, random mode) comes from `rng`.
pub fn choose_next_pair<'a, R: Rng + ?Sized>(
    items: &'a [Item],
    state: &SelectionState,
    rng: &mut R,
) -> Option<ItemPair<'a>> {
    let eligible: Vec<&Item> = items
        .iter()
        .filter(|item| !state.wins_only || item.rating.wins >= 1)
        .collect();

    if eligible.len() < 2 {
        debug!(
            eligible = eligible.len(),
            wins_only = state.wins_only,
            "not enough eligible items for a pair"
        );
        return None;
    }

    let prioritized = order_by_priority(eligible, state.mu_priority, rng);

    let pair = match state.mode {
        Mode::Active => select_active(&prioritized, state, rng),
        Mode::Bubble => select_bubble(&prioritized, state, rng),
        Mode::Random => select_random(&prioritized, state, rng),
        Mode::ResolveTies => select_resolve_ties(&prioritized, state, rng),
    };

    if let Some((a, b)) = pair {
        debug!(mode = %state.mode, a = %a.id, b = %b.id, "selected pair");
    }
    pair
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn order_by_priority<'a, R: Rng + ?Sized>(
    mut pool: Vec<&'a Item>,
    priority: MuPriority,
    rng: &mut R,
) -> Vec<&'a Item> {
    match priority {
        MuPriority::Highest => pool.sort_by(|a, b| cmp_f64(b.rating.mu, a.rating.mu)),
        MuPriority::Lowest => pool.sort_by(|a, b| cmp_f64(a.rating.mu, b.rating.mu)),
        MuPriority::Random => pool.shuffle(rng),
    }
    pool
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Narrow `candidates` to one comparison-count bucket.
///
/// Only buckets with at least `min_size` members qualify. `Minimal` takes the
/// lowest `n`, `Maximal` the highest, `Random` any. When no bucket qualifies
/// the candidates come back unchanged. Candidate order is preserved.
fn bucket_by_n<'a, R: Rng + ?Sized>(
    candidates: &[&'a Item],
    strategy: NMatchStrategy,
    min_size: usize,
    rng: &mut R,
) -> Vec<&'a Item> {
    let mut buckets: BTreeMap<u32, Vec<&'a Item>> = BTreeMap::new();
    for &item in candidates {
        buckets.entry(item.rating.n).or_default().push(item);
    }

    let viable: Vec<&Vec<&'a Item>> = buckets.values().filter(|b| b.len() >= min_size).collect();

    let chosen = match strategy {
        NMatchStrategy::Minimal => viable.first(),
        NMatchStrategy::Maximal => viable.last(),
        NMatchStrategy::Random if viable.is_empty() => None,
        NMatchStrategy::Random => viable.get(rng.random_range(0..viable.len())),
    };

    match chosen {
        Some(bucket) => bucket.to_vec(),
        None => candidates.to_vec(),
    }
}

/// First candidate across `tiers` (in order) that satisfies `fresh`.
fn find_fresh_one<'a>(tiers: &[Vec<&'a Item>], fresh: impl Fn(&Item) -> bool) -> Option<&'a Item> {
    tiers
        .iter()
        .find_map(|tier| tier.iter().find(|item| fresh(**item)).copied())
}

/// Like [`find_fresh_one`], but falls back to the first candidate of the first
/// non-empty tier.
fn pick_one<'a>(tiers: &[Vec<&'a Item>], fresh: impl Fn(&Item) -> bool) -> Option<&'a Item> {
    find_fresh_one(tiers, fresh).or_else(|| tiers.iter().find_map(|tier| tier.first().copied()))
}

/// First pair (in tier order) that is not the last shown pair.
fn find_fresh_pair<'a>(tiers: &[Vec<&'a Item>], state: &SelectionState) -> Option<ItemPair<'a>> {
    for tier in tiers {
        for (i, &a) in tier.iter().enumerate() {
            for &b in &tier[i + 1..] {
                if a.id != b.id && !state.is_last_pair(&a.id, &b.id) {
                    return Some((a, b));
                }
            }
        }
    }
    None
}

/// Like [`find_fresh_pair`], but falls back to the first two candidates of
/// the first tier that has two.
fn pick_two<'a>(tiers: &[Vec<&'a Item>], state: &SelectionState) -> Option<ItemPair<'a>> {
    find_fresh_pair(tiers, state).or_else(|| {
        tiers
            .iter()
            .find(|tier| tier.len() >= 2)
            .map(|tier| (tier[0], tier[1]))
    })
}

// ---------------------------------------------------------------------------
// Active / bubble
// ---------------------------------------------------------------------------

/// Pick item A: the most uncertain items from the top of the priority order,
/// narrowed by n-bucket, avoiding the last pair.
fn pick_focus_item<'a, R: Rng + ?Sized>(
    prioritized: &[&'a Item],
    state: &SelectionState,
    rng: &mut R,
) -> Option<&'a Item> {
    let focus_len = ((prioritized.len() as f64 * FOCUS_FRACTION).ceil() as usize)
        .max(MIN_FOCUS)
        .min(prioritized.len());

    let mut focus: Vec<&'a Item> = prioritized[..focus_len].to_vec();
    focus.sort_by(|a, b| cmp_f64(b.rating.sigma, a.rating.sigma));
    focus.truncate(CANDIDATE_A_LIMIT);

    let bucket = bucket_by_n(&focus, state.resolve_tie_n_matches, 1, rng);
    pick_one(&[bucket, focus], |item| !state.in_last_pair(&item.id))
}

/// Opponents for `a`, closest mu first and most uncertain first among equals.
///
/// Returns `(preferred, all)`: `preferred` keeps only opponents from a
/// different primary category, or everything when that leaves nothing.
fn rank_opponents<'a>(a: &Item, prioritized: &[&'a Item]) -> (Vec<&'a Item>, Vec<&'a Item>) {
    let mut all: Vec<&'a Item> = prioritized
        .iter()
        .copied()
        .filter(|c| c.id != a.id)
        .collect();

    all.sort_by(|x, y| {
        let dx = (a.rating.mu - x.rating.mu).abs();
        let dy = (a.rating.mu - y.rating.mu).abs();
        cmp_f64(dx, dy).then_with(|| cmp_f64(y.rating.sigma, x.rating.sigma))
    });

    let diverse: Vec<&'a Item> = match &a.category {
        Some(category) => all
            .iter()
            .copied()
            .filter(|c| c.category.as_ref() != Some(category))
            .collect(),
        None => Vec::new(),
    };

    let preferred = if diverse.is_empty() { all.clone() } else { diverse };
    (preferred, all)
}

fn select_active<'a, R: Rng + ?Sized>(
    prioritized: &[&'a Item],
    state: &SelectionState,
    rng: &mut R,
) -> Option<ItemPair<'a>> {
    let a = pick_focus_item(prioritized, state, rng)?;
    let (preferred, all) = rank_opponents(a, prioritized);
    let b = pick_general_opponent(a, &preferred, all, state, rng)?;
    Some((a, b))
}

fn pick_general_opponent<'a, R: Rng + ?Sized>(
    a: &Item,
    preferred: &[&'a Item],
    all: Vec<&'a Item>,
    state: &SelectionState,
    rng: &mut R,
) -> Option<&'a Item> {
    let pool: Vec<&'a Item> = preferred.iter().take(CANDIDATE_B_LIMIT).copied().collect();
    let bucket = bucket_by_n(&pool, state.resolve_tie_n_matches, 1, rng);
    pick_one(&[bucket, pool, all], |c| !state.is_last_pair(&a.id, &c.id))
}

/// Ids of the top `top_n + BUBBLE_BUFFER` items by mu, highest first.
fn boundary_window<'a>(prioritized: &[&'a Item], state: &SelectionState) -> HashSet<&'a str> {
    let mut ranked: Vec<&'a Item> = prioritized.to_vec();
    match state.mu_priority {
        MuPriority::Highest => {}
        MuPriority::Lowest => ranked.reverse(),
        MuPriority::Random => ranked.sort_by(|a, b| cmp_f64(b.rating.mu, a.rating.mu)),
    }
    ranked
        .into_iter()
        .take(state.top_n.saturating_add(BUBBLE_BUFFER))
        .map(|item| item.id.as_str())
        .collect()
}

fn select_bubble<'a, R: Rng + ?Sized>(
    prioritized: &[&'a Item],
    state: &SelectionState,
    rng: &mut R,
) -> Option<ItemPair<'a>> {
    let a = pick_focus_item(prioritized, state, rng)?;
    let (preferred, all) = rank_opponents(a, prioritized);

    let window = boundary_window(prioritized, state);
    if window.contains(a.id.as_str()) {
        let in_window = |list: &[&'a Item]| -> Vec<&'a Item> {
            list.iter()
                .take(CANDIDATE_B_LIMIT)
                .copied()
                .filter(|c| window.contains(c.id.as_str()))
                .collect()
        };
        let window_preferred = in_window(&preferred);
        let window_all = in_window(&all);
        let bucket = bucket_by_n(&window_preferred, state.resolve_tie_n_matches, 1, rng);

        let fresh = |c: &Item| !state.is_last_pair(&a.id, &c.id);
        if let Some(b) = find_fresh_one(&[bucket, window_preferred, window_all], fresh) {
            return Some((a, b));
        }
        debug!(a = %a.id, "no fresh opponent inside the bubble window");
    }

    let b = pick_general_opponent(a, &preferred, all, state, rng)?;
    Some((a, b))
}

// ---------------------------------------------------------------------------
// Random
// ---------------------------------------------------------------------------

fn select_random<'a, R: Rng + ?Sized>(
    prioritized: &[&'a Item],
    state: &SelectionState,
    rng: &mut R,
) -> Option<ItemPair<'a>> {
    let mut bucket = bucket_by_n(prioritized, state.resolve_tie_n_matches, 2, rng);
    bucket.shuffle(rng);
    let mut wider = prioritized.to_vec();
    wider.shuffle(rng);
    pick_two(&[bucket, wider], state)
}

// ---------------------------------------------------------------------------
// Tie resolution
// ---------------------------------------------------------------------------

/// Groups of two or more items with identical mu (to `TIE_DECIMALS` places),
/// in order of first appearance in `prioritized`.
fn tie_groups<'a>(prioritized: &[&'a Item]) -> Vec<Vec<&'a Item>> {
    let scale = 10f64.powi(TIE_DECIMALS);
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut groups: Vec<Vec<&'a Item>> = Vec::new();

    for &item in prioritized {
        let key = (item.rating.mu * scale).round() as i64;
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(item);
    }

    groups.retain(|g| g.len() >= 2);
    groups
}

fn select_resolve_ties<'a, R: Rng + ?Sized>(
    prioritized: &[&'a Item],
    state: &SelectionState,
    rng: &mut R,
) -> Option<ItemPair<'a>> {
    let Some(group) = tie_groups(prioritized).into_iter().next() else {
        debug!("no tie groups, falling back to active selection");
        return select_active(prioritized, state, rng);
    };
    let bucket = bucket_by_n(&group, state.resolve_tie_n_matches, 2, rng);
    pick_two(&[bucket, group], state)
}
