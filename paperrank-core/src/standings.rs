/// Ranked read-out of the current ratings.
use std::cmp::Ordering;

use serde::Serialize;

use crate::constants::DEFAULT_MU;
use crate::types::Item;

/// One row of the ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standing {
    /// 1-based.
    pub rank: usize,
    pub id: String,
    pub mu: f64,
    pub sigma: f64,
    pub n: u32,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

fn by_mu_desc(a: &Item, b: &Item) -> Ordering {
    b.rating
        .mu
        .partial_cmp(&a.rating.mu)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.id.cmp(&b.id))
}

/// Items sorted by mu, highest first. Equal mu is broken by id.
pub fn standings(items: &[Item]) -> Vec<Standing> {
    let mut sorted: Vec<&Item> = items.iter().collect();
    sorted.sort_by(|a, b| by_mu_desc(a, b));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, item)| Standing {
            rank: i + 1,
            id: item.id.clone(),
            mu: item.rating.mu,
            sigma: item.rating.sigma,
            n: item.rating.n,
            wins: item.rating.wins,
            losses: item.rating.losses,
            ties: item.rating.ties,
        })
        .collect()
}

/// Non-negative preference weight per rated item, highest first.
///
/// Weight is how far mu sits above the starting rating. Unrated items
/// (`n == 0`) carry no signal. If no rated item is above the start, the
/// ranking order itself is used: the i-th of `count` items gets
/// `(count - i) / count`. Zero weights are left out.
pub fn preference_weights(items: &[Item]) -> Vec<(String, f64)> {
    let mut rated: Vec<&Item> = items.iter().filter(|i| i.rating.n > 0).collect();
    rated.sort_by(|a, b| by_mu_desc(a, b));

    let above_start: Vec<(String, f64)> = rated
        .iter()
        .map(|i| (i.id.clone(), (i.rating.mu - DEFAULT_MU).max(0.0)))
        .filter(|(_, w)| *w > 0.0)
        .collect();
    if !above_start.is_empty() {
        return above_start;
    }

    let count = rated.len() as f64;
    rated
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id.clone(), (count - i as f64) / count))
        .collect()
}
