/// Elo-style pairwise update with per-item uncertainty.
///
/// Each item carries `(mu, sigma, n)`. Sigma scales the learning rate (uncertain
/// items move faster) and decays multiplicatively with every comparison down
/// to `MIN_SIGMA`.
use crate::constants::{
    BASE_K, DEFAULT_SIGMA, JOINT_FEEDBACK_SCALE, JOINT_SIGMA_DECAY, K_SCALE_MAX, K_SCALE_MIN,
    LEGACY_NEITHER_PENALTY, MIN_SIGMA, SIGMA_DECAY, TIE_SIGMA_DECAY,
};
use crate::types::{JointSignal, Outcome, Rating};

/// Expected score of A against B on a 400-point logistic scale.
pub fn expected_score(mu_a: f64, mu_b: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf(-(mu_a - mu_b) / 400.0))
}

/// Learning-rate multiplier from an item's uncertainty, bounded to 0.6x-1.8x.
pub fn k_scale(sigma: f64) -> f64 {
    (sigma / DEFAULT_SIGMA).clamp(K_SCALE_MIN, K_SCALE_MAX)
}

fn decay_sigma(sigma: f64, factor: f64) -> f64 {
    (sigma * factor).max(MIN_SIGMA)
}

/// Apply one comparison between A and B.
///
/// `outcome` is from A's point of view. Both items are mutated in place: mu
/// moves by the item's own K times the surprise, sigma decays, `n` and the
/// outcome counters tick.
pub fn update(a: &mut Rating, b: &mut Rating, outcome: Outcome, base_k: f64) {
    let k_a = base_k * k_scale(a.sigma);
    let k_b = base_k * k_scale(b.sigma);

    let p_a = expected_score(a.mu, b.mu);
    let p_b = 1.0 - p_a;
    let score_a = outcome.value();

    a.mu += k_a * (score_a - p_a);
    b.mu += k_b * ((1.0 - score_a) - p_b);

    let factor = match outcome {
        Outcome::Tie => SIGMA_DECAY * TIE_SIGMA_DECAY,
        Outcome::AWins | Outcome::BWins => SIGMA_DECAY,
    };
    a.sigma = decay_sigma(a.sigma, factor);
    b.sigma = decay_sigma(b.sigma, factor);

    a.n += 1;
    b.n += 1;

    match outcome {
        Outcome::AWins => {
            a.wins += 1;
            b.losses += 1;
        }
        Outcome::BWins => {
            b.wins += 1;
            a.losses += 1;
        }
        Outcome::Tie => {
            a.ties += 1;
            b.ties += 1;
        }
    }
}

/// Apply a BOTH/NEITHER signal to a single item.
///
/// Not a comparison: each item of the pair gets this independently, so both
/// move in the same direction.
pub fn apply_joint(rating: &mut Rating, signal: JointSignal, k_mult: f64) {
    let step = BASE_K * k_mult * k_scale(rating.sigma) * JOINT_FEEDBACK_SCALE;
    rating.mu += signal.direction() * step;
    rating.sigma = decay_sigma(rating.sigma, SIGMA_DECAY * JOINT_SIGMA_DECAY);
    rating.n += 1;
}

/// Flat mu penalty carried by NEITHER entries.
pub fn apply_legacy_neither_penalty(rating: &mut Rating) {
    rating.mu -= LEGACY_NEITHER_PENALTY;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_MU, DEFAULT_SIGMA};
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_expected_score_equal_ratings() {
        assert!(approx(expected_score(1500.0, 1500.0), 0.5));
    }

    #[test]
    fn test_expected_score_400_point_gap() {
        // 400 points is a 10:1 odds ratio.
        assert!(approx(expected_score(1900.0, 1500.0), 10.0 / 11.0));
        assert!(approx(expected_score(1500.0, 1900.0), 1.0 / 11.0));
    }

    #[test]
    fn test_k_scale_bounds() {
        assert!(approx(k_scale(DEFAULT_SIGMA), 1.0));
        assert!(approx(k_scale(60.0), 0.6));
        assert!(approx(k_scale(10_000.0), 1.8));
        assert!(approx(k_scale(280.0), 0.8));
    }

    #[test]
    fn test_decisive_update_on_default_items() {
        let mut x = Rating::default();
        let mut y = Rating::default();
        update(&mut x, &mut y, Outcome::AWins, 32.0);

        assert!(approx(x.mu, 1516.0));
        assert!(approx(y.mu, 1484.0));
        assert!(approx(x.sigma, 325.5));
        assert!(approx(y.sigma, 325.5));
        assert_eq!((x.n, y.n), (1, 1));
        assert_eq!((x.wins, x.losses), (1, 0));
        assert_eq!((y.wins, y.losses), (0, 1));
    }

    #[test]
    fn test_b_win_mirrors_a_win() {
        let mut x = Rating::default();
        let mut y = Rating::default();
        update(&mut x, &mut y, Outcome::BWins, 32.0);
        assert!(approx(x.mu, 1484.0));
        assert!(approx(y.mu, 1516.0));
        assert_eq!(y.wins, 1);
        assert_eq!(x.losses, 1);
    }

    #[test]
    fn test_tie_between_equals_keeps_mu_and_decays_more() {
        let mut x = Rating::default();
        let mut y = Rating::default();
        update(&mut x, &mut y, Outcome::Tie, 32.0);
        assert!(approx(x.mu, DEFAULT_MU));
        assert!(approx(y.mu, DEFAULT_MU));
        assert!(approx(x.sigma, 350.0 * 0.93 * 0.98));
        assert_eq!((x.ties, y.ties), (1, 1));
    }

    #[test]
    fn test_uncertain_item_moves_faster() {
        let mut settled = Rating { sigma: 100.0, ..Rating::default() };
        let mut fresh = Rating::default();
        update(&mut settled, &mut fresh, Outcome::BWins, 32.0);
        let settled_delta = (settled.mu - DEFAULT_MU).abs();
        let fresh_delta = (fresh.mu - DEFAULT_MU).abs();
        assert!(fresh_delta > settled_delta);
        assert!(approx(settled_delta, 32.0 * 0.6 * 0.5));
    }

    #[test]
    fn test_joint_endorse_on_default_item() {
        let mut r = Rating::default();
        apply_joint(&mut r, JointSignal::Endorse, 0.8);
        assert!(approx(r.mu, 1511.52));
        assert!(approx(r.sigma, 350.0 * 0.93 * 0.99));
        assert_eq!(r.n, 1);
    }

    #[test]
    fn test_joint_reject_moves_down() {
        let mut r = Rating::default();
        apply_joint(&mut r, JointSignal::Reject, 0.8);
        assert!(approx(r.mu, 1488.48));
    }

    #[test]
    fn test_sigma_floor_after_many_updates() {
        let mut x = Rating::default();
        let mut y = Rating::default();
        for _ in 0..200 {
            update(&mut x, &mut y, Outcome::AWins, 32.0);
            apply_joint(&mut x, JointSignal::Reject, 0.8);
        }
        assert!(approx(x.sigma, MIN_SIGMA));
        assert!(approx(y.sigma, MIN_SIGMA));
    }

    proptest! {
        #[test]
        fn prop_sigma_never_below_floor(
            steps in prop::collection::vec((0u8..5, 0.0f64..2.0), 1..120),
        ) {
            let mut x = Rating::default();
            let mut y = Rating::default();
            for (kind, k_mult) in steps {
                match kind {
                    0 => update(&mut x, &mut y, Outcome::AWins, BASE_K * k_mult),
                    1 => update(&mut x, &mut y, Outcome::BWins, BASE_K * k_mult),
                    2 => update(&mut x, &mut y, Outcome::Tie, BASE_K * k_mult),
                    3 => apply_joint(&mut x, JointSignal::Endorse, k_mult),
                    _ => apply_joint(&mut y, JointSignal::Reject, k_mult),
                }
                prop_assert!(x.sigma >= MIN_SIGMA);
                prop_assert!(y.sigma >= MIN_SIGMA);
            }
        }

        #[test]
        fn prop_equal_k_win_is_zero_sum(
            mu_a in 1000.0f64..2000.0,
            mu_b in 1000.0f64..2000.0,
            sigma in 60.0f64..700.0,
        ) {
            let mut a = Rating { mu: mu_a, sigma, ..Rating::default() };
            let mut b = Rating { mu: mu_b, sigma, ..Rating::default() };
            update(&mut a, &mut b, Outcome::AWins, BASE_K);
            prop_assert!(a.mu > mu_a);
            prop_assert!(b.mu < mu_b);
            prop_assert!(((a.mu - mu_a) + (b.mu - mu_b)).abs() < 1e-9);
        }
    }
}
