/// Starting skill estimate for an item that has never been compared.
pub const DEFAULT_MU: f64 = 1500.0;

/// Starting uncertainty. Also the reference point for per-item K scaling.
pub const DEFAULT_SIGMA: f64 = 350.0;

/// Uncertainty floor. Sigma never collapses below this, so long-rated items
/// can still move.
pub const MIN_SIGMA: f64 = 60.0;

/// Multiplicative sigma decay applied to both items on every comparison.
pub const SIGMA_DECAY: f64 = 0.93;

/// Extra decay factor for ties, on top of `SIGMA_DECAY`.
pub const TIE_SIGMA_DECAY: f64 = 0.98;

/// Extra decay factor for BOTH/NEITHER joint feedback, on top of `SIGMA_DECAY`.
pub const JOINT_SIGMA_DECAY: f64 = 0.99;

/// Bounds on `sigma / DEFAULT_SIGMA` when scaling the learning rate.
pub const K_SCALE_MIN: f64 = 0.6;
pub const K_SCALE_MAX: f64 = 1.8;

/// Base learning rate. Each history entry scales it by its own `k_mult`.
pub const BASE_K: f64 = 32.0;

/// Damping applied to joint BOTH/NEITHER adjustments relative to a full
/// comparison step.
pub const JOINT_FEEDBACK_SCALE: f64 = 0.45;

/// Flat mu penalty applied to each item of a NEITHER entry. Older ledgers
/// predate the joint scale and only carried this penalty, so replay keeps it.
pub const LEGACY_NEITHER_PENALTY: f64 = 10.0;

/// Share of the priority-ordered pool that active/bubble selection draws
/// item A from.
pub const FOCUS_FRACTION: f64 = 0.4;

/// Focus pool never shrinks below this many items.
pub const MIN_FOCUS: usize = 2;

/// Maximum number of high-sigma items considered for item A.
pub const CANDIDATE_A_LIMIT: usize = 40;

/// Maximum number of closest-skill opponents considered for item B.
pub const CANDIDATE_B_LIMIT: usize = 30;

/// Extra ranks past `top_n` included in the bubble boundary window.
pub const BUBBLE_BUFFER: usize = 20;

/// Decimal places used when grouping items by exact mu in tie resolution.
pub const TIE_DECIMALS: i32 = 6;

/// Default bubble cutoff rank.
pub const DEFAULT_TOP_N: usize = 30;

/// Largest accepted bubble cutoff rank.
pub const MAX_TOP_N: usize = 100_000;

/// Version tag written into persisted state.
pub const STATE_VERSION: u32 = 1;
