mod amount;
mod calendar;
mod evaluator;
mod projection;
mod types;

pub use amount::{clamp01, format_chf, parse_amount, round_to_2};
pub use calendar::{
    Clock, DEFAULT_HORIZON_MONTHS, FixedClock, SystemClock, add_months, default_target_month,
    format_month, months_remaining, parse_target_month,
};
pub use evaluator::{equity_composition, evaluate};
pub use projection::{growth_timeline, project_balance, project_buckets};
pub use types::{
    AssetBucket, AssetKind, BindingConstraint, EquityBuckets, EquityComposition,
    HARD_EQUITY_RATIO, Hardness, ProjectedEquity, RateIssue, RequirementState,
    TOTAL_EQUITY_RATIO, TimelinePoint,
};
