use super::amount::clamp01;
use super::projection::project_buckets;
use super::types::{
    BindingConstraint, EquityBuckets, EquityComposition, HARD_EQUITY_RATIO, RateIssue,
    RequirementState, TOTAL_EQUITY_RATIO,
};

/// Measures the projected equity at the target month against the 20% total
/// and 10% hard requirements for `price`.
///
/// The required monthly rate is sized for whichever rule is further from being
/// met. Because hard equity is part of total equity, saving that rate into a
/// hard bucket satisfies both rules. The rate is NaN (with `rate_issue` set)
/// when there is no valid price, or when money is missing but no month is left
/// to save it in.
pub fn evaluate(price: f64, buckets: &EquityBuckets, months: u32) -> RequirementState {
    let total_required = price * TOTAL_EQUITY_RATIO;
    let hard_required = price * HARD_EQUITY_RATIO;
    let price_valid = price > 0.0;

    let projected = project_buckets(buckets, months);
    let total_projected = projected.total;
    let hard_projected = projected.hard;

    let total_shortfall = (total_required - total_projected).max(0.0);
    let hard_shortfall = (hard_required - hard_projected).max(0.0);
    let savings_gap = total_shortfall.max(hard_shortfall);

    let binding_constraint = if hard_shortfall > total_shortfall {
        BindingConstraint::Hard
    } else if total_shortfall > hard_shortfall {
        BindingConstraint::Total
    } else {
        BindingConstraint::None
    };

    let (required_monthly_rate, rate_issue) = if !price_valid {
        (f64::NAN, Some(RateIssue::InvalidPrice))
    } else if savings_gap <= 0.0 {
        (0.0, None)
    } else if months == 0 {
        (f64::NAN, Some(RateIssue::NoTimeWindow))
    } else {
        (savings_gap / f64::from(months), None)
    };

    let hard_rule_met = hard_projected >= hard_required;
    let total_rule_met = total_projected >= total_required;

    let total_progress = if total_required <= 0.0 {
        0.0
    } else {
        clamp01(total_projected / total_required)
    };
    let hard_progress = if hard_required <= 0.0 {
        0.0
    } else {
        clamp01(hard_projected / hard_required)
    };

    let state = RequirementState {
        price,
        price_valid,
        months_remaining: months,
        assets_now: buckets.total_now(),
        total_required,
        hard_required,
        projected,
        total_projected,
        hard_projected,
        total_shortfall,
        hard_shortfall,
        savings_gap,
        binding_constraint,
        required_monthly_rate,
        rate_issue,
        hard_rule_met,
        total_rule_met,
        hard_equity_warning: total_rule_met && !hard_rule_met,
        invalid_time_window: price_valid && savings_gap > 0.0 && months == 0,
        total_progress,
        hard_progress,
    };

    tracing::debug!(
        price,
        months,
        savings_gap,
        binding = ?state.binding_constraint,
        rate = state.required_monthly_rate,
        issue = ?state.rate_issue,
        "equity requirement evaluated"
    );

    state
}

/// Splits the 20% target into the part covered by hard equity, the part
/// pension money fills on top, and what is still missing.
pub fn equity_composition(state: &RequirementState) -> EquityComposition {
    let target = state.total_required;
    let hard = state.hard_projected.min(target);
    let soft = state
        .projected
        .pension_fund
        .min((target - hard).max(0.0));
    let gap = (target - hard - soft).max(0.0);

    EquityComposition {
        target,
        hard,
        soft,
        gap,
    }
}
