use serde::Serialize;

/// Share of the purchase price that must be covered by equity overall.
pub const TOTAL_EQUITY_RATIO: f64 = 0.20;
/// Share of the purchase price that must be covered by hard (non-pension) equity.
pub const HARD_EQUITY_RATIO: f64 = 0.10;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Hardness {
    Hard,
    Soft,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Cash,
    Pillar3a,
    PensionFund,
    Other,
}

impl AssetKind {
    /// Pension-fund money only counts toward the total requirement.
    pub fn hardness(self) -> Hardness {
        match self {
            AssetKind::PensionFund => Hardness::Soft,
            AssetKind::Cash | AssetKind::Pillar3a | AssetKind::Other => Hardness::Hard,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBucket {
    pub kind: AssetKind,
    pub current_balance: f64,
    pub monthly_contribution: f64,
}

impl AssetBucket {
    pub fn new(kind: AssetKind, current_balance: f64, monthly_contribution: f64) -> Self {
        Self {
            kind,
            current_balance,
            monthly_contribution,
        }
    }

    /// A bucket that is not fed by monthly payments.
    pub fn static_balance(kind: AssetKind, current_balance: f64) -> Self {
        Self::new(kind, current_balance, 0.0)
    }

    pub fn hardness(&self) -> Hardness {
        self.kind.hardness()
    }
}

/// The four equity sources the calculator knows about.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityBuckets {
    pub cash: AssetBucket,
    pub pillar_3a: AssetBucket,
    pub pension_fund: AssetBucket,
    pub other: AssetBucket,
}

impl EquityBuckets {
    /// Only pillar 3a and the pension fund take monthly contributions by default.
    pub fn new(
        cash: f64,
        pillar_3a: f64,
        pillar_3a_monthly: f64,
        pension_fund: f64,
        pension_fund_monthly: f64,
        other: f64,
    ) -> Self {
        Self {
            cash: AssetBucket::static_balance(AssetKind::Cash, cash),
            pillar_3a: AssetBucket::new(AssetKind::Pillar3a, pillar_3a, pillar_3a_monthly),
            pension_fund: AssetBucket::new(
                AssetKind::PensionFund,
                pension_fund,
                pension_fund_monthly,
            ),
            other: AssetBucket::static_balance(AssetKind::Other, other),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetBucket> {
        [&self.cash, &self.pillar_3a, &self.pension_fund, &self.other].into_iter()
    }

    pub fn total_now(&self) -> f64 {
        self.iter().map(|bucket| bucket.current_balance).sum()
    }
}

/// Balances of every bucket at the target month plus the two aggregates the
/// requirement rules are measured against.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedEquity {
    pub cash: f64,
    pub pillar_3a: f64,
    pub pension_fund: f64,
    pub other: f64,
    pub hard: f64,
    pub total: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingConstraint {
    Hard,
    Total,
    None,
}

/// Why the required monthly rate could not be computed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RateIssue {
    InvalidPrice,
    NoTimeWindow,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementState {
    pub price: f64,
    pub price_valid: bool,
    pub months_remaining: u32,
    pub assets_now: f64,
    pub total_required: f64,
    pub hard_required: f64,
    pub projected: ProjectedEquity,
    pub total_projected: f64,
    pub hard_projected: f64,
    pub total_shortfall: f64,
    pub hard_shortfall: f64,
    pub savings_gap: f64,
    pub binding_constraint: BindingConstraint,
    /// NaN when the rate is undefined; see `rate_issue`.
    pub required_monthly_rate: f64,
    pub rate_issue: Option<RateIssue>,
    pub hard_rule_met: bool,
    pub total_rule_met: bool,
    pub hard_equity_warning: bool,
    pub invalid_time_window: bool,
    pub total_progress: f64,
    pub hard_progress: f64,
}

impl RequirementState {
    pub fn monthly_rate(&self) -> Option<f64> {
        if self.required_monthly_rate.is_nan() {
            None
        } else {
            Some(self.required_monthly_rate)
        }
    }

    pub fn goal_met(&self) -> bool {
        self.hard_rule_met && self.total_rule_met
    }
}

/// How the 20% target is filled: hard equity first, then pension money, then
/// whatever is still missing.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityComposition {
    pub target: f64,
    pub hard: f64,
    pub soft: f64,
    pub gap: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub offset: u32,
    pub month: String,
    pub liquid: f64,
    pub pillar_3a: f64,
    pub pension_fund: f64,
    pub total: f64,
}
