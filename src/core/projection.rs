use chrono::NaiveDate;

use super::calendar::{add_months, format_month};
use super::types::{AssetBucket, EquityBuckets, Hardness, ProjectedEquity, TimelinePoint};

/// Straight-line balance after `months` contributions. No returns, no caps.
pub fn project_balance(current: f64, monthly_contribution: f64, months: u32) -> f64 {
    current + monthly_contribution * f64::from(months)
}

impl AssetBucket {
    pub fn projected(&self, months: u32) -> f64 {
        project_balance(self.current_balance, self.monthly_contribution, months)
    }
}

pub fn project_buckets(buckets: &EquityBuckets, months: u32) -> ProjectedEquity {
    let cash = buckets.cash.projected(months);
    let pillar_3a = buckets.pillar_3a.projected(months);
    let pension_fund = buckets.pension_fund.projected(months);
    let other = buckets.other.projected(months);

    let hard: f64 = buckets
        .iter()
        .filter(|bucket| bucket.hardness() == Hardness::Hard)
        .map(|bucket| bucket.projected(months))
        .sum();

    ProjectedEquity {
        cash,
        pillar_3a,
        pension_fund,
        other,
        hard,
        total: hard + pension_fund,
    }
}

/// Month-by-month balances from today's month (offset 0) through the target
/// month. Cash and other assets are reported together as liquid money.
pub fn growth_timeline(
    buckets: &EquityBuckets,
    months: u32,
    today: NaiveDate,
) -> Vec<TimelinePoint> {
    if months == 0 {
        return Vec::new();
    }

    (0..=months)
        .map(|offset| {
            let liquid = buckets.cash.projected(offset) + buckets.other.projected(offset);
            let pillar_3a = buckets.pillar_3a.projected(offset);
            let pension_fund = buckets.pension_fund.projected(offset);
            TimelinePoint {
                offset,
                month: format_month(add_months(today, offset)),
                liquid,
                pillar_3a,
                pension_fund,
                total: liquid + pillar_3a + pension_fund,
            }
        })
        .collect()
}
