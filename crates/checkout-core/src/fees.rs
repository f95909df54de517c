//! Fee Aggregation
//!
//! Groups a flat list of applied fee rules into per-type buckets and renders
//! their human labels. Both steps are pure functions of the rule list, so
//! re-rendering the same calculation always yields the same output.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{AppliedFeeRule, FeeCalculation, FeeRuleType};

/// The part of a rule a bucket keeps
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketRule {
    pub id: String,
    pub value: Decimal,
    pub fee_amount: Decimal,
}

/// All applied rules of one type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeBucket {
    pub rule_type: FeeRuleType,
    pub count: usize,
    pub total_fee_amount: Decimal,
    pub rules: Vec<BucketRule>,
}

impl FeeBucket {
    fn empty(rule_type: FeeRuleType) -> Self {
        Self {
            rule_type,
            count: 0,
            total_fee_amount: Decimal::ZERO,
            rules: Vec::new(),
        }
    }

    fn push(&mut self, rule: &AppliedFeeRule) {
        self.count += 1;
        self.total_fee_amount += rule.fee_amount;
        self.rules.push(BucketRule {
            id: rule.id.clone(),
            value: rule.value,
            fee_amount: rule.fee_amount,
        });
    }

    /// `None` when no rule landed here
    fn into_present(self) -> Option<Self> {
        (self.count > 0).then_some(self)
    }

    pub fn label(&self) -> String {
        label_for(self.rule_type, self)
    }
}

/// Type-keyed summaries. An absent bucket means "no fee of this type was
/// applied", which is different from a zero-valued fee.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FeesByType {
    pub percentage: Option<FeeBucket>,
    pub fx_spread: Option<FeeBucket>,
    pub fixed: Option<FeeBucket>,
}

impl FeesByType {
    pub fn get(&self, rule_type: FeeRuleType) -> Option<&FeeBucket> {
        match rule_type {
            FeeRuleType::Percentage => self.percentage.as_ref(),
            FeeRuleType::FxSpread => self.fx_spread.as_ref(),
            FeeRuleType::Fixed => self.fixed.as_ref(),
        }
    }

    /// Present buckets in display order: percentage, FX spread, fixed
    pub fn iter(&self) -> impl Iterator<Item = &FeeBucket> {
        FeeRuleType::ALL.into_iter().filter_map(|t| self.get(t))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Sum of every bucket's total
    pub fn total(&self) -> Decimal {
        self.iter().map(|b| b.total_fee_amount).sum()
    }

    /// Label and amount per present bucket, ready for display
    pub fn lines(&self) -> Vec<FeeLine> {
        self.iter()
            .map(|bucket| FeeLine {
                rule_type: bucket.rule_type,
                label: bucket.label(),
                amount: bucket.total_fee_amount,
            })
            .collect()
    }
}

/// One row of a fee breakdown
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeLine {
    pub rule_type: FeeRuleType,
    pub label: String,
    pub amount: Decimal,
}

/// Group a calculation's applied rules
pub fn aggregate(calc: &FeeCalculation) -> FeesByType {
    let grouped = aggregate_rules(&calc.applied_rules);
    if !calc.fees_balance() {
        tracing::warn!(
            total_fee = %calc.total_fee,
            rules_total = %grouped.total(),
            "Applied fee rules do not add up to total_fee"
        );
    }
    grouped
}

/// Single pass over `rules`, routing each into its type's bucket
pub fn aggregate_rules(rules: &[AppliedFeeRule]) -> FeesByType {
    let mut percentage = FeeBucket::empty(FeeRuleType::Percentage);
    let mut fx_spread = FeeBucket::empty(FeeRuleType::FxSpread);
    let mut fixed = FeeBucket::empty(FeeRuleType::Fixed);

    for rule in rules {
        match rule.rule_type {
            FeeRuleType::Percentage => percentage.push(rule),
            FeeRuleType::FxSpread => fx_spread.push(rule),
            FeeRuleType::Fixed => fixed.push(rule),
        }
    }

    FeesByType {
        percentage: percentage.into_present(),
        fx_spread: fx_spread.into_present(),
        fixed: fixed.into_present(),
    }
}

/// Human label for a bucket. The fixed fee's amount is rendered by the
/// caller, so its label is constant.
pub fn label_for(rule_type: FeeRuleType, bucket: &FeeBucket) -> String {
    let title = match rule_type {
        FeeRuleType::Fixed => return "Comisión Fija".into(),
        FeeRuleType::Percentage => "Comisión",
        FeeRuleType::FxSpread => "Conversión de Moneda",
    };

    if bucket.count > 1 {
        let values = bucket.rules.iter().map(|r| r.value);
        let min = values.clone().min().unwrap_or_default();
        let max = values.max().unwrap_or_default();
        if min == max {
            return format!("{title} ({}%)", format_rate(min));
        }
        return format!("{title} ({}% - {}%)", format_rate(min), format_rate(max));
    }

    let single = bucket.rules.first().map(|r| r.value).unwrap_or_default();
    format!("{title} ({}%)", format_rate(single))
}

/// Trailing zeros dropped, but always at least one decimal place:
/// `1.5000` → `1.5`, `2` → `2.0`
pub fn format_rate(value: Decimal) -> String {
    let normalized = value.normalize();
    if normalized.scale() == 0 {
        format!("{normalized}.0")
    } else {
        normalized.to_string()
    }
}
