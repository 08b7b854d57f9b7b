//! 随访计划查表

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::risk::{ControlStatus, RiskTier};

/// 随访计划
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowUpPlan {
    pub frequency: String,
    pub cycle_days: i64,
    pub next_visit: NaiveDate,
    pub monitoring: Vec<String>,
    /// 高血压：控制目标
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
    /// 糖尿病：年度检查项目
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annual_check: Vec<String>,
}

impl FollowUpPlan {
    fn build(
        frequency: &str,
        cycle_days: i64,
        today: NaiveDate,
        monitoring: &[&str],
        targets: &[&str],
        annual_check: &[&str],
    ) -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            frequency: frequency.to_string(),
            cycle_days,
            next_visit: today + Duration::days(cycle_days),
            monitoring: owned(monitoring),
            targets: owned(targets),
            annual_check: owned(annual_check),
        }
    }
}

/// 高血压随访计划
pub fn hypertension_plan(tier: RiskTier, today: NaiveDate) -> FollowUpPlan {
    match tier {
        RiskTier::Low => FollowUpPlan::build(
            "3个月",
            90,
            today,
            &["血压监测（每周1-2次）", "生活方式评估"],
            &["血压<140/90 mmHg"],
            &[],
        ),
        RiskTier::Medium => FollowUpPlan::build(
            "1个月",
            30,
            today,
            &["血压监测（每周2-3次）", "心血管危险因素评估", "靶器官检查"],
            &["血压<140/90 mmHg", "评估是否需要药物治疗"],
            &[],
        ),
        RiskTier::High => FollowUpPlan::build(
            "2周",
            14,
            today,
            &["血压监测（每日）", "心血管风险评估", "肾功能检查", "心电图"],
            &["血压<130/80 mmHg", "立即开始药物治疗"],
            &[],
        ),
        RiskTier::VeryHigh => FollowUpPlan::build(
            "1周",
            7,
            today,
            &["血压监测（每日2次）", "心血管全面评估", "肾功能", "眼底检查"],
            &["尽快将血压控制在安全范围", "强化治疗", "考虑转诊"],
            &[],
        ),
    }
}

/// 糖尿病随访计划
pub fn diabetes_plan(status: ControlStatus, today: NaiveDate) -> FollowUpPlan {
    match status {
        ControlStatus::Good => FollowUpPlan::build(
            "3个月",
            90,
            today,
            &["HbA1c（每3个月）", "空腹血糖", "餐后血糖"],
            &[],
            &["眼底检查", "肾功能", "足部检查"],
        ),
        ControlStatus::Fair => FollowUpPlan::build(
            "1-2个月",
            45,
            today,
            &["HbA1c（每3个月）", "血糖谱监测", "用药依从性评估"],
            &[],
            &["眼底检查", "肾功能", "神经病变筛查", "足部检查"],
        ),
        ControlStatus::Poor => FollowUpPlan::build(
            "2-4周",
            14,
            today,
            &["强化血糖监测", "HbA1c（每3个月）", "并发症筛查"],
            &[],
            &["眼底检查", "肾功能", "心血管风险评估", "神经病变", "足部检查"],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_hypertension_cycles_shorten_with_tier() {
        let cycles: Vec<i64> = [RiskTier::Low, RiskTier::Medium, RiskTier::High, RiskTier::VeryHigh]
            .into_iter()
            .map(|tier| hypertension_plan(tier, today()).cycle_days)
            .collect();
        assert_eq!(cycles, vec![90, 30, 14, 7]);
    }

    #[test]
    fn test_next_visit_is_offset_from_today() {
        let plan = hypertension_plan(RiskTier::VeryHigh, today());
        assert_eq!(plan.next_visit, NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
        assert_eq!(plan.frequency, "1周");
        assert!(plan.targets.contains(&"考虑转诊".to_string()));
        assert!(plan.annual_check.is_empty());
    }

    #[test]
    fn test_diabetes_plans_escalate() {
        let good = diabetes_plan(ControlStatus::Good, today());
        let poor = diabetes_plan(ControlStatus::Poor, today());
        assert_eq!(good.cycle_days, 90);
        assert_eq!(diabetes_plan(ControlStatus::Fair, today()).cycle_days, 45);
        assert_eq!(poor.cycle_days, 14);
        assert!(poor.annual_check.len() > good.annual_check.len());
        assert!(poor.targets.is_empty());
    }
}
