//! 风险分层引擎
//!
//! 高血压风险分层依据《中国高血压防治指南2023》，糖尿病控制评估依据
//! 《中国2型糖尿病防治指南2020》。两条评估轴相互独立，任一轴缺少数据
//! 只会使该轴降级为"无法评估"，不影响另一轴和综合等级。

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use medassist_core::models::{Gender, PatientSnapshot};
use medassist_core::utils::{
    classify_bp, classify_hba1c, split_list, BpClassification, BpGrade, EvidenceLevel, Hba1cBand,
};

use crate::followup::{self, FollowUpPlan};

pub const HYPERTENSION_GUIDELINE: &str = "中国高血压防治指南2023";
pub const DIABETES_GUIDELINE: &str = "中国2型糖尿病防治指南2020";

const DIABETES_FACTOR: &str = "糖尿病";

/// 风险等级，按严重程度排序
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskTier {
    #[serde(rename = "低危")]
    Low,
    #[serde(rename = "中危")]
    Medium,
    #[serde(rename = "高危")]
    High,
    #[serde(rename = "很高危")]
    VeryHigh,
}

impl RiskTier {
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "低危",
            RiskTier::Medium => "中危",
            RiskTier::High => "高危",
            RiskTier::VeryHigh => "很高危",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 糖尿病控制状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlStatus {
    #[serde(rename = "良好")]
    Good,
    #[serde(rename = "一般")]
    Fair,
    #[serde(rename = "不佳")]
    Poor,
}

impl ControlStatus {
    /// 仅由 HbA1c 决定
    pub fn from_hba1c(hba1c: f64) -> Self {
        if hba1c < 7.0 {
            ControlStatus::Good
        } else if hba1c < 8.0 {
            ControlStatus::Fair
        } else {
            ControlStatus::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ControlStatus::Good => "良好",
            ControlStatus::Fair => "一般",
            ControlStatus::Poor => "不佳",
        }
    }
}

/// 推荐类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RecommendationKind {
    #[serde(rename = "生活方式干预")]
    Lifestyle,
    #[serde(rename = "药物治疗")]
    DrugTherapy,
    #[serde(rename = "观察随访")]
    Observation,
    #[serde(rename = "合并糖尿病")]
    DiabetesComorbidity,
    #[serde(rename = "强化治疗")]
    Intensive,
    #[serde(rename = "联合治疗")]
    Combination,
    #[serde(rename = "调整治疗")]
    Adjustment,
    #[serde(rename = "维持治疗")]
    Maintenance,
}

impl RecommendationKind {
    pub fn label(&self) -> &'static str {
        match self {
            RecommendationKind::Lifestyle => "生活方式干预",
            RecommendationKind::DrugTherapy => "药物治疗",
            RecommendationKind::Observation => "观察随访",
            RecommendationKind::DiabetesComorbidity => "合并糖尿病",
            RecommendationKind::Intensive => "强化治疗",
            RecommendationKind::Combination => "联合治疗",
            RecommendationKind::Adjustment => "调整治疗",
            RecommendationKind::Maintenance => "维持治疗",
        }
    }
}

/// 治疗建议
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drugs: Vec<String>,
    pub evidence_level: EvidenceLevel,
    pub source: String,
}

impl Recommendation {
    fn new(
        kind: RecommendationKind,
        content: &str,
        drugs: &[&str],
        evidence_level: EvidenceLevel,
        source: &str,
    ) -> Self {
        Self {
            kind,
            content: content.to_string(),
            drugs: drugs.iter().map(|d| d.to_string()).collect(),
            evidence_level,
            source: source.to_string(),
        }
    }
}

/// 风险分层输入
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierInputs {
    pub bp_grade: BpGrade,
    pub risk_factor_count: usize,
    pub has_organ_damage: bool,
    pub has_clinical_condition: bool,
    pub has_diabetes: bool,
}

/// 高血压风险分层决策
///
/// 按优先级：临床疾患 > 靶器官损害/糖尿病 > 血压分级与危险因素数量。
pub fn decide_tier(inputs: &TierInputs) -> RiskTier {
    if inputs.has_clinical_condition {
        return RiskTier::VeryHigh;
    }

    if inputs.has_organ_damage || inputs.has_diabetes {
        return if inputs.bp_grade >= BpGrade::Grade2 {
            RiskTier::VeryHigh
        } else {
            RiskTier::High
        };
    }

    let factors = inputs.risk_factor_count;
    match inputs.bp_grade {
        BpGrade::Grade3 => RiskTier::VeryHigh,
        BpGrade::Grade2 => match factors {
            0 => RiskTier::Medium,
            1 | 2 => RiskTier::High,
            _ => RiskTier::VeryHigh,
        },
        BpGrade::Grade1 => match factors {
            0 => RiskTier::Low,
            1 | 2 => RiskTier::Medium,
            _ => RiskTier::High,
        },
        BpGrade::Normal | BpGrade::HighNormal => {
            if factors >= 3 {
                RiskTier::Medium
            } else {
                RiskTier::Low
            }
        }
    }
}

/// 综合风险等级，缺失的评估轴不参与升级
pub fn overall_tier(hypertension: Option<RiskTier>, diabetes: Option<ControlStatus>) -> RiskTier {
    match (hypertension, diabetes) {
        (Some(RiskTier::VeryHigh), _) | (_, Some(ControlStatus::Poor)) => RiskTier::VeryHigh,
        (Some(RiskTier::High), _) | (_, Some(ControlStatus::Fair)) => RiskTier::High,
        (Some(RiskTier::Medium), _) => RiskTier::Medium,
        _ => RiskTier::Low,
    }
}

/// 高血压风险评估结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypertensionAssessment {
    /// None 表示缺少血压数据，无法评估
    pub risk_level: Option<RiskTier>,
    pub risk_factors: Vec<String>,
    pub target_organ_damage: Vec<String>,
    pub clinical_conditions: Vec<String>,
    pub bp_classification: Option<BpClassification>,
    pub follow_up_plan: Option<FollowUpPlan>,
    pub recommendations: Vec<Recommendation>,
    pub evidence_level: EvidenceLevel,
    pub source: String,
}

impl HypertensionAssessment {
    fn unassessable() -> Self {
        Self {
            risk_level: None,
            risk_factors: Vec::new(),
            target_organ_damage: Vec::new(),
            clinical_conditions: Vec::new(),
            bp_classification: None,
            follow_up_plan: None,
            recommendations: Vec::new(),
            evidence_level: EvidenceLevel::IA,
            source: HYPERTENSION_GUIDELINE.to_string(),
        }
    }

    pub fn is_assessed(&self) -> bool {
        self.risk_level.is_some()
    }

    pub fn risk_label(&self) -> &'static str {
        self.risk_level.map(|t| t.label()).unwrap_or("无法评估（缺少血压数据）")
    }
}

/// 血糖值
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GlucoseValues {
    pub fasting: Option<f64>,
    pub postprandial: Option<f64>,
}

/// 糖尿病控制评估结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiabetesAssessment {
    /// None 表示缺少 HbA1c，无法评估
    pub control_status: Option<ControlStatus>,
    pub hba1c: Option<f64>,
    pub hba1c_band: Option<Hba1cBand>,
    pub glucose_values: GlucoseValues,
    pub insulin_usage: Option<bool>,
    pub follow_up_plan: Option<FollowUpPlan>,
    pub recommendations: Vec<Recommendation>,
    pub evidence_level: EvidenceLevel,
    pub source: String,
}

impl DiabetesAssessment {
    pub fn is_assessed(&self) -> bool {
        self.control_status.is_some()
    }

    pub fn status_label(&self) -> &'static str {
        self.control_status.map(|s| s.label()).unwrap_or("无法评估（缺少数据）")
    }
}

/// 综合评估结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComprehensiveAssessment {
    pub patient_id: String,
    pub hypertension: HypertensionAssessment,
    pub diabetes: DiabetesAssessment,
    pub overall_risk: RiskTier,
}

/// 风险评估引擎
///
/// 纯函数式规则评估，不持有外部连接。
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskEngine;

impl RiskEngine {
    pub fn new() -> Self {
        Self
    }

    /// 高血压风险分层（以当天为随访基准日）
    pub fn assess_hypertension(&self, snapshot: &PatientSnapshot) -> HypertensionAssessment {
        self.assess_hypertension_on(snapshot, Local::now().date_naive())
    }

    pub fn assess_hypertension_on(
        &self,
        snapshot: &PatientSnapshot,
        today: NaiveDate,
    ) -> HypertensionAssessment {
        let record = match &snapshot.hypertension_assessment {
            Some(record) => record,
            None => {
                warn!(patient_id = %snapshot.patient_id(), "Missing hypertension assessment record");
                return HypertensionAssessment::unassessable();
            }
        };

        let (sbp, dbp) = match (finite(record.sbp), finite(record.dbp)) {
            (Some(sbp), Some(dbp)) => (sbp, dbp),
            _ => {
                warn!(patient_id = %snapshot.patient_id(), "Hypertension record lacks blood pressure values");
                return HypertensionAssessment::unassessable();
            }
        };

        let bp_classification = classify_bp(sbp, dbp);
        let has_diabetes = snapshot.diabetes_assessment.is_some();

        let mut risk_factors = demographic_factors(snapshot);
        risk_factors.extend(split_list(record.risk_factors.as_deref()));
        if has_diabetes && !risk_factors.iter().any(|f| f == DIABETES_FACTOR) {
            risk_factors.push(DIABETES_FACTOR.to_string());
        }

        let target_organ_damage = split_list(record.target_organs_damage.as_deref());
        let clinical_conditions = split_list(record.clinical_conditions.as_deref());

        let tier = decide_tier(&TierInputs {
            bp_grade: bp_classification.grade,
            risk_factor_count: risk_factors.len(),
            has_organ_damage: !target_organ_damage.is_empty(),
            has_clinical_condition: !clinical_conditions.is_empty(),
            has_diabetes,
        });

        let recommendations = hypertension_recommendations(tier, &risk_factors);

        info!(patient_id = %snapshot.patient_id(), tier = %tier, "Hypertension risk stratified");

        HypertensionAssessment {
            risk_level: Some(tier),
            risk_factors,
            target_organ_damage,
            clinical_conditions,
            bp_classification: Some(bp_classification),
            follow_up_plan: Some(followup::hypertension_plan(tier, today)),
            recommendations,
            evidence_level: EvidenceLevel::IA,
            source: HYPERTENSION_GUIDELINE.to_string(),
        }
    }

    /// 糖尿病控制评估（以当天为随访基准日）
    pub fn assess_diabetes(&self, snapshot: &PatientSnapshot) -> DiabetesAssessment {
        self.assess_diabetes_on(snapshot, Local::now().date_naive())
    }

    pub fn assess_diabetes_on(&self, snapshot: &PatientSnapshot, today: NaiveDate) -> DiabetesAssessment {
        let record = snapshot.diabetes_assessment.as_ref();
        let hba1c = record.and_then(|r| finite(r.hba1c));

        let mut assessment = DiabetesAssessment {
            control_status: None,
            hba1c,
            hba1c_band: None,
            glucose_values: GlucoseValues {
                fasting: record.and_then(|r| finite(r.fasting_glucose)),
                postprandial: record.and_then(|r| finite(r.postprandial_glucose)),
            },
            insulin_usage: record.and_then(|r| r.insulin_usage),
            follow_up_plan: None,
            recommendations: Vec::new(),
            evidence_level: EvidenceLevel::IA,
            source: DIABETES_GUIDELINE.to_string(),
        };

        let Some(hba1c) = hba1c else {
            warn!(patient_id = %snapshot.patient_id(), "Missing HbA1c, diabetes control not assessed");
            return assessment;
        };

        let status = ControlStatus::from_hba1c(hba1c);
        assessment.control_status = Some(status);
        assessment.hba1c_band = Some(classify_hba1c(hba1c));
        assessment.recommendations = diabetes_recommendations(hba1c);
        assessment.follow_up_plan = Some(followup::diabetes_plan(status, today));

        info!(patient_id = %snapshot.patient_id(), status = status.label(), "Diabetes control assessed");
        assessment
    }

    /// 综合评估：两轴独立完成后再合并
    pub fn comprehensive(&self, snapshot: &PatientSnapshot) -> ComprehensiveAssessment {
        self.comprehensive_on(snapshot, Local::now().date_naive())
    }

    pub fn comprehensive_on(&self, snapshot: &PatientSnapshot, today: NaiveDate) -> ComprehensiveAssessment {
        let hypertension = self.assess_hypertension_on(snapshot, today);
        let diabetes = self.assess_diabetes_on(snapshot, today);
        let overall_risk = overall_tier(hypertension.risk_level, diabetes.control_status);

        info!(patient_id = %snapshot.patient_id(), overall = %overall_risk, "Comprehensive assessment completed");

        ComprehensiveAssessment {
            patient_id: snapshot.patient_id().to_string(),
            hypertension,
            diabetes,
            overall_risk,
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// 年龄与 BMI 危险因素
fn demographic_factors(snapshot: &PatientSnapshot) -> Vec<String> {
    let info = &snapshot.basic_info;
    let mut factors = Vec::new();

    let aged = match (info.gender, info.age) {
        (Some(Gender::Male), Some(age)) => age >= 55,
        (Some(Gender::Female), Some(age)) => age >= 65,
        _ => false,
    };
    if aged {
        factors.push("年龄（男≥55岁/女≥65岁）".to_string());
    }

    match finite(info.bmi) {
        Some(bmi) if bmi >= 28.0 => factors.push(format!("肥胖（BMI {}）", bmi)),
        Some(bmi) if bmi >= 24.0 => factors.push(format!("超重（BMI {}）", bmi)),
        _ => {}
    }

    factors
}

fn hypertension_recommendations(tier: RiskTier, risk_factors: &[String]) -> Vec<Recommendation> {
    let source = HYPERTENSION_GUIDELINE;
    let mut recommendations = vec![Recommendation::new(
        RecommendationKind::Lifestyle,
        "限盐（<6g/d）、减重、规律运动、戒烟限酒、DASH饮食",
        &[],
        EvidenceLevel::IA,
        source,
    )];

    recommendations.push(match tier {
        RiskTier::High | RiskTier::VeryHigh => Recommendation::new(
            RecommendationKind::DrugTherapy,
            "立即开始降压药物治疗，推荐起始联合治疗",
            &["CCB（如氨氯地平）", "ACEI/ARB（如缬沙坦）"],
            EvidenceLevel::IA,
            source,
        ),
        RiskTier::Medium => Recommendation::new(
            RecommendationKind::DrugTherapy,
            "生活方式干预4周后若血压未达标，开始药物治疗",
            &["CCB", "ACEI/ARB", "利尿剂（任选一种）"],
            EvidenceLevel::IA,
            source,
        ),
        RiskTier::Low => Recommendation::new(
            RecommendationKind::Observation,
            "首先强化生活方式干预，密切监测血压",
            &[],
            EvidenceLevel::IB,
            source,
        ),
    });

    if risk_factors.iter().any(|f| f == DIABETES_FACTOR) {
        recommendations.push(Recommendation::new(
            RecommendationKind::DiabetesComorbidity,
            "优先选择ACEI/ARB类药物，有肾脏保护作用",
            &["ACEI（如依那普利）", "ARB（如缬沙坦）"],
            EvidenceLevel::IA,
            source,
        ));
    }

    recommendations
}

fn diabetes_recommendations(hba1c: f64) -> Vec<Recommendation> {
    let source = DIABETES_GUIDELINE;
    let lifestyle = Recommendation::new(
        RecommendationKind::Lifestyle,
        "医学营养治疗、运动疗法、戒烟、糖尿病自我管理教育",
        &[],
        EvidenceLevel::IA,
        source,
    );

    let graded = if hba1c >= 9.0 {
        Recommendation::new(
            RecommendationKind::Intensive,
            "HbA1c≥9.0%，建议起始胰岛素治疗或联合治疗",
            &["基础胰岛素", "二甲双胍联合胰岛素"],
            EvidenceLevel::IA,
            source,
        )
    } else if hba1c >= 7.5 {
        Recommendation::new(
            RecommendationKind::Combination,
            "HbA1c≥7.5%，建议二甲双胍联合其他降糖药",
            &["二甲双胍+DPP-4抑制剂", "二甲双胍+SGLT-2抑制剂", "二甲双胍+GLP-1受体激动剂"],
            EvidenceLevel::IA,
            source,
        )
    } else if hba1c >= 7.0 {
        Recommendation::new(
            RecommendationKind::Adjustment,
            "HbA1c 7.0-7.5%，强化生活方式干预，必要时增加药物",
            &["二甲双胍（一线）"],
            EvidenceLevel::IA,
            source,
        )
    } else {
        Recommendation::new(
            RecommendationKind::Maintenance,
            "HbA1c<7.0%，控制良好，维持当前治疗方案",
            &[],
            EvidenceLevel::IA,
            source,
        )
    };

    vec![lifestyle, graded]
}

#[cfg(test)]
mod tests {
    use super::*;
    use medassist_core::models::{BasicInfo, DiabetesRecord, HypertensionRecord};
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn snapshot(sbp: f64, dbp: f64) -> PatientSnapshot {
        PatientSnapshot {
            basic_info: BasicInfo {
                patient_id: "P001".into(),
                name: Some("张三".into()),
                gender: Some(Gender::Male),
                age: Some(45),
                bmi: Some(22.0),
            },
            hypertension_assessment: Some(HypertensionRecord {
                sbp: Some(sbp),
                dbp: Some(dbp),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_emergency_scenario_is_very_high() {
        let mut patient = snapshot(185.0, 125.0);
        if let Some(record) = patient.hypertension_assessment.as_mut() {
            record.clinical_conditions = Some("胸痛".into());
        }
        let result = RiskEngine::new().assess_hypertension_on(&patient, today());
        assert_eq!(result.risk_level, Some(RiskTier::VeryHigh));
        assert_eq!(result.clinical_conditions, vec!["胸痛"]);
        assert_eq!(result.follow_up_plan.unwrap().cycle_days, 7);
    }

    #[test]
    fn test_demographic_factors_count() {
        let mut patient = snapshot(150.0, 95.0);
        patient.basic_info.age = Some(60);
        patient.basic_info.bmi = Some(29.5);
        if let Some(record) = patient.hypertension_assessment.as_mut() {
            record.risk_factors = Some("吸烟，血脂异常".into());
        }
        let result = RiskEngine::new().assess_hypertension_on(&patient, today());
        assert_eq!(result.risk_factors.len(), 4);
        assert!(result.risk_factors.contains(&"肥胖（BMI 29.5）".to_string()));
        assert_eq!(result.risk_level, Some(RiskTier::High));
    }

    #[test]
    fn test_female_age_threshold() {
        let mut patient = snapshot(150.0, 95.0);
        patient.basic_info.gender = Some(Gender::Female);
        patient.basic_info.age = Some(60);
        let result = RiskEngine::new().assess_hypertension_on(&patient, today());
        assert!(result.risk_factors.is_empty());
        assert_eq!(result.risk_level, Some(RiskTier::Low));
        assert_eq!(result.recommendations[1].kind, RecommendationKind::Observation);
    }

    #[test]
    fn test_diabetes_raises_tier_and_adds_acei_recommendation() {
        let mut patient = snapshot(150.0, 95.0);
        patient.diabetes_assessment = Some(DiabetesRecord { hba1c: Some(7.2), ..Default::default() });
        let result = RiskEngine::new().assess_hypertension_on(&patient, today());
        assert_eq!(result.risk_level, Some(RiskTier::High));
        assert!(result.risk_factors.contains(&"糖尿病".to_string()));
        let last = result.recommendations.last().unwrap();
        assert_eq!(last.kind, RecommendationKind::DiabetesComorbidity);
        assert!(last.drugs.iter().any(|d| d.contains("依那普利")));
    }

    #[test]
    fn test_missing_bp_is_unassessable() {
        let mut patient = snapshot(0.0, 0.0);
        if let Some(record) = patient.hypertension_assessment.as_mut() {
            record.dbp = None;
        }
        let result = RiskEngine::new().assess_hypertension_on(&patient, today());
        assert!(!result.is_assessed());
        assert!(result.recommendations.is_empty());
        assert_eq!(result.risk_label(), "无法评估（缺少血压数据）");

        patient.hypertension_assessment = None;
        assert!(!RiskEngine::new().assess_hypertension_on(&patient, today()).is_assessed());
    }

    #[test]
    fn test_poor_control_scenario() {
        let mut patient = snapshot(118.0, 76.0);
        patient.diabetes_assessment = Some(DiabetesRecord {
            hba1c: Some(9.5),
            fasting_glucose: Some(9.8),
            ..Default::default()
        });
        let result = RiskEngine::new().assess_diabetes_on(&patient, today());
        assert_eq!(result.control_status, Some(ControlStatus::Poor));
        assert_eq!(result.hba1c_band, Some(Hba1cBand::Poor));
        assert_eq!(result.recommendations[1].kind, RecommendationKind::Intensive);
        assert_eq!(result.follow_up_plan.unwrap().cycle_days, 14);
        assert_eq!(
            serde_json::to_value(&result.recommendations[1]).unwrap()["type"],
            "强化治疗"
        );
    }

    #[test]
    fn test_diabetes_grading_thresholds() {
        let kinds: Vec<RecommendationKind> = [6.5, 7.0, 7.5, 9.0]
            .into_iter()
            .map(|v| diabetes_recommendations(v)[1].kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                RecommendationKind::Maintenance,
                RecommendationKind::Adjustment,
                RecommendationKind::Combination,
                RecommendationKind::Intensive,
            ]
        );
    }

    #[test]
    fn test_missing_hba1c_is_unassessable() {
        let mut patient = snapshot(118.0, 76.0);
        patient.diabetes_assessment = Some(DiabetesRecord { fasting_glucose: Some(6.1), ..Default::default() });
        let result = RiskEngine::new().assess_diabetes_on(&patient, today());
        assert!(!result.is_assessed());
        assert!(result.recommendations.is_empty());
        assert_eq!(result.glucose_values.fasting, Some(6.1));
    }

    #[test]
    fn test_overall_tier_combinations() {
        assert_eq!(overall_tier(Some(RiskTier::Low), Some(ControlStatus::Poor)), RiskTier::VeryHigh);
        assert_eq!(overall_tier(Some(RiskTier::Medium), Some(ControlStatus::Fair)), RiskTier::High);
        assert_eq!(overall_tier(Some(RiskTier::Medium), None), RiskTier::Medium);
        assert_eq!(overall_tier(None, Some(ControlStatus::Good)), RiskTier::Low);
        assert_eq!(overall_tier(None, None), RiskTier::Low);
    }

    #[test]
    fn test_comprehensive_degrades_one_axis_only() {
        let mut patient = snapshot(165.0, 95.0);
        patient.diabetes_assessment = Some(DiabetesRecord::default());
        let result = RiskEngine::new().comprehensive_on(&patient, today());
        assert_eq!(result.hypertension.risk_level, Some(RiskTier::VeryHigh));
        assert!(!result.diabetes.is_assessed());
        assert_eq!(result.overall_risk, RiskTier::VeryHigh);
    }

    fn grade() -> impl Strategy<Value = BpGrade> {
        prop::sample::select(vec![
            BpGrade::Normal,
            BpGrade::HighNormal,
            BpGrade::Grade1,
            BpGrade::Grade2,
            BpGrade::Grade3,
        ])
    }

    fn inputs() -> impl Strategy<Value = TierInputs> {
        (grade(), 0usize..8, any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(bp_grade, risk_factor_count, has_organ_damage, has_clinical_condition, has_diabetes)| TierInputs {
                bp_grade,
                risk_factor_count,
                has_organ_damage,
                has_clinical_condition,
                has_diabetes,
            },
        )
    }

    proptest! {
        #[test]
        fn property_tier_monotonic_in_each_input(base in inputs(), higher in grade()) {
            let tier = decide_tier(&base);

            if higher >= base.bp_grade {
                let raised = TierInputs { bp_grade: higher, ..base };
                prop_assert!(decide_tier(&raised) >= tier);
            }
            let raised = TierInputs { risk_factor_count: base.risk_factor_count + 1, ..base };
            prop_assert!(decide_tier(&raised) >= tier);
            let raised = TierInputs { has_organ_damage: true, ..base };
            prop_assert!(decide_tier(&raised) >= tier);
            let raised = TierInputs { has_clinical_condition: true, ..base };
            prop_assert!(decide_tier(&raised) >= tier);
            let raised = TierInputs { has_diabetes: true, ..base };
            prop_assert!(decide_tier(&raised) >= tier);
        }
    }
}
