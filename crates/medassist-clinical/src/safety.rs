//! 安全预警守卫
//!
//! 四项检查相互独立，均为患者快照（及可选的拟用推荐方案）的纯函数。
//! 合并后按严重程度稳定排序，同级预警保持产生顺序。

use serde::{Deserialize, Serialize};
use tracing::info;

use medassist_core::models::{Medication, PatientSnapshot};

use crate::interactions::{DrugToken, InteractionPair};
use crate::risk::Recommendation;

/// 高血压急症伴随症状
pub const EMERGENCY_SYMPTOMS: [&str; 6] = ["头痛", "呕吐", "视物模糊", "胸痛", "呼吸困难", "意识障碍"];

/// 推荐方案中提示 ACEI/ARB 的药名片段
const RAS_DRUG_MARKERS: [&str; 4] = ["ACEI", "ARB", "普利", "沙坦"];

const DIAGNOSIS_PREGNANCY_MARKERS: [&str; 2] = ["妊娠", "孕"];
const RECORD_PREGNANCY_MARKERS: [&str; 3] = ["妊娠", "孕妇", "怀孕"];

/// 预警严重程度，枚举顺序即严重程度升序
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,      // 提示
    Warning,   // 警告
    Critical,  // 严重
    Emergency, // 紧急
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
            Severity::Emergency => "emergency",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Emergency => "🚨",
            Severity::Critical => "❗",
            Severity::Warning => "⚠️",
            Severity::Info => "ℹ️",
        }
    }
}

/// 预警类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WarningKind {
    #[serde(rename = "高血压急症")]
    HypertensiveEmergency,
    #[serde(rename = "妊娠期用药禁忌")]
    PregnancyContraindication,
    #[serde(rename = "推荐方案禁忌")]
    ProposedPlanContraindication,
    #[serde(rename = "药物相互作用")]
    DrugInteraction,
    #[serde(rename = "低血糖")]
    Hypoglycemia,
    #[serde(rename = "严重高血糖")]
    SevereHyperglycemia,
    #[serde(rename = "血糖控制极差")]
    VeryPoorControl,
}

impl WarningKind {
    pub fn label(&self) -> &'static str {
        match self {
            WarningKind::HypertensiveEmergency => "高血压急症",
            WarningKind::PregnancyContraindication => "妊娠期用药禁忌",
            WarningKind::ProposedPlanContraindication => "推荐方案禁忌",
            WarningKind::DrugInteraction => "药物相互作用",
            WarningKind::Hypoglycemia => "低血糖",
            WarningKind::SevereHyperglycemia => "严重高血糖",
            WarningKind::VeryPoorControl => "血糖控制极差",
        }
    }
}

/// 安全预警，每次评估重新生成，不落库
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafetyWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub severity: Severity,
    pub message: String,
    pub recommendation: String,
    pub evidence: String,
    pub requires_action: bool,
}

/// 安全预警守卫
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyGuard;

impl SafetyGuard {
    pub fn new() -> Self {
        Self
    }

    /// 全面安全检查，返回按严重程度降序排列的预警
    pub fn check(&self, snapshot: &PatientSnapshot, proposed: &[Recommendation]) -> Vec<SafetyWarning> {
        let mut warnings = Vec::new();
        warnings.extend(self.check_hypertension_emergency(snapshot));
        warnings.extend(self.check_pregnancy_contraindications(snapshot, proposed));
        warnings.extend(self.check_drug_interactions(snapshot));
        warnings.extend(self.check_extreme_values(snapshot));

        // sort_by 为稳定排序
        warnings.sort_by(|a, b| b.severity.cmp(&a.severity));

        info!(patient_id = %snapshot.patient_id(), count = warnings.len(), "Safety check completed");
        warnings
    }

    /// 高血压急症：SBP≥180 或 DBP≥120
    ///
    /// 缺失的读数视为未测量而非异常，不能单独构成急症：单项缺失时由另一项判定，
    /// 两项都缺失不产生预警。
    pub fn check_hypertension_emergency(&self, snapshot: &PatientSnapshot) -> Option<SafetyWarning> {
        let record = snapshot.hypertension_assessment.as_ref()?;
        let sbp = record.sbp.unwrap_or(0.0);
        let dbp = record.dbp.unwrap_or(0.0);

        if sbp < 180.0 && dbp < 120.0 {
            return None;
        }

        let conditions = record.clinical_conditions.as_deref().unwrap_or("");
        let symptoms: Vec<&str> = EMERGENCY_SYMPTOMS
            .iter()
            .copied()
            .filter(|symptom| conditions.contains(symptom))
            .collect();

        let mut message = format!(
            "⚠️ 高血压急症预警：血压 {}/{} mmHg",
            reading(record.sbp),
            reading(record.dbp)
        );
        let severity = if symptoms.is_empty() {
            Severity::Critical
        } else {
            message.push_str(&format!("，伴有症状：{}", symptoms.join(", ")));
            Severity::Emergency
        };

        Some(SafetyWarning {
            kind: WarningKind::HypertensiveEmergency,
            severity,
            message,
            recommendation: "紧急处理建议：\n\
                1. 【立即转诊】建议紧急转诊至急诊科\n\
                2. 【静脉降压】启动静脉降压治疗\n\
                3. 【降压目标】1小时内降低不超过25%\n\
                4. 【监测】持续心电监护、血压监测\n\
                5. 【评估】排除继发性高血压、靶器官损害"
                .to_string(),
            evidence: "中国高血压防治指南2023 (证据等级ⅠA)".to_string(),
            requires_action: true,
        })
    }

    /// 通过诊断名称与病历自由文本推断是否妊娠
    pub fn is_pregnant(&self, snapshot: &PatientSnapshot) -> bool {
        let by_diagnosis = snapshot.diagnoses.iter().any(|d| {
            DIAGNOSIS_PREGNANCY_MARKERS.iter().any(|m| d.diagnosis_name.contains(m))
        });

        by_diagnosis
            || snapshot.medical_records.iter().any(|record| {
                record
                    .narrative_fields()
                    .any(|text| RECORD_PREGNANCY_MARKERS.iter().any(|m| text.contains(m)))
            })
    }

    /// 妊娠期 ACEI/ARB 禁忌：当前用药与拟用方案各自逐条预警
    pub fn check_pregnancy_contraindications(
        &self,
        snapshot: &PatientSnapshot,
        proposed: &[Recommendation],
    ) -> Vec<SafetyWarning> {
        if !self.is_pregnant(snapshot) {
            return Vec::new();
        }
        info!(patient_id = %snapshot.patient_id(), "Pregnant patient detected");

        let mut warnings: Vec<SafetyWarning> = snapshot
            .medications
            .iter()
            .filter_map(|med| ras_class(med).map(|class| (med, class)))
            .map(|(med, class)| SafetyWarning {
                kind: WarningKind::PregnancyContraindication,
                severity: Severity::Critical,
                message: format!("⚠️ 严重警告：妊娠期患者正在使用禁忌药物：{}（{}）", med.drug_name, class.label()),
                recommendation: "紧急处理建议：\n\
                    1. 【立即停药】停用 ACEI/ARB 类药物\n\
                    2. 【替代方案】推荐使用：\n   \
                    - 甲基多巴（首选，证据等级ⅠB）\n   \
                    - 拉贝洛尔（证据等级ⅠB）\n   \
                    - 硝苯地平缓释片（证据等级ⅠC）\n\
                    3. 【会诊】建议产科会诊，评估胎儿状况\n\
                    4. 【监测】密切监测血压和胎儿情况"
                    .to_string(),
                evidence: "中国高血压防治指南2023 - 妊娠期高血压章节 (证据等级ⅠA)".to_string(),
                requires_action: true,
            })
            .collect();

        for drug in proposed.iter().flat_map(|rec| rec.drugs.iter()) {
            if RAS_DRUG_MARKERS.iter().any(|marker| drug.contains(marker)) {
                warnings.push(SafetyWarning {
                    kind: WarningKind::ProposedPlanContraindication,
                    severity: Severity::Critical,
                    message: format!("⚠️ 警告：推荐方案中包含妊娠期禁忌药物：{}", drug),
                    recommendation: "妊娠期应避免使用 ACEI/ARB 类药物，建议使用甲基多巴或拉贝洛尔".to_string(),
                    evidence: "中国高血压防治指南2023".to_string(),
                    requires_action: true,
                });
            }
        }

        warnings
    }

    /// 药物相互作用，至少两种用药时才检查
    pub fn check_drug_interactions(&self, snapshot: &PatientSnapshot) -> Vec<SafetyWarning> {
        let medications = &snapshot.medications;
        if medications.len() < 2 {
            return Vec::new();
        }

        InteractionPair::ALL
            .into_iter()
            .filter(|pair| pair.matched_by(medications))
            .map(|pair| SafetyWarning {
                kind: WarningKind::DrugInteraction,
                severity: pair.severity(),
                message: format!("⚠️ 药物相互作用警告：{}", pair.display()),
                recommendation: format!("风险说明：{}，建议评估是否需要调整用药方案", pair.risk()),
                evidence: "药物相互作用数据库".to_string(),
                requires_action: pair.severity() == Severity::Critical,
            })
            .collect()
    }

    /// 极端血糖与 HbA1c
    pub fn check_extreme_values(&self, snapshot: &PatientSnapshot) -> Vec<SafetyWarning> {
        let Some(record) = snapshot.diabetes_assessment.as_ref() else {
            return Vec::new();
        };
        let mut warnings = Vec::new();
        let evidence = "中国2型糖尿病防治指南2020".to_string();

        match record.fasting_glucose {
            Some(fg) if fg < 3.9 => warnings.push(SafetyWarning {
                kind: WarningKind::Hypoglycemia,
                severity: Severity::Critical,
                message: format!("⚠️ 低血糖警告：空腹血糖 {} mmol/L", fg),
                recommendation: "立即补充葡萄糖，评估降糖药物剂量是否过量".to_string(),
                evidence: evidence.clone(),
                requires_action: true,
            }),
            Some(fg) if fg > 16.7 => warnings.push(SafetyWarning {
                kind: WarningKind::SevereHyperglycemia,
                severity: Severity::Critical,
                message: format!("⚠️ 严重高血糖警告：空腹血糖 {} mmol/L", fg),
                recommendation: "警惕糖尿病酮症酸中毒，建议急诊评估".to_string(),
                evidence: evidence.clone(),
                requires_action: true,
            }),
            _ => {}
        }

        if let Some(hba1c) = record.hba1c.filter(|v| *v >= 10.0) {
            warnings.push(SafetyWarning {
                kind: WarningKind::VeryPoorControl,
                severity: Severity::Warning,
                message: format!("⚠️ HbA1c {}%，血糖控制极差", hba1c),
                recommendation: "需要强化治疗，考虑起始或强化胰岛素治疗".to_string(),
                evidence,
                requires_action: true,
            });
        }

        warnings
    }

    /// 渲染预警报告；无预警时给出明确的确认文本
    pub fn format_warnings(&self, warnings: &[SafetyWarning]) -> String {
        if warnings.is_empty() {
            return "✅ 未发现安全风险预警".to_string();
        }

        let rule = "=".repeat(50);
        let mut lines = vec![rule.clone(), "⚠️ 安全预警报告".to_string(), rule];

        for (i, warning) in warnings.iter().enumerate() {
            lines.push(format!("\n{} 预警 {}: {}", warning.severity.icon(), i + 1, warning.kind.label()));
            lines.push(format!("严重程度: {}", warning.severity.as_str()));
            lines.push(format!("详情: {}", warning.message));
            lines.push(format!("\n建议措施:\n{}", warning.recommendation));
            lines.push(format!("\n证据来源: {}", warning.evidence));
            if warning.requires_action {
                lines.push("⚡ 需要立即处理".to_string());
            }
            lines.push("-".repeat(40));
        }

        lines.join("\n")
    }
}

/// 用药若属 ACEI/ARB 则返回其标识
fn ras_class(medication: &Medication) -> Option<DrugToken> {
    [DrugToken::Acei, DrugToken::Arb]
        .into_iter()
        .find(|token| token.matches(medication))
}

/// 血压读数文本，未测量显示为 `--`
fn reading(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_string(), |v| v.to_string())
}
