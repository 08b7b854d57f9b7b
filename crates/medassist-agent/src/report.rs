//! 患者画像报告

use medassist_clinical::{ComprehensiveAssessment, SafetyWarning};
use medassist_core::models::PatientSnapshot;

const MAX_LISTED_MEDICATIONS: usize = 5;

fn or_dash(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// 生成 Markdown 格式的患者画像报告
pub fn render_patient_report(
    snapshot: &PatientSnapshot,
    assessment: &ComprehensiveAssessment,
    warnings: &[SafetyWarning],
) -> String {
    let info = &snapshot.basic_info;
    let hypertension = &assessment.hypertension;
    let diabetes = &assessment.diabetes;
    let mut lines = Vec::new();

    lines.push("## 📋 患者画像报告\n".to_string());
    lines.push(format!("**患者ID**: {}", info.patient_id));
    lines.push(format!("**姓名**: {}", info.name.as_deref().unwrap_or("未知")));
    lines.push(format!("**性别**: {}", info.gender.map(|g| g.label()).unwrap_or("未知")));
    lines.push(format!(
        "**年龄**: {}岁",
        info.age.map(|a| a.to_string()).unwrap_or_else(|| "未知".to_string())
    ));
    if let Some(bmi) = info.bmi {
        lines.push(format!("**BMI**: {}", bmi));
    }
    lines.push(format!("**综合风险等级**: {}", assessment.overall_risk));

    if let Some(record) = &snapshot.hypertension_assessment {
        lines.push("\n### 🩺 高血压评估".to_string());
        lines.push(format!("**血压**: {}/{} mmHg", or_dash(record.sbp), or_dash(record.dbp)));
        if let Some(bp) = &hypertension.bp_classification {
            lines.push(format!("**血压分级**: {}", bp.name));
        }
        lines.push(format!("**风险等级**: {}", hypertension.risk_label()));
        if !hypertension.risk_factors.is_empty() {
            lines.push(format!("**危险因素**: {}", hypertension.risk_factors.join(", ")));
        }
    }

    if let Some(record) = &snapshot.diabetes_assessment {
        lines.push("\n### 🍬 糖尿病评估".to_string());
        lines.push(format!("**HbA1c**: {}%", or_dash(record.hba1c)));
        lines.push(format!("**空腹血糖**: {} mmol/L", or_dash(record.fasting_glucose)));
        lines.push(format!("**控制状态**: {}", diabetes.status_label()));
    }

    if !snapshot.medications.is_empty() {
        lines.push("\n### 💊 当前用药".to_string());
        for med in snapshot.medications.iter().take(MAX_LISTED_MEDICATIONS) {
            lines.push(format!(
                "- {} {} {}",
                med.drug_name,
                med.dosage.as_deref().unwrap_or(""),
                med.frequency.as_deref().unwrap_or("")
            ));
        }
    }

    if !warnings.is_empty() {
        lines.push("\n### ⚠️ 安全预警".to_string());
        for warning in warnings {
            lines.push(format!(
                "- {} **{}**: {}",
                warning.severity.icon(),
                warning.kind.label(),
                warning.message
            ));
        }
    }

    if let Some(plan) = &hypertension.follow_up_plan {
        lines.push("\n### 📅 随访计划".to_string());
        lines.push(format!("**随访频率**: {}", plan.frequency));
        lines.push(format!("**下次随访**: {}", plan.next_visit));
        lines.push(format!("**监测项目**: {}", plan.monitoring.join(", ")));
    }

    if !hypertension.recommendations.is_empty() {
        lines.push("\n### 💡 治疗建议".to_string());
        for rec in &hypertension.recommendations {
            lines.push(format!("\n**{}** ({})", rec.kind.label(), rec.evidence_level));
            lines.push(rec.content.clone());
            if !rec.drugs.is_empty() {
                lines.push(format!("推荐药物: {}", rec.drugs.join(", ")));
            }
            lines.push(format!("*来源: {}*", rec.source));
        }
    }

    lines.push("\n---".to_string());
    lines.push(
        "*数据来源: MySQL数据库 (patient_info, hypertension_risk_assessment, diabetes_control_assessment, medication_records)*"
            .to_string(),
    );

    lines.join("\n")
}
