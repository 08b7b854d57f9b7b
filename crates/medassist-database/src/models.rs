//! 数据库模型
//!
//! 查询语句中对数值列显式 CAST，行结构只需处理固定的 Rust 类型。

use chrono::NaiveDate;
use medassist_core::models::*;
use sqlx::FromRow;

/// patient_info 表
#[derive(Debug, FromRow)]
pub struct DbPatientInfo {
    pub patient_id: String,
    pub name: Option<String>,
    pub gender: Option<String>, // 存储为文本，转换为 Gender 枚举
    pub age: Option<i64>,
    pub bmi: Option<f64>,
}

impl From<DbPatientInfo> for BasicInfo {
    fn from(row: DbPatientInfo) -> Self {
        BasicInfo {
            patient_id: row.patient_id,
            name: row.name,
            gender: row.gender.as_deref().and_then(Gender::from_label),
            age: row.age.and_then(|age| u32::try_from(age).ok()),
            bmi: row.bmi,
        }
    }
}

/// medical_records 表
#[derive(Debug, FromRow)]
pub struct DbMedicalRecord {
    pub visit_date: Option<NaiveDate>,
    pub chief_complaint: Option<String>,
    pub present_illness: Option<String>,
    pub past_history: Option<String>,
    pub diagnosis: Option<String>,
}

impl From<DbMedicalRecord> for MedicalRecord {
    fn from(row: DbMedicalRecord) -> Self {
        MedicalRecord {
            visit_date: row.visit_date,
            chief_complaint: row.chief_complaint,
            present_illness: row.present_illness,
            past_history: row.past_history,
            diagnosis: row.diagnosis,
        }
    }
}

/// lab_results 表
#[derive(Debug, FromRow)]
pub struct DbLabResult {
    pub test_name: Option<String>,
    pub result_value: Option<String>,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    pub test_date: Option<NaiveDate>,
}

impl From<DbLabResult> for LabResult {
    fn from(row: DbLabResult) -> Self {
        LabResult {
            test_name: row.test_name.unwrap_or_default(),
            result_value: row.result_value,
            unit: row.unit,
            reference_range: row.reference_range,
            test_date: row.test_date,
        }
    }
}

/// medication_records 表
#[derive(Debug, FromRow)]
pub struct DbMedication {
    pub drug_name: Option<String>,
    pub drug_class: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub medication_date: Option<NaiveDate>,
}

impl From<DbMedication> for Medication {
    fn from(row: DbMedication) -> Self {
        Medication {
            drug_name: row.drug_name.unwrap_or_default(),
            drug_class: row.drug_class.filter(|class| !class.trim().is_empty()),
            dosage: row.dosage,
            frequency: row.frequency,
            medication_date: row.medication_date,
        }
    }
}

/// diagnosis_records 表
#[derive(Debug, FromRow)]
pub struct DbDiagnosis {
    pub diagnosis_name: Option<String>,
    pub diagnosis_date: Option<NaiveDate>,
}

impl From<DbDiagnosis> for Diagnosis {
    fn from(row: DbDiagnosis) -> Self {
        Diagnosis {
            diagnosis_name: row.diagnosis_name.unwrap_or_default(),
            diagnosis_date: row.diagnosis_date,
        }
    }
}

/// hypertension_risk_assessment 表
#[derive(Debug, FromRow)]
pub struct DbHypertensionAssessment {
    pub assessment_date: Option<NaiveDate>,
    pub sbp: Option<f64>,
    pub dbp: Option<f64>,
    pub risk_factors: Option<String>,
    pub target_organs_damage: Option<String>,
    pub clinical_conditions: Option<String>,
    pub risk_level: Option<String>,
}

impl From<DbHypertensionAssessment> for HypertensionRecord {
    fn from(row: DbHypertensionAssessment) -> Self {
        HypertensionRecord {
            assessment_date: row.assessment_date,
            sbp: row.sbp,
            dbp: row.dbp,
            risk_factors: row.risk_factors,
            target_organs_damage: row.target_organs_damage,
            clinical_conditions: row.clinical_conditions,
            risk_level: row.risk_level,
        }
    }
}

/// diabetes_control_assessment 表
#[derive(Debug, FromRow)]
pub struct DbDiabetesAssessment {
    pub assessment_date: Option<NaiveDate>,
    pub hba1c: Option<f64>,
    pub fasting_glucose: Option<f64>,
    pub postprandial_glucose: Option<f64>,
    pub insulin_usage: Option<i64>, // 0/1
    pub control_status: Option<String>,
}

impl From<DbDiabetesAssessment> for DiabetesRecord {
    fn from(row: DbDiabetesAssessment) -> Self {
        DiabetesRecord {
            assessment_date: row.assessment_date,
            hba1c: row.hba1c,
            fasting_glucose: row.fasting_glucose,
            postprandial_glucose: row.postprandial_glucose,
            insulin_usage: row.insulin_usage.map(|flag| flag != 0),
            control_status: row.control_status,
        }
    }
}

/// guideline_recommendations 表
#[derive(Debug, FromRow)]
pub struct DbGuideline {
    pub guideline_name: Option<String>,
    pub disease_type: Option<String>,
    pub patient_condition: Option<String>,
    pub recommendation_level: Option<String>,
    pub recommendation_content: Option<String>,
    pub evidence_source: Option<String>,
    pub update_date: Option<NaiveDate>,
}

impl From<DbGuideline> for GuidelineRow {
    fn from(row: DbGuideline) -> Self {
        GuidelineRow {
            guideline_name: row.guideline_name.unwrap_or_default(),
            disease_type: row.disease_type,
            patient_condition: row.patient_condition,
            recommendation_level: row.recommendation_level,
            recommendation_content: row.recommendation_content.unwrap_or_default(),
            evidence_source: row.evidence_source,
            update_date: row.update_date,
            // 查询只返回启用中的规则
            is_active: true,
        }
    }
}
