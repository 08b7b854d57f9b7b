//! 核心数据模型定义

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 性别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    #[serde(rename = "男")]
    Male,
    #[serde(rename = "女")]
    Female,
}

impl Gender {
    /// 从存储中的文本解析性别，无法识别时返回 None
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "男" | "M" | "m" | "male" | "Male" => Some(Gender::Male),
            "女" | "F" | "f" | "female" | "Female" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "男",
            Gender::Female => "女",
        }
    }
}

/// 患者基本信息
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicInfo {
    pub patient_id: String,
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    pub bmi: Option<f64>,
}

/// 病历记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub visit_date: Option<NaiveDate>,
    pub chief_complaint: Option<String>,   // 主诉
    pub present_illness: Option<String>,   // 现病史
    pub past_history: Option<String>,      // 既往史
    pub diagnosis: Option<String>,
}

impl MedicalRecord {
    /// 参与妊娠判断的自由文本字段
    pub fn narrative_fields(&self) -> impl Iterator<Item = &str> {
        [&self.chief_complaint, &self.present_illness, &self.past_history]
            .into_iter()
            .filter_map(|field| field.as_deref())
    }
}

/// 检查检验结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabResult {
    pub test_name: String,
    pub result_value: Option<String>,
    pub unit: Option<String>,
    pub reference_range: Option<String>,
    pub test_date: Option<NaiveDate>,
}

/// 用药记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Medication {
    pub drug_name: String,
    pub drug_class: Option<String>, // 药物类别标签，如 ACEI / ARB
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub medication_date: Option<NaiveDate>,
}

/// 诊断记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnosis {
    pub diagnosis_name: String,
    pub diagnosis_date: Option<NaiveDate>,
}

/// 最近一次高血压风险评估记录
///
/// 危险因素、靶器官损害、临床疾患在存储中均为逗号分隔的自由文本。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HypertensionRecord {
    pub assessment_date: Option<NaiveDate>,
    pub sbp: Option<f64>,
    pub dbp: Option<f64>,
    pub risk_factors: Option<String>,
    pub target_organs_damage: Option<String>,
    pub clinical_conditions: Option<String>,
    pub risk_level: Option<String>,
}

/// 最近一次糖尿病控制评估记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiabetesRecord {
    pub assessment_date: Option<NaiveDate>,
    pub hba1c: Option<f64>,
    pub fasting_glucose: Option<f64>,
    pub postprandial_glucose: Option<f64>,
    pub insulin_usage: Option<bool>,
    pub control_status: Option<String>,
}

/// 患者画像快照
///
/// 每次请求从持久化协作方组装的只读投影，不跨请求缓存。
/// 两类评估均为按日期取最新的一条，而不是历史列表。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub basic_info: BasicInfo,
    #[serde(default)]
    pub medical_records: Vec<MedicalRecord>,
    #[serde(default)]
    pub lab_results: Vec<LabResult>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub diagnoses: Vec<Diagnosis>,
    pub hypertension_assessment: Option<HypertensionRecord>,
    pub diabetes_assessment: Option<DiabetesRecord>,
}

impl PatientSnapshot {
    /// 快照所依赖的数据表
    pub const SOURCE_TABLES: [&'static str; 7] = [
        "patient_info",
        "medical_records",
        "lab_results",
        "medication_records",
        "diagnosis_records",
        "hypertension_risk_assessment",
        "diabetes_control_assessment",
    ];

    pub fn patient_id(&self) -> &str {
        &self.basic_info.patient_id
    }
}

/// 指南推荐规则行
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuidelineRow {
    pub guideline_name: String,
    pub disease_type: Option<String>,
    pub patient_condition: Option<String>,
    pub recommendation_level: Option<String>,
    pub recommendation_content: String,
    pub evidence_source: Option<String>,
    pub update_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// 检索结果来源类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalType {
    Vector,   // 语义索引
    Database, // 结构化关键词检索
}

/// 检索结果来源描述
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceDescriptor {
    #[serde(rename = "type")]
    pub source_type: String, // pdf / excel / mysql
    pub file: Option<String>,
    pub page: Option<u32>,
    pub table: Option<String>,
    pub rows: Option<String>,
    pub update_date: Option<NaiveDate>,
}

impl SourceDescriptor {
    pub fn table(table: &str) -> Self {
        Self {
            source_type: "mysql".to_string(),
            table: Some(table.to_string()),
            ..Default::default()
        }
    }

    /// 用于上下文标注的简短位置描述
    pub fn locator(&self) -> String {
        let mut parts = vec![self.source_type.clone()];
        if let Some(file) = &self.file {
            parts.push(file.clone());
        }
        if let Some(page) = self.page {
            parts.push(format!("第{}页", page));
        }
        if let Some(table) = &self.table {
            parts.push(table.clone());
        }
        if let Some(rows) = &self.rows {
            parts.push(format!("行{}", rows));
        }
        parts.join(" - ")
    }
}

/// 单条检索命中
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub content: String,
    pub score: f32, // [0, 1]
    pub source: SourceDescriptor,
    pub retrieval_type: RetrievalType,
}

/// 跨源检索结果，命中按得分降序排列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<RetrievalHit>,
    pub total_hits: usize,
    pub sources: Vec<String>,
    pub normalized_query: String,
    pub original_query: String,
}

impl SearchResult {
    pub fn max_score(&self) -> Option<f32> {
        self.hits.iter().map(|hit| hit.score).reduce(f32::max)
    }
}

/// 检索过滤条件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    /// 仅补充该日期（含）之后更新的指南
    pub update_date_after: Option<NaiveDate>,
}

/// 对话角色
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// 对话消息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }
}
