//! 意图识别
//!
//! 有序关键词级联，第一条命中的规则生效。各关键词集合存在交叠
//! （如 "180" 既是急症阈值也可能出现在普通血压描述中），规则顺序不可调整：
//!
//! 1. 超出范围 → 一般问答（由 RAG 给出范围说明）
//! 2. 急症
//! 3. 患者信息查询
//! 4. 诊断
//! 5. 治疗
//! 6. 指南
//! 7. 短消息症状描述 → SOAP 问诊
//! 8. 一般问答

use serde::{Deserialize, Serialize};

use crate::scope;

pub const EMERGENCY_KEYWORDS: [&str; 8] = ["急症", "急诊", "紧急", "180", "190", "200", "昏迷", "休克"];
pub const DIAGNOSIS_KEYWORDS: [&str; 5] = ["诊断", "鉴别", "是什么病", "什么症状", "症状"];
pub const TREATMENT_KEYWORDS: [&str; 6] = ["治疗", "方案", "用药", "药物", "处方", "怎么治"];
pub const GUIDELINE_KEYWORDS: [&str; 4] = ["指南", "推荐", "证据", "等级"];
pub const SOAP_KEYWORDS: [&str; 4] = ["头晕", "头痛", "不舒服", "难受"];

/// SOAP 问诊仅针对短消息（按字符计）
pub const SOAP_MAX_CHARS: usize = 50;

/// 用户意图
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    PatientQuery,
    Diagnosis,
    Treatment,
    Emergency,
    Guideline,
    SoapInquiry,
    General,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::PatientQuery => "patient_query",
            Intent::Diagnosis => "diagnosis",
            Intent::Treatment => "treatment",
            Intent::Emergency => "emergency",
            Intent::Guideline => "guideline",
            Intent::SoapInquiry => "soap_inquiry",
            Intent::General => "general",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains_any(message: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| message.contains(keyword))
}

fn is_patient_query(message: &str) -> bool {
    message.contains("患者")
        && (message.contains("画像") || message.contains("信息") || message.to_uppercase().contains("ID"))
}

/// 对原始消息进行意图分类
pub fn classify_intent(message: &str) -> Intent {
    if scope::is_out_of_scope(message) {
        return Intent::General;
    }
    if contains_any(message, &EMERGENCY_KEYWORDS) {
        return Intent::Emergency;
    }
    if is_patient_query(message) {
        return Intent::PatientQuery;
    }
    if contains_any(message, &DIAGNOSIS_KEYWORDS) {
        return Intent::Diagnosis;
    }
    if contains_any(message, &TREATMENT_KEYWORDS) {
        return Intent::Treatment;
    }
    if contains_any(message, &GUIDELINE_KEYWORDS) {
        return Intent::Guideline;
    }
    if contains_any(message, &SOAP_KEYWORDS) && message.chars().count() < SOAP_MAX_CHARS {
        return Intent::SoapInquiry;
    }
    Intent::General
}
