//! # 医疗智能体
//!
//! 对话编排层：意图识别、范围判定、跨源检索与 RAG 问答、
//! 患者画像报告、有界对话历史以及降级模式处理。

pub mod history;
pub mod intent;
pub mod orchestrator;
pub mod prompts;
pub mod report;
pub mod retrieval;
pub mod scope;

#[cfg(test)]
mod testing;

pub use history::ConversationHistory;
pub use intent::{classify_intent, Intent};
pub use orchestrator::{
    extract_date, extract_patient_id, AgentConfig, ChatResponse, GuidelineListing, MedicalAgent,
    ResponseSource, RiskAssessmentResponse, SimulationToggle,
};
pub use report::render_patient_report;
pub use retrieval::{CitedSource, RagAnswer, RetrievalConfig, RetrievalService};
pub use scope::{is_out_of_scope, no_knowledge_response};
