//! # 临床规则模块
//!
//! 提供基于指南的确定性规则评估，包括：
//! - 风险分层：高血压风险分层、糖尿病控制评估及综合风险等级
//! - 随访计划：按风险等级/控制状态查表生成
//! - 安全预警：高血压急症、妊娠期用药禁忌、药物相互作用、极端指标值

pub mod followup;
pub mod interactions;
pub mod risk;
pub mod safety;

pub use followup::FollowUpPlan;
pub use interactions::{DrugToken, InteractionPair};
pub use risk::{
    decide_tier, overall_tier, ComprehensiveAssessment, ControlStatus, DiabetesAssessment,
    GlucoseValues, HypertensionAssessment, Recommendation, RecommendationKind, RiskEngine,
    RiskTier, TierInputs,
};
pub use safety::{SafetyGuard, SafetyWarning, Severity, WarningKind};
