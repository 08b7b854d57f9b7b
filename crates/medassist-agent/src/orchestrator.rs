//! 医疗智能体
//!
//! 协调术语标准化、检索融合、风险评估和安全预警，按意图路由到各处理器，
//! 并维护有界对话历史。持久化不可用时进入降级模式，而不是向上抛出故障。

use std::sync::{Arc, OnceLock};

use chrono::NaiveDate;
use medassist_clinical::{ComprehensiveAssessment, RiskEngine, SafetyGuard, SafetyWarning};
use medassist_core::models::*;
use medassist_core::{
    ConnectionStatus, DocumentIndex, IndexStatus, LanguageModel, PatientStore, RebuildOutcome,
};
use medassist_terms::{contraindications_for, DrugContraindications, MappingEntry, NormalizedTerm, TermMapper};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::history::{ConversationHistory, DEFAULT_CONTEXT_MESSAGES, DEFAULT_MAX_MESSAGES};
use crate::intent::{classify_intent, Intent};
use crate::prompts::{self, MEDICAL_SYSTEM_PROMPT, SOAP_SYSTEM_PROMPT};
use crate::report::render_patient_report;
use crate::retrieval::{CitedSource, RagAnswer, RetrievalConfig, RetrievalService};

const MAX_GUIDELINE_RESULTS: usize = 5;

/// 智能体配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 生成时携带的历史消息条数
    pub history_context_messages: usize,
    /// 历史消息保留上限
    pub max_history_messages: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            history_context_messages: DEFAULT_CONTEXT_MESSAGES,
            max_history_messages: DEFAULT_MAX_MESSAGES,
        }
    }
}

/// 回答来源
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResponseSource {
    Cited(CitedSource),
    Tables {
        #[serde(rename = "type")]
        source_type: String,
        tables: Vec<String>,
    },
    Guideline {
        #[serde(rename = "type")]
        source_type: String,
        name: String,
    },
}

/// 对话响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub intent: Intent,
    pub sources: Vec<ResponseSource>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SafetyWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<PatientSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<ComprehensiveAssessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_knowledge: Option<bool>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_out_of_scope: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_emergency: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub db_unavailable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inquiry_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_hits: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    fn new(intent: Intent, answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            intent,
            sources: Vec::new(),
            success: true,
            warnings: Vec::new(),
            profile: None,
            assessment: None,
            has_knowledge: None,
            is_out_of_scope: false,
            is_emergency: false,
            db_unavailable: false,
            degraded_mode: false,
            inquiry_type: None,
            total_hits: None,
            error: None,
        }
    }

    fn from_rag(intent: Intent, rag: RagAnswer) -> Self {
        Self {
            sources: cited(rag.sources),
            success: rag.success,
            has_knowledge: Some(rag.has_knowledge),
            is_out_of_scope: rag.is_out_of_scope,
            error: rag.error,
            ..Self::new(intent, rag.answer)
        }
    }

    fn degraded(intent: Intent, patient_id: &str, error: &str) -> Self {
        Self {
            db_unavailable: true,
            degraded_mode: true,
            error: Some(error.to_string()),
            ..Self::new(intent, prompts::degraded_mode_message(patient_id, error))
        }
    }
}

fn cited(sources: Vec<CitedSource>) -> Vec<ResponseSource> {
    sources.into_iter().map(ResponseSource::Cited).collect()
}

/// 风险评估响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessmentResponse {
    pub success: bool,
    pub patient_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment: Option<ComprehensiveAssessment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SafetyWarning>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub db_unavailable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 指南推荐列表响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidelineListing {
    pub success: bool,
    pub guidelines: Vec<GuidelineRow>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub db_unavailable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 故障模拟切换结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationToggle {
    pub success: bool,
    pub message: String,
    pub simulation_enabled: bool,
}

/// 患者查询结果
enum PatientLookup {
    Found(Box<PatientSnapshot>),
    NotFound,
    Unavailable(String),
    Failed(String),
}

fn patient_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)(?:患者\s*id|id|患者)\s*[=:：]?\s*([A-Za-z0-9][A-Za-z0-9_\-]*)").ok())
        .as_ref()
}

fn date_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\d{4})[-/年](\d{1,2})[-/月](\d{1,2})").ok())
        .as_ref()
}

/// 从自由文本中提取患者ID
pub fn extract_patient_id(message: &str) -> Option<String> {
    patient_id_pattern()?
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 提取 `YYYY-MM-DD`、`YYYY/MM/DD`、`YYYY年MM月DD日` 形式的日期
pub fn extract_date(message: &str) -> Option<NaiveDate> {
    let caps = date_pattern()?.captures(message)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let day = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// 医疗智能体
pub struct MedicalAgent {
    terms: Arc<TermMapper>,
    store: Arc<dyn PatientStore>,
    index: Arc<dyn DocumentIndex>,
    llm: Arc<dyn LanguageModel>,
    retrieval: RetrievalService,
    risk_engine: RiskEngine,
    safety_guard: SafetyGuard,
    history: Mutex<ConversationHistory>,
}

impl MedicalAgent {
    pub fn new(
        terms: Arc<TermMapper>,
        store: Arc<dyn PatientStore>,
        index: Arc<dyn DocumentIndex>,
        llm: Arc<dyn LanguageModel>,
        retrieval_config: RetrievalConfig,
        config: AgentConfig,
    ) -> Self {
        let retrieval = RetrievalService::new(
            terms.clone(),
            index.clone(),
            store.clone(),
            llm.clone(),
            retrieval_config,
        );

        Self {
            terms,
            store,
            index,
            llm,
            retrieval,
            risk_engine: RiskEngine::new(),
            safety_guard: SafetyGuard::new(),
            history: Mutex::new(ConversationHistory::new(
                config.history_context_messages,
                config.max_history_messages,
            )),
        }
    }

    pub fn retrieval(&self) -> &RetrievalService {
        &self.retrieval
    }

    /// 对话入口
    pub async fn chat(&self, message: &str, patient_id: Option<&str>) -> ChatResponse {
        let preview: String = message.chars().take(50).collect();
        let intent = classify_intent(message);
        info!(message = %preview, intent = %intent, "Message received");

        if intent == Intent::PatientQuery {
            return self.handle_patient_query(message, patient_id).await;
        }

        let patient = match patient_id {
            Some(id) => self.patient_context(id).await,
            None => None,
        };

        match intent {
            Intent::Diagnosis => self.handle_diagnosis(message, patient.as_ref()).await,
            Intent::Treatment => self.handle_treatment(message, patient.as_ref()).await,
            Intent::Emergency => self.handle_emergency(message, patient.as_ref()).await,
            Intent::Guideline => self.handle_guideline(message).await,
            Intent::SoapInquiry => self.handle_soap(message).await,
            Intent::PatientQuery | Intent::General => self.handle_general(message, patient.as_ref()).await,
        }
    }

    /// 流式对话入口，回答片段到达即交给 `on_fragment`
    ///
    /// 只有一般问答由大模型直接生成回答，走流式生成；其余意图的回答由
    /// 模板或多步处理拼装，完成后作为单个片段发出。
    pub async fn chat_stream<F>(&self, message: &str, patient_id: Option<&str>, mut on_fragment: F) -> ChatResponse
    where
        F: FnMut(&str),
    {
        let intent = classify_intent(message);
        if intent != Intent::General {
            let response = self.chat(message, patient_id).await;
            on_fragment(&response.answer);
            return response;
        }

        let preview: String = message.chars().take(50).collect();
        info!(message = %preview, intent = %intent, "Message received for streaming");

        let patient = match patient_id {
            Some(id) => self.patient_context(id).await,
            None => None,
        };
        let history = self.history_context().await;
        let rag = self
            .retrieval
            .rag_answer_streaming(message, patient.as_ref(), &history, on_fragment)
            .await;

        if rag.has_knowledge && rag.success {
            self.record_exchange(message, &rag.answer).await;
        }
        ChatResponse::from_rag(Intent::General, rag)
    }

    async fn lookup_patient(&self, patient_id: &str) -> PatientLookup {
        match self.store.get_patient_snapshot(patient_id).await {
            Ok(Some(snapshot)) => PatientLookup::Found(Box::new(snapshot)),
            Ok(None) => PatientLookup::NotFound,
            Err(e) if e.is_unavailable() => {
                warn!(patient_id = %patient_id, "Patient store unavailable: {}", e);
                PatientLookup::Unavailable(e.to_string())
            }
            Err(e) => {
                error!(patient_id = %patient_id, "Patient lookup failed: {}", e);
                PatientLookup::Failed(e.to_string())
            }
        }
    }

    /// 对话中的患者上下文；数据源不可用时跳过
    async fn patient_context(&self, patient_id: &str) -> Option<PatientSnapshot> {
        match self.lookup_patient(patient_id).await {
            PatientLookup::Found(snapshot) => Some(*snapshot),
            _ => None,
        }
    }

    async fn record_exchange(&self, question: &str, answer: &str) {
        self.history.lock().await.record_exchange(question, answer);
    }

    async fn history_context(&self) -> Vec<ChatMessage> {
        self.history.lock().await.context()
    }

    async fn handle_patient_query(&self, message: &str, patient_id: Option<&str>) -> ChatResponse {
        let patient_id = match patient_id {
            Some(id) => id.to_string(),
            None => match extract_patient_id(message) {
                Some(id) => id,
                None => return ChatResponse::new(Intent::PatientQuery, prompts::MISSING_PATIENT_ID),
            },
        };
        self.patient_profile(&patient_id).await
    }

    /// 患者画像：综合评估、安全预警与报告
    pub async fn patient_profile(&self, patient_id: &str) -> ChatResponse {
        let intent = Intent::PatientQuery;
        let snapshot = match self.lookup_patient(patient_id).await {
            PatientLookup::Found(snapshot) => snapshot,
            PatientLookup::NotFound => return ChatResponse::new(intent, prompts::patient_not_found(patient_id)),
            PatientLookup::Unavailable(message) => {
                warn!(patient_id = %patient_id, "Entering degraded mode");
                return ChatResponse::degraded(intent, patient_id, &message);
            }
            PatientLookup::Failed(message) => {
                return ChatResponse {
                    success: false,
                    error: Some(message.clone()),
                    ..ChatResponse::new(intent, format!("查询患者信息失败: {}", message))
                };
            }
        };

        let assessment = self.risk_engine.comprehensive(&snapshot);
        let warnings = self
            .safety_guard
            .check(&snapshot, &assessment.hypertension.recommendations);
        let answer = render_patient_report(&snapshot, &assessment, &warnings);

        ChatResponse {
            sources: vec![ResponseSource::Tables {
                source_type: "mysql".to_string(),
                tables: PatientSnapshot::SOURCE_TABLES.iter().map(|t| t.to_string()).collect(),
            }],
            warnings,
            profile: Some(*snapshot),
            assessment: Some(assessment),
            ..ChatResponse::new(intent, answer)
        }
    }

    /// 综合风险评估
    pub async fn risk_assessment(&self, patient_id: &str) -> RiskAssessmentResponse {
        let response = |success: bool| RiskAssessmentResponse {
            success,
            patient_id: patient_id.to_string(),
            assessment: None,
            warnings: Vec::new(),
            db_unavailable: false,
            message: None,
            error: None,
        };

        match self.lookup_patient(patient_id).await {
            PatientLookup::Found(snapshot) => {
                let assessment = self.risk_engine.comprehensive(&snapshot);
                let warnings = self
                    .safety_guard
                    .check(&snapshot, &assessment.hypertension.recommendations);
                RiskAssessmentResponse {
                    assessment: Some(assessment),
                    warnings,
                    ..response(true)
                }
            }
            PatientLookup::NotFound => RiskAssessmentResponse {
                error: Some(format!("未找到患者: {}", patient_id)),
                ..response(false)
            },
            PatientLookup::Unavailable(message) => RiskAssessmentResponse {
                db_unavailable: true,
                message: Some(prompts::degraded_mode_message(patient_id, &message)),
                error: Some(message),
                ..response(true)
            },
            PatientLookup::Failed(message) => RiskAssessmentResponse {
                error: Some(message),
                ..response(false)
            },
        }
    }

    async fn handle_diagnosis(&self, message: &str, patient: Option<&PatientSnapshot>) -> ChatResponse {
        let rag = self.retrieval.rag_answer(message, patient, &[]).await;
        if !rag.has_knowledge || !rag.success {
            return ChatResponse::from_rag(Intent::Diagnosis, rag);
        }

        let prompt = prompts::diagnosis_prompt(message, &rag.answer);
        let history = self.history_context().await;
        let sources = cited(rag.sources);

        match self.llm.generate(&prompt, &history, Some(MEDICAL_SYSTEM_PROMPT)).await {
            Ok(answer) => {
                self.record_exchange(message, &answer).await;
                ChatResponse {
                    sources,
                    has_knowledge: Some(true),
                    ..ChatResponse::new(Intent::Diagnosis, answer)
                }
            }
            Err(e) => ChatResponse {
                sources,
                success: false,
                has_knowledge: Some(true),
                error: Some(e.to_string()),
                ..ChatResponse::new(Intent::Diagnosis, e.to_string())
            },
        }
    }

    async fn handle_treatment(&self, message: &str, patient: Option<&PatientSnapshot>) -> ChatResponse {
        let rag = self.retrieval.rag_answer(message, patient, &[]).await;
        let warnings = patient
            .map(|snapshot| self.safety_guard.check(snapshot, &[]))
            .unwrap_or_default();

        let mut response = if rag.has_knowledge && rag.success {
            let prompt = prompts::treatment_prompt(message, Some(&rag.answer));
            let history = self.history_context().await;
            let sources = cited(rag.sources);

            match self.llm.generate(&prompt, &history, Some(MEDICAL_SYSTEM_PROMPT)).await {
                Ok(answer) => {
                    self.record_exchange(message, &answer).await;
                    ChatResponse {
                        sources,
                        has_knowledge: Some(true),
                        ..ChatResponse::new(Intent::Treatment, answer)
                    }
                }
                Err(e) => ChatResponse {
                    sources,
                    success: false,
                    has_knowledge: Some(true),
                    error: Some(e.to_string()),
                    ..ChatResponse::new(Intent::Treatment, e.to_string())
                },
            }
        } else {
            ChatResponse::from_rag(Intent::Treatment, rag)
        };

        if !warnings.is_empty() {
            response.answer = format!("{}\n\n{}", self.safety_guard.format_warnings(&warnings), response.answer);
        }
        response.warnings = warnings;
        response
    }

    async fn handle_emergency(&self, message: &str, patient: Option<&PatientSnapshot>) -> ChatResponse {
        let mut answer = prompts::EMERGENCY_PROTOCOL.to_string();

        let rag = self.retrieval.rag_answer(message, patient, &[]).await;
        if rag.has_knowledge && rag.success && !rag.answer.is_empty() {
            answer.push_str(&format!("\n\n### 📚 相关指南信息\n{}", rag.answer));
        }

        let warnings = patient
            .map(|snapshot| self.safety_guard.check(snapshot, &[]))
            .unwrap_or_default();
        if !warnings.is_empty() {
            answer.push_str(&format!(
                "\n\n### ⚠️ 患者安全预警\n{}",
                self.safety_guard.format_warnings(&warnings)
            ));
        }

        let mut sources = cited(rag.sources);
        sources.push(ResponseSource::Guideline {
            source_type: "指南".to_string(),
            name: prompts::EMERGENCY_GUIDELINE_NAME.to_string(),
        });

        ChatResponse {
            sources,
            warnings,
            is_emergency: true,
            ..ChatResponse::new(Intent::Emergency, answer)
        }
    }

    async fn handle_guideline(&self, message: &str) -> ChatResponse {
        let filters = SearchFilters { update_date_after: extract_date(message) };
        if let Some(after) = filters.update_date_after {
            info!(after = %after, "Guideline query with date filter");
        }

        let result = self.retrieval.search(message, &filters).await;
        if result.hits.is_empty() {
            return ChatResponse::new(Intent::Guideline, prompts::NO_GUIDELINE_FOUND);
        }

        let top = &result.hits[..result.hits.len().min(MAX_GUIDELINE_RESULTS)];
        let mut lines = vec!["## 📖 指南推荐查询结果\n".to_string()];
        for (i, hit) in top.iter().enumerate() {
            let location = hit
                .source
                .table
                .as_deref()
                .or(hit.source.file.as_deref())
                .unwrap_or("");
            lines.push(format!("### {}. 结果", i + 1));
            lines.push(hit.content.clone());
            lines.push(format!("\n*来源: {} - {}*", hit.source.source_type, location));
            lines.push(String::new());
        }

        ChatResponse {
            sources: top
                .iter()
                .map(|hit| ResponseSource::Cited(CitedSource { source: hit.source.clone(), score: hit.score }))
                .collect(),
            total_hits: Some(result.total_hits),
            ..ChatResponse::new(Intent::Guideline, lines.join("\n"))
        }
    }

    async fn handle_soap(&self, message: &str) -> ChatResponse {
        let prompt = prompts::soap_prompt(message);
        let mut response = match self.llm.generate(&prompt, &[], Some(SOAP_SYSTEM_PROMPT)).await {
            Ok(answer) => {
                self.record_exchange(message, &answer).await;
                ChatResponse::new(Intent::SoapInquiry, answer)
            }
            Err(e) => ChatResponse {
                success: false,
                error: Some(e.to_string()),
                ..ChatResponse::new(Intent::SoapInquiry, e.to_string())
            },
        };
        response.inquiry_type = Some("SOAP".to_string());
        response
    }

    async fn handle_general(&self, message: &str, patient: Option<&PatientSnapshot>) -> ChatResponse {
        let history = self.history_context().await;
        let rag = self.retrieval.rag_answer(message, patient, &history).await;

        if rag.has_knowledge && rag.success {
            self.record_exchange(message, &rag.answer).await;
        }
        ChatResponse::from_rag(Intent::General, rag)
    }

    /// 跨源检索
    pub async fn search(&self, query: &str, filters: &SearchFilters) -> SearchResult {
        self.retrieval.search(query, filters).await
    }

    /// 指南推荐列表
    pub async fn guidelines(&self, disease_type: Option<&str>, updated_after: Option<NaiveDate>) -> GuidelineListing {
        match self.store.get_guideline_recommendations(disease_type, updated_after).await {
            Ok(guidelines) => GuidelineListing { success: true, guidelines, db_unavailable: false, error: None },
            Err(e) => {
                warn!("Guideline listing failed: {}", e);
                GuidelineListing {
                    success: false,
                    guidelines: Vec::new(),
                    db_unavailable: e.is_unavailable(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn normalize_term(&self, term: &str) -> NormalizedTerm {
        self.terms.normalize_with_suggestions(term)
    }

    pub fn term_mapping_table(&self) -> BTreeMap<String, MappingEntry> {
        self.terms.get_mapping_table()
    }

    pub fn add_term_mapping(&self, alias: &str, standard: &str) -> bool {
        self.terms.add_mapping(alias, standard)
    }

    pub fn contraindications(&self, drug: &str) -> Option<DrugContraindications> {
        contraindications_for(&self.terms, drug)
    }

    pub async fn index_status(&self) -> IndexStatus {
        self.index.status().await
    }

    pub async fn rebuild_index(&self) -> RebuildOutcome {
        self.index.rebuild_index().await
    }

    pub async fn database_status(&self) -> ConnectionStatus {
        self.store.check_connection().await
    }

    /// 切换数据库故障模拟
    pub async fn set_database_failure_simulation(&self, enabled: bool) -> SimulationToggle {
        self.store.set_failure_simulation(enabled).await;
        let status = if enabled { "启用" } else { "禁用" };
        info!(enabled, "Database failure simulation toggled");

        SimulationToggle {
            success: true,
            message: format!("数据库故障模拟已{}", status),
            simulation_enabled: self.store.failure_simulation_enabled(),
        }
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
        info!("Conversation history cleared");
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use medassist_clinical::{ControlStatus, RecommendationKind, RiskTier, Severity, WarningKind};

    fn agent_with<M: LanguageModel + 'static>(
        index: Arc<dyn DocumentIndex>,
        store: Arc<dyn PatientStore>,
        model: M,
    ) -> MedicalAgent {
        MedicalAgent::new(
            Arc::new(TermMapper::new()),
            store,
            index,
            Arc::new(model),
            RetrievalConfig::default(),
            AgentConfig::default(),
        )
    }

    fn demo_agent<M: LanguageModel + 'static>(model: M) -> MedicalAgent {
        agent_with(
            index_with(&[("高血压病急症紧急处理：静脉降压，1小时内降幅不超过25%", 88)]),
            demo_store(),
            model,
        )
    }

    #[test]
    fn test_extract_patient_id() {
        assert_eq!(extract_patient_id("查询患者ID=1002_0_20210504的信息").as_deref(), Some("1002_0_20210504"));
        assert_eq!(extract_patient_id("患者id: P001 画像").as_deref(), Some("P001"));
        assert_eq!(extract_patient_id("患者P003的信息").as_deref(), Some("P003"));
        assert_eq!(extract_patient_id("查询患者画像"), None);
    }

    #[test]
    fn test_extract_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2022, 1, 5);
        assert_eq!(extract_date("2022-01-05之后的指南"), expected);
        assert_eq!(extract_date("2022/1/5之后的指南"), expected);
        assert_eq!(extract_date("2022年1月5日之后的指南"), expected);
        assert_eq!(extract_date("2022年13月5日"), None);
        assert_eq!(extract_date("最新指南"), None);
    }

    #[tokio::test]
    async fn test_out_of_scope_question_is_not_answered() {
        let model = ScriptedModel::replying("不应调用");
        let agent = demo_agent(model.clone());

        let response = agent.chat("骨折怎么治疗", None).await;
        assert_eq!(response.intent, Intent::General);
        assert!(response.is_out_of_scope);
        assert_eq!(response.has_knowledge, Some(false));
        assert!(response.sources.is_empty());
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_degraded_mode_on_unavailable_store() {
        let agent = demo_agent(ScriptedModel::replying("ok"));
        let toggle = agent.set_database_failure_simulation(true).await;
        assert_eq!(toggle.message, "数据库故障模拟已启用");
        assert!(toggle.simulation_enabled);

        let response = agent.patient_profile("P001").await;
        assert!(response.success);
        assert!(response.db_unavailable);
        assert!(response.degraded_mode);
        assert!(response.answer.contains("医学知识查询"));
        assert!(response.profile.is_none());

        let via_chat = agent.chat("查询患者ID=P001的信息", None).await;
        assert!(via_chat.db_unavailable);

        let risk = agent.risk_assessment("P001").await;
        assert!(risk.success && risk.db_unavailable);
        assert!(risk.assessment.is_none());

        let status = agent.database_status().await;
        assert!(status.simulated_failure);

        let toggle = agent.set_database_failure_simulation(false).await;
        assert_eq!(toggle.message, "数据库故障模拟已禁用");
        assert!(!agent.patient_profile("P001").await.db_unavailable);
    }

    #[tokio::test]
    async fn test_patient_query_needs_id() {
        let agent = demo_agent(ScriptedModel::replying("ok"));
        let response = agent.chat("查询患者画像", None).await;
        assert_eq!(response.answer, prompts::MISSING_PATIENT_ID);

        let response = agent.chat("查询患者ID=P404的信息", None).await;
        assert!(response.success);
        assert!(response.answer.contains("未找到患者ID为 P404 的信息"));

        let risk = agent.risk_assessment("P404").await;
        assert!(!risk.success);
        assert_eq!(risk.error.as_deref(), Some("未找到患者: P404"));
    }

    #[tokio::test]
    async fn test_pregnant_patient_profile_warns() {
        let agent = demo_agent(ScriptedModel::replying("ok"));
        let response = agent.chat("查询患者ID=P003的信息", None).await;

        assert_eq!(response.intent, Intent::PatientQuery);
        let warning = response
            .warnings
            .iter()
            .find(|w| w.kind == WarningKind::PregnancyContraindication)
            .unwrap();
        assert_eq!(warning.severity, Severity::Critical);
        assert!(warning.recommendation.contains("甲基多巴"));
        assert!(response.answer.contains("### ⚠️ 安全预警"));
        assert!(matches!(&response.sources[0], ResponseSource::Tables { tables, .. } if tables.len() == 7));
    }

    #[tokio::test]
    async fn test_emergency_with_patient_context() {
        let model = ScriptedModel::replying("指南补充：静脉乌拉地尔");
        let agent = demo_agent(model.clone());
        let response = agent.chat("高血压急症紧急处理", Some("P001")).await;

        assert_eq!(response.intent, Intent::Emergency);
        assert!(response.is_emergency);
        assert!(response.success);
        assert!(response.answer.starts_with("## 🚨 高血压急症处理指南"));
        assert!(response.answer.contains("### 📚 相关指南信息\n指南补充：静脉乌拉地尔"));

        let first = &response.warnings[0];
        assert_eq!(first.kind, WarningKind::HypertensiveEmergency);
        assert_eq!(first.severity, Severity::Emergency);
        assert!(first.requires_action);

        assert!(matches!(
            response.sources.last(),
            Some(ResponseSource::Guideline { name, .. }) if name == "中国高血压防治指南2023"
        ));
    }

    #[tokio::test]
    async fn test_risk_assessment_for_poorly_controlled_diabetes() {
        let agent = demo_agent(ScriptedModel::replying("ok"));
        let risk = agent.risk_assessment("P002").await;
        let assessment = risk.assessment.unwrap();

        assert_eq!(assessment.diabetes.control_status, Some(ControlStatus::Poor));
        assert!(assessment
            .diabetes
            .recommendations
            .iter()
            .any(|r| r.kind == RecommendationKind::Intensive));
        assert_eq!(assessment.hypertension.risk_level, None);
        assert_eq!(assessment.overall_risk, RiskTier::VeryHigh);
    }

    #[tokio::test]
    async fn test_guideline_query_with_date_filter() {
        let agent = agent_with(empty_index(), demo_store(), ScriptedModel::replying("ok"));
        let response = agent.chat("2022年1月1日以后更新的指南", None).await;

        assert_eq!(response.intent, Intent::Guideline);
        assert!(response.answer.starts_with("## 📖 指南推荐查询结果"));
        assert!(response.answer.contains("中国高血压防治指南2023"));
        assert!(response.answer.contains("*来源: mysql - guideline_recommendations*"));
        assert_eq!(response.total_hits, Some(1));
    }

    #[tokio::test]
    async fn test_guideline_query_without_hits() {
        let agent = agent_with(empty_index(), empty_store(), ScriptedModel::replying("ok"));
        let response = agent.chat("有哪些推荐等级", None).await;
        assert_eq!(response.answer, prompts::NO_GUIDELINE_FOUND);
    }

    #[tokio::test]
    async fn test_treatment_without_knowledge_skips_generation() {
        let model = ScriptedModel::replying("不应调用");
        let agent = agent_with(empty_index(), empty_store(), model.clone());
        let response = agent.chat("某罕见病用药方案", None).await;

        assert_eq!(response.intent, Intent::Treatment);
        assert_eq!(response.has_knowledge, Some(false));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_treatment_prepends_safety_warnings() {
        let model = ScriptedModel::replying("推荐拉贝洛尔");
        let agent = demo_agent(model.clone());
        let response = agent.chat("高血压用药方案", Some("P003")).await;

        assert_eq!(response.intent, Intent::Treatment);
        assert!(response.answer.starts_with(&"=".repeat(50)));
        assert!(response.answer.ends_with("推荐拉贝洛尔"));
        assert!(!response.warnings.is_empty());
        // RAG 生成一次，治疗方案生成一次
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_soap_inquiry_uses_interview_prompt() {
        let model = ScriptedModel::replying("请问头晕持续多久了？");
        let agent = demo_agent(model.clone());
        let response = agent.chat("最近总是头晕", None).await;

        assert_eq!(response.intent, Intent::SoapInquiry);
        assert_eq!(response.inquiry_type.as_deref(), Some("SOAP"));
        assert_eq!(model.last_system_prompt().as_deref(), Some(SOAP_SYSTEM_PROMPT));
        assert_eq!(agent.history_len().await, 2);
    }

    #[tokio::test]
    async fn test_diagnosis_uses_rag_answer_as_reference() {
        let model = ScriptedModel::replying("继发性高血压需排查");
        let agent = demo_agent(model.clone());
        let response = agent.chat("高血压的鉴别诊断", None).await;

        assert_eq!(response.intent, Intent::Diagnosis);
        assert_eq!(model.calls(), 2);
        let prompt = model.last_prompt().unwrap();
        assert!(prompt.contains("鉴别诊断分析"));
        assert!(prompt.contains("【参考资料】\n继发性高血压需排查"));
        assert!(!response.sources.is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_is_reported() {
        let agent = demo_agent(ScriptedModel::failing());
        let response = agent.chat("最近总是头晕", None).await;
        assert!(!response.success);
        assert!(response.error.is_some());
        assert_eq!(agent.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_history_window_passed_to_general_answers() {
        let model = ScriptedModel::replying("控制血压需长期管理");
        let agent = demo_agent(model.clone());

        for _ in 0..4 {
            let response = agent.chat("高血压", None).await;
            assert_eq!(response.intent, Intent::General);
            assert_eq!(response.has_knowledge, Some(true));
        }
        assert_eq!(model.last_call().unwrap().history_len, 4);
        assert_eq!(agent.history_len().await, 8);

        agent.clear_history().await;
        assert_eq!(agent.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_chat_stream_delivers_fragments_and_records_history() {
        let agent = demo_agent(StreamingModel::new(&["长期", "管理"]));

        let mut received = Vec::new();
        let response = agent.chat_stream("高血压", None, |f| received.push(f.to_string())).await;

        assert_eq!(received, vec!["长期", "管理"]);
        assert_eq!(response.intent, Intent::General);
        assert!(response.success);
        assert_eq!(response.answer, "长期管理");
        assert_eq!(agent.history_len().await, 2);
    }

    #[tokio::test]
    async fn test_chat_stream_interrupted_is_not_recorded() {
        let agent = demo_agent(StreamingModel::interrupted(&["长期"]));

        let mut received = Vec::new();
        let response = agent.chat_stream("高血压", None, |f| received.push(f.to_string())).await;

        assert_eq!(received, vec!["长期"]);
        assert!(!response.success);
        assert!(response.error.is_some());
        assert_eq!(agent.history_len().await, 0);
    }

    #[tokio::test]
    async fn test_chat_stream_other_intents_send_whole_answer() {
        let model = ScriptedModel::replying("ok");
        let agent = demo_agent(model.clone());

        let mut received = Vec::new();
        let response = agent.chat_stream("查询患者画像", None, |f| received.push(f.to_string())).await;

        assert_eq!(response.intent, Intent::PatientQuery);
        assert_eq!(received, vec![prompts::MISSING_PATIENT_ID.to_string()]);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_term_operations() {
        let agent = demo_agent(ScriptedModel::replying("ok"));
        assert!(agent.normalize_term("HTN").is_mapped);
        assert!(agent.add_term_mapping("血压高", "高血压病"));
        assert!(agent.term_mapping_table()["高血压病"].aliases.contains(&"血压高".to_string()));
        assert!(agent.contraindications("ACEI").is_some());
    }

    #[tokio::test]
    async fn test_index_operations() {
        let agent = demo_agent(ScriptedModel::replying("ok"));
        assert!(agent.index_status().await.has_index);
        // 未配置文本块文件，重建失败但不影响现有索引
        assert!(!agent.rebuild_index().await.success);
        assert!(agent.index_status().await.has_index);
    }

    #[tokio::test]
    async fn test_guideline_listing_reports_unavailable() {
        let agent = demo_agent(ScriptedModel::replying("ok"));
        assert_eq!(agent.guidelines(Some("糖尿病"), None).await.guidelines.len(), 1);

        agent.set_database_failure_simulation(true).await;
        let listing = agent.guidelines(None, None).await;
        assert!(!listing.success);
        assert!(listing.db_unavailable);
    }

    #[test]
    fn test_response_omits_false_flags() {
        let response = ChatResponse::new(Intent::General, "答");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["intent"], "general");
        assert!(value.get("is_emergency").is_none());
        assert!(value.get("warnings").is_none());

        let degraded = serde_json::to_value(ChatResponse::degraded(Intent::PatientQuery, "P001", "数据库不可用")).unwrap();
        assert_eq!(degraded["db_unavailable"], true);
        assert_eq!(degraded["degraded_mode"], true);
    }
}
