//! 跨源检索与 RAG 问答
//!
//! 标准化后的查询同时发往语义文档索引和指南推荐表，合并后按得分排序。
//! 任一子源失败只记录日志，不影响另一子源的结果。
//!
//! 问答前先做范围判定，检索后按相似度阈值做相关性门控：
//! 最高得分低于阈值时整体视为无相关知识，不调用大模型。

use std::sync::Arc;

use medassist_core::models::*;
use medassist_core::{DocumentIndex, LanguageModel, MedError, PatientStore};
use medassist_terms::TermMapper;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::prompts::{rag_prompt, MEDICAL_SYSTEM_PROMPT};
use crate::scope;

pub const VECTOR_SOURCE: &str = "pdf_excel_index";
pub const DATABASE_SOURCE: &str = "mysql";
const GUIDELINE_TABLE: &str = "guideline_recommendations";

/// 检索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// 语义索引返回条数
    pub top_k: usize,
    /// 相关性门控阈值
    pub similarity_threshold: f32,
    /// 检索结果最多返回条数
    pub max_hits: usize,
    /// 构建上下文时最多使用的命中条数
    pub context_hits: usize,
    /// 关键词匹配命中的固定得分
    pub database_score: f32,
    /// 按更新日期补充的指南命中的固定得分
    pub recency_score: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.3,
            max_hits: 10,
            context_hits: 5,
            database_score: 0.8,
            recency_score: 0.9,
        }
    }
}

/// 回答引用的来源
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CitedSource {
    #[serde(flatten)]
    pub source: SourceDescriptor,
    pub score: f32,
}

/// RAG 问答结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<CitedSource>,
    pub success: bool,
    pub has_knowledge: bool,
    pub is_out_of_scope: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RagAnswer {
    fn no_knowledge(query: &str) -> Self {
        Self {
            answer: scope::no_knowledge_response(query),
            sources: Vec::new(),
            success: true,
            has_knowledge: false,
            is_out_of_scope: false,
            max_score: None,
            normalized_query: None,
            error: None,
        }
    }

    fn out_of_scope(query: &str) -> Self {
        Self { is_out_of_scope: true, ..Self::no_knowledge(query) }
    }
}

/// 指南推荐行格式化为文本
pub fn format_guideline(row: &GuidelineRow) -> String {
    let or_empty = |value: &Option<String>| value.clone().unwrap_or_default();
    format!(
        "指南名称: {}\n疾病类型: {}\n适用条件: {}\n推荐等级: {}\n推荐内容: {}\n证据来源: {}\n更新日期: {}",
        row.guideline_name,
        or_empty(&row.disease_type),
        or_empty(&row.patient_condition),
        or_empty(&row.recommendation_level),
        row.recommendation_content,
        or_empty(&row.evidence_source),
        row.update_date.map(|d| d.to_string()).unwrap_or_default(),
    )
}

/// 患者快照的简要文本
pub fn format_patient_context(snapshot: &PatientSnapshot) -> String {
    let mut parts = Vec::new();
    let info = &snapshot.basic_info;

    parts.push(format!(
        "基本信息: {}, {}, {}岁",
        info.name.as_deref().unwrap_or("未知"),
        info.gender.map(|g| g.label()).unwrap_or(""),
        info.age.map(|a| a.to_string()).unwrap_or_default(),
    ));
    if let Some(bmi) = info.bmi {
        parts.push(format!("BMI: {}", bmi));
    }

    if let Some(ha) = &snapshot.hypertension_assessment {
        let value = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        parts.push(format!("血压: {}/{} mmHg", value(ha.sbp), value(ha.dbp)));
        parts.push(format!("高血压风险等级: {}", ha.risk_level.as_deref().unwrap_or("未评估")));
    }

    if let Some(da) = &snapshot.diabetes_assessment {
        if let Some(hba1c) = da.hba1c {
            parts.push(format!("HbA1c: {}%", hba1c));
        }
        parts.push(format!("糖尿病控制状态: {}", da.control_status.as_deref().unwrap_or("未评估")));
    }

    if !snapshot.medications.is_empty() {
        let names: Vec<&str> = snapshot.medications.iter().take(5).map(|m| m.drug_name.as_str()).collect();
        parts.push(format!("当前用药: {}", names.join(", ")));
    }

    parts.join("\n")
}

/// 检索融合服务
pub struct RetrievalService {
    terms: Arc<TermMapper>,
    index: Arc<dyn DocumentIndex>,
    store: Arc<dyn PatientStore>,
    llm: Arc<dyn LanguageModel>,
    config: RetrievalConfig,
}

impl RetrievalService {
    pub fn new(
        terms: Arc<TermMapper>,
        index: Arc<dyn DocumentIndex>,
        store: Arc<dyn PatientStore>,
        llm: Arc<dyn LanguageModel>,
        config: RetrievalConfig,
    ) -> Self {
        Self { terms, index, store, llm, config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// 跨源统一检索
    pub async fn search(&self, query: &str, filters: &SearchFilters) -> SearchResult {
        let normalized_query = self.terms.expand_query(query);
        info!(query = %query, normalized = %normalized_query, "Cross-source search");

        let mut hits = Vec::new();
        let mut sources = Vec::new();

        match self.index.search(&normalized_query, self.config.top_k).await {
            Ok(results) => {
                info!(hits = results.len(), "Vector search finished");
                hits.extend(results.into_iter().map(|hit| RetrievalHit {
                    content: hit.content,
                    score: hit.score,
                    source: hit.source,
                    retrieval_type: RetrievalType::Vector,
                }));
                sources.push(VECTOR_SOURCE.to_string());
            }
            Err(e) => error!("Vector search failed: {}", e),
        }

        match self.store.search_guidelines_by_keyword(&normalized_query).await {
            Ok(rows) => {
                info!(hits = rows.len(), "Keyword search finished");
                hits.extend(rows.iter().map(|row| RetrievalHit {
                    content: format_guideline(row),
                    score: self.config.database_score,
                    source: SourceDescriptor::table(GUIDELINE_TABLE),
                    retrieval_type: RetrievalType::Database,
                }));
                sources.push(DATABASE_SOURCE.to_string());
            }
            Err(e) => error!("Keyword search failed: {}", e),
        }

        if let Some(after) = filters.update_date_after {
            match self.store.get_guideline_recommendations(None, Some(after)).await {
                Ok(rows) => {
                    info!(hits = rows.len(), after = %after, "Recent guideline filter finished");
                    hits.extend(rows.iter().map(|row| RetrievalHit {
                        content: format_guideline(row),
                        score: self.config.recency_score,
                        source: SourceDescriptor {
                            update_date: row.update_date,
                            ..SourceDescriptor::table(GUIDELINE_TABLE)
                        },
                        retrieval_type: RetrievalType::Database,
                    }));
                }
                Err(e) => error!("Recent guideline filter failed: {}", e),
            }
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        let total_hits = hits.len();
        hits.truncate(self.config.max_hits);

        SearchResult {
            hits,
            total_hits,
            sources,
            normalized_query,
            original_query: query.to_string(),
        }
    }

    /// 带相关性门控的 RAG 问答
    pub async fn rag_answer(
        &self,
        query: &str,
        patient: Option<&PatientSnapshot>,
        history: &[ChatMessage],
    ) -> RagAnswer {
        let prepared = match self.prepare(query, patient).await {
            Ok(prepared) => prepared,
            Err(gated) => return gated,
        };

        match self.llm.generate(&prepared.prompt, history, Some(MEDICAL_SYSTEM_PROMPT)).await {
            Ok(answer) => prepared.answered(answer),
            Err(e) => {
                error!(query = %query, "Answer generation failed: {}", e);
                prepared.failed(&e)
            }
        }
    }

    /// 流式 RAG 问答，片段到达即交给 `on_fragment`
    ///
    /// 门控与 [`rag_answer`](Self::rag_answer) 相同；被门控时固定回复作为单个片段发出。
    /// 返回值中的 `answer` 为已收到片段的拼接。
    pub async fn rag_answer_streaming<F>(
        &self,
        query: &str,
        patient: Option<&PatientSnapshot>,
        history: &[ChatMessage],
        mut on_fragment: F,
    ) -> RagAnswer
    where
        F: FnMut(&str),
    {
        let prepared = match self.prepare(query, patient).await {
            Ok(prepared) => prepared,
            Err(gated) => {
                on_fragment(&gated.answer);
                return gated;
            }
        };

        let mut fragments = match self
            .llm
            .generate_stream(&prepared.prompt, history, Some(MEDICAL_SYSTEM_PROMPT))
            .await
        {
            Ok(fragments) => fragments,
            Err(e) => {
                error!(query = %query, "Streaming generation failed to start: {}", e);
                let failed = prepared.failed(&e);
                on_fragment(&failed.answer);
                return failed;
            }
        };

        let mut answer = String::new();
        while let Some(fragment) = fragments.recv().await {
            match fragment {
                Ok(text) => {
                    on_fragment(&text);
                    answer.push_str(&text);
                }
                Err(e) => {
                    error!(query = %query, received = answer.chars().count(), "Streaming generation interrupted: {}", e);
                    return prepared.failed(&e);
                }
            }
        }

        debug!(query = %query, chars = answer.chars().count(), "Streaming answer completed");
        prepared.answered(answer)
    }

    /// 范围门控、检索与阈值门控，通过后组装提示词；被门控时返回固定回复
    async fn prepare(&self, query: &str, patient: Option<&PatientSnapshot>) -> Result<PreparedRag, RagAnswer> {
        if scope::is_out_of_scope(query) {
            info!(query = %query, "Query is out of scope, skipping retrieval");
            return Err(RagAnswer::out_of_scope(query));
        }

        let result = self.search(query, &SearchFilters::default()).await;
        let Some(max_score) = result.max_score() else {
            warn!(query = %query, "No knowledge found");
            return Err(RagAnswer::no_knowledge(query));
        };

        let threshold = self.config.similarity_threshold;
        if max_score < threshold {
            warn!(query = %query, max_score, threshold, "Retrieved knowledge below relevance threshold");
            return Err(RagAnswer { max_score: Some(max_score), ..RagAnswer::no_knowledge(query) });
        }

        let relevant: Vec<&RetrievalHit> = result
            .hits
            .iter()
            .filter(|hit| hit.score >= threshold)
            .take(self.config.context_hits)
            .collect();

        let context = relevant
            .iter()
            .map(|hit| format!("【来源: {}】\n{}", hit.source.locator(), hit.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        let sources: Vec<CitedSource> = relevant
            .iter()
            .map(|hit| CitedSource { source: hit.source.clone(), score: hit.score })
            .collect();

        let patient_info = patient.map(format_patient_context);

        Ok(PreparedRag {
            prompt: rag_prompt(&context, patient_info.as_deref(), query),
            sources,
            max_score,
            normalized_query: result.normalized_query,
        })
    }
}

/// 通过门控、待生成的 RAG 请求
struct PreparedRag {
    prompt: String,
    sources: Vec<CitedSource>,
    max_score: f32,
    normalized_query: String,
}

impl PreparedRag {
    fn answered(self, answer: String) -> RagAnswer {
        RagAnswer {
            answer,
            sources: self.sources,
            success: true,
            has_knowledge: true,
            is_out_of_scope: false,
            max_score: Some(self.max_score),
            normalized_query: Some(self.normalized_query),
            error: None,
        }
    }

    fn failed(self, error: &MedError) -> RagAnswer {
        RagAnswer {
            answer: format!("生成回答时出错: {}", error),
            sources: Vec::new(),
            success: false,
            has_knowledge: true,
            is_out_of_scope: false,
            max_score: Some(self.max_score),
            normalized_query: Some(self.normalized_query),
            error: Some(error.to_string()),
        }
    }
}
