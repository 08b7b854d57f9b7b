//! 外部协作方接口
//!
//! 决策核心只通过这里定义的窄接口访问持久化存储、语义文档索引和大模型。
//! 各实现通过构造函数注入，不使用全局单例。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::{ChatMessage, GuidelineRow, PatientSnapshot, SourceDescriptor};

/// 数据库故障模拟开关
///
/// 由存储实现持有，并可克隆给控制面（CLI/传输层）共享同一开关。
#[derive(Debug, Clone, Default)]
pub struct FailureSwitch {
    enabled: Arc<AtomicBool>,
}

impl FailureSwitch {
    pub fn new(enabled: bool) -> Self {
        Self { enabled: Arc::new(AtomicBool::new(enabled)) }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// 设置开关，返回之前的状态
    pub fn set(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::SeqCst)
    }
}

/// 数据库连接状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: String,
    pub simulated_failure: bool,
}

/// 持久化协作方
///
/// 不可用时必须返回 `MedError::DataUnavailable`，未找到返回 `Ok(None)` 或空列表。
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// 组装患者画像快照
    async fn get_patient_snapshot(&self, patient_id: &str) -> Result<Option<PatientSnapshot>>;

    /// 在指南推荐表中做自由文本匹配
    async fn search_guidelines_by_keyword(&self, keyword: &str) -> Result<Vec<GuidelineRow>>;

    /// 获取启用中的指南推荐，可按疾病类型和更新日期过滤
    async fn get_guideline_recommendations(
        &self,
        disease_type: Option<&str>,
        updated_after: Option<NaiveDate>,
    ) -> Result<Vec<GuidelineRow>>;

    /// 检查连接状态
    async fn check_connection(&self) -> ConnectionStatus;

    /// 切换故障模拟；切换时必须丢弃已缓存的连接
    async fn set_failure_simulation(&self, enabled: bool);

    fn failure_simulation_enabled(&self) -> bool;
}

/// 语义索引命中
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHit {
    pub content: String,
    pub score: f32,
    pub source: SourceDescriptor,
}

/// 索引重建结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebuildOutcome {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// 索引状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatus {
    pub has_index: bool,
    pub last_update_time: Option<DateTime<Utc>>,
    pub persist_path: String,
}

/// 语义文档索引协作方
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<IndexHit>>;

    async fn rebuild_index(&self) -> RebuildOutcome;

    async fn status(&self) -> IndexStatus;
}

/// 大模型协作方
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 单次生成，失败时返回 `MedError::Generation`
    async fn generate(
        &self,
        prompt: &str,
        history: &[ChatMessage],
        system_prompt: Option<&str>,
    ) -> Result<String>;

    /// 流式生成，逐段返回文本；中途失败以 `Err` 片段结束
    ///
    /// 默认实现将完整回答作为一个片段发送。
    async fn generate_stream(
        &self,
        prompt: &str,
        history: &[ChatMessage],
        system_prompt: Option<&str>,
    ) -> Result<mpsc::Receiver<Result<String>>> {
        let content = self.generate(prompt, history, system_prompt).await?;
        let (tx, rx) = mpsc::channel(1);
        if tx.send(Ok(content)).await.is_err() {
            tracing::debug!("Stream receiver dropped before first fragment");
        }
        Ok(rx)
    }
}
