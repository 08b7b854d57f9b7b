//! 知识库文本块索引
//!
//! 文本块由外部导入流程（PDF/Excel 解析）生成为 JSON 文件，此处只负责
//! 加载、检索与重建。相关度为查询与文本块的字符二元组重合比例，取值 [0, 1]。

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medassist_core::models::SourceDescriptor;
use medassist_core::{DocumentIndex, IndexHit, IndexStatus, MedError, RebuildOutcome, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info};

/// 知识库文本块
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub text: String,
    #[serde(default)]
    pub source: Option<String>, // 文件名
    #[serde(default = "default_source_type")]
    pub source_type: String, // pdf / excel
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub row_start: Option<u32>,
    #[serde(default)]
    pub row_end: Option<u32>,
}

fn default_source_type() -> String {
    "unknown".to_string()
}

impl KnowledgeChunk {
    fn descriptor(&self) -> SourceDescriptor {
        let rows = match (self.row_start, self.row_end) {
            (Some(start), Some(end)) if end > 0 => Some(format!("{}-{}", start, end)),
            _ => None,
        };
        SourceDescriptor {
            source_type: self.source_type.clone(),
            file: self.source.clone(),
            page: self.page.filter(|p| *p > 0),
            table: None,
            rows,
            update_date: None,
        }
    }
}

#[derive(Debug, Default)]
struct IndexState {
    chunks: Vec<(KnowledgeChunk, HashSet<String>)>,
    last_update_time: Option<DateTime<Utc>>,
}

/// 基于文本块文件的文档索引
pub struct StaticDocumentIndex {
    chunks_file: Option<PathBuf>,
    persist_path: String,
    state: RwLock<IndexState>,
}

/// 文本的检索单元：多字符文本取相邻二元组，单字符取自身
fn grams(text: &str) -> HashSet<String> {
    let chars: Vec<char> = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    if chars.len() == 1 {
        return chars.iter().map(|c| c.to_string()).collect();
    }
    chars.windows(2).map(|w| w.iter().collect()).collect()
}

fn overlap_score(query: &HashSet<String>, chunk: &HashSet<String>) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let shared = query.intersection(chunk).count();
    shared as f32 / query.len() as f32
}

impl StaticDocumentIndex {
    pub fn new(chunks_file: Option<PathBuf>, persist_path: impl Into<String>) -> Self {
        Self {
            chunks_file,
            persist_path: persist_path.into(),
            state: RwLock::new(IndexState::default()),
        }
    }

    /// 直接以内存文本块建立索引
    pub fn from_chunks(chunks: Vec<KnowledgeChunk>, persist_path: impl Into<String>) -> Self {
        Self {
            chunks_file: None,
            persist_path: persist_path.into(),
            state: RwLock::new(IndexState {
                chunks: Self::prepare(chunks),
                last_update_time: Some(Utc::now()),
            }),
        }
    }

    fn prepare(chunks: Vec<KnowledgeChunk>) -> Vec<(KnowledgeChunk, HashSet<String>)> {
        chunks
            .into_iter()
            .filter(|chunk| !chunk.text.trim().is_empty())
            .map(|chunk| {
                let grams = grams(&chunk.text);
                (chunk, grams)
            })
            .collect()
    }

    async fn load_chunks(&self) -> Result<Vec<KnowledgeChunk>> {
        let path = self
            .chunks_file
            .as_ref()
            .ok_or_else(|| MedError::Config("未配置知识库文本块文件".to_string()))?;
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 首次启动时加载文本块；失败只记录日志
    pub async fn load(&self) -> bool {
        self.rebuild_index().await.success
    }
}

#[async_trait]
impl DocumentIndex for StaticDocumentIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<IndexHit>> {
        let state = self.state.read().await;
        if state.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_grams = grams(query);
        let mut scored: Vec<(f32, &KnowledgeChunk)> = state
            .chunks
            .iter()
            .map(|(chunk, chunk_grams)| (overlap_score(&query_grams, chunk_grams), chunk))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        info!(hits = scored.len(), "Document index search finished");
        Ok(scored
            .into_iter()
            .map(|(score, chunk)| IndexHit {
                content: chunk.text.clone(),
                score,
                source: chunk.descriptor(),
            })
            .collect())
    }

    async fn rebuild_index(&self) -> RebuildOutcome {
        info!("Rebuilding document index");
        let timestamp = Utc::now();

        match self.load_chunks().await {
            Ok(chunks) => {
                let prepared = Self::prepare(chunks);
                let count = prepared.len();
                let mut state = self.state.write().await;
                state.chunks = prepared;
                state.last_update_time = Some(timestamp);

                info!(chunks = count, "Document index rebuilt");
                RebuildOutcome {
                    success: true,
                    timestamp,
                    message: format!("索引重建成功，共 {} 个文本块", count),
                }
            }
            Err(e) => {
                error!("Document index rebuild failed: {}", e);
                RebuildOutcome {
                    success: false,
                    timestamp,
                    message: format!("索引重建失败: {}", e),
                }
            }
        }
    }

    async fn status(&self) -> IndexStatus {
        let state = self.state.read().await;
        IndexStatus {
            has_index: !state.chunks.is_empty(),
            last_update_time: state.last_update_time,
            persist_path: self.persist_path.clone(),
        }
    }
}
