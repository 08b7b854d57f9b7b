//! # 外部服务集成模块
//!
//! 提供决策核心所依赖的外部协作方实现：
//! - OpenAI 兼容协议的大模型客户端，支持单次与流式生成
//! - 基于文本块文件的知识库索引，支持检索、重建与状态查询

pub mod index;
pub mod llm;

pub use index::{KnowledgeChunk, StaticDocumentIndex};
pub use llm::{LlmConfig, OpenAiCompatClient};
