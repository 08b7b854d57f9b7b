//! # MedAssist Core
//!
//! 高血压/糖尿病决策支持系统的核心模块，提供基础数据结构、错误定义、
//! 分级工具以及外部协作方（数据库、文档索引、大模型）的接口定义。

pub mod collaborators;
pub mod error;
pub mod models;
pub mod utils;

pub use collaborators::{
    ConnectionStatus, DocumentIndex, FailureSwitch, IndexHit, IndexStatus, LanguageModel,
    PatientStore, RebuildOutcome,
};
pub use error::{MedError, Result};
pub use models::*;
