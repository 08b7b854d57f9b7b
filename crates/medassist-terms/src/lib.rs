//! # 医学术语标准化
//!
//! 将别名、缩写、商品名映射到标准术语，支持模糊建议与查询扩展，
//! 并提供按药物类别的禁忌参考表。

pub mod contraindications;
pub mod mapper;
pub mod table;

pub use contraindications::{contraindications_for, DrugClass, DrugContraindications};
pub use mapper::{MappingEntry, NormalizedTerm, TermMapper, TermSuggestion};
