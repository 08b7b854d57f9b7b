//! 术语映射器
//!
//! 映射为多对一关系，标准术语可映射到自身。映射表启动时由内置表初始化，
//! 运行期只允许通过 `add_mapping` 追加或覆盖，不支持删除。

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::table::SEED_MAPPINGS;

/// 模糊建议默认阈值
pub const DEFAULT_SUGGEST_THRESHOLD: f64 = 0.6;

/// 模糊建议最多返回条数
const MAX_SUGGESTIONS: usize = 5;

/// 查询扩展过程中文本相对输入的最大字节膨胀倍数
const MAX_EXPANSION_GROWTH: usize = 8;

/// 模糊匹配建议
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TermSuggestion {
    pub term: String,
    pub standard: String,
    pub similarity: f64,
}

/// 标准术语的别名汇总
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingEntry {
    pub aliases: Vec<String>,
    pub count: usize,
}

/// 术语标准化服务结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTerm {
    pub original: String,
    pub normalized: String,
    pub is_mapped: bool,
    /// 仅在未命中映射时给出
    pub suggestions: Vec<TermSuggestion>,
}

#[derive(Debug, Default)]
struct MappingState {
    /// 别名 -> 标准术语
    mappings: BTreeMap<String, String>,
    /// 标准术语 -> 别名（不含自身）
    reverse: BTreeMap<String, Vec<String>>,
    /// 查询扩展用的 (匹配键, 替换文本)，按字符长度降序
    expansion_keys: Vec<(String, String)>,
}

impl MappingState {
    fn insert(&mut self, alias: &str, standard: &str) {
        if let Some(previous) = self.mappings.insert(alias.to_string(), standard.to_string()) {
            if previous != standard {
                if let Some(aliases) = self.reverse.get_mut(&previous) {
                    aliases.retain(|a| a != alias);
                }
                if !self.mappings.values().any(|v| v == &previous) {
                    self.reverse.remove(&previous);
                }
            }
        }

        let aliases = self.reverse.entry(standard.to_string()).or_default();
        if alias != standard && !aliases.iter().any(|a| a == alias) {
            aliases.push(alias.to_string());
        }
    }

    /// 重建扩展键：别名映射到标准术语，标准术语映射到自身
    fn rebuild_expansion_keys(&mut self) {
        let mut keys: BTreeMap<&str, &str> = BTreeMap::new();
        for standard in self.mappings.values() {
            keys.insert(standard, standard);
        }
        for (alias, standard) in &self.mappings {
            keys.insert(alias, standard);
        }

        let mut ordered: Vec<(String, String)> = keys
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ordered.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        self.expansion_keys = ordered;
    }

    /// 从 `standard` 沿映射链前进是否会回到 `alias`
    fn leads_back_to(&self, alias: &str, standard: &str) -> bool {
        let mut visited: Vec<&str> = Vec::new();
        let mut current = standard;

        loop {
            if current == alias {
                return true;
            }
            if visited.contains(&current) {
                return false;
            }
            visited.push(current);
            match self.mappings.get(current) {
                Some(next) if next != current => current = next,
                _ => return false,
            }
        }
    }

    /// 重复单遍替换直到文本不再变化
    ///
    /// 迭代次数以输入长度加映射条数为上限；超限或膨胀过大视为不收敛，返回原文，
    /// 这样对任意映射表结果都是不动点或原文本身。
    fn expand_to_fixpoint(&self, text: &str) -> Option<String> {
        let max_passes = text.chars().count() + self.mappings.len() + 1;
        let max_bytes = text.len() * MAX_EXPANSION_GROWTH + 256;
        let mut current = text.to_string();

        for _ in 0..max_passes {
            let next = self.expand_once(&current);
            if next == current {
                return Some(current);
            }
            if next.len() > max_bytes {
                break;
            }
            current = next;
        }

        None
    }

    /// 单遍最长匹配替换
    fn expand_once(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(ch) = rest.chars().next() {
            match self.expansion_keys.iter().find(|(key, _)| rest.starts_with(key.as_str())) {
                Some((key, replacement)) => {
                    out.push_str(replacement);
                    rest = &rest[key.len()..];
                }
                None => {
                    out.push(ch);
                    rest = &rest[ch.len_utf8()..];
                }
            }
        }

        out
    }
}

/// 医学术语映射器
#[derive(Debug)]
pub struct TermMapper {
    state: RwLock<MappingState>,
}

impl TermMapper {
    /// 使用内置映射表创建
    pub fn new() -> Self {
        Self::with_mappings(std::iter::empty::<(String, String)>())
    }

    /// 在内置映射表基础上追加自定义映射
    pub fn with_mappings<I, A, S>(custom: I) -> Self
    where
        I: IntoIterator<Item = (A, S)>,
        A: AsRef<str>,
        S: AsRef<str>,
    {
        let mut state = MappingState::default();
        for (alias, standard) in SEED_MAPPINGS {
            state.insert(alias, standard);
        }
        for (alias, standard) in custom {
            let (alias, standard) = (alias.as_ref().trim(), standard.as_ref().trim());
            if alias.is_empty() || standard.is_empty() {
                continue;
            }
            if alias != standard && state.leads_back_to(alias, standard) {
                warn!(alias = %alias, standard = %standard, "Skipped cyclic custom term mapping");
                continue;
            }
            state.insert(alias, standard);
        }
        state.rebuild_expansion_keys();

        Self { state: RwLock::new(state) }
    }

    fn read(&self) -> RwLockReadGuard<'_, MappingState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// 标准化术语，返回 (标准术语, 是否发生映射)
    ///
    /// 先精确匹配，再大小写不敏感匹配；未命中时原样返回。
    pub fn normalize(&self, term: &str) -> (String, bool) {
        let term = term.trim();
        let state = self.read();

        if let Some(standard) = state.mappings.get(term) {
            if standard != term {
                info!(term = %term, standard = %standard, "Term normalized");
                return (standard.clone(), true);
            }
            return (term.to_string(), false);
        }

        let lowered = term.to_lowercase();
        if let Some((_, standard)) = state
            .mappings
            .iter()
            .find(|(alias, _)| alias.to_lowercase() == lowered)
        {
            info!(term = %term, standard = %standard, "Term normalized case-insensitively");
            return (standard.clone(), true);
        }

        (term.to_string(), false)
    }

    /// 标准化并在未命中时附带模糊建议
    pub fn normalize_with_suggestions(&self, term: &str) -> NormalizedTerm {
        let (normalized, is_mapped) = self.normalize(term);
        let suggestions = if is_mapped {
            Vec::new()
        } else {
            self.suggest(term, DEFAULT_SUGGEST_THRESHOLD)
        };

        NormalizedTerm {
            original: term.to_string(),
            normalized,
            is_mapped,
            suggestions,
        }
    }

    /// 基于归一化编辑距离的相似术语建议，按相似度降序最多返回 5 条
    pub fn suggest(&self, term: &str, threshold: f64) -> Vec<TermSuggestion> {
        let lowered = term.trim().to_lowercase();
        let state = self.read();

        let mut suggestions: Vec<TermSuggestion> = state
            .mappings
            .iter()
            .filter_map(|(alias, standard)| {
                let similarity = strsim::normalized_levenshtein(&lowered, &alias.to_lowercase());
                (similarity >= threshold).then(|| TermSuggestion {
                    term: alias.clone(),
                    standard: standard.clone(),
                    similarity: (similarity * 100.0).round() / 100.0,
                })
            })
            .collect();

        suggestions.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }

    /// 将文本中出现的所有别名替换为标准术语
    ///
    /// 长别名优先匹配，标准术语本身作为恒等键参与匹配，逐遍替换直到不动点，
    /// 因此重复执行结果不变。
    pub fn expand_query(&self, query: &str) -> String {
        let state = self.read();

        match state.expand_to_fixpoint(query) {
            Some(expanded) => {
                if expanded != query {
                    info!(query = %query, expanded = %expanded, "Query expanded");
                }
                expanded
            }
            None => {
                warn!(query = %query, "Query expansion did not converge, keeping original text");
                query.to_string()
            }
        }
    }

    /// 获取标准术语的所有别名
    pub fn get_aliases(&self, standard: &str) -> Vec<String> {
        self.read().reverse.get(standard).cloned().unwrap_or_default()
    }

    /// 获取完整映射表 {标准术语: {aliases, count}}
    pub fn get_mapping_table(&self) -> BTreeMap<String, MappingEntry> {
        self.read()
            .reverse
            .iter()
            .map(|(standard, aliases)| {
                (
                    standard.clone(),
                    MappingEntry { aliases: aliases.clone(), count: aliases.len() },
                )
            })
            .collect()
    }

    /// 添加或覆盖映射关系
    ///
    /// 标准术语沿现有映射链能回到别名时拒绝，避免 A→B→A 循环。
    pub fn add_mapping(&self, alias: &str, standard: &str) -> bool {
        let (alias, standard) = (alias.trim(), standard.trim());
        if alias.is_empty() || standard.is_empty() {
            warn!(alias = %alias, standard = %standard, "Rejected empty term mapping");
            return false;
        }

        let mut state = match self.state.write() {
            Ok(guard) => guard,
            Err(e) => {
                error!("Term mapping table lock poisoned: {}", e);
                return false;
            }
        };

        if alias != standard && state.leads_back_to(alias, standard) {
            warn!(alias = %alias, standard = %standard, "Rejected cyclic term mapping");
            return false;
        }

        state.insert(alias, standard);
        state.rebuild_expansion_keys();
        debug!(keys = state.expansion_keys.len(), "Expansion keys rebuilt");
        info!(alias = %alias, standard = %standard, "Term mapping added");
        true
    }

    /// 当前映射条数
    pub fn len(&self) -> usize {
        self.read().mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().mappings.is_empty()
    }
}

impl Default for TermMapper {
    fn default() -> Self {
        Self::new()
    }
}
