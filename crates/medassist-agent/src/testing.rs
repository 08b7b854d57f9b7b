//! 测试用协作方与夹具

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use medassist_core::models::*;
use medassist_core::{DocumentIndex, FailureSwitch, IndexHit, IndexStatus, LanguageModel, MedError, PatientStore, RebuildOutcome, Result};
use medassist_database::{InMemoryPatientStore, StoreFixtures};
use medassist_integration::{KnowledgeChunk, StaticDocumentIndex};
use medassist_terms::TermMapper;

use crate::retrieval::{RetrievalConfig, RetrievalService};

#[derive(Debug, Clone)]
pub struct Call {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub history_len: usize,
}

/// 按脚本应答的大模型，记录每次调用
#[derive(Debug, Clone)]
pub struct ScriptedModel {
    reply: Option<String>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl ScriptedModel {
    pub fn replying(reply: &str) -> Self {
        Self { reply: Some(reply.to_string()), calls: Arc::default() }
    }

    pub fn failing() -> Self {
        Self { reply: None, calls: Arc::default() }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<Call> {
        self.calls.lock().unwrap().last().cloned()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_call().map(|c| c.prompt)
    }

    pub fn last_system_prompt(&self) -> Option<String> {
        self.last_call().and_then(|c| c.system_prompt)
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str, history: &[ChatMessage], system_prompt: Option<&str>) -> Result<String> {
        self.calls.lock().unwrap().push(Call {
            prompt: prompt.to_string(),
            system_prompt: system_prompt.map(str::to_string),
            history_len: history.len(),
        });
        self.reply
            .clone()
            .ok_or_else(|| MedError::Generation("LLM 调用失败: 连接被拒绝".to_string()))
    }
}

/// 逐段流式应答的大模型，可在末尾注入一次中途失败
#[derive(Debug, Clone)]
pub struct StreamingModel {
    fragments: Vec<String>,
    fail_after: bool,
}

impl StreamingModel {
    pub fn new(fragments: &[&str]) -> Self {
        Self { fragments: fragments.iter().map(|f| f.to_string()).collect(), fail_after: false }
    }

    pub fn interrupted(fragments: &[&str]) -> Self {
        Self { fail_after: true, ..Self::new(fragments) }
    }
}

#[async_trait]
impl LanguageModel for StreamingModel {
    async fn generate(&self, _prompt: &str, _history: &[ChatMessage], _system_prompt: Option<&str>) -> Result<String> {
        Ok(self.fragments.concat())
    }

    async fn generate_stream(
        &self,
        _prompt: &str,
        _history: &[ChatMessage],
        _system_prompt: Option<&str>,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<String>>> {
        let (tx, rx) = tokio::sync::mpsc::channel(self.fragments.len() + 1);
        for fragment in &self.fragments {
            tx.send(Ok(fragment.clone())).await.unwrap();
        }
        if self.fail_after {
            tx.send(Err(MedError::Generation("LLM 流式调用失败: 连接中断".to_string())))
                .await
                .unwrap();
        }
        Ok(rx)
    }
}

/// 始终失败的文档索引
pub struct FailingIndex;

#[async_trait]
impl DocumentIndex for FailingIndex {
    async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<IndexHit>> {
        Err(MedError::Index("索引未加载".to_string()))
    }

    async fn rebuild_index(&self) -> RebuildOutcome {
        RebuildOutcome { success: false, timestamp: chrono::Utc::now(), message: "索引重建失败".to_string() }
    }

    async fn status(&self) -> IndexStatus {
        IndexStatus { has_index: false, last_update_time: None, persist_path: String::new() }
    }
}

pub fn index_with(chunks: &[(&str, u32)]) -> Arc<StaticDocumentIndex> {
    let chunks = chunks
        .iter()
        .map(|(text, page)| KnowledgeChunk {
            text: text.to_string(),
            source: Some("中国高血压防治指南.pdf".to_string()),
            source_type: "pdf".to_string(),
            page: Some(*page),
            row_start: None,
            row_end: None,
        })
        .collect();
    Arc::new(StaticDocumentIndex::from_chunks(chunks, "knowledge_base/medical_index"))
}

pub fn empty_index() -> Arc<StaticDocumentIndex> {
    Arc::new(StaticDocumentIndex::new(None, "knowledge_base/medical_index"))
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

fn guideline(name: &str, disease: &str, content: &str, updated: Option<NaiveDate>) -> GuidelineRow {
    GuidelineRow {
        guideline_name: name.to_string(),
        disease_type: Some(disease.to_string()),
        patient_condition: None,
        recommendation_level: Some("ⅠA".to_string()),
        recommendation_content: content.to_string(),
        evidence_source: Some(name.to_string()),
        update_date: updated,
        is_active: true,
    }
}

fn patient(id: &str, name: &str, gender: Gender, age: u32) -> BasicInfo {
    BasicInfo {
        patient_id: id.to_string(),
        name: Some(name.to_string()),
        gender: Some(gender),
        age: Some(age),
        bmi: None,
    }
}

/// 高血压急症患者：185/125，伴胸痛
pub fn emergency_patient() -> PatientSnapshot {
    PatientSnapshot {
        basic_info: patient("P001", "张三", Gender::Male, 62),
        medications: vec![Medication {
            drug_name: "氨氯地平".to_string(),
            drug_class: Some("CCB".to_string()),
            dosage: Some("5mg".to_string()),
            frequency: Some("qd".to_string()),
            medication_date: None,
        }],
        hypertension_assessment: Some(HypertensionRecord {
            assessment_date: date(2024, 3, 1),
            sbp: Some(185.0),
            dbp: Some(125.0),
            risk_factors: Some("吸烟".to_string()),
            target_organs_damage: None,
            clinical_conditions: Some("胸痛".to_string()),
            risk_level: Some("很高危".to_string()),
        }),
        ..Default::default()
    }
}

/// 血糖控制不佳患者：HbA1c 9.5
pub fn diabetic_patient() -> PatientSnapshot {
    PatientSnapshot {
        basic_info: patient("P002", "李四", Gender::Female, 58),
        diabetes_assessment: Some(DiabetesRecord {
            assessment_date: date(2024, 2, 1),
            hba1c: Some(9.5),
            fasting_glucose: Some(9.8),
            postprandial_glucose: Some(14.2),
            insulin_usage: Some(false),
            control_status: Some("不佳".to_string()),
        }),
        ..Default::default()
    }
}

/// 妊娠期服用 ACEI 的患者
pub fn pregnant_patient() -> PatientSnapshot {
    PatientSnapshot {
        basic_info: patient("P003", "王五", Gender::Female, 30),
        diagnoses: vec![Diagnosis { diagnosis_name: "妊娠期高血压".to_string(), diagnosis_date: date(2024, 1, 10) }],
        medications: vec![Medication {
            drug_name: "依那普利".to_string(),
            drug_class: Some("ACEI".to_string()),
            dosage: Some("10mg".to_string()),
            frequency: Some("qd".to_string()),
            medication_date: None,
        }],
        hypertension_assessment: Some(HypertensionRecord {
            assessment_date: date(2024, 1, 10),
            sbp: Some(150.0),
            dbp: Some(95.0),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn demo_fixtures() -> StoreFixtures {
    StoreFixtures {
        patients: vec![emergency_patient(), diabetic_patient(), pregnant_patient()],
        guidelines: vec![
            guideline("中国高血压防治指南2023", "高血压", "高血压病患者推荐CCB或ACEI/ARB起始治疗", date(2023, 6, 1)),
            guideline("中国2型糖尿病防治指南2020", "糖尿病", "二甲双胍为2型糖尿病一线用药", date(2021, 4, 1)),
        ],
    }
}

pub fn demo_store() -> Arc<InMemoryPatientStore> {
    Arc::new(InMemoryPatientStore::new(demo_fixtures(), FailureSwitch::default()))
}

pub fn empty_store() -> Arc<InMemoryPatientStore> {
    Arc::new(InMemoryPatientStore::new(StoreFixtures::default(), FailureSwitch::default()))
}

pub fn service_with<M: LanguageModel + 'static>(
    index: Arc<dyn DocumentIndex>,
    store: Arc<dyn PatientStore>,
    model: M,
) -> RetrievalService {
    RetrievalService::new(
        Arc::new(TermMapper::new()),
        index,
        store,
        Arc::new(model),
        RetrievalConfig::default(),
    )
}
