//! 内存持久化协作方
//!
//! 从 JSON 夹具加载患者快照与指南推荐，用于演示、测试和无数据库部署。

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use medassist_core::models::{GuidelineRow, PatientSnapshot};
use medassist_core::{ConnectionStatus, FailureSwitch, MedError, PatientStore, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::connection::SIMULATED_FAILURE_MESSAGE;

/// 夹具文件结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFixtures {
    #[serde(default)]
    pub patients: Vec<PatientSnapshot>,
    #[serde(default)]
    pub guidelines: Vec<GuidelineRow>,
}

/// 内存存储
pub struct InMemoryPatientStore {
    patients: HashMap<String, PatientSnapshot>,
    guidelines: Vec<GuidelineRow>,
    failure: FailureSwitch,
}

impl InMemoryPatientStore {
    pub fn new(fixtures: StoreFixtures, failure: FailureSwitch) -> Self {
        let patients = fixtures
            .patients
            .into_iter()
            .map(|snapshot| (snapshot.patient_id().to_string(), snapshot))
            .collect();

        Self {
            patients,
            guidelines: fixtures.guidelines,
            failure,
        }
    }

    /// 从 JSON 夹具文件加载
    pub fn from_json_file(path: impl AsRef<Path>, failure: FailureSwitch) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let fixtures: StoreFixtures = serde_json::from_str(&content)?;

        info!(
            path = %path.display(),
            patients = fixtures.patients.len(),
            guidelines = fixtures.guidelines.len(),
            "In-memory patient store loaded"
        );
        Ok(Self::new(fixtures, failure))
    }

    pub fn failure_switch(&self) -> &FailureSwitch {
        &self.failure
    }

    fn ensure_available(&self) -> Result<()> {
        if self.failure.is_enabled() {
            return Err(MedError::DataUnavailable(SIMULATED_FAILURE_MESSAGE.to_string()));
        }
        Ok(())
    }
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|text| text.to_lowercase().contains(needle))
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn get_patient_snapshot(&self, patient_id: &str) -> Result<Option<PatientSnapshot>> {
        self.ensure_available()?;
        Ok(self.patients.get(patient_id.trim()).cloned())
    }

    async fn search_guidelines_by_keyword(&self, keyword: &str) -> Result<Vec<GuidelineRow>> {
        self.ensure_available()?;
        let needle = keyword.to_lowercase();

        Ok(self
            .guidelines
            .iter()
            .filter(|row| row.is_active)
            .filter(|row| {
                contains_ci(Some(&row.recommendation_content), &needle)
                    || contains_ci(row.patient_condition.as_deref(), &needle)
                    || contains_ci(Some(&row.guideline_name), &needle)
            })
            .cloned()
            .collect())
    }

    async fn get_guideline_recommendations(
        &self,
        disease_type: Option<&str>,
        updated_after: Option<NaiveDate>,
    ) -> Result<Vec<GuidelineRow>> {
        self.ensure_available()?;

        let mut rows: Vec<GuidelineRow> = self
            .guidelines
            .iter()
            .filter(|row| row.is_active)
            .filter(|row| disease_type.map_or(true, |d| row.disease_type.as_deref() == Some(d)))
            .filter(|row| updated_after.map_or(true, |after| row.update_date.is_some_and(|date| date >= after)))
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.update_date.cmp(&a.update_date));
        Ok(rows)
    }

    async fn check_connection(&self) -> ConnectionStatus {
        if self.failure.is_enabled() {
            ConnectionStatus {
                connected: false,
                message: SIMULATED_FAILURE_MESSAGE.to_string(),
                simulated_failure: true,
            }
        } else {
            ConnectionStatus {
                connected: true,
                message: "内存数据源可用".to_string(),
                simulated_failure: false,
            }
        }
    }

    async fn set_failure_simulation(&self, enabled: bool) {
        let previous = self.failure.set(enabled);
        info!(enabled, previous, "In-memory store failure simulation toggled");
    }

    fn failure_simulation_enabled(&self) -> bool {
        self.failure.is_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medassist_core::models::BasicInfo;

    fn guideline(name: &str, content: &str, disease: &str, date: Option<(i32, u32, u32)>, active: bool) -> GuidelineRow {
        GuidelineRow {
            guideline_name: name.into(),
            disease_type: Some(disease.into()),
            patient_condition: None,
            recommendation_level: Some("ⅠA".into()),
            recommendation_content: content.into(),
            evidence_source: None,
            update_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            is_active: active,
        }
    }

    fn store() -> InMemoryPatientStore {
        let fixtures = StoreFixtures {
            patients: vec![PatientSnapshot {
                basic_info: BasicInfo { patient_id: "P001".into(), ..Default::default() },
                ..Default::default()
            }],
            guidelines: vec![
                guideline("中国高血压防治指南2023", "高血压病患者推荐CCB起始治疗", "高血压", Some((2023, 6, 1)), true),
                guideline("中国2型糖尿病防治指南2020", "二甲双胍为一线用药", "糖尿病", Some((2021, 4, 1)), true),
                guideline("旧版指南", "高血压病旧推荐", "高血压", Some((2010, 1, 1)), false),
            ],
        };
        InMemoryPatientStore::new(fixtures, FailureSwitch::default())
    }

    #[tokio::test]
    async fn test_not_found_is_none_not_error() {
        let store = store();
        assert!(store.get_patient_snapshot("P001").await.unwrap().is_some());
        assert!(store.get_patient_snapshot("P404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keyword_search_skips_inactive() {
        let rows = store().search_guidelines_by_keyword("高血压病").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].guideline_name, "中国高血压防治指南2023");
    }

    #[tokio::test]
    async fn test_recommendations_filtered_and_sorted() {
        let store = store();
        let all = store.get_guideline_recommendations(None, None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].disease_type.as_deref(), Some("高血压"));

        let recent = store
            .get_guideline_recommendations(None, NaiveDate::from_ymd_opt(2022, 1, 1))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);

        let dm = store.get_guideline_recommendations(Some("糖尿病"), None).await.unwrap();
        assert_eq!(dm.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_simulation_distinct_from_not_found() {
        let store = store();
        store.set_failure_simulation(true).await;
        let err = store.get_patient_snapshot("P001").await.err().unwrap();
        assert!(err.is_unavailable());
        assert!(store.check_connection().await.simulated_failure);

        store.set_failure_simulation(false).await;
        assert!(store.check_connection().await.connected);
    }

    #[test]
    fn test_fixture_file_missing_is_io_error() {
        let err = InMemoryPatientStore::from_json_file("/nonexistent/fixtures.json", FailureSwitch::default())
            .err()
            .unwrap();
        assert!(matches!(err, MedError::Io(_)));
    }

    #[tokio::test]
    async fn test_bundled_demo_fixtures_load() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/demo.json");
        let store = InMemoryPatientStore::from_json_file(path, FailureSwitch::default()).unwrap();

        let snapshot = store.get_patient_snapshot("P003").await.unwrap().unwrap();
        assert_eq!(snapshot.diagnoses[0].diagnosis_name, "妊娠期高血压");
        // 停用的指南不参与查询
        let all = store.get_guideline_recommendations(None, None).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
