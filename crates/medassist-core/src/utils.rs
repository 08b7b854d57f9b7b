//! 通用工具函数：血压/糖化血红蛋白分级、证据等级与 BMI

use serde::{Deserialize, Serialize};

/// 血压分级
///
/// 枚举顺序即严重程度顺序，可直接比较。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BpGrade {
    Normal,     // 正常血压
    HighNormal, // 正常高值
    Grade1,     // 1级高血压
    Grade2,     // 2级高血压
    Grade3,     // 3级高血压
}

impl BpGrade {
    /// 指南中的序数等级 0 / 0.5 / 1 / 2 / 3
    pub fn level(&self) -> f32 {
        match self {
            BpGrade::Normal => 0.0,
            BpGrade::HighNormal => 0.5,
            BpGrade::Grade1 => 1.0,
            BpGrade::Grade2 => 2.0,
            BpGrade::Grade3 => 3.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BpGrade::Normal => "正常血压",
            BpGrade::HighNormal => "正常高值",
            BpGrade::Grade1 => "1级高血压",
            BpGrade::Grade2 => "2级高血压",
            BpGrade::Grade3 => "3级高血压",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BpGrade::Normal => "理想血压水平",
            BpGrade::HighNormal => "血压偏高，需注意",
            BpGrade::Grade1 => "轻度高血压",
            BpGrade::Grade2 => "中度高血压",
            BpGrade::Grade3 => "重度高血压",
        }
    }
}

/// 血压分级结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BpClassification {
    pub grade: BpGrade,
    pub level: f32,
    pub name: String,
    pub description: String,
}

impl From<BpGrade> for BpClassification {
    fn from(grade: BpGrade) -> Self {
        Self {
            grade,
            level: grade.level(),
            name: grade.name().to_string(),
            description: grade.description().to_string(),
        }
    }
}

/// 按收缩压/舒张压进行高血压分级
pub fn classify_bp(sbp: f64, dbp: f64) -> BpClassification {
    let grade = if sbp < 120.0 && dbp < 80.0 {
        BpGrade::Normal
    } else if sbp < 140.0 && dbp < 90.0 {
        BpGrade::HighNormal
    } else if sbp < 160.0 && dbp < 100.0 {
        BpGrade::Grade1
    } else if sbp < 180.0 && dbp < 110.0 {
        BpGrade::Grade2
    } else {
        BpGrade::Grade3
    };
    grade.into()
}

/// 糖化血红蛋白分级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Hba1cBand {
    Normal,         // 正常
    Prediabetes,    // 糖尿病前期
    WellControlled, // 控制良好
    Fair,           // 控制一般
    Poor,           // 控制不佳
}

impl Hba1cBand {
    pub fn label(&self) -> &'static str {
        match self {
            Hba1cBand::Normal => "正常",
            Hba1cBand::Prediabetes => "糖尿病前期",
            Hba1cBand::WellControlled => "控制良好",
            Hba1cBand::Fair => "控制一般",
            Hba1cBand::Poor => "控制不佳",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Hba1cBand::Normal => "血糖控制正常",
            Hba1cBand::Prediabetes => "需要加强生活方式干预",
            Hba1cBand::WellControlled => "糖尿病控制良好",
            Hba1cBand::Fair => "需要加强治疗",
            Hba1cBand::Poor => "需要强化治疗，考虑调整方案",
        }
    }
}

/// 按 HbA1c(%) 分级
pub fn classify_hba1c(hba1c: f64) -> Hba1cBand {
    if hba1c < 5.7 {
        Hba1cBand::Normal
    } else if hba1c < 6.5 {
        Hba1cBand::Prediabetes
    } else if hba1c < 7.0 {
        Hba1cBand::WellControlled
    } else if hba1c < 8.0 {
        Hba1cBand::Fair
    } else {
        Hba1cBand::Poor
    }
}

/// 指南证据等级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EvidenceLevel {
    #[serde(rename = "ⅠA")]
    IA,
    #[serde(rename = "ⅠB")]
    IB,
    #[serde(rename = "ⅠC")]
    IC,
    #[serde(rename = "ⅡA")]
    IIA,
    #[serde(rename = "ⅡB")]
    IIB,
    #[serde(rename = "Ⅲ")]
    III,
}

impl EvidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceLevel::IA => "ⅠA",
            EvidenceLevel::IB => "ⅠB",
            EvidenceLevel::IC => "ⅠC",
            EvidenceLevel::IIA => "ⅡA",
            EvidenceLevel::IIB => "ⅡB",
            EvidenceLevel::III => "Ⅲ",
        }
    }

    /// 带推荐强度说明的展示文本
    pub fn describe(&self) -> &'static str {
        match self {
            EvidenceLevel::IA => "ⅠA级 (强推荐，高质量证据)",
            EvidenceLevel::IB => "ⅠB级 (强推荐，中等质量证据)",
            EvidenceLevel::IC => "ⅠC级 (强推荐，低质量证据)",
            EvidenceLevel::IIA => "ⅡA级 (中等推荐，高质量证据)",
            EvidenceLevel::IIB => "ⅡB级 (中等推荐，中等质量证据)",
            EvidenceLevel::III => "Ⅲ级 (弱推荐)",
        }
    }
}

impl std::fmt::Display for EvidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 计算 BMI，输入非法时返回 None
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if weight_kg <= 0.0 || height_cm <= 0.0 {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some((weight_kg / (height_m * height_m) * 10.0).round() / 10.0)
}

/// 拆分逗号分隔的自由文本列表（兼容中文逗号与顿号）
pub fn split_list(text: Option<&str>) -> Vec<String> {
    text.map(|t| {
        t.split(|c| c == ',' || c == '，' || c == '、')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_bp_bands() {
        assert_eq!(classify_bp(118.0, 76.0).grade, BpGrade::Normal);
        assert_eq!(classify_bp(135.0, 85.0).grade, BpGrade::HighNormal);
        assert_eq!(classify_bp(120.0, 70.0).grade, BpGrade::HighNormal);
        assert_eq!(classify_bp(150.0, 95.0).grade, BpGrade::Grade1);
        assert_eq!(classify_bp(130.0, 105.0).grade, BpGrade::Grade2);
        assert_eq!(classify_bp(185.0, 90.0).grade, BpGrade::Grade3);

        let class = classify_bp(165.0, 95.0);
        assert_eq!(class.level, 2.0);
        assert_eq!(class.name, "2级高血压");
    }

    #[test]
    fn test_classify_hba1c_bands() {
        assert_eq!(classify_hba1c(5.2), Hba1cBand::Normal);
        assert_eq!(classify_hba1c(6.0), Hba1cBand::Prediabetes);
        assert_eq!(classify_hba1c(6.8), Hba1cBand::WellControlled);
        assert_eq!(classify_hba1c(7.5), Hba1cBand::Fair);
        assert_eq!(classify_hba1c(8.0), Hba1cBand::Poor);
    }

    #[test]
    fn test_evidence_level_text() {
        assert_eq!(EvidenceLevel::IA.to_string(), "ⅠA");
        assert!(EvidenceLevel::IIB.describe().contains("中等推荐"));
        assert_eq!(serde_json::to_string(&EvidenceLevel::IB).unwrap(), "\"ⅠB\"");
    }

    #[test]
    fn test_calculate_bmi() {
        assert_eq!(calculate_bmi(70.0, 175.0), Some(22.9));
        assert_eq!(calculate_bmi(70.0, 0.0), None);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(Some("吸烟, 血脂异常，早发心血管病家族史、")), vec!["吸烟", "血脂异常", "早发心血管病家族史"]);
        assert!(split_list(Some(" , ")).is_empty());
        assert!(split_list(None).is_empty());
    }

    proptest! {
        #[test]
        fn property_classify_bp_monotonic_in_systolic(sbp in 60.0f64..260.0, dbp in 40.0f64..160.0, delta in 0.0f64..80.0) {
            prop_assert!(classify_bp(sbp + delta, dbp).grade >= classify_bp(sbp, dbp).grade);
        }

        #[test]
        fn property_classify_bp_monotonic_in_diastolic(sbp in 60.0f64..260.0, dbp in 40.0f64..160.0, delta in 0.0f64..60.0) {
            prop_assert!(classify_bp(sbp, dbp + delta).grade >= classify_bp(sbp, dbp).grade);
        }
    }
}
