//! 药物相互作用表

use serde::{Deserialize, Serialize};

use medassist_core::models::Medication;
use medassist_terms::DrugClass;

use crate::safety::Severity;

/// ACEI 类常用通用名
pub const ACEI_GENERIC_NAMES: [&str; 5] = ["依那普利", "贝那普利", "雷米普利", "培哚普利", "卡托普利"];

/// ARB 类常用通用名
pub const ARB_GENERIC_NAMES: [&str; 5] = ["缬沙坦", "氯沙坦", "厄贝沙坦", "坎地沙坦", "替米沙坦"];

/// 参与相互作用判断的药物标识
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DrugToken {
    Acei,
    Arb,
    PotassiumSparingDiuretic, // 保钾利尿剂
    BetaBlocker,              // β受体阻滞剂
    Verapamil,                // 维拉帕米
    Metformin,                // 二甲双胍
    ContrastMedium,           // 造影剂
}

impl DrugToken {
    pub fn label(&self) -> &'static str {
        match self {
            DrugToken::Acei => "ACEI",
            DrugToken::Arb => "ARB",
            DrugToken::PotassiumSparingDiuretic => "保钾利尿剂",
            DrugToken::BetaBlocker => "β受体阻滞剂",
            DrugToken::Verapamil => "维拉帕米",
            DrugToken::Metformin => "二甲双胍",
            DrugToken::ContrastMedium => "造影剂",
        }
    }

    /// 类别标签的标准术语写法
    fn canonical_class(&self) -> Option<&'static str> {
        match self {
            DrugToken::Acei => Some(DrugClass::Acei.canonical_name()),
            DrugToken::Arb => Some(DrugClass::Arb.canonical_name()),
            DrugToken::BetaBlocker => Some(DrugClass::BetaBlocker.canonical_name()),
            _ => None,
        }
    }

    fn generic_names(&self) -> &'static [&'static str] {
        match self {
            DrugToken::Acei => &ACEI_GENERIC_NAMES,
            DrugToken::Arb => &ARB_GENERIC_NAMES,
            _ => &[],
        }
    }

    /// 按类别标签或药名判断用药是否属于该标识
    pub fn matches(&self, medication: &Medication) -> bool {
        let tagged = medication.drug_class.as_deref().map(str::trim).is_some_and(|class| {
            class == self.label() || Some(class) == self.canonical_class()
        });

        tagged
            || medication.drug_name.contains(self.label())
            || self.generic_names().iter().any(|name| medication.drug_name.contains(name))
    }

    pub fn present_in(&self, medications: &[Medication]) -> bool {
        medications.iter().any(|med| self.matches(med))
    }
}

/// 已知的相互作用组合
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum InteractionPair {
    DualRasBlockade,      // ACEI + ARB
    AceiPotassiumSparing, // ACEI + 保钾利尿剂
    BetaBlockerVerapamil, // β受体阻滞剂 + 维拉帕米
    MetforminContrast,    // 二甲双胍 + 造影剂
}

impl InteractionPair {
    pub const ALL: [InteractionPair; 4] = [
        InteractionPair::DualRasBlockade,
        InteractionPair::AceiPotassiumSparing,
        InteractionPair::BetaBlockerVerapamil,
        InteractionPair::MetforminContrast,
    ];

    pub fn tokens(&self) -> [DrugToken; 2] {
        match self {
            InteractionPair::DualRasBlockade => [DrugToken::Acei, DrugToken::Arb],
            InteractionPair::AceiPotassiumSparing => [DrugToken::Acei, DrugToken::PotassiumSparingDiuretic],
            InteractionPair::BetaBlockerVerapamil => [DrugToken::BetaBlocker, DrugToken::Verapamil],
            InteractionPair::MetforminContrast => [DrugToken::Metformin, DrugToken::ContrastMedium],
        }
    }

    pub fn risk(&self) -> &'static str {
        match self {
            InteractionPair::DualRasBlockade => "双重RAS阻断增加高钾血症和肾功能损害风险",
            InteractionPair::AceiPotassiumSparing => "增加高钾血症风险",
            InteractionPair::BetaBlockerVerapamil => "可能导致严重心动过缓或传导阻滞",
            InteractionPair::MetforminContrast => "增加乳酸酸中毒风险，造影前后需停药",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            InteractionPair::BetaBlockerVerapamil => Severity::Critical,
            _ => Severity::Warning,
        }
    }

    /// 两种药物均出现在用药列表中
    pub fn matched_by(&self, medications: &[Medication]) -> bool {
        self.tokens().iter().all(|token| token.present_in(medications))
    }

    pub fn display(&self) -> String {
        let [a, b] = self.tokens();
        format!("{} + {}", a.label(), b.label())
    }
}
