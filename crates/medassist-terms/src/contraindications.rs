//! 常用降压药物类别禁忌参考表

use serde::Serialize;

use crate::mapper::TermMapper;

/// 有禁忌参考信息的药物类别
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum DrugClass {
    Acei,        // 血管紧张素转换酶抑制剂
    Arb,         // 血管紧张素II受体拮抗剂
    Ccb,         // 钙通道阻滞剂
    BetaBlocker, // β受体阻滞剂
    Thiazide,    // 噻嗪类利尿剂
}

impl DrugClass {
    pub const ALL: [DrugClass; 5] = [
        DrugClass::Acei,
        DrugClass::Arb,
        DrugClass::Ccb,
        DrugClass::BetaBlocker,
        DrugClass::Thiazide,
    ];

    /// 对应的标准术语
    pub fn canonical_name(&self) -> &'static str {
        match self {
            DrugClass::Acei => "血管紧张素转换酶抑制剂",
            DrugClass::Arb => "血管紧张素II受体拮抗剂",
            DrugClass::Ccb => "钙通道阻滞剂",
            DrugClass::BetaBlocker => "β受体阻滞剂",
            DrugClass::Thiazide => "噻嗪类利尿剂",
        }
    }

    pub fn from_canonical(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.canonical_name() == name)
    }

    pub fn contraindications(&self) -> DrugContraindications {
        let (absolute, relative, cautions): (&[&str], &[&str], &[&str]) = match self {
            DrugClass::Acei => (
                &["妊娠期", "哺乳期", "双侧肾动脉狭窄", "高钾血症"],
                &["单侧肾动脉狭窄", "严重肾功能不全"],
                &["干咳", "血管性水肿风险"],
            ),
            DrugClass::Arb => (
                &["妊娠期", "哺乳期", "双侧肾动脉狭窄"],
                &["严重肾功能不全"],
                &["高钾血症风险"],
            ),
            DrugClass::Ccb => (
                &["严重主动脉瓣狭窄", "心源性休克"],
                &["严重心动过缓", "心力衰竭"],
                &["下肢水肿", "头痛", "面部潮红"],
            ),
            DrugClass::BetaBlocker => (
                &["严重心动过缓", "二度以上房室传导阻滞", "支气管哮喘"],
                &["COPD", "周围血管病"],
                &["糖尿病患者可能掩盖低血糖症状"],
            ),
            DrugClass::Thiazide => (
                &["痛风", "低钾血症", "低钠血症"],
                &["糖尿病", "高尿酸血症"],
                &["电解质紊乱", "血糖升高"],
            ),
        };

        DrugContraindications {
            drug_class: *self,
            standard_name: self.canonical_name(),
            absolute: absolute.to_vec(),
            relative: relative.to_vec(),
            cautions: cautions.to_vec(),
        }
    }
}

/// 药物禁忌信息
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DrugContraindications {
    pub drug_class: DrugClass,
    pub standard_name: &'static str,
    pub absolute: Vec<&'static str>, // 禁忌人群
    pub relative: Vec<&'static str>, // 相对禁忌
    pub cautions: Vec<&'static str>, // 注意事项
}

impl DrugContraindications {
    /// 是否对某一人群或状况禁用（含相对禁忌）
    pub fn applies_to(&self, condition: &str) -> bool {
        self.absolute.iter().chain(&self.relative).any(|c| *c == condition)
    }
}

/// 先标准化药物术语，再查找禁忌信息
pub fn contraindications_for(mapper: &TermMapper, drug: &str) -> Option<DrugContraindications> {
    let (standard, _) = mapper.normalize(drug);
    DrugClass::from_canonical(&standard).map(|class| class.contraindications())
}
