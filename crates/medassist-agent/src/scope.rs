//! 知识范围判定
//!
//! 意图识别与 RAG 问答共用同一张关键词表，判定均不区分大小写。

/// 系统支持的主题关键词
pub const SUPPORTED_KEYWORDS: [&str; 21] = [
    "高血压", "糖尿病", "血压", "血糖", "HbA1c", "糖化血红蛋白",
    "降压", "降糖", "ACEI", "ARB", "CCB", "利尿剂",
    "心肌梗死", "冠心病", "脑卒中", "肾病", "视网膜病变",
    "胰岛素", "二甲双胍", "氨氯地平", "缬沙坦",
];

/// 超出知识范围的专科关键词
pub const OUT_OF_SCOPE_KEYWORDS: [&str; 24] = [
    "骨折", "骨科", "眼科", "皮肤", "癌症", "肿瘤", "手术", "外科",
    "妇科", "产科", "儿科", "耳鼻喉", "口腔", "精神", "心理", "感冒",
    "肝病", "肺病", "胃病", "肠病", "甲状腺", "风湿", "免疫", "中医",
];

fn first_match<'a>(query: &str, keywords: &[&'a str]) -> Option<&'a str> {
    let query = query.to_lowercase();
    keywords
        .iter()
        .copied()
        .find(|keyword| query.contains(&keyword.to_lowercase()))
}

/// 命中的第一个超范围关键词
pub fn out_of_scope_keyword(query: &str) -> Option<&'static str> {
    first_match(query, &OUT_OF_SCOPE_KEYWORDS)
}

pub fn mentions_supported_topic(query: &str) -> bool {
    first_match(query, &SUPPORTED_KEYWORDS).is_some()
}

/// 含超范围关键词且不含任何支持关键词时判定为超出范围
pub fn is_out_of_scope(query: &str) -> bool {
    out_of_scope_keyword(query).is_some() && !mentions_supported_topic(query)
}

/// 无相关知识时的回复
pub fn no_knowledge_response(query: &str) -> String {
    if let Some(keyword) = out_of_scope_keyword(query) {
        return format!(
            "抱歉，本系统是高血压和糖尿病诊疗决策支持助手，暂不支持\"{}\"相关问题的查询。\n\n\
             本系统支持的功能包括：\n\
             1. 高血压诊疗相关问题\n\
             2. 糖尿病诊疗相关问题\n\
             3. 患者画像与风险评估\n\
             4. 用药方案与禁忌查询\n\
             5. 指南推荐与循证医学支持\n\n\
             如需其他疾病的诊疗信息，请咨询相关专科医生。",
            keyword
        );
    }

    format!(
        "抱歉，在当前知识库中未找到与\"{}\"相关的信息。\n\n\
         可能的原因：\n\
         1. 查询的内容不在本系统覆盖范围内\n\
         2. 请尝试使用更具体或标准的医学术语\n\n\
         本系统主要支持高血压和糖尿病相关的诊疗决策支持。如有其他问题，请咨询专业医生。",
        query
    )
}
