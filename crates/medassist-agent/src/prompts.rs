//! 提示词模板与固定回复文本

/// 临床问答系统提示词
pub const MEDICAL_SYSTEM_PROMPT: &str = "你是一个专业的医疗知识助手，专注于高血压和糖尿病的诊疗决策支持。

你的职责包括：
1. 根据患者信息生成患者画像
2. 进行高血压和糖尿病的风险分层评估
3. 检测药物冲突和禁忌
4. 生成个性化的诊疗方案
5. 进行结构化问诊（SOAP格式）

重要原则：
- 所有建议必须基于医学指南和证据
- 标注证据等级（如ⅠA、ⅠB、ⅡA等）
- 对高风险情况（如孕妇、急症）必须给出预警
- 如无相关知识，明确说明而非猜测

回复格式要求：
- 使用结构化格式
- 标注数据来源（PDF页码、数据库表名等）
- 对重要信息加粗或突出显示
";

/// 结构化问诊系统提示词
pub const SOAP_SYSTEM_PROMPT: &str =
    "你是一位专业的内科医生，擅长高血压和糖尿病的诊疗。请使用专业但易懂的语言与患者交流。";

/// 急症处理方案的指南来源
pub const EMERGENCY_GUIDELINE_NAME: &str = "中国高血压防治指南2023";

/// 高血压急症处理方案
pub const EMERGENCY_PROTOCOL: &str = "## 🚨 高血压急症处理指南

### 识别标准
- 收缩压 > 180 mmHg 和/或 舒张压 > 120 mmHg
- 伴有靶器官急性损害表现

### 紧急处理步骤

1. **立即评估**
   - 确认血压读数
   - 评估靶器官损害（头痛、视力改变、胸痛、呼吸困难）
   - 完善必要检查（心电图、肾功能、CT/MRI）

2. **降压治疗** (证据等级 ⅠA)
   - 启动静脉降压治疗
   - 首选药物：乌拉地尔、硝普钠、尼卡地平
   - 目标：1小时内降低不超过25%

3. **转诊建议**
   - 建议紧急转诊至急诊科/ICU
   - 持续心电监护
   - 专科会诊

### 特殊情况处理

- **高血压脑病**：降压同时预防脑水肿
- **主动脉夹层**：快速降压，目标SBP 100-120 mmHg
- **急性冠脉综合征**：联合抗缺血治疗

---
*来源: 中国高血压防治指南2023 (证据等级ⅠA)*
";

/// 未提供患者ID时的提示
pub const MISSING_PATIENT_ID: &str = "请提供患者ID以查询患者信息。例如：查询患者ID=1002_0_20210504的信息";

pub const NO_GUIDELINE_FOUND: &str = "未找到符合条件的指南推荐。";

pub fn patient_not_found(patient_id: &str) -> String {
    format!("未找到患者ID为 {} 的信息，请确认患者ID是否正确。", patient_id)
}

/// RAG 问答提示词
pub fn rag_prompt(context: &str, patient_info: Option<&str>, query: &str) -> String {
    let patient_block = patient_info
        .map(|info| format!("\n\n【患者信息】\n{}", info))
        .unwrap_or_default();

    format!(
        "基于以下参考资料回答问题。请务必：
1. 仅基于提供的参考资料回答，不要编造信息
2. 如果资料不足以完整回答，请说明
3. 标注证据等级和来源
4. 对高风险情况给出预警

【参考资料】
{}{}

【问题】
{}

【回答】",
        context, patient_block, query
    )
}

/// 鉴别诊断提示词
pub fn diagnosis_prompt(message: &str, reference: &str) -> String {
    format!(
        "基于患者信息和医学知识，进行鉴别诊断分析。

要求：
1. 列出至少3个可能的诊断，按概率排序
2. 说明诊断依据和推理过程
3. 标注证据等级
4. 提出需要进一步检查的项目

患者信息/症状描述：{}

【参考资料】
{}

请给出结构化的鉴别诊断分析：",
        message, reference
    )
}

/// 治疗方案提示词
pub fn treatment_prompt(message: &str, reference: Option<&str>) -> String {
    let reference_block = reference
        .map(|text| format!("\n\n【参考资料】\n{}", text))
        .unwrap_or_default();

    format!(
        "基于医学指南和患者情况，生成个性化治疗方案。

要求：
1. 给出具体的药物选择和剂量
2. 说明选择依据
3. 标注证据等级（如ⅠA、ⅠB、ⅡA等）
4. 列出需要注意的禁忌和不良反应
5. 给出随访监测建议

查询：{}{}

请生成结构化的治疗方案：",
        message, reference_block
    )
}

/// SOAP 问诊提示词
pub fn soap_prompt(message: &str) -> String {
    format!(
        "你是一位经验丰富的内科医生，正在对患者进行问诊。患者主诉：\"{}\"

请按照 SOAP 格式进行结构化问诊：

**S (Subjective 主观资料)**
请询问患者以下信息（列出需要追问的问题）：
- 症状的具体表现
- 起病时间和持续时间
- 诱发和缓解因素
- 伴随症状
- 既往病史

**O (Objective 客观资料)**
建议检查的项目：
- 体格检查
- 实验室检查
- 影像学检查

**A (Assessment 评估)**
根据现有信息的初步判断和鉴别诊断思路

**P (Plan 计划)**
下一步诊疗计划

请以问诊对话的形式，首先向患者追问关键信息：",
        message
    )
}

/// 数据库不可用时的降级说明
pub fn degraded_mode_message(patient_id: &str, error: &str) -> String {
    format!(
        "## ⚠️ 数据库服务暂时不可用

**错误信息**: {}

### 📋 系统状态
- **患者ID**: {}
- **数据库状态**: 🔴 不可用
- **降级模式**: 已启用

### 💡 当前可用功能

虽然无法访问患者数据库，但您仍可以使用以下功能：

1. **📚 医学知识查询**
   - 查询高血压/糖尿病诊疗指南
   - 获取药物使用建议
   - 了解疾病症状和诊断标准

2. **📖 指南与术语**
   - 按疾病或更新日期查询指南推荐
   - 医学术语标准化与药物禁忌参考

3. **🤖 智能问答**
   - 进行 SOAP 格式问诊
   - 获取一般医学建议

### 🔧 建议操作

- 请稍后重试查询患者信息
- 如问题持续，请联系系统管理员
- 可以先使用知识库查询功能

---
*提示：输入 \"高血压治疗指南\" 或 \"糖尿病用药建议\" 等问题，我可以为您提供相关医学知识。*
",
        error, patient_id
    )
}
