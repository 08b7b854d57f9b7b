//! 内置术语映射表（别名 -> 标准术语）
//!
//! 标准术语可以映射到自身。

pub const SEED_MAPPINGS: &[(&str, &str)] = &[
    // 心血管疾病
    ("心梗", "心肌梗死"),
    ("心肌梗塞", "心肌梗死"),
    ("MI", "心肌梗死"),
    ("AMI", "急性心肌梗死"),
    ("冠心病", "冠状动脉粥样硬化性心脏病"),
    ("冠状动脉硬化", "冠状动脉粥样硬化性心脏病"),
    ("CHD", "冠状动脉粥样硬化性心脏病"),
    ("中风", "脑卒中"),
    ("脑中风", "脑卒中"),
    ("脑梗", "脑梗死"),
    ("脑梗塞", "脑梗死"),
    ("脑溢血", "脑出血"),
    ("高血压", "高血压病"),
    ("血压高", "高血压病"),
    ("HTN", "高血压病"),
    ("房颤", "心房颤动"),
    ("心律不齐", "心律失常"),
    // 糖尿病相关
    ("糖尿病", "糖尿病"),
    ("DM", "糖尿病"),
    ("血糖高", "高血糖"),
    ("低血糖", "低血糖症"),
    ("1型糖尿病", "1型糖尿病"),
    ("T1DM", "1型糖尿病"),
    ("2型糖尿病", "2型糖尿病"),
    ("T2DM", "2型糖尿病"),
    ("糖化血红蛋白", "糖化血红蛋白"),
    ("HbA1c", "糖化血红蛋白"),
    ("糖化", "糖化血红蛋白"),
    // 药物类别
    ("ACEI", "血管紧张素转换酶抑制剂"),
    ("普利类", "血管紧张素转换酶抑制剂"),
    ("ARB", "血管紧张素II受体拮抗剂"),
    ("沙坦类", "血管紧张素II受体拮抗剂"),
    ("CCB", "钙通道阻滞剂"),
    ("地平类", "钙通道阻滞剂"),
    ("β受体阻滞剂", "β受体阻滞剂"),
    ("洛尔类", "β受体阻滞剂"),
    ("利尿剂", "利尿剂"),
    ("噻嗪类", "噻嗪类利尿剂"),
    // 具体药物
    ("氨氯地平", "苯磺酸氨氯地平"),
    ("络活喜", "苯磺酸氨氯地平"),
    ("缬沙坦", "缬沙坦"),
    ("代文", "缬沙坦"),
    ("氯沙坦", "氯沙坦钾"),
    ("科素亚", "氯沙坦钾"),
    ("二甲双胍", "盐酸二甲双胍"),
    ("格华止", "盐酸二甲双胍"),
    ("甲基多巴", "甲基多巴"),
    ("拉贝洛尔", "盐酸拉贝洛尔"),
    // 检查检验
    ("血压", "血压测量"),
    ("BP", "血压测量"),
    ("收缩压", "收缩压"),
    ("SBP", "收缩压"),
    ("舒张压", "舒张压"),
    ("DBP", "舒张压"),
    ("空腹血糖", "空腹血糖"),
    ("FPG", "空腹血糖"),
    ("FBG", "空腹血糖"),
    ("餐后血糖", "餐后2小时血糖"),
    ("餐后2h血糖", "餐后2小时血糖"),
    ("2hPG", "餐后2小时血糖"),
    // 症状
    ("头晕", "眩晕"),
    ("头痛", "头痛"),
    ("胸闷", "胸闷"),
    ("胸痛", "胸痛"),
    ("心慌", "心悸"),
    ("气短", "呼吸困难"),
    ("水肿", "水肿"),
    ("浮肿", "水肿"),
    // 并发症
    ("肾病", "肾脏病变"),
    ("肾功能不全", "慢性肾脏病"),
    ("CKD", "慢性肾脏病"),
    ("视网膜病变", "糖尿病视网膜病变"),
    ("DR", "糖尿病视网膜病变"),
    ("神经病变", "糖尿病周围神经病变"),
    ("DPN", "糖尿病周围神经病变"),
    ("糖足", "糖尿病足"),
    // 特殊人群
    ("孕妇", "妊娠期"),
    ("妊娠", "妊娠期"),
    ("老年人", "老年患者"),
    ("老人", "老年患者"),
];
