//! MedAssist 命令行入口

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use medassist_admin::{init_logging, log_operation, AppConfig, OperationRecord, OperationStatus};
use medassist_agent::MedicalAgent;
use medassist_core::{DocumentIndex, FailureSwitch, PatientStore, SearchFilters};
use medassist_database::{InMemoryPatientStore, MySqlPatientStore, StoreFixtures};
use medassist_integration::{OpenAiCompatClient, StaticDocumentIndex};
use medassist_terms::TermMapper;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "medassist")]
#[command(about = "高血压/糖尿病诊疗决策支持助手")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 内存存储夹具文件，覆盖配置
    #[arg(long, global = true)]
    fixtures: Option<PathBuf>,

    /// 启动时即模拟数据库故障
    #[arg(long, global = true)]
    simulate_db_failure: bool,

    /// 日志级别，覆盖配置
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// 以 JSON 输出完整响应
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 对话问答
    Chat {
        message: String,
        #[arg(short, long)]
        patient_id: Option<String>,
        /// 回答片段到达即输出
        #[arg(long)]
        stream: bool,
    },
    /// 患者画像报告
    Patient { patient_id: String },
    /// 综合风险评估
    Risk { patient_id: String },
    /// 跨源检索
    Search {
        query: String,
        /// 仅补充该日期之后更新的指南 (YYYY-MM-DD)
        #[arg(long)]
        after: Option<NaiveDate>,
    },
    /// 指南推荐列表
    Guidelines {
        #[arg(long)]
        disease: Option<String>,
        #[arg(long)]
        after: Option<NaiveDate>,
    },
    /// 术语标准化
    Normalize { term: String },
    /// 查看或添加术语映射
    Terms {
        /// 添加映射：别名 标准术语
        #[arg(long, num_args = 2, value_names = ["ALIAS", "STANDARD"])]
        add: Option<Vec<String>>,
    },
    /// 药物禁忌参考
    Contraindications { drug: String },
    /// 知识库索引状态
    IndexStatus,
    /// 重建知识库索引
    IndexRebuild,
    /// 数据库连接状态
    DbStatus,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Chat { .. } => "chat",
            Command::Patient { .. } => "patient_profile",
            Command::Risk { .. } => "risk_assessment",
            Command::Search { .. } => "search",
            Command::Guidelines { .. } => "guidelines",
            Command::Normalize { .. } => "normalize",
            Command::Terms { .. } => "terms",
            Command::Contraindications { .. } => "contraindications",
            Command::IndexStatus => "index_status",
            Command::IndexRebuild => "index_rebuild",
            Command::DbStatus => "db_status",
        }
    }

    fn is_streaming(&self) -> bool {
        matches!(self, Command::Chat { stream: true, .. })
    }

    fn patient_id(&self) -> Option<&str> {
        match self {
            Command::Chat { patient_id, .. } => patient_id.as_deref(),
            Command::Patient { patient_id } | Command::Risk { patient_id } => Some(patient_id),
            _ => None,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

fn build_store(config: &AppConfig, fixtures: Option<PathBuf>, failure: FailureSwitch) -> Result<Arc<dyn PatientStore>> {
    if let Some(database) = config.database_config() {
        info!("Using MySQL patient store");
        return Ok(Arc::new(MySqlPatientStore::new(database, failure)));
    }

    match fixtures.or_else(|| config.fixtures.path.clone()) {
        Some(path) => {
            let store = InMemoryPatientStore::from_json_file(&path, failure)
                .with_context(|| format!("Failed to load fixtures from {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("No database or fixtures configured, patient store is empty");
            Ok(Arc::new(InMemoryPatientStore::new(StoreFixtures::default(), failure)))
        }
    }
}

async fn build_agent(config: &AppConfig, args: &Args) -> Result<MedicalAgent> {
    let failure = FailureSwitch::new(args.simulate_db_failure);
    let store = build_store(config, args.fixtures.clone(), failure)?;

    let index = Arc::new(StaticDocumentIndex::new(
        config.index.chunks_file.clone(),
        config.index.persist_path.clone(),
    ));
    if !index.load().await {
        warn!("Knowledge index not loaded, vector search will return no hits");
    }

    let llm = OpenAiCompatClient::new(config.llm_config()).context("Failed to create LLM client")?;
    info!(model = %llm.model(), "LLM client ready");

    Ok(MedicalAgent::new(
        Arc::new(TermMapper::new()),
        store,
        index as Arc<dyn DocumentIndex>,
        Arc::new(llm),
        config.retrieval.clone(),
        config.agent.clone(),
    ))
}

/// 执行子命令，返回操作状态
async fn run(agent: &MedicalAgent, command: &Command, as_json: bool) -> Result<OperationStatus> {
    let status = match command {
        Command::Chat { message, patient_id, stream } => {
            let response = if *stream {
                let mut stdout = io::stdout();
                let response = agent
                    .chat_stream(message, patient_id.as_deref(), |fragment| {
                        if let Err(e) = stdout.write_all(fragment.as_bytes()).and_then(|_| stdout.flush()) {
                            warn!("Failed to write stream fragment: {}", e);
                        }
                    })
                    .await;
                writeln!(stdout).context("Failed to write output")?;
                if let Some(e) = &response.error {
                    error!("Streaming chat failed: {}", e);
                }
                response
            } else {
                agent.chat(message, patient_id.as_deref()).await
            };
            if as_json {
                print_json(&response)?;
            } else if !*stream {
                println!("{}", response.answer);
            }
            match (response.success, response.degraded_mode) {
                (false, _) => OperationStatus::Failure,
                (true, true) => OperationStatus::Warning,
                (true, false) => OperationStatus::Success,
            }
        }
        Command::Patient { patient_id } => {
            let response = agent.patient_profile(patient_id).await;
            if as_json {
                print_json(&response)?;
            } else {
                println!("{}", response.answer);
            }
            if response.db_unavailable {
                OperationStatus::Warning
            } else if response.success {
                OperationStatus::Success
            } else {
                OperationStatus::Failure
            }
        }
        Command::Risk { patient_id } => {
            let response = agent.risk_assessment(patient_id).await;
            print_json(&response)?;
            if !response.success {
                OperationStatus::Failure
            } else if response.db_unavailable || !response.warnings.is_empty() {
                OperationStatus::Warning
            } else {
                OperationStatus::Success
            }
        }
        Command::Search { query, after } => {
            let filters = SearchFilters { update_date_after: *after };
            print_json(&agent.search(query, &filters).await)?;
            OperationStatus::Success
        }
        Command::Guidelines { disease, after } => {
            let listing = agent.guidelines(disease.as_deref(), *after).await;
            print_json(&listing)?;
            if listing.success {
                OperationStatus::Success
            } else {
                OperationStatus::Failure
            }
        }
        Command::Normalize { term } => {
            print_json(&agent.normalize_term(term))?;
            OperationStatus::Success
        }
        Command::Terms { add } => {
            if let Some([alias, standard]) = add.as_deref() {
                if !agent.add_term_mapping(alias, standard) {
                    anyhow::bail!("Failed to add term mapping {} -> {}", alias, standard);
                }
            }
            print_json(&agent.term_mapping_table())?;
            OperationStatus::Success
        }
        Command::Contraindications { drug } => match agent.contraindications(drug) {
            Some(info) => {
                print_json(&info)?;
                OperationStatus::Success
            }
            None => {
                print_json(&json!({ "success": false, "error": format!("未找到药物禁忌信息: {}", drug) }))?;
                OperationStatus::Warning
            }
        },
        Command::IndexStatus => {
            print_json(&agent.index_status().await)?;
            OperationStatus::Success
        }
        Command::IndexRebuild => {
            let outcome = agent.rebuild_index().await;
            print_json(&outcome)?;
            if outcome.success {
                OperationStatus::Success
            } else {
                OperationStatus::Failure
            }
        }
        Command::DbStatus => {
            let status = agent.database_status().await;
            print_json(&status)?;
            if status.connected {
                OperationStatus::Success
            } else {
                OperationStatus::Warning
            }
        }
    };

    Ok(status)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load_validated(args.config.as_deref())?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    init_logging(&config.logging);

    info!("Starting MedAssist...");
    let agent = build_agent(&config, &args).await?;

    let started = Instant::now();
    let result = run(&agent, &args.command, args.json).await;

    let status = match &result {
        Ok(status) => *status,
        Err(e) => {
            error!("Command failed: {:#}", e);
            OperationStatus::Failure
        }
    };
    let details = json!({ "json_output": args.json, "streaming": args.command.is_streaming() });
    let record = OperationRecord::new(args.command.name(), details)
        .with_patient(args.command.patient_id())
        .with_status(status)
        .finished(started);
    log_operation(&record);

    result.map(|_| ())
}
