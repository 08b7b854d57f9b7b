//! 数据库连接管理
//!
//! 维护一个按需建立的 MySQL 连接，每次取用前探活，断开则重连。
//! 故障模拟开启时所有取用立即失败；切换开关会丢弃已缓存的连接。

use std::str::FromStr;
use std::time::Duration;

use medassist_core::{ConnectionStatus, FailureSwitch, MedError, Result};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{ConnectOptions, Connection};
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{info, warn};

/// 模拟故障时返回的错误信息
pub const SIMULATED_FAILURE_MESSAGE: &str = "数据库连接失败（故障模拟已启用）";

/// 数据库连接配置
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub connect_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// 惰性建立、可重连的单连接
pub struct LazyConnection {
    config: DatabaseConfig,
    slot: Mutex<Option<MySqlConnection>>,
    failure: FailureSwitch,
}

impl LazyConnection {
    pub fn new(config: DatabaseConfig, failure: FailureSwitch) -> Self {
        Self {
            config,
            slot: Mutex::new(None),
            failure,
        }
    }

    pub fn failure_switch(&self) -> &FailureSwitch {
        &self.failure
    }

    /// 取得可用连接；故障模拟或连接失败时返回 `DataUnavailable`
    pub async fn acquire(&self) -> Result<MappedMutexGuard<'_, MySqlConnection>> {
        if self.failure.is_enabled() {
            return Err(MedError::DataUnavailable(SIMULATED_FAILURE_MESSAGE.to_string()));
        }

        let mut slot = self.slot.lock().await;

        if let Some(conn) = slot.as_mut() {
            if let Err(e) = conn.ping().await {
                warn!("Cached database connection is closed, reconnecting: {}", e);
                *slot = None;
            }
        }

        if slot.is_none() {
            *slot = Some(self.connect().await?);
        }

        MutexGuard::try_map(slot, |conn| conn.as_mut())
            .map_err(|_| MedError::Internal("数据库连接槽为空".to_string()))
    }

    async fn connect(&self) -> Result<MySqlConnection> {
        let options = MySqlConnectOptions::from_str(&self.config.url)
            .map_err(|e| MedError::Config(format!("数据库连接串无效: {}", e)))?;

        let conn = tokio::time::timeout(self.config.connect_timeout, options.connect())
            .await
            .map_err(|_| MedError::DataUnavailable("数据库连接超时".to_string()))?
            .map_err(|e| MedError::DataUnavailable(format!("数据库连接失败: {}", e)))?;

        info!("Database connection established");
        Ok(conn)
    }

    /// 关闭并丢弃缓存的连接
    pub async fn reset(&self) {
        if let Some(conn) = self.slot.lock().await.take() {
            if let Err(e) = conn.close().await {
                warn!("Failed to close database connection cleanly: {}", e);
            }
            info!("Database connection closed");
        }
    }

    /// 切换故障模拟开关，并丢弃缓存连接以免状态残留
    pub async fn set_failure_simulation(&self, enabled: bool) {
        let previous = self.failure.set(enabled);
        self.reset().await;
        info!(enabled, previous, "Database failure simulation toggled");
    }

    /// 查询失败后判断是否需要丢弃连接
    pub async fn handle_error(&self, error: sqlx::Error) -> MedError {
        let broken = matches!(
            error,
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed
        );

        if broken {
            self.reset().await;
            MedError::DataUnavailable(format!("数据库连接中断: {}", error))
        } else {
            MedError::Database(error.to_string())
        }
    }

    pub async fn check(&self) -> ConnectionStatus {
        if self.failure.is_enabled() {
            return ConnectionStatus {
                connected: false,
                message: SIMULATED_FAILURE_MESSAGE.to_string(),
                simulated_failure: true,
            };
        }

        match self.acquire().await {
            Ok(_) => ConnectionStatus {
                connected: true,
                message: "数据库连接正常".to_string(),
                simulated_failure: false,
            },
            Err(e) => ConnectionStatus {
                connected: false,
                message: e.to_string(),
                simulated_failure: false,
            },
        }
    }
}
