//! Postgres 电压方案目录实现
//!
//! `config` 列以 JSON 文本存储，读取时解析为 `serde_json::Value`。

use crate::error::StorageError;
use crate::traits::ProgramCatalog;
use domain::VoltageProgram;
use sqlx::{PgPool, Row};

pub struct PgProgramCatalog {
    pub pool: PgPool,
}

impl PgProgramCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProgramCatalog for PgProgramCatalog {
    async fn find_program(&self, program_id: i64) -> Result<Option<VoltageProgram>, StorageError> {
        let row = sqlx::query(
            "select program_id, name, config from voltage_programs where program_id = $1",
        )
        .bind(program_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let config: String = row.try_get("config")?;
        let config = serde_json::from_str(&config).map_err(|err| {
            StorageError::new(format!("program {} config invalid: {}", program_id, err))
        })?;
        Ok(Some(VoltageProgram {
            program_id: row.try_get("program_id")?,
            name: row.try_get("name")?,
            config,
        }))
    }
}
