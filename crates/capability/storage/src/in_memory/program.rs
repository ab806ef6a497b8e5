//! 电压方案目录内存实现。

use crate::error::StorageError;
use crate::traits::ProgramCatalog;
use domain::VoltageProgram;
use std::collections::HashMap;
use std::sync::RwLock;

pub struct InMemoryProgramCatalog {
    programs: RwLock<HashMap<i64, VoltageProgram>>,
}

impl InMemoryProgramCatalog {
    pub fn new() -> Self {
        Self {
            programs: RwLock::new(HashMap::new()),
        }
    }

    /// 以给定方案初始化目录
    pub fn with_programs(programs: Vec<VoltageProgram>) -> Self {
        let map = programs
            .into_iter()
            .map(|program| (program.program_id, program))
            .collect();
        Self {
            programs: RwLock::new(map),
        }
    }

    /// 新增或替换方案
    pub fn insert(&self, program: VoltageProgram) -> Result<(), StorageError> {
        let mut programs = self
            .programs
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        programs.insert(program.program_id, program);
        Ok(())
    }

    /// 删除方案
    pub fn remove(&self, program_id: i64) -> Result<bool, StorageError> {
        let mut programs = self
            .programs
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(programs.remove(&program_id).is_some())
    }
}

impl Default for InMemoryProgramCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProgramCatalog for InMemoryProgramCatalog {
    async fn find_program(&self, program_id: i64) -> Result<Option<VoltageProgram>, StorageError> {
        let programs = self
            .programs
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(programs.get(&program_id).cloned())
    }
}
