//! 仓储与工作单元配置
//!
use crate::error::DomainResult;
use bon::Builder;
use serde::{Deserialize, Serialize};

/// 仓库（Warehouse）工作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseMode {
    /// 读取走存储驱动并与暂存状态合并，写入暂存至提交时落库
    #[default]
    Deferred,
    /// 脱离存储驱动：读写只作用于内存暂存状态（调试/测试用）
    Detached,
}

#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    #[builder(default)]
    pub mode: WarehouseMode,
    /// 读取结果是否经过事件通知器的查询改写钩子
    #[builder(default = true)]
    pub announce_queries: bool,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            mode: WarehouseMode::Deferred,
            announce_queries: true,
        }
    }
}

impl WarehouseConfig {
    pub fn from_json(raw: &str) -> DomainResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn is_detached(&self) -> bool {
        self.mode == WarehouseMode::Detached
    }
}
