//! 仓储层统一错误定义
//!
//! 聚焦暂存校验、存储驱动、提交流程与值转换等最小必要集合，
//! 便于存储驱动与上层应用统一转换为 `DomainError`。
//!
use crate::entity::Identity;
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化/配置 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },

    // --- 暂存校验 ---
    #[error("stale entity: {identity} has been removed in this unit of work")]
    StaleEntity { identity: Identity },
    #[error("validation: {reason}")]
    Validation { reason: String },

    // --- 存储驱动 ---
    #[error("storage error: operation={operation}, target={target}, reason={reason}")]
    Storage {
        operation: &'static str,
        target: String,
        reason: String,
    },

    // --- 事件通知 ---
    #[error("announce error: {reason}")]
    Announce { reason: String },

    // --- 工作单元 ---
    #[error("commit failed at record #{position} ({record}): {source}")]
    CommitFailed {
        position: usize,
        record: String,
        #[source]
        source: Box<DomainError>,
    },
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    // --- 值与字段 ---
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
    #[error("unknown field: entity={entity_type}, field={field}")]
    UnknownField {
        entity_type: &'static str,
        field: String,
    },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },
}

impl DomainError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    pub fn storage(
        operation: &'static str,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Storage {
            operation,
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn announce(reason: impl Into<String>) -> Self {
        Self::Announce {
            reason: reason.into(),
        }
    }

    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
