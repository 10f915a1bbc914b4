use crate::entity::Identity;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryEventKind {
    Saved,
    Removed,
    RemovedByCondition,
    Modified,
}

/// 仓储写操作事件
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryEvent {
    #[builder(into)]
    entity_type: String,
    kind: RepositoryEventKind,
    #[builder(default)]
    identities: Vec<Identity>,
    /// 按条件操作时的条件/修改描述
    #[builder(into)]
    detail: Option<String>,
    #[builder(default = Utc::now())]
    occurred_at: DateTime<Utc>,
}

impl RepositoryEvent {
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn kind(&self) -> RepositoryEventKind {
        self.kind
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn occurred_at(&self) -> &DateTime<Utc> {
        &self.occurred_at
    }
}
