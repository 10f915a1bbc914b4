//! 仓储事件通知（eventing）
//!
//! - `EventAnnouncer`：写操作通知与查询结果改写钩子；
//! - `NoopAnnouncer`：默认实现；
//! - `QueryRewriteAnnouncer`：查询结果改写装饰器；
//! - `BroadcastAnnouncer`：基于 tokio 广播的内存实现（需开启 `eventing` 特性）。
//!
mod announcer;
#[cfg(feature = "eventing")]
mod broadcast;
mod event;
mod rewrite;

pub use announcer::{EventAnnouncer, NoopAnnouncer};
#[cfg(feature = "eventing")]
pub use broadcast::BroadcastAnnouncer;
pub use event::{RepositoryEvent, RepositoryEventKind};
pub use rewrite::QueryRewriteAnnouncer;
