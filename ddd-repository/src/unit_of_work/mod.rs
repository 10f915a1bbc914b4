//! 变更记录树与工作单元
//!
//! 仓储调用产生 `ActivationRecord`（级联写入以 `Package` 组织），
//! 由 `UnitOfWork` 按登记顺序累积，并在提交时深度优先逐条执行。
//!
mod record;
mod work;

pub use record::{ActivationRecord, ActivationRecordKind};
pub use work::{CommitSummary, RecordExecutor, RecordOutcome, UnitOfWork, UnitOfWorkState};
