/// Admin operations
///
/// Account lifecycle transitions performed by admins, and the audit trail
/// that records them.

pub mod audit;
pub mod lifecycle;

pub use audit::{
    Actor, AuditAction, AuditLogEntry, AuditQuery, AuditRecorder, AuditSummary, NewAuditEntry,
    RequestMeta,
};
pub use lifecycle::{AccountLifecycle, BatchFailure, BatchOutcome};
