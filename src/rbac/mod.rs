/// Role/permission registry
///
/// Roles are assigned to accounts; routes require permissions. The registry
/// is the only place that knows which role holds which permission.

pub mod permission;
mod registry;
mod role;

pub use permission::Permission;
pub use registry::{resource_permissions, PermissionRegistry};
pub use role::Role;
