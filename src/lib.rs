/// Alumni Gate - membership authorization core
///
/// Role and permission registry, request authorization gate, account
/// lifecycle with admin approval, and the audit trail of admin actions.

pub mod account;
pub mod admin;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod gate;
pub mod password;
pub mod rbac;
pub mod server;

pub use context::AppContext;
