//! Middleware - コマンドを包む横断的関心事
//!
//! 並び順は permission -> observability -> transactional（終端）です。

pub mod observability;
pub mod permission;
pub mod transactional;

pub use self::observability::ObservabilityMiddleware;
pub use self::permission::PermissionMiddleware;
pub use self::transactional::Transactional;
