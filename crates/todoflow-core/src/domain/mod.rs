//! Domain model (aggregate, value objects, events, outbox message, authorization).

pub mod authz;
pub mod errors;
pub mod events;
pub mod ids;
pub mod label;
pub mod outbox;
pub mod state;
pub mod title;
pub mod todo;

pub use self::authz::{ActorContext, Permission, PermissionDenied};
pub use self::errors::DomainError;
pub use self::events::TodoEvent;
pub use self::ids::{MessageId, TodoId};
pub use self::label::Label;
pub use self::outbox::{OutboxMessage, OutboxStatus};
pub use self::state::TodoStatus;
pub use self::title::TodoTitle;
pub use self::todo::{Todo, TodoRecord};
