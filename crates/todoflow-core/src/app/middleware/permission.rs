//! PermissionMiddleware - 権限がなければドメインロジックに入る前に拒否

use async_trait::async_trait;

use crate::app::errors::CommandError;
use crate::app::pipeline::{Middleware, Next};
use crate::domain::authz::require_permission;
use crate::domain::{ActorContext, Permission};

pub struct PermissionMiddleware {
    required: Permission,
}

impl PermissionMiddleware {
    pub fn new(required: Permission) -> Self {
        Self { required }
    }
}

#[async_trait]
impl<I: Send + 'static, O: Send + 'static> Middleware<I, O> for PermissionMiddleware {
    async fn handle(
        &self,
        input: I,
        actor: &ActorContext,
        next: Next<'_, I, O>,
    ) -> Result<O, CommandError> {
        if let Err(denied) = require_permission(actor, self.required) {
            tracing::warn!(
                user_id = %actor.user_id,
                permission = %self.required,
                "permission denied"
            );
            return Err(denied.into());
        }
        next.run(input, actor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{Handler, Pipeline};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Handler<(), ()> for Counting {
        async fn handle(&self, _input: (), _actor: &ActorContext) -> Result<(), CommandError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn denies_before_reaching_the_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(Counting(calls.clone()))
            .with(PermissionMiddleware::new(Permission::TodoDelete));

        let err = pipeline
            .execute((), &ActorContext::new("u1", [Permission::TodoRead]))
            .await
            .unwrap_err();

        assert_eq!(err.code, "FORBIDDEN");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn allows_actor_with_permission() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new(Counting(calls.clone()))
            .with(PermissionMiddleware::new(Permission::TodoDelete));

        pipeline
            .execute((), &ActorContext::new("u1", [Permission::TodoDelete]))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
