//! Transactional - UnitOfWork を開いて use case を実行する終端 handler
//!
//! 呼び出しごとに新しい Tx を開き、その Tx に束縛した use case を組み立てます。
//! commit / rollback は use case が Err を返したかどうかだけで決まります。

use async_trait::async_trait;
use std::sync::Arc;

use crate::app::errors::CommandError;
use crate::app::pipeline::Handler;
use crate::domain::ActorContext;
use crate::ports::UnitOfWork;

pub struct Transactional<W, F> {
    uow: Arc<W>,
    make_use_case: F,
}

impl<W, F> Transactional<W, F> {
    /// `make_use_case` builds a fresh use case bound to one transaction context.
    pub fn new(uow: Arc<W>, make_use_case: F) -> Self {
        Self { uow, make_use_case }
    }
}

#[async_trait]
impl<I, O, W, F, U> Handler<I, O> for Transactional<W, F>
where
    I: Send + 'static,
    O: Send + 'static,
    W: UnitOfWork + 'static,
    F: Fn(W::Tx) -> U + Send + Sync,
    U: Handler<I, O>,
{
    async fn handle(&self, input: I, actor: &ActorContext) -> Result<O, CommandError> {
        self.uow
            .transaction(|tx| async move {
                let use_case = (self.make_use_case)(tx);
                use_case.handle(input, actor).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryKvStore, KvUnitOfWork};
    use crate::ports::{KeyScope, KeyValueStore, StorageError};

    /// Writes `key=value`, then fails when asked to.
    struct WriteThenMaybeFail {
        kv: Arc<dyn KeyValueStore>,
    }

    #[async_trait]
    impl Handler<(&'static str, bool), ()> for WriteThenMaybeFail {
        async fn handle(
            &self,
            input: (&'static str, bool),
            _actor: &ActorContext,
        ) -> Result<(), CommandError> {
            let (value, fail) = input;
            self.kv.set("todo:1", value.to_string())?;
            if fail {
                return Err(StorageError::Backend("simulated".into()).into());
            }
            Ok(())
        }
    }

    fn handler(
        store: &InMemoryKvStore,
    ) -> Transactional<
        KvUnitOfWork<Arc<dyn KeyValueStore>>,
        impl Fn(Arc<dyn KeyValueStore>) -> WriteThenMaybeFail + Send + Sync,
    > {
        let uow = KvUnitOfWork::new(
            Arc::new(store.clone()),
            vec![KeyScope::prefix("todo:")],
            |kv| kv,
        );
        Transactional::new(Arc::new(uow), |kv: Arc<dyn KeyValueStore>| {
            WriteThenMaybeFail { kv }
        })
    }

    #[tokio::test]
    async fn commit_on_success_rollback_on_error() {
        let store = InMemoryKvStore::new();
        let tx = handler(&store);
        let actor = ActorContext::guest();

        tx.handle(("first", false), &actor).await.unwrap();
        assert_eq!(store.get("todo:1").unwrap().as_deref(), Some("first"));

        let err = tx.handle(("second", true), &actor).await.unwrap_err();
        assert!(matches!(err, CommandError::Storage(_)));
        assert_eq!(store.get("todo:1").unwrap().as_deref(), Some("first"));
    }
}
