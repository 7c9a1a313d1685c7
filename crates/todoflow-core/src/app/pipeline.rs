//! Pipeline - middleware の連鎖と終端 handler
//!
//! # 構成
//! ```text
//! caller -> [permission] -> [observability] -> Transactional -> use case
//! ```
//! 各層は同じ `(input, actor, next) -> Result<O, CommandError>` の形をしています。
//! 継承ではなく、`Vec<Arc<dyn Middleware>>` を先頭から順に辿る chain-of-responsibility です。

use async_trait::async_trait;
use std::sync::Arc;

use super::errors::{AppError, CommandError, map_error};
use crate::domain::ActorContext;

/// Terminal step of a pipeline (a use case, or `Transactional` wrapping one).
#[async_trait]
pub trait Handler<I: Send + 'static, O: Send + 'static>: Send + Sync {
    async fn handle(&self, input: I, actor: &ActorContext) -> Result<O, CommandError>;
}

/// Cross-cutting step. Call `next.run(..)` to continue, or return early.
#[async_trait]
pub trait Middleware<I: Send + 'static, O: Send + 'static>: Send + Sync {
    async fn handle(
        &self,
        input: I,
        actor: &ActorContext,
        next: Next<'_, I, O>,
    ) -> Result<O, CommandError>;
}

/// The rest of the chain after the current middleware.
pub struct Next<'a, I: Send + 'static, O: Send + 'static> {
    middleware: &'a [Arc<dyn Middleware<I, O>>],
    handler: &'a dyn Handler<I, O>,
}

impl<'a, I: Send + 'static, O: Send + 'static> Next<'a, I, O> {
    pub async fn run(self, input: I, actor: &ActorContext) -> Result<O, CommandError> {
        match self.middleware.split_first() {
            Some((current, rest)) => {
                let next = Next {
                    middleware: rest,
                    handler: self.handler,
                };
                current.handle(input, actor, next).await
            }
            None => self.handler.handle(input, actor).await,
        }
    }
}

/// One command: ordered middleware around a handler.
pub struct Pipeline<I: Send + 'static, O: Send + 'static> {
    middleware: Vec<Arc<dyn Middleware<I, O>>>,
    handler: Arc<dyn Handler<I, O>>,
}

impl<I: Send + 'static, O: Send + 'static> Pipeline<I, O> {
    pub fn new(handler: impl Handler<I, O> + 'static) -> Self {
        Self {
            middleware: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Append a middleware. The first one added runs first (outermost).
    pub fn with(mut self, middleware: impl Middleware<I, O> + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Run the chain and normalize any error.
    pub async fn execute(&self, input: I, actor: &ActorContext) -> Result<O, AppError> {
        self.run(input, actor).await.map_err(map_error)
    }

    /// Run the chain, keeping the raw CommandError.
    pub async fn run(&self, input: I, actor: &ActorContext) -> Result<O, CommandError> {
        let next = Next {
            middleware: &self.middleware,
            handler: self.handler.as_ref(),
        };
        next.run(input, actor).await
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Echo;

    #[async_trait]
    impl Handler<String, String> for Echo {
        async fn handle(
            &self,
            input: String,
            _actor: &ActorContext,
        ) -> Result<String, CommandError> {
            Ok(format!("handled {input}"))
        }
    }

    /// Records its name on the way in and on the way out.
    struct Trace {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware<String, String> for Trace {
        async fn handle(
            &self,
            input: String,
            actor: &ActorContext,
            next: Next<'_, String, String>,
        ) -> Result<String, CommandError> {
            self.log.lock().unwrap().push(format!("{} in", self.name));
            let out = next.run(input, actor).await;
            self.log.lock().unwrap().push(format!("{} out", self.name));
            out
        }
    }

    struct Stop;

    #[async_trait]
    impl Middleware<String, String> for Stop {
        async fn handle(
            &self,
            _input: String,
            _actor: &ActorContext,
            _next: Next<'_, String, String>,
        ) -> Result<String, CommandError> {
            Ok("stopped".to_string())
        }
    }

    #[tokio::test]
    async fn middleware_runs_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(Echo)
            .with(Trace {
                name: "outer",
                log: log.clone(),
            })
            .with(Trace {
                name: "inner",
                log: log.clone(),
            });

        let out = pipeline
            .execute("x".to_string(), &ActorContext::guest())
            .await
            .unwrap();

        assert_eq!(out, "handled x");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer in", "inner in", "inner out", "outer out"]
        );
        assert_eq!(pipeline.len(), 2);
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::new(Echo).with(Stop).with(Trace {
            name: "never",
            log: log.clone(),
        });

        let out = pipeline
            .execute("x".to_string(), &ActorContext::guest())
            .await
            .unwrap();
        assert_eq!(out, "stopped");
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bare_handler_pipeline() {
        let pipeline = Pipeline::new(Echo);
        assert!(pipeline.is_empty());
        assert_eq!(
            pipeline.execute("y".into(), &ActorContext::guest()).await.unwrap(),
            "handled y"
        );
    }
}
