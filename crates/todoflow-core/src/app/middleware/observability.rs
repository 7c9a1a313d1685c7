//! ObservabilityMiddleware - ログ、メトリクス、エラー分類
//!
//! - 開始 / 成功 / 失敗をログに出す（失敗は outcome に応じて warn か error）
//! - `<operation>_<outcome>` のカウンタと `<operation>_duration_seconds` を記録
//! - `swallow` に分類された失敗は、出力型が受け入れれば no-op 成功に変換する

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::app::errors::{CommandError, Operation, Outcome, Swallowable, classify};
use crate::app::pipeline::{Middleware, Next};
use crate::domain::ActorContext;
use crate::ports::Metrics;

pub struct ObservabilityMiddleware {
    operation: Operation,
    metrics: Arc<dyn Metrics>,
}

impl ObservabilityMiddleware {
    pub fn new(operation: Operation, metrics: Arc<dyn Metrics>) -> Self {
        Self { operation, metrics }
    }

    fn count(&self, outcome: Outcome, actor: &ActorContext) {
        let name = format!("{}_{}", self.operation.as_str(), outcome.as_str());
        self.metrics
            .increment(&name, &[("user_id", actor.user_id.clone())]);
    }
}

#[async_trait]
impl<I, O> Middleware<I, O> for ObservabilityMiddleware
where
    I: Send + 'static,
    O: Swallowable + Send + 'static,
{
    async fn handle(
        &self,
        input: I,
        actor: &ActorContext,
        next: Next<'_, I, O>,
    ) -> Result<O, CommandError> {
        let operation = self.operation.as_str();
        tracing::info!(operation, user_id = %actor.user_id, "command started");

        let started = Instant::now();
        let result = next.run(input, actor).await;
        self.metrics.record_time(
            &format!("{operation}_duration_seconds"),
            started.elapsed(),
            &[],
        );

        let err = match result {
            Ok(output) => {
                self.count(Outcome::Success, actor);
                tracing::info!(operation, user_id = %actor.user_id, "command succeeded");
                return Ok(output);
            }
            Err(err) => err,
        };

        let class = classify(&err);
        self.count(class.outcome, actor);

        if class.swallow
            && let Some(output) = O::from_swallowed(&err)
        {
            tracing::info!(
                operation,
                code = class.code,
                outcome = class.outcome.as_str(),
                "command resolved as no-op"
            );
            return Ok(output);
        }

        if class.outcome.is_client_error() {
            tracing::warn!(
                operation,
                user_id = %actor.user_id,
                code = class.code,
                outcome = class.outcome.as_str(),
                error = %err,
                "command rejected"
            );
        } else {
            tracing::error!(
                operation,
                user_id = %actor.user_id,
                code = class.code,
                outcome = class.outcome.as_str(),
                retriable = class.retriable,
                error = %err,
                "command failed"
            );
        }
        Err(err)
    }
}
