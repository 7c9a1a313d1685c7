//! OutboxProcessor - outbox の PENDING メッセージを購読者へ配送
//!
//! # フロー（run_once）
//! 1. `get_unprocessed(limit)` で PENDING を occurred_on 昇順に取得
//! 2. 1 件ずつ payload を復元して live な EventBus に publish
//!    - 失敗はそのメッセージだけの問題として記録し、次へ進む
//! 3. 成功した id をまとめて `mark_processed`
//!
//! 配送の失敗がストレージを巻き戻すことはありません。
//! 失敗したメッセージは PENDING のまま残り、次の run で再送されます（at-least-once）。
//!
//! # 同時実行
//! 1 つの processor の run は内部の Mutex で直列化されます。
//! 複数の processor インスタンス間での claim は行いません（二重配送の可能性あり）。

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::config::OutboxConfig;
use crate::domain::{OutboxMessage, OutboxStatus};
use crate::observability::OutboxCounts;
use crate::ports::{EventBus, Metrics, OutboxRepository, StorageError};

/// What one run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReport {
    pub fetched: usize,
    pub published: usize,
    /// Failed this run, still PENDING.
    pub failed: usize,
    /// Failed this run and parked as FAILED (retry limit reached).
    pub dead: usize,
}

/// Shortest delay between loop runs. `tokio::time::interval` rejects zero.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct OutboxProcessor {
    outbox: Arc<dyn OutboxRepository>,
    bus: Arc<dyn EventBus>,
    metrics: Arc<dyn Metrics>,
    config: OutboxConfig,
    run_lock: Mutex<()>,
}

impl OutboxProcessor {
    pub fn new(
        outbox: Arc<dyn OutboxRepository>,
        bus: Arc<dyn EventBus>,
        metrics: Arc<dyn Metrics>,
        config: OutboxConfig,
    ) -> Self {
        Self {
            outbox,
            bus,
            metrics,
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &OutboxConfig {
        &self.config
    }

    /// One pass with the configured batch limit (at least 1).
    pub async fn run_once(&self) -> Result<ProcessReport, StorageError> {
        self.run_with_limit(self.config.batch_limit.max(1)).await
    }

    pub async fn run_with_limit(&self, limit: usize) -> Result<ProcessReport, StorageError> {
        let _guard = self.run_lock.lock().await;

        let messages = self.outbox.get_unprocessed(limit).await?;
        let mut report = ProcessReport {
            fetched: messages.len(),
            ..ProcessReport::default()
        };
        if messages.is_empty() {
            return Ok(report);
        }
        self.metrics.increment(
            "outbox_events_processing",
            &[("count", messages.len().to_string())],
        );

        let mut published = Vec::with_capacity(messages.len());
        for message in &messages {
            match self.deliver(message).await {
                Ok(()) => {
                    self.metrics.increment(
                        "outbox_event_published",
                        &[("event_type", message.event_type.clone())],
                    );
                    published.push(message.id);
                }
                Err(reason) => match self.note_failure(message, &reason).await {
                    OutboxStatus::Failed => report.dead += 1,
                    _ => report.failed += 1,
                },
            }
        }

        if !published.is_empty() {
            self.outbox.mark_processed(&published).await?;
        }
        report.published = published.len();

        tracing::info!(
            fetched = report.fetched,
            published = report.published,
            failed = report.failed,
            dead = report.dead,
            "outbox run finished"
        );
        Ok(report)
    }

    pub async fn counts(&self) -> Result<OutboxCounts, StorageError> {
        self.outbox.counts().await
    }

    async fn deliver(&self, message: &OutboxMessage) -> Result<(), String> {
        let event = message
            .decode_event()
            .map_err(|e| format!("undecodable payload: {e}"))?;
        self.bus.publish(vec![event]).await.map_err(|e| e.to_string())
    }

    /// Record the failure on the message. Bookkeeping errors are logged, not raised,
    /// so one bad message cannot stop the batch.
    async fn note_failure(&self, message: &OutboxMessage, reason: &str) -> OutboxStatus {
        let tags = [("event_type", message.event_type.clone())];
        let status = match self
            .outbox
            .record_failure(&message.id, reason, self.config.max_retries)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(
                    message_id = %message.id,
                    error = %e,
                    "failed to record delivery failure"
                );
                OutboxStatus::Pending
            }
        };

        if status == OutboxStatus::Failed {
            self.metrics.increment("outbox_event_dead", &tags);
            tracing::error!(
                message_id = %message.id,
                event_type = %message.event_type,
                retries = message.retries + 1,
                error = reason,
                "outbox message parked after too many failures"
            );
        } else {
            self.metrics.increment("outbox_event_failed", &tags);
            tracing::warn!(
                message_id = %message.id,
                event_type = %message.event_type,
                error = reason,
                "outbox delivery failed; will retry"
            );
        }
        status
    }

    /// Run `run_once` every `interval` (at least 1 ms) until shut down.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> OutboxLoop {
        let interval = interval.max(MIN_POLL_INTERVAL);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(outbox_loop(self, interval, shutdown_rx));
        OutboxLoop { shutdown_tx, join }
    }
}

/// Handle of the background loop.
/// - `request_shutdown()` で次の tick を待たずに止まる
/// - 実行中の run は最後まで終わらせる
pub struct OutboxLoop {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl OutboxLoop {
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "outbox loop task ended abnormally");
        }
    }
}

async fn outbox_loop(
    processor: Arc<OutboxProcessor>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown_rx.changed() => {
                // sender dropped counts as shutdown
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        if let Err(e) = processor.run_once().await {
            tracing::error!(error = %e, "outbox run failed");
        }
    }
    tracing::debug!("outbox loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageId, TodoEvent, TodoId};
    use crate::impls::{InMemoryEventBus, InMemoryKvStore, InMemoryMetrics, KvOutboxRepository};
    use crate::ports::{EventHandler, HandlerError, KeyValueStore};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use ulid::Ulid;

    /// Counts deliveries; fails while `down` is set. Each delivery takes `delay`.
    #[derive(Default)]
    struct Subscriber {
        seen: AtomicUsize,
        down: AtomicBool,
        delay: Duration,
    }

    #[async_trait]
    impl EventHandler for Subscriber {
        async fn handle(&self, _event: &TodoEvent) -> Result<(), HandlerError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.down.load(Ordering::SeqCst) {
                return Err(HandlerError::new("subscriber unavailable"));
            }
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Setup {
        store: InMemoryKvStore,
        outbox: Arc<KvOutboxRepository>,
        subscriber: Arc<Subscriber>,
        metrics: Arc<InMemoryMetrics>,
        processor: Arc<OutboxProcessor>,
    }

    fn setup(max_retries: Option<u32>) -> Setup {
        let config = OutboxConfig {
            max_retries,
            ..OutboxConfig::default()
        };
        setup_with(config, Duration::ZERO)
    }

    fn setup_with(config: OutboxConfig, delay: Duration) -> Setup {
        let store = InMemoryKvStore::new();
        let outbox = Arc::new(KvOutboxRepository::new(Arc::new(store.clone())));
        let bus = InMemoryEventBus::new();
        let subscriber = Arc::new(Subscriber {
            delay,
            ..Subscriber::default()
        });
        bus.subscribe(TodoEvent::COMPLETED, subscriber.clone());
        let metrics = Arc::new(InMemoryMetrics::new());
        let processor = Arc::new(OutboxProcessor::new(
            outbox.clone(),
            Arc::new(bus),
            metrics.clone(),
            config,
        ));
        Setup {
            store,
            outbox,
            subscriber,
            metrics,
            processor,
        }
    }

    async fn stage(outbox: &KvOutboxRepository, n: i64) -> Vec<OutboxMessage> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let messages: Vec<_> = (0..n)
            .map(|i| {
                let event = TodoEvent::Completed {
                    todo_id: TodoId::new(format!("t{i}")).unwrap(),
                    occurred_on: t0 + ChronoDuration::seconds(i),
                };
                OutboxMessage::from_event(MessageId::from_ulid(Ulid::new()), &event).unwrap()
            })
            .collect();
        outbox.add_many(messages.clone()).await.unwrap();
        messages
    }

    #[tokio::test]
    async fn delivered_messages_are_published_once() {
        let s = setup(None);
        stage(&s.outbox, 3).await;

        let report = s.processor.run_once().await.unwrap();
        assert_eq!(
            report,
            ProcessReport {
                fetched: 3,
                published: 3,
                failed: 0,
                dead: 0
            }
        );

        let again = s.processor.run_once().await.unwrap();
        assert_eq!(again, ProcessReport::default());
        assert_eq!(s.subscriber.seen.load(Ordering::SeqCst), 3);
        assert_eq!(s.metrics.counter("outbox_event_published"), 3);
        assert_eq!(s.processor.counts().await.unwrap().published, 3);
    }

    #[tokio::test]
    async fn failed_messages_stay_pending_until_delivered() {
        let s = setup(None);
        stage(&s.outbox, 1).await;
        s.subscriber.down.store(true, Ordering::SeqCst);

        for _ in 0..3 {
            let report = s.processor.run_once().await.unwrap();
            assert_eq!((report.published, report.failed), (0, 1));
        }
        let pending = s.outbox.get_unprocessed(10).await.unwrap();
        assert_eq!(pending[0].retries, 3);
        assert_eq!(s.metrics.counter("outbox_event_failed"), 3);

        s.subscriber.down.store(false, Ordering::SeqCst);
        assert_eq!(s.processor.run_once().await.unwrap().published, 1);
        assert_eq!(s.processor.run_once().await.unwrap().fetched, 0);
        assert_eq!(s.subscriber.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn one_bad_message_does_not_block_the_batch() {
        let s = setup(None);
        let staged = stage(&s.outbox, 2).await;

        // corrupt the payload of the oldest message
        let mut broken = staged[0].clone();
        broken.payload = "{\"kind\":\"Nope\"}".to_string();
        s.outbox.add_many(vec![broken]).await.unwrap();

        let report = s.processor.run_once().await.unwrap();
        assert_eq!((report.fetched, report.published, report.failed), (2, 1, 1));
        assert_eq!(s.subscriber.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_limit_parks_message_as_failed() {
        let s = setup(Some(2));
        stage(&s.outbox, 1).await;
        s.subscriber.down.store(true, Ordering::SeqCst);

        assert_eq!(s.processor.run_once().await.unwrap().failed, 1);
        assert_eq!(s.processor.run_once().await.unwrap().dead, 1);
        assert_eq!(s.processor.run_once().await.unwrap().fetched, 0);

        let counts = s.processor.counts().await.unwrap();
        assert_eq!((counts.pending, counts.failed), (0, 1));
        assert_eq!(s.metrics.counter("outbox_event_dead"), 1);
    }

    #[tokio::test]
    async fn batch_limit_is_respected_in_fifo_order() {
        let s = setup(None);
        let staged = stage(&s.outbox, 5).await;

        let report = s.processor.run_with_limit(2).await.unwrap();
        assert_eq!(report.published, 2);

        let remaining: Vec<_> = s
            .outbox
            .get_unprocessed(10)
            .await
            .unwrap()
            .iter()
            .map(|m| m.id)
            .collect();
        let expected: Vec<_> = staged[2..].iter().map(|m| m.id).collect();
        assert_eq!(remaining, expected);
    }

    #[tokio::test]
    async fn background_loop_delivers_and_stops() {
        let s = setup(None);
        stage(&s.outbox, 2).await;

        let handle = s.processor.clone().spawn(Duration::from_millis(10));
        for _ in 0..100 {
            if s.subscriber.seen.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown_and_join().await;

        assert_eq!(s.subscriber.seen.load(Ordering::SeqCst), 2);
        assert!(s.store.keys_with_prefix("outbox:").unwrap().len() == 2);
    }

    #[tokio::test]
    async fn concurrent_runs_deliver_each_message_once() {
        let s = setup_with(OutboxConfig::default(), Duration::from_millis(20));
        stage(&s.outbox, 3).await;

        let (a, b) = tokio::join!(s.processor.run_once(), s.processor.run_once());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a.published + b.published, 3);
        assert_eq!(a.fetched + b.fetched, 3);
        assert_eq!(s.subscriber.seen.load(Ordering::SeqCst), 3);
        assert_eq!(s.processor.counts().await.unwrap().published, 3);
    }

    #[tokio::test]
    async fn zero_interval_and_batch_limit_still_deliver() {
        let config = OutboxConfig {
            batch_limit: 0,
            poll_interval_ms: 0,
            max_retries: None,
        };
        let s = setup_with(config, Duration::ZERO);
        stage(&s.outbox, 2).await;

        let handle = s.processor.clone().spawn(s.processor.config().poll_interval());
        for _ in 0..100 {
            if s.subscriber.seen.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.shutdown_and_join().await;

        assert_eq!(s.subscriber.seen.load(Ordering::SeqCst), 2);
        assert_eq!(s.processor.counts().await.unwrap().pending, 0);
    }
}
