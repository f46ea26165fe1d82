//! Poll loop, deserialization, idempotency+sequencing gating, state update,
//! manual offset commit, retry-with-backoff and DLT recovery (C8).
//!
//! Implements the ten-step pipeline of spec §4.8 exactly, wrapped in a
//! retry-with-DLT loop for steps 4-9. Deserialization failures (step 1) are
//! a non-retryable shortcut straight to the DLT. Start/stop is driven only
//! by `ConnectivityMonitor` transitions (spec §9: "monitor owns start/stop
//! calls; workers never self-start") — `run_with_connectivity` is the single
//! place that calls `start`/`stop`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::Utc;
use order_domain::{FailureMetadata, Order, StatusMachine, normalize_order_id};
use rdkafka::Message;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::config::{KafkaConfig, RetryConfig};
use crate::domain::{shipping_cost, IdempotencyIndex, ProcessedOrder, ProcessedOrderStore};

/// Engine lifecycle state (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    /// Not polling; set when the broker is down.
    Stopped = 0,
    /// Broker just reported healthy; the listener is being started.
    Starting = 1,
    /// Polling, processing, committing.
    Running = 2,
    /// Broker lost or application shutdown; draining in-flight work.
    Stopping = 3,
}

impl EngineState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

/// Outcome of processing one message through steps 3-9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessOutcome {
    Written,
    SkippedDuplicateOffset,
    SkippedSameStatus,
    SkippedInvalidTransition,
}

impl ProcessOutcome {
    const fn metric_label(self) -> &'static str {
        match self {
            Self::Written => "WRITTEN",
            Self::SkippedDuplicateOffset => "SKIPPED_DUPLICATE_OFFSET",
            Self::SkippedSameStatus => "SKIPPED_SAME_STATUS",
            Self::SkippedInvalidTransition => "SKIPPED_INVALID_TRANSITION",
        }
    }
}

/// Failure modes of the steps 3-9 gate. Re-normalizing `orderId` here (every
/// producer and consumer path must, per [`order_domain::order`]) is the one
/// way this stage can genuinely fail; everything past it is infallible
/// in-memory bookkeeping.
#[derive(Debug, thiserror::Error)]
enum ProcessingError {
    #[error("invalid orderId: {0}")]
    InvalidOrderId(String),
}

/// The consumer's core ingest path (C8).
pub struct ConsumeEngine {
    consumer: StreamConsumer,
    dlt_producer: FutureProducer,
    config: KafkaConfig,
    retry: RetryConfig,
    processed_store: ProcessedOrderStore,
    idempotency: IdempotencyIndex,
    state: AtomicU8,
    run_signal: watch::Sender<bool>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConsumeEngine {
    /// Build a new engine. Does not start polling; call `start()` or run it
    /// under `run_with_connectivity`.
    #[must_use]
    pub fn new(
        consumer: StreamConsumer,
        dlt_producer: FutureProducer,
        config: KafkaConfig,
        retry: RetryConfig,
        processed_store: ProcessedOrderStore,
        idempotency: IdempotencyIndex,
    ) -> Self {
        let (run_signal, _) = watch::channel(false);
        Self {
            consumer,
            dlt_producer,
            config,
            retry,
            processed_store,
            idempotency,
            state: AtomicU8::new(EngineState::Stopped as u8),
            run_signal,
            poll_task: Mutex::new(None),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Relaxed))
    }

    fn set_state(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::Relaxed);
    }

    /// Drive this engine's lifecycle from connectivity transitions. Spawn
    /// once at startup; never returns.
    pub async fn run_with_connectivity(self: Arc<Self>, mut healthy_rx: watch::Receiver<bool>) {
        loop {
            let healthy = *healthy_rx.borrow();
            if healthy {
                self.start().await;
            } else {
                self.stop().await;
            }

            if healthy_rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Start the poll loop. Idempotent: a second call while already
    /// running/starting is a no-op.
    pub async fn start(self: &Arc<Self>) {
        let mut task_guard = self.poll_task.lock().await;
        if task_guard.is_some() {
            return;
        }

        self.set_state(EngineState::Starting);
        let _ = self.run_signal.send(true);

        let engine = Arc::clone(self);
        *task_guard = Some(tokio::spawn(async move {
            engine.poll_loop().await;
        }));

        self.set_state(EngineState::Running);
        crate::observability::metrics::record_engine_state(EngineState::Running as u8 as f64);
        tracing::info!(topic = %self.config.topic, "consume engine started");
    }

    /// Stop the poll loop, draining the current in-flight message before
    /// returning. Idempotent: a second call while already stopped is a
    /// no-op.
    pub async fn stop(&self) {
        let mut task_guard = self.poll_task.lock().await;
        let Some(handle) = task_guard.take() else {
            return;
        };

        self.set_state(EngineState::Stopping);
        crate::observability::metrics::record_engine_state(EngineState::Stopping as u8 as f64);
        let _ = self.run_signal.send(false);
        let _ = handle.await;
        self.set_state(EngineState::Stopped);
        crate::observability::metrics::record_engine_state(EngineState::Stopped as u8 as f64);
        tracing::info!(topic = %self.config.topic, "consume engine stopped");
    }

    async fn poll_loop(self: Arc<Self>) {
        let mut run_rx = self.run_signal.subscribe();

        loop {
            if !*run_rx.borrow() {
                return;
            }

            tokio::select! {
                changed = run_rx.changed() => {
                    if changed.is_err() || !*run_rx.borrow() {
                        return;
                    }
                }
                result = self.consumer.recv() => {
                    match result {
                        Ok(message) => self.handle_message(&message).await,
                        Err(err) => tracing::error!(error = %err, "poll error"),
                    }
                }
            }
        }
    }

    async fn handle_message(&self, message: &rdkafka::message::BorrowedMessage<'_>) {
        let offset = message.offset();
        let partition = message.partition();
        let key = message.key().map(|k| String::from_utf8_lossy(k).into_owned());
        let payload_bytes = message.payload().unwrap_or_default();
        let payload_str = String::from_utf8_lossy(payload_bytes).into_owned();

        // Step 1: deserialize. A poison pill bypasses the retry budget.
        let order: Order = match serde_json::from_slice(payload_bytes) {
            Ok(order) => order,
            Err(err) => {
                tracing::warn!(offset, partition, error = %err, "poison pill, routing to DLT");
                let dlt_sent = self
                    .route_to_dlt(key.as_deref(), &payload_str, partition, offset, "PoisonPill", &err.to_string())
                    .await;
                if dlt_sent {
                    self.commit(message);
                } else {
                    tracing::error!(offset, partition, "DLT publish failed, leaving offset uncommitted for redelivery");
                }
                return;
            }
        };

        // Step 2: key check, lenient.
        if key.as_deref() != Some(order.order_id.as_str()) {
            tracing::warn!(
                offset,
                partition,
                key = ?key,
                order_id = %order.order_id,
                "message key does not match payload orderId"
            );
        }

        let mut backoff = crate::consume::retry::ExponentialBackoffCalculator::new(
            &crate::consume::retry::BackoffPolicy::consume_retry(
                self.retry.max_retries,
                self.retry.initial_backoff,
                self.retry.max_backoff,
                self.retry.backoff_multiplier,
            ),
        );

        loop {
            match self.try_process(&order, offset) {
                Ok(outcome) => {
                    crate::observability::metrics::record_consume_outcome(outcome.metric_label());
                    self.commit(message);
                    return;
                }
                Err(err) => {
                    if let Some(delay) = backoff.next_backoff() {
                        crate::observability::metrics::record_retry_attempt();
                        tracing::warn!(
                            order_id = %order.order_id,
                            attempt = backoff.current_attempt(),
                            error = %err,
                            "processing failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        tracing::error!(order_id = %order.order_id, error = %err, "retries exhausted, routing to DLT");
                        let dlt_sent = self
                            .route_to_dlt(
                                key.as_deref(),
                                &payload_str,
                                partition,
                                offset,
                                "ProcessingException",
                                &err.to_string(),
                            )
                            .await;
                        if dlt_sent {
                            self.commit(message);
                        } else {
                            tracing::error!(
                                order_id = %order.order_id,
                                offset,
                                partition,
                                "DLT publish failed, leaving offset uncommitted for redelivery"
                            );
                        }
                        return;
                    }
                }
            }
        }
    }

    /// Steps 3-9 of the pipeline.
    fn try_process(&self, incoming: &Order, offset: i64) -> Result<ProcessOutcome, ProcessingError> {
        let order_id =
            normalize_order_id(&incoming.order_id).map_err(|e| ProcessingError::InvalidOrderId(e.to_string()))?;
        let order = Order {
            order_id: order_id.clone(),
            ..incoming.clone()
        };

        // Step 3: offset-based idempotency.
        if self.idempotency.already_processed(&order_id, offset) {
            return Ok(ProcessOutcome::SkippedDuplicateOffset);
        }

        // Step 4: load current.
        let current = self.processed_store.get(&order_id);

        // Step 5: state-based idempotency.
        if let Some(existing) = &current {
            if existing.order.status == order.status {
                self.idempotency.record(&order_id, offset);
                return Ok(ProcessOutcome::SkippedSameStatus);
            }
        }

        // Step 6: sequencing.
        let current_status = current.as_ref().map(|p| p.order.status);
        if !StatusMachine::is_valid_transition(current_status, order.status) {
            tracing::warn!(
                order_id = %order_id,
                current = ?current_status,
                next = %order.status,
                "invalid transition, skipping"
            );
            self.idempotency.record(&order_id, offset);
            return Ok(ProcessOutcome::SkippedInvalidTransition);
        }

        // Step 7: derive shipping cost.
        let shipping = shipping_cost(&order);

        // Step 8: update the store.
        self.processed_store.put(
            &order_id,
            ProcessedOrder {
                order,
                shipping_cost: shipping,
            },
        );

        // Step 9: record in the idempotency index.
        self.idempotency.record(&order_id, offset);

        Ok(ProcessOutcome::Written)
    }

    fn commit(&self, message: &rdkafka::message::BorrowedMessage<'_>) {
        if let Err(err) = self.consumer.commit_message(message, CommitMode::Sync) {
            tracing::error!(error = %err, "failed to commit offset");
        }
    }

    /// Sends `payload` to the DLT topic, returning whether the send succeeded.
    /// Per spec §4.8, the caller must only commit the original offset when this
    /// returns `true` — a failed DLT send means none of the three definitive
    /// commit outcomes hold, and the message must be redelivered.
    async fn route_to_dlt(
        &self,
        key: Option<&str>,
        payload: &str,
        partition: i32,
        offset: i64,
        exception_class: &str,
        exception_message: &str,
    ) -> bool {
        let metadata = FailureMetadata {
            original_topic: self.config.topic.clone(),
            original_partition: Some(partition),
            original_offset: Some(offset),
            original_timestamp: Utc::now(),
            exception_class: exception_class.to_string(),
            exception_message: exception_message.to_string(),
            exception_stacktrace: String::new(),
            failed_at: Utc::now(),
        };

        let mut kafka_headers = rdkafka::message::OwnedHeaders::new();
        for (header_key, value) in &metadata.as_headers() {
            kafka_headers = kafka_headers.insert(rdkafka::message::Header {
                key: header_key,
                value: Some(value.as_str()),
            });
        }

        let mut record: FutureRecord<'_, str, str> = FutureRecord::to(&self.config.dlt_topic)
            .payload(payload)
            .headers(kafka_headers);
        if let Some(key) = key {
            record = record.key(key);
        }

        match self
            .dlt_producer
            .send(record, std::time::Duration::from_millis(0))
            .await
        {
            Ok(_delivery) => {
                crate::observability::metrics::record_dlt_publish(exception_class);
                tracing::warn!(exception_class, offset, partition, "routed to DLT");
                true
            }
            Err((err, _owned)) => {
                tracing::error!(error = %err, "DLT publish also failed, message will be redelivered");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_domain::{OrderItem, Status};
    use rust_decimal_macros::dec;

    fn sample_order(order_id: &str, status: Status) -> Order {
        Order {
            order_id: order_id.to_string(),
            customer_id: "CUST-1".to_string(),
            order_date: Utc::now(),
            items: vec![OrderItem {
                item_id: "sku-1".to_string(),
                quantity: 1,
                price: dec!(10.00),
            }],
            total_amount: dec!(10.00),
            currency: "USD".to_string(),
            status,
        }
    }

    fn bare_engine() -> ConsumeEngine {
        let consumer: StreamConsumer = rdkafka::ClientConfig::new()
            .set("bootstrap.servers", "127.0.0.1:1")
            .set("group.id", "test-group")
            .set("enable.auto.commit", "false")
            .create()
            .unwrap();
        let dlt_producer: FutureProducer = rdkafka::ClientConfig::new()
            .set("bootstrap.servers", "127.0.0.1:1")
            .set("message.timeout.ms", "100")
            .create()
            .unwrap();

        ConsumeEngine::new(
            consumer,
            dlt_producer,
            KafkaConfig {
                bootstrap_servers: "127.0.0.1:1".to_string(),
                topic: "orders".to_string(),
                dlt_topic: "orders.dlt".to_string(),
                group_id: "test-group".to_string(),
            },
            RetryConfig {
                initial_backoff: std::time::Duration::from_millis(1),
                backoff_multiplier: 2.0,
                max_backoff: std::time::Duration::from_millis(10),
                max_retries: 3,
            },
            ProcessedOrderStore::new(),
            IdempotencyIndex::new(),
        )
    }

    #[test]
    fn first_write_is_accepted() {
        let engine = bare_engine();
        let order = sample_order("ORD-0001", Status::New);
        let outcome = engine.try_process(&order, 1).unwrap();
        assert_eq!(outcome, ProcessOutcome::Written);
        assert_eq!(
            engine.processed_store.get("ORD-0001").unwrap().order.status,
            Status::New
        );
        assert_eq!(engine.idempotency.offset_for("ORD-0001"), Some(1));
    }

    #[test]
    fn duplicate_offset_is_skipped() {
        let engine = bare_engine();
        let order = sample_order("ORD-0001", Status::New);
        engine.try_process(&order, 42).unwrap();

        let outcome = engine.try_process(&order, 42).unwrap();
        assert_eq!(outcome, ProcessOutcome::SkippedDuplicateOffset);
    }

    #[test]
    fn same_status_redelivery_is_skipped_but_offset_advances() {
        let engine = bare_engine();
        let order = sample_order("ORD-0001", Status::New);
        engine.try_process(&order, 1).unwrap();

        let outcome = engine.try_process(&order, 2).unwrap();
        assert_eq!(outcome, ProcessOutcome::SkippedSameStatus);
        assert_eq!(engine.idempotency.offset_for("ORD-0001"), Some(2));
    }

    #[test]
    fn invalid_transition_is_skipped_and_does_not_write() {
        let engine = bare_engine();
        engine.try_process(&sample_order("ORD-0001", Status::New), 1).unwrap();

        let outcome = engine
            .try_process(&sample_order("ORD-0001", Status::Completed), 2)
            .unwrap();
        assert_eq!(outcome, ProcessOutcome::SkippedInvalidTransition);
        assert_eq!(
            engine.processed_store.get("ORD-0001").unwrap().order.status,
            Status::New
        );
    }

    #[test]
    fn sequential_progression_derives_shipping_cost() {
        let engine = bare_engine();
        engine.try_process(&sample_order("ORD-0001", Status::New), 1).unwrap();
        engine
            .try_process(&sample_order("ORD-0001", Status::Confirmed), 2)
            .unwrap();

        let processed = engine.processed_store.get("ORD-0001").unwrap();
        assert_eq!(processed.order.status, Status::Confirmed);
        assert_eq!(processed.shipping_cost, dec!(0.2000));
    }

    #[test]
    fn replaying_same_offset_never_changes_store() {
        let engine = bare_engine();
        engine.try_process(&sample_order("ORD-0001", Status::New), 1).unwrap();
        engine
            .try_process(&sample_order("ORD-0001", Status::Confirmed), 2)
            .unwrap();
        let before = engine.processed_store.get("ORD-0001").unwrap();

        engine
            .try_process(&sample_order("ORD-0001", Status::Confirmed), 2)
            .unwrap();
        let after = engine.processed_store.get("ORD-0001").unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn start_then_stop_is_idempotent() {
        let engine = Arc::new(bare_engine());
        engine.start().await;
        engine.start().await;
        assert_eq!(engine.state(), EngineState::Running);

        engine.stop().await;
        engine.stop().await;
        assert_eq!(engine.state(), EngineState::Stopped);
    }
}
