use std::{num::NonZeroUsize, sync::Arc};

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};

use super::{
    DeliveryOutcome, DeliveryTransport, ErrorClass, PayloadBuilder,
};
use crate::{
    error::Error, futures_set::join_keyed, registry::SubscriptionRegistry,
    types::NotificationIntent,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
    pub details: Vec<DeliveryOutcome>,
}

/// Broadcasts one notification to every registered subscription.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<dyn SubscriptionRegistry>,
    transport: Arc<dyn DeliveryTransport>,
    builder: PayloadBuilder,
    capacity: Option<NonZeroUsize>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<dyn SubscriptionRegistry>,
        transport: Arc<dyn DeliveryTransport>,
        builder: PayloadBuilder,
        capacity: Option<NonZeroUsize>,
    ) -> Self {
        Dispatcher {
            registry,
            transport,
            builder,
            capacity,
        }
    }

    /// Runs [`Dispatcher::dispatch`] on its own task. Dropping the returned
    /// future detaches the task instead of cancelling it, so every send and
    /// the pruning that follows still complete.
    pub async fn dispatch_detached(
        &self,
        intent: NotificationIntent,
    ) -> Result<DispatchSummary, Error> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.dispatch(&intent).await }).await?
    }

    /// Fails only on an invalid intent or when the registry cannot be read,
    /// both before anything is sent. After that every per-endpoint problem
    /// ends up in the summary.
    pub async fn dispatch(
        &self,
        intent: &NotificationIntent,
    ) -> Result<DispatchSummary, Error> {
        let payload = Arc::new(self.builder.build(intent, Utc::now())?);
        let subscriptions = self.registry.list_all().await?;
        let total = subscriptions.len();

        if total == 0 {
            info!("No subscriptions registered, nothing to send");
            return Ok(DispatchSummary::default());
        }

        let sends = subscriptions.into_iter().map(|subscription| {
            let transport = self.transport.clone();
            let payload = payload.clone();
            let endpoint = subscription.endpoint.to_owned();

            (endpoint, async move {
                transport.send(&subscription, &payload).await
            })
        });

        let details = join_keyed(
            sends,
            Vec::with_capacity(total),
            |mut details, endpoint, result| {
                let outcome = match result {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!("Push task for {} aborted: {}", endpoint, e);
                        DeliveryOutcome::failed(
                            &endpoint,
                            ErrorClass::Transient,
                            None,
                        )
                    },
                };
                details.push(outcome);
                details
            },
            self.capacity,
        )
        .await;

        self.prune(&details).await;

        let successful = details.iter().filter(|o| o.success).count();
        let failed = details.len() - successful;

        info!(
            "Dispatched \"{}\": {} successful, {} failed, {} total",
            payload.content.title, successful, failed, total
        );

        Ok(DispatchSummary {
            successful,
            failed,
            total,
            details,
        })
    }

    /// Removes endpoints the push service reported as gone. Failures are only
    /// logged, the dispatch result does not change.
    async fn prune(&self, outcomes: &[DeliveryOutcome]) {
        let removals = outcomes.iter().filter(|o| o.is_permanent()).map(|o| {
            let registry = self.registry.clone();
            async move { (o.endpoint.as_str(), registry.remove(&o.endpoint).await) }
        });

        for (endpoint, result) in join_all(removals).await {
            match result {
                Ok(()) => info!("Removed expired subscription {}", endpoint),
                Err(e) => {
                    warn!("Failed to remove subscription {}: {}", endpoint, e)
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        model::Subscription, push::SerializedPayload, registry::MemoryRegistry,
    };

    #[derive(Default)]
    struct ScriptedTransport {
        failures: HashMap<String, (ErrorClass, u16)>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn failing(mut self, endpoint: &str, class: ErrorClass, status: u16) -> Self {
            self.failures.insert(endpoint.to_owned(), (class, status));
            self
        }
    }

    #[async_trait]
    impl DeliveryTransport for ScriptedTransport {
        async fn send(
            &self,
            subscription: &Subscription,
            _payload: &SerializedPayload,
        ) -> DeliveryOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failures.get(&subscription.endpoint) {
                Some((class, status)) => DeliveryOutcome::failed(
                    &subscription.endpoint,
                    *class,
                    Some(*status),
                ),
                None => DeliveryOutcome::delivered(&subscription.endpoint, 201),
            }
        }
    }

    struct PanickingTransport;

    #[async_trait]
    impl DeliveryTransport for PanickingTransport {
        async fn send(
            &self,
            subscription: &Subscription,
            _payload: &SerializedPayload,
        ) -> DeliveryOutcome {
            if subscription.endpoint.ends_with("/bad") {
                panic!("transport bug");
            }
            DeliveryOutcome::delivered(&subscription.endpoint, 201)
        }
    }

    /// Answers 410 for every endpoint after a delay.
    #[derive(Default)]
    struct SlowGoneTransport {
        completed: AtomicUsize,
    }

    #[async_trait]
    impl DeliveryTransport for SlowGoneTransport {
        async fn send(
            &self,
            subscription: &Subscription,
            _payload: &SerializedPayload,
        ) -> DeliveryOutcome {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            DeliveryOutcome::failed(
                &subscription.endpoint,
                ErrorClass::Permanent,
                Some(410),
            )
        }
    }

    /// Serves a fixed list but refuses deletes, counting every call.
    #[derive(Default)]
    struct StubbornRegistry {
        items: Vec<Subscription>,
        reads: AtomicUsize,
        writes: AtomicUsize,
        fail_reads: bool,
    }

    #[async_trait]
    impl SubscriptionRegistry for StubbornRegistry {
        async fn upsert(&self, _subscription: Subscription) -> Result<(), Error> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(Error::StorageError(String::from("read only")))
        }

        async fn remove(&self, _endpoint: &str) -> Result<(), Error> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(Error::StorageError(String::from("read only")))
        }

        async fn list_all(&self) -> Result<Vec<Subscription>, Error> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail_reads {
                return Err(Error::StorageError(String::from("unreachable")));
            }
            Ok(self.items.clone())
        }

        async fn count(&self) -> Result<i64, Error> {
            Ok(self.items.len() as i64)
        }
    }

    fn builder() -> PayloadBuilder {
        PayloadBuilder {
            icon: String::from("/icon.png"),
            badge: String::from("/badge.png"),
            default_url: String::from("/"),
        }
    }

    fn endpoint(i: usize) -> String {
        format!("https://push.example/{}", i)
    }

    async fn registry_with(count: usize) -> Arc<MemoryRegistry> {
        let registry = Arc::new(MemoryRegistry::new());
        for i in 0..count {
            registry
                .upsert(Subscription::new(&endpoint(i), "p256dh", "auth"))
                .await
                .unwrap();
        }
        registry
    }

    fn dispatcher(
        registry: Arc<dyn SubscriptionRegistry>,
        transport: Arc<dyn DeliveryTransport>,
    ) -> Dispatcher {
        Dispatcher::new(registry, transport, builder(), NonZeroUsize::new(4))
    }

    #[tokio::test]
    async fn test_gone_endpoint_is_pruned() {
        let registry = registry_with(3).await;
        let transport = Arc::new(
            ScriptedTransport::default().failing(&endpoint(1), ErrorClass::Permanent, 410),
        );

        let summary = dispatcher(registry.clone(), transport.clone())
            .dispatch(&NotificationIntent::new("T", "B"))
            .await
            .unwrap();

        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.details.len(), 3);
        assert_eq!(registry.count().await.unwrap(), 2);
        assert!(!registry.contains(&endpoint(1)).await);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_endpoint() {
        let registry = registry_with(4).await;
        let transport = Arc::new(
            ScriptedTransport::default()
                .failing(&endpoint(0), ErrorClass::Transient, 503)
                .failing(&endpoint(2), ErrorClass::Transient, 429)
                .failing(&endpoint(3), ErrorClass::Permanent, 404),
        );

        let summary = dispatcher(registry.clone(), transport)
            .dispatch(&NotificationIntent::new("T", "B"))
            .await
            .unwrap();

        assert_eq!(summary.successful + summary.failed, summary.total);
        assert_eq!(summary.failed, 3);
        assert!(registry.contains(&endpoint(0)).await);
        assert!(registry.contains(&endpoint(2)).await);
        assert!(!registry.contains(&endpoint(3)).await);
    }

    #[tokio::test]
    async fn test_empty_registry_is_not_an_error() {
        let registry = registry_with(0).await;
        let transport = Arc::new(ScriptedTransport::default());

        let summary = dispatcher(registry, transport.clone())
            .dispatch(&NotificationIntent::new("T", "B"))
            .await
            .unwrap();

        assert_eq!(summary, DispatchSummary::default());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_intent_touches_nothing() {
        let registry = Arc::new(StubbornRegistry {
            items: vec![Subscription::new(&endpoint(0), "k", "a")],
            ..Default::default()
        });
        let transport = Arc::new(ScriptedTransport::default());

        let result = dispatcher(registry.clone(), transport.clone())
            .dispatch(&NotificationIntent::new("", "B"))
            .await;

        assert!(matches!(result, Err(Error::ValidationError(_))));
        assert_eq!(registry.reads.load(Ordering::SeqCst), 0);
        assert_eq!(registry.writes.load(Ordering::SeqCst), 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_registry_read_failure_aborts() {
        let registry = Arc::new(StubbornRegistry {
            fail_reads: true,
            ..Default::default()
        });
        let transport = Arc::new(ScriptedTransport::default());

        let result = dispatcher(registry, transport.clone())
            .dispatch(&NotificationIntent::new("T", "B"))
            .await;

        assert!(matches!(result, Err(Error::StorageError(_))));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prune_failure_does_not_change_summary() {
        let registry = Arc::new(StubbornRegistry {
            items: vec![
                Subscription::new(&endpoint(0), "k", "a"),
                Subscription::new(&endpoint(1), "k", "a"),
            ],
            ..Default::default()
        });
        let transport = Arc::new(
            ScriptedTransport::default().failing(&endpoint(0), ErrorClass::Permanent, 410),
        );

        let summary = dispatcher(registry.clone(), transport)
            .dispatch(&NotificationIntent::new("T", "B"))
            .await
            .unwrap();

        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total, 2);
        assert_eq!(registry.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_send_counts_as_transient() {
        let registry = Arc::new(MemoryRegistry::new());
        registry
            .upsert(Subscription::new("https://push.example/good", "k", "a"))
            .await
            .unwrap();
        registry
            .upsert(Subscription::new("https://push.example/bad", "k", "a"))
            .await
            .unwrap();

        let summary = dispatcher(registry.clone(), Arc::new(PanickingTransport))
            .dispatch(&NotificationIntent::new("T", "B"))
            .await
            .unwrap();

        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total, 2);

        let bad = summary
            .details
            .iter()
            .find(|o| o.endpoint == "https://push.example/bad")
            .unwrap();
        assert_eq!(bad.error_class, ErrorClass::Transient);
        assert!(registry.contains("https://push.example/bad").await);
    }

    #[tokio::test]
    async fn test_large_fan_out_with_small_window() {
        let registry = registry_with(50).await;
        let transport = Arc::new(ScriptedTransport::default());

        let summary = Dispatcher::new(
            registry,
            transport.clone(),
            builder(),
            NonZeroUsize::new(3),
        )
        .dispatch(&NotificationIntent::new("T", "B"))
        .await
        .unwrap();

        assert_eq!(summary.total, 50);
        assert_eq!(summary.successful, 50);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn test_detached_dispatch_outlives_caller() {
        let registry = registry_with(3).await;
        let transport = Arc::new(SlowGoneTransport::default());
        let dispatcher = dispatcher(registry.clone(), transport.clone());

        let caller = tokio::time::timeout(
            Duration::from_millis(50),
            dispatcher.dispatch_detached(NotificationIntent::new("T", "B")),
        )
        .await;
        assert!(caller.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(transport.completed.load(Ordering::SeqCst), 3);
        assert_eq!(registry.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_detached_dispatch_returns_summary() {
        let registry = registry_with(2).await;
        let transport = Arc::new(
            ScriptedTransport::default().failing(&endpoint(0), ErrorClass::Permanent, 410),
        );

        let summary = dispatcher(registry.clone(), transport)
            .dispatch_detached(NotificationIntent::new("T", "B"))
            .await
            .unwrap();

        assert_eq!((summary.successful, summary.failed, summary.total), (1, 1, 2));
        assert_eq!(registry.count().await.unwrap(), 1);
    }
}
