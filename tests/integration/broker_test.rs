//! Integration tests for broker ordering, join, and shutdown guarantees.

mod helpers;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use annohub_core::config::{OverflowPolicy, PersistenceConfig};
use annohub_realtime::{Delivery, Identity, MessageKind, RegisterError, Submission};

fn broadcast_payloads(messages: &[Arc<annohub_realtime::Message>]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .filter(|m| m.kind() == MessageKind::Broadcast)
        .map(|m| m.payload().clone())
        .collect()
}

#[tokio::test]
async fn test_late_joiner_receives_history_first() {
    let broker = helpers::start_broker();
    let a = broker.register("A", "a@x").await.expect("A");
    broker.submit(Submission::broadcast(a.identity(), json!("hello")));

    let b = broker.register("B", "b@y").await.expect("B");
    broker.submit(Submission::broadcast(a.identity(), json!("newer")));

    let seen = helpers::drain(&broker, &b).await;
    assert_eq!(broadcast_payloads(&seen), vec![json!("hello"), json!("newer")]);

    let own_join = seen
        .iter()
        .position(|m| m.kind() == MessageKind::SystemJoin && m.origin().map(|o| o.name.as_str()) == Some("B"))
        .expect("own join");
    let hello = seen.iter().position(|m| m.payload() == &json!("hello")).expect("hello");
    assert!(hello < own_join);
}

#[tokio::test]
async fn test_broadcast_reaches_every_subscriber() {
    let broker = helpers::start_broker();
    let a = broker.register("A", "a@x").await.expect("A");
    let b = broker.register("B", "b@y").await.expect("B");
    broker.submit(Submission::broadcast(a.identity(), json!("m2")));

    assert_eq!(broadcast_payloads(&helpers::drain(&broker, &a).await), vec![json!("m2")]);
    assert_eq!(broadcast_payloads(&helpers::drain(&broker, &b).await), vec![json!("m2")]);
}

#[tokio::test]
async fn test_duplicate_name_is_refused() {
    let broker = helpers::start_broker();
    broker.register("A", "a@x").await.expect("A");
    let err = broker.register("A", "z@y").await.unwrap_err();
    assert!(matches!(err, RegisterError::NameInUse { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registration_admits_one() {
    let broker = helpers::start_broker();
    let attempts: Vec<_> = (0..2)
        .map(|_| {
            let broker = broker.clone();
            tokio::spawn(async move { broker.register("alice", "a@x").await })
        })
        .collect();

    let mut ok = 0;
    let mut in_use = 0;
    for attempt in attempts {
        match attempt.await.expect("join") {
            Ok(_) => ok += 1,
            Err(RegisterError::NameInUse { .. }) => in_use += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((ok, in_use), (1, 1));
}

#[tokio::test]
async fn test_unregister_then_broadcast() {
    let broker = helpers::start_broker();
    let a = broker.register("A", "a@x").await.expect("A");
    let b = broker.register("B", "b@y").await.expect("B");
    helpers::drain(&broker, &b).await;

    broker.unregister(&a);
    broker.submit(Submission::broadcast(b.identity(), json!("m3")));

    assert!(broker.next(&a, Duration::from_secs(5)).await.is_done());

    let seen = helpers::drain(&broker, &b).await;
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].kind(), MessageKind::SystemLeave);
    assert_eq!(seen[0].origin().map(|o| o.name.as_str()), Some("A"));
    assert_eq!(seen[1].payload(), &json!("m3"));
}

#[tokio::test]
async fn test_shutdown_releases_blocked_reader() {
    let broker = helpers::start_broker();
    let b = broker.register("B", "b@y").await.expect("B");
    helpers::drain(&broker, &b).await;

    let reader = {
        let broker = broker.clone();
        let b = b.clone();
        tokio::spawn(async move {
            let started = Instant::now();
            let delivery = broker.next(&b, Duration::from_secs(30)).await;
            (delivery, started.elapsed())
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    broker.stop(Duration::from_secs(5)).await.expect("stop");

    let (delivery, waited) = reader.await.expect("join");
    assert_eq!(delivery, Delivery::Done);
    assert!(waited < Duration::from_secs(5));
}

#[tokio::test]
async fn test_next_respects_timeout() {
    let broker = helpers::start_broker();
    let a = broker.register("A", "a@x").await.expect("A");
    helpers::drain(&broker, &a).await;

    let started = Instant::now();
    assert_eq!(broker.next(&a, Duration::from_millis(200)).await, Delivery::NoMessage);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(190));
    assert!(waited < Duration::from_secs(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_producers_share_one_order() {
    let broker = helpers::start_broker();
    let readers = [
        broker.register("r1", "r1@x").await.expect("r1"),
        broker.register("r2", "r2@x").await.expect("r2"),
        broker.register("r3", "r3@x").await.expect("r3"),
    ];

    let producers: Vec<_> = (0..4)
        .map(|p| {
            let broker = broker.clone();
            tokio::spawn(async move {
                let author = Identity::new(format!("p{p}"), format!("p{p}@x"));
                for n in 0..50 {
                    broker.submit(Submission::broadcast(&author, json!({ "p": p, "n": n })));
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for producer in producers {
        producer.await.expect("join");
    }

    let mut streams = Vec::new();
    for reader in &readers {
        let seqs: Vec<u64> = helpers::drain(&broker, reader)
            .await
            .iter()
            .filter(|m| m.kind() == MessageKind::Broadcast)
            .map(|m| m.seq())
            .collect();
        assert_eq!(seqs.len(), 200);
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        streams.push(seqs);
    }
    assert_eq!(streams[0], streams[1]);
    assert_eq!(streams[1], streams[2]);
}

#[tokio::test]
async fn test_private_message_is_isolated() {
    let broker = helpers::start_broker();
    let a = broker.register("A", "a@x").await.expect("A");
    let b = broker.register("B", "b@y").await.expect("B");
    let c = broker.register("C", "c@z").await.expect("C");

    broker.submit(Submission::private(a.identity(), b.id(), json!("for B")));

    let b_seen = helpers::drain(&broker, &b).await;
    assert!(b_seen.iter().any(|m| m.kind() == MessageKind::Private));
    let c_seen = helpers::drain(&broker, &c).await;
    assert!(c_seen.iter().all(|m| m.kind() != MessageKind::Private));

    let late = broker.register("D", "d@w").await.expect("D");
    let replay = helpers::drain(&broker, &late).await;
    assert!(replay.iter().all(|m| m.payload() != &json!("for B")));
}

#[tokio::test]
async fn test_durable_log_switches_targets() {
    let first = tempfile::tempdir().expect("tempdir");
    let second = tempfile::tempdir().expect("tempdir");
    let persistence = PersistenceConfig {
        store_directory: Some(first.path().to_path_buf()),
        ..PersistenceConfig::default()
    };
    let broker = helpers::start_broker_with(helpers::test_broker_config(), persistence.clone());
    let a = broker.register("A", "a@x").await.expect("A");

    broker.submit(Submission::broadcast(a.identity(), json!("one")));
    broker.set_persistence_target(Some(second.path().to_path_buf()));
    broker.submit(Submission::broadcast(a.identity(), json!("two")));
    broker.submit(Submission::private(a.identity(), a.id(), json!("never logged")));
    broker.stop(Duration::from_secs(5)).await.expect("stop");

    let read = |dir: &std::path::Path| -> Vec<serde_json::Value> {
        let raw = std::fs::read_to_string(dir.join(&persistence.file_name)).expect("read log");
        serde_json::from_str::<Vec<serde_json::Value>>(&raw).expect("well-formed log")
    };
    let first_log = read(first.path());
    let second_log = read(second.path());

    assert_eq!(first_log.len(), 1);
    assert_eq!(first_log[0]["payload"], "one");
    assert_eq!(second_log.len(), 1);
    assert_eq!(second_log[0]["payload"], "two");
    assert_eq!(second_log[0]["author"], "A");
}

#[tokio::test]
async fn test_drop_oldest_keeps_newest() {
    let mut config = helpers::test_broker_config();
    config.mailbox_capacity = 2;
    config.overflow_policy = OverflowPolicy::DropOldest;
    let broker = helpers::start_broker_with(config, PersistenceConfig::default());
    let a = broker.register("A", "a@x").await.expect("A");
    helpers::drain(&broker, &a).await;

    for n in 0..5 {
        broker.submit(Submission::broadcast(a.identity(), json!(n)));
    }
    broker.stop(Duration::from_secs(5)).await.expect("stop");

    let seen = helpers::drain(&broker, &a).await;
    assert_eq!(broadcast_payloads(&seen), vec![json!(3), json!(4)]);
    assert_eq!(broker.metrics().dropped, 3);
}

#[tokio::test]
async fn test_late_joiner_with_long_history_is_not_disconnected() {
    let mut config = helpers::test_broker_config();
    config.mailbox_capacity = 4;
    config.overflow_policy = OverflowPolicy::Disconnect;
    let broker = helpers::start_broker_with(config, PersistenceConfig::default());
    let a = broker.register("A", "a@x").await.expect("A");
    helpers::drain(&broker, &a).await;

    for batch in [0..3, 3..6] {
        for n in batch {
            broker.submit(Submission::broadcast(a.identity(), json!(n)));
        }
        helpers::drain(&broker, &a).await;
    }

    let b = broker.register("B", "b@y").await.expect("B");
    let seen = helpers::drain(&broker, &b).await;

    assert_eq!(
        broadcast_payloads(&seen),
        (0..6).map(|n| json!(n)).collect::<Vec<_>>()
    );
    assert_eq!(seen.last().map(|m| m.kind()), Some(MessageKind::SystemJoin));
    assert!(!b.mailbox().is_closed());
    assert_eq!(broker.subscriber_count(), 2);
}
