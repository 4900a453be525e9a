// tests/property/registry_test.rs

//! Property-based tests for the connection registry
//! Tests that a sweep evicts exactly the closed connections

use crate::test_helpers::{FakeConnection, RecordingHandler, fake_connection, wait_until};
use connector::connection::Connection;
use connector::connector::{Connector, ConnectorConfig};
use proptest::prelude::*;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        max_shrink_iters: 100,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_sweep_keeps_only_open_connections(
        close_flags in prop::collection::vec(any::<bool>(), 0..16)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let connector: Connector<FakeConnection> = Connector::with_configs(
                RecordingHandler::new(),
                [ConnectorConfig::new().with_clean_interval(Duration::from_millis(5))],
            );

            let mut remotes = Vec::new();
            let mut conns = Vec::new();
            for _ in &close_flags {
                let (conn, remote) = fake_connection();
                connector.add_connection(conn.clone());
                conns.push(conn);
                remotes.push(remote);
            }
            for (conn, close) in conns.iter().zip(&close_flags) {
                if *close {
                    conn.close().await;
                }
            }

            let token = CancellationToken::new();
            let runner = connector.clone();
            let run_token = token.clone();
            let start = tokio::spawn(async move { runner.start(run_token).await });

            let open = close_flags.iter().filter(|closed| !**closed).count();
            assert!(
                wait_until(Duration::from_secs(2), || connector.connection_count() == open).await
            );
            assert!(connector.get_connections().iter().all(|conn| !conn.closed()));

            let survivors = connector.get_connections();
            for (conn, close) in conns.iter().zip(&close_flags) {
                let kept = survivors.iter().any(|s| s.equals(Some(conn)));
                assert_eq!(kept, !*close);
            }

            token.cancel();
            start.await.unwrap().unwrap();
        });
    }
}
