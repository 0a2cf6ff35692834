// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lookup of the host's virtual networks.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slog::{debug, warn, Logger};

/// How long synthesis waits for the virtual network list.
pub const DEFAULT_NETWORK_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VirtualNetworkType {
    Bridged,
    HostOnly,
    Routed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualNetwork {
    pub id: String,
    #[serde(rename = "type")]
    pub network_type: VirtualNetworkType,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

const fn enabled_by_default() -> bool {
    true
}

/// Source of the host's virtual network list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VirtualNetworkQuery: Send + Sync {
    async fn virtual_networks(&self) -> anyhow::Result<Vec<VirtualNetwork>>;
}

/// A fixed network list, for callers that already know the answer.
#[derive(Clone, Debug, Default)]
pub struct StaticNetworkList(pub Vec<VirtualNetwork>);

#[async_trait]
impl VirtualNetworkQuery for StaticNetworkList {
    async fn virtual_networks(&self) -> anyhow::Result<Vec<VirtualNetwork>> {
        Ok(self.0.clone())
    }
}

/// Returns the id of the first enabled bridged network.
///
/// Waits at most `timeout` for the query. A failed or late query yields
/// `None`.
pub async fn default_bridged_network(
    query: &dyn VirtualNetworkQuery,
    timeout: Duration,
    log: &Logger,
) -> Option<String> {
    let networks =
        match tokio::time::timeout(timeout, query.virtual_networks()).await {
            Ok(Ok(networks)) => networks,
            Ok(Err(e)) => {
                warn!(log, "virtual network query failed"; "error" => %e);
                return None;
            }
            Err(_) => {
                warn!(log, "virtual network query timed out";
                    "timeout_ms" => timeout.as_millis() as u64);
                return None;
            }
        };

    let id = networks
        .into_iter()
        .find(|n| n.network_type == VirtualNetworkType::Bridged && n.enabled)
        .map(|n| n.id);
    debug!(log, "default bridged network"; "id" => ?id);
    id
}

#[cfg(test)]
mod test {
    use super::*;

    fn logger() -> Logger {
        Logger::root(slog::Discard, slog::o!())
    }

    fn net(
        id: &str,
        network_type: VirtualNetworkType,
        enabled: bool,
    ) -> VirtualNetwork {
        VirtualNetwork { id: id.to_string(), network_type, enabled }
    }

    struct NeverAnswers;

    #[async_trait]
    impl VirtualNetworkQuery for NeverAnswers {
        async fn virtual_networks(
            &self,
        ) -> anyhow::Result<Vec<VirtualNetwork>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![net("late", VirtualNetworkType::Bridged, true)])
        }
    }

    #[tokio::test]
    async fn picks_first_enabled_bridged() {
        let list = StaticNetworkList(vec![
            net("Host-Only", VirtualNetworkType::HostOnly, true),
            net("Bridged-off", VirtualNetworkType::Bridged, false),
            net("Bridged", VirtualNetworkType::Bridged, true),
            net("Bridged-2", VirtualNetworkType::Bridged, true),
        ]);
        let id = default_bridged_network(
            &list,
            DEFAULT_NETWORK_QUERY_TIMEOUT,
            &logger(),
        )
        .await;
        assert_eq!(id.as_deref(), Some("Bridged"));
    }

    #[tokio::test]
    async fn no_bridged_network() {
        let list = StaticNetworkList(vec![net(
            "Routed",
            VirtualNetworkType::Routed,
            true,
        )]);
        let id = default_bridged_network(
            &list,
            DEFAULT_NETWORK_QUERY_TIMEOUT,
            &logger(),
        )
        .await;
        assert_eq!(id, None);
    }

    #[tokio::test]
    async fn query_failure_yields_none() {
        let mut mock = MockVirtualNetworkQuery::new();
        mock.expect_virtual_networks()
            .times(1)
            .returning(|| Err(anyhow::anyhow!("server went away")));
        let id = default_bridged_network(
            &mock,
            DEFAULT_NETWORK_QUERY_TIMEOUT,
            &logger(),
        )
        .await;
        assert_eq!(id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn query_timeout_yields_none() {
        let id = default_bridged_network(
            &NeverAnswers,
            DEFAULT_NETWORK_QUERY_TIMEOUT,
            &logger(),
        )
        .await;
        assert_eq!(id, None);
    }

    #[test]
    fn network_enabled_defaults_on() {
        let n: VirtualNetwork =
            serde_json::from_str(r#"{"id": "Bridged", "type": "bridged"}"#)
                .unwrap();
        assert!(n.enabled);
        assert_eq!(n.network_type, VirtualNetworkType::Bridged);
    }
}
