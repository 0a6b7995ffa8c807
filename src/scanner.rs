//! Swarm scanner: one polling cycle's read-and-classify step.
//!
//! Fetches the torrent list and each torrent's peer swarm, runs every
//! peer through the classifier, and returns the distinct set of
//! addresses to ban this cycle. A fetch failure on any torrent aborts
//! the whole cycle rather than silently skipping it, so partial
//! results never desynchronize the registry.

use std::collections::BTreeSet;

use log::{debug, info, warn};

use crate::api::{ApiError, ControlPlane, PeerDetail};
use crate::fingerprint::{classify, match_category, ClassificationPolicy, PeerObservation};
use crate::utils::addr::{normalize_peer_address, peer_port};

/// A scan failure, tagged with the operation that failed.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to fetch torrent list: {0}")]
    TorrentList(#[source] ApiError),
    #[error("failed to fetch peers for torrent {hash}: {source}")]
    TorrentPeers {
        hash: String,
        #[source]
        source: ApiError,
    },
}

/// Scan every swarm once and collect the addresses to ban.
///
/// Purely read-then-compute: no shared state is mutated. Duplicate
/// detections within or across torrents collapse to one address.
pub fn scan_swarms<C: ControlPlane>(
    api: &C,
    policy: &ClassificationPolicy,
) -> Result<BTreeSet<String>, ScanError> {
    let torrents = api.list_torrents().map_err(ScanError::TorrentList)?;
    debug!("scanning {} torrent swarms", torrents.len());

    let mut flagged = BTreeSet::new();
    for torrent in &torrents {
        let peers = api
            .torrent_peers(&torrent.hash)
            .map_err(|source| ScanError::TorrentPeers {
                hash: torrent.hash.clone(),
                source,
            })?;

        for (endpoint, detail) in &peers {
            let observation = build_observation(endpoint, detail);
            let Some(category) = match_category(&observation.fingerprint, policy) else {
                continue;
            };
            info!(
                "detected {} in '{}': {} ({})",
                category.label(),
                torrent.name,
                observation.fingerprint,
                observation.host
            );
            if classify(&observation, policy) {
                warn!(
                    "banning {} (client: {}, country: {})",
                    observation.host, observation.fingerprint, observation.country
                );
                flagged.insert(observation.host);
            }
        }
    }

    Ok(flagged)
}

/// Build an immutable peer snapshot from one wire entry.
fn build_observation(endpoint: &str, detail: &PeerDetail) -> PeerObservation {
    let host = normalize_peer_address(endpoint);
    let is_ipv6 = host.contains(':');
    PeerObservation {
        port: peer_port(endpoint).unwrap_or(0),
        is_ipv6,
        host,
        fingerprint: detail.client.clone(),
        progress: detail.progress,
        downloaded: detail.downloaded,
        uploaded: detail.uploaded,
        country: detail.country.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TorrentSummary;
    use std::collections::HashMap;

    /// In-memory control plane serving a fixed torrent/peer layout.
    struct FixedControlPlane {
        torrents: Vec<TorrentSummary>,
        peers: HashMap<String, HashMap<String, PeerDetail>>,
        fail_peers_for: Option<String>,
    }

    impl FixedControlPlane {
        fn new() -> Self {
            Self {
                torrents: Vec::new(),
                peers: HashMap::new(),
                fail_peers_for: None,
            }
        }

        fn add_torrent(&mut self, hash: &str, name: &str) {
            self.torrents.push(TorrentSummary {
                hash: hash.to_string(),
                name: name.to_string(),
            });
            self.peers.entry(hash.to_string()).or_default();
        }

        fn add_peer(&mut self, hash: &str, endpoint: &str, client: &str, uploaded: u64) {
            self.peers.entry(hash.to_string()).or_default().insert(
                endpoint.to_string(),
                PeerDetail {
                    client: client.to_string(),
                    progress: 0.0,
                    downloaded: 0,
                    uploaded,
                    country: String::new(),
                },
            );
        }
    }

    impl ControlPlane for FixedControlPlane {
        fn authenticate(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        fn list_torrents(&self) -> Result<Vec<TorrentSummary>, ApiError> {
            Ok(self.torrents.clone())
        }

        fn torrent_peers(&self, hash: &str) -> Result<HashMap<String, PeerDetail>, ApiError> {
            if self.fail_peers_for.as_deref() == Some(hash) {
                return Err(ApiError::Read(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "peer fetch failed",
                )));
            }
            Ok(self.peers.get(hash).cloned().unwrap_or_default())
        }

        fn set_banned_addresses(&self, _banned: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn lenient_policy() -> ClassificationPolicy {
        ClassificationPolicy {
            ban_leech: true,
            ban_player: true,
            ban_others: true,
            skip_ratio_check: true,
            upload_threshold: 1_048_576,
        }
    }

    #[test]
    fn test_scan_collects_only_banworthy_peers() {
        let mut api = FixedControlPlane::new();
        api.add_torrent("aaa", "linux.iso");
        api.add_peer("aaa", "203.0.113.7:6881", "Xunlei 0.0.1.2", 0);
        api.add_peer("aaa", "198.51.100.2:51413", "qBittorrent/4.6.2", 0);

        let flagged = scan_swarms(&api, &lenient_policy()).unwrap();
        assert_eq!(flagged.into_iter().collect::<Vec<_>>(), vec!["203.0.113.7"]);
    }

    #[test]
    fn test_duplicate_peer_across_torrents_collapses() {
        let mut api = FixedControlPlane::new();
        api.add_torrent("aaa", "linux.iso");
        api.add_torrent("bbb", "bsd.iso");
        api.add_peer("aaa", "203.0.113.7:6881", "Xunlei 0.0.1.2", 0);
        api.add_peer("bbb", "203.0.113.7:9090", "Xunlei 0.0.1.2", 0);

        let flagged = scan_swarms(&api, &lenient_policy()).unwrap();
        assert_eq!(flagged.len(), 1);
    }

    #[test]
    fn test_peer_fetch_failure_aborts_the_cycle() {
        let mut api = FixedControlPlane::new();
        api.add_torrent("aaa", "linux.iso");
        api.add_torrent("bbb", "bsd.iso");
        api.add_peer("aaa", "203.0.113.7:6881", "Xunlei 0.0.1.2", 0);
        api.fail_peers_for = Some("bbb".to_string());

        let err = scan_swarms(&api, &lenient_policy()).unwrap_err();
        match err {
            ScanError::TorrentPeers { hash, .. } => assert_eq!(hash, "bbb"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_observation_splits_endpoint() {
        let detail = PeerDetail {
            client: "Xunlei 0.0.1.2".to_string(),
            progress: 0.0,
            downloaded: 0,
            uploaded: 0,
            country: "CN".to_string(),
        };

        let observation = build_observation("[2001:db8::1]:6881", &detail);
        assert_eq!(observation.host, "2001:db8::1");
        assert_eq!(observation.port, 6881);
        assert!(observation.is_ipv6);

        let observation = build_observation("203.0.113.7:51413", &detail);
        assert_eq!(observation.host, "203.0.113.7");
        assert_eq!(observation.port, 51413);
        assert!(!observation.is_ipv6);
    }

    #[test]
    fn test_ipv6_peer_address_is_normalized() {
        let mut api = FixedControlPlane::new();
        api.add_torrent("aaa", "linux.iso");
        api.add_peer("aaa", "[2001:db8::1]:6881", "Xunlei 0.0.1.2", 0);

        let flagged = scan_swarms(&api, &lenient_policy()).unwrap();
        assert_eq!(flagged.into_iter().collect::<Vec<_>>(), vec!["2001:db8::1"]);
    }
}
