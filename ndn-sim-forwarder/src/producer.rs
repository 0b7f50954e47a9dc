//! Local producer faces.
//!
//! A producer is attached to a forwarder under a prefix and receives every
//! Interest the forwarder routes to it. Returning `None` leaves the
//! Interest unanswered, so the consumer eventually times out.

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use ndn_sim_common::ndn::{Data, Interest, Name};
use ndn_sim_common::types::FaceId;
use ndn_sim_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::forwarder::Forwarder;

/// Answers Interests routed to a local face.
#[async_trait]
pub trait Producer: Send + Sync + 'static {
    async fn produce(&self, interest: Interest) -> Option<Data>;
}

/// Producer backed by an async closure
pub struct FnProducer<F> {
    f: F,
}

impl<F> FnProducer<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Producer for FnProducer<F>
where
    F: Fn(Interest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Data>> + Send + 'static,
{
    async fn produce(&self, interest: Interest) -> Option<Data> {
        (self.f)(interest).await
    }
}

/// Options for [`Forwarder::register_prefix`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerOptions {
    /// Whether the prefix route hides shorter prefixes
    pub capture: bool,

    /// Whether Data from this producer is always inserted into the CS
    pub cache: bool,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            capture: true,
            cache: false,
        }
    }
}

/// Answers `<prefix>/ping/...` with empty Data
#[derive(Debug, Clone, Copy, Default)]
pub struct PingServer;

impl PingServer {
    /// Name a node with routable `node_prefix` answers pings under.
    pub fn prefix(node_prefix: &Name) -> Name {
        node_prefix.append("ping")
    }

    /// Registers a ping responder on `forwarder` under `node_prefix`.
    pub async fn register(forwarder: &Forwarder, node_prefix: &Name) -> Result<FaceId> {
        forwarder
            .register_prefix(Self::prefix(node_prefix), PingServer, ProducerOptions::default())
            .await
    }
}

#[async_trait]
impl Producer for PingServer {
    async fn produce(&self, interest: Interest) -> Option<Data> {
        debug!("Ping {}", interest.name);
        Some(Data::new(interest.name, Bytes::new()))
    }
}

/// Serves stored certificate Data packets by name.
///
/// Cloning shares the store, so certificates can be added after the server
/// has been registered.
#[derive(Debug, Clone, Default)]
pub struct CertificateServer {
    certificates: Arc<RwLock<BTreeMap<Name, Data>>>,
}

impl CertificateServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_certificate(&self, certificate: Data) {
        debug!("Certificate added: {}", certificate.name);
        self.certificates
            .write()
            .await
            .insert(certificate.name.clone(), certificate);
    }

    pub async fn remove_certificate(&self, name: &Name) -> Option<Data> {
        self.certificates.write().await.remove(name)
    }

    pub async fn len(&self) -> usize {
        self.certificates.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.certificates.read().await.is_empty()
    }
}

#[async_trait]
impl Producer for CertificateServer {
    async fn produce(&self, interest: Interest) -> Option<Data> {
        let certificates = self.certificates.read().await;
        if let Some(certificate) = certificates.get(&interest.name) {
            return Some(certificate.clone());
        }
        if !interest.can_be_prefix {
            return None;
        }
        certificates
            .range(interest.name.clone()..)
            .take_while(|(name, _)| interest.name.is_prefix_of(name))
            .map(|(_, certificate)| certificate.clone())
            .next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ping_server_echoes_name() {
        let data = PingServer.produce(Interest::new("/a/ping/123")).await.unwrap();
        assert_eq!(data.name, Name::from("/a/ping/123"));
        assert!(data.content.is_empty());
        assert_eq!(PingServer::prefix(&Name::from("/a")), Name::from("/a/ping"));
    }

    #[tokio::test]
    async fn test_certificate_server_lookup() {
        let server = CertificateServer::new();
        server
            .add_certificate(Data::new("/a/KEY/1/self/v1", "cert"))
            .await;
        assert_eq!(server.len().await, 1);

        assert!(server.produce(Interest::new("/a/KEY/1")).await.is_none());
        let cert = server
            .produce(Interest::new("/a/KEY/1").with_can_be_prefix(true))
            .await
            .unwrap();
        assert_eq!(cert.content.as_ref(), b"cert");
        assert!(server.produce(Interest::new("/a/KEY/1/self/v1")).await.is_some());

        server.remove_certificate(&Name::from("/a/KEY/1/self/v1")).await;
        assert!(server.is_empty().await);
    }

    #[tokio::test]
    async fn test_fn_producer() {
        let producer = FnProducer::new(|i: Interest| async move {
            (i.name.len() > 1).then(|| Data::new(i.name, "deep"))
        });
        assert!(producer.produce(Interest::new("/x")).await.is_none());
        assert!(producer.produce(Interest::new("/x/y")).await.is_some());
    }
}
