use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::error::TunnelError;

/// Marker trait for the bidirectional byte streams handed out by a cluster
/// client.
pub trait AsyncReadWrite: AsyncRead + AsyncWrite {}

impl<T: AsyncRead + AsyncWrite + ?Sized> AsyncReadWrite for T {}

/// A bidirectional stream to a remote port on a pod.
pub type PodStream = Box<dyn AsyncReadWrite + Send + Unpin>;

/// What the tunnel needs to know about a pod.
#[derive(Debug, Clone)]
pub struct PodHandle {
    pub name: String,
    pub available: bool,
}

/// The cluster operations a tunnel depends on. Production code uses
/// [`super::KubeClusterClient`]; tests inject an in-memory fake.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Looks up a single pod by name.
    async fn get_pod(&self, name: &str) -> Result<PodHandle, TunnelError>;

    /// Returns the label selector of the named service.
    async fn service_selector(&self, name: &str) -> Result<BTreeMap<String, String>, TunnelError>;

    /// Lists pods matching a `key=value,key=value` label selector.
    async fn list_pods(&self, label_selector: &str) -> Result<Vec<PodHandle>, TunnelError>;

    /// Opens a port-forward stream to the given remote port on a pod.
    async fn open_stream(&self, pod_name: &str, remote_port: u16) -> Result<PodStream, TunnelError>;
}
