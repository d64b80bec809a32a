//! Port-forward tunnels to Kubernetes resources.
//!
//! A [`Tunnel`] proxies a local TCP port to a remote port on a cluster pod,
//! optionally selecting the pod through a service's label selector. The
//! cluster interaction goes through the injected [`ClusterClient`] seam; the
//! tunnel itself owns only the lifecycle (start and stop signals) and the
//! pod-selection policy.

mod client;
mod error;
mod kube;

pub use client::{ClusterClient, PodHandle, PodStream};
pub use error::TunnelError;
pub use kube::KubeClusterClient;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Connection options for reaching a cluster: which kubeconfig, which
/// context, which namespace.
#[derive(Debug, Clone)]
pub struct KubectlOptions {
    pub context_name: Option<String>,
    pub config_path: Option<PathBuf>,
    pub namespace: String,
}

impl KubectlOptions {
    pub fn new(context_name: Option<String>, config_path: Option<PathBuf>) -> Self {
        KubectlOptions {
            context_name,
            config_path,
            namespace: "default".to_string(),
        }
    }
}

impl Default for KubectlOptions {
    fn default() -> Self {
        KubectlOptions::new(None, None)
    }
}

/// Resource kinds that support port forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KubeResourceType {
    Pod,
    Service,
}

impl fmt::Display for KubeResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KubeResourceType::Pod => write!(f, "pod"),
            KubeResourceType::Service => write!(f, "svc"),
        }
    }
}

/// Configures and manages one port-forwarding tunnel.
///
/// Constructed idle with [`Tunnel::new`], started with
/// [`Tunnel::forward_port`], terminated with [`Tunnel::close`]. A closed
/// tunnel cannot be restarted.
pub struct Tunnel {
    client: Arc<dyn ClusterClient>,
    pub resource_type: KubeResourceType,
    pub resource_name: String,
    pub local_port: u16,
    pub remote_port: u16,
    stop: CancellationToken,
    forward_task: Option<JoinHandle<()>>,
}

impl Tunnel {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        resource_type: KubeResourceType,
        resource_name: impl Into<String>,
        local_port: u16,
        remote_port: u16,
    ) -> Self {
        Tunnel {
            client,
            resource_type,
            resource_name: resource_name.into(),
            local_port,
            remote_port,
            stop: CancellationToken::new(),
            forward_task: None,
        }
    }

    /// Opens the tunnel: resolves the target pod, verifies that a
    /// port-forward stream to it can be established, binds the local port
    /// and starts serving connections in a background task. Returns once the
    /// local listener is accepting. The stop signal fires on every failure
    /// path so partial state never lingers.
    pub async fn forward_port(&mut self) -> Result<(), TunnelError> {
        match self.start().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.stop.cancel();
                Err(e)
            }
        }
    }

    async fn start(&mut self) -> Result<(), TunnelError> {
        info!(
            "creating a port forwarding tunnel for resource {}/{} routing local port {} to remote port {}",
            self.resource_type, self.resource_name, self.local_port, self.remote_port,
        );

        let pod_name = self.attachable_pod().await?;
        info!(pod = %pod_name, "selected pod to open port forward to");

        // A tunnel that can never forward must fail at startup, not on the
        // first connection. Per-connection streams are opened lazily later.
        let stream = self.client.open_stream(&pod_name, self.remote_port).await?;
        drop(stream);

        let listener = TcpListener::bind(("127.0.0.1", self.local_port)).await?;

        let client = Arc::clone(&self.client);
        let stop = self.stop.clone();
        let remote_port = self.remote_port;
        let task = tokio::spawn(async move {
            serve_connections(listener, client, pod_name, remote_port, stop).await;
        });
        self.forward_task = Some(task);

        info!("successfully created port forwarding tunnel");
        Ok(())
    }

    /// Disconnects the tunnel by firing the stop signal. The background task
    /// exits promptly; in-flight connections are dropped.
    pub fn close(&mut self) {
        self.stop.cancel();
    }

    /// Finds a pod that can be port forwarded to for the configured resource.
    async fn attachable_pod(&self) -> Result<String, TunnelError> {
        match self.resource_type {
            KubeResourceType::Pod => {
                let pod = self.client.get_pod(&self.resource_name).await?;
                if !pod.available {
                    return Err(TunnelError::PodNotAvailable { pod: pod.name });
                }
                Ok(pod.name)
            }
            KubeResourceType::Service => {
                let selector = self.client.service_selector(&self.resource_name).await?;
                let label_selector = selector
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect::<Vec<_>>()
                    .join(",");
                let pods = self.client.list_pods(&label_selector).await?;
                pods.into_iter()
                    .find(|pod| pod.available)
                    .map(|pod| pod.name)
                    .ok_or_else(|| TunnelError::ServiceUnavailable {
                        service: self.resource_name.clone(),
                    })
            }
        }
    }
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

async fn serve_connections(
    listener: TcpListener,
    client: Arc<dyn ClusterClient>,
    pod_name: String,
    remote_port: u16,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            accepted = listener.accept() => {
                let (conn, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "failed to accept tunnel connection");
                        continue;
                    }
                };
                debug!(%peer, "accepted tunnel connection");
                let client = Arc::clone(&client);
                let pod_name = pod_name.clone();
                let stop = stop.clone();
                tokio::spawn(async move {
                    proxy_connection(conn, client, pod_name, remote_port, stop).await;
                });
            }
        }
    }
}

async fn proxy_connection(
    mut conn: tokio::net::TcpStream,
    client: Arc<dyn ClusterClient>,
    pod_name: String,
    remote_port: u16,
    stop: CancellationToken,
) {
    let mut upstream = match client.open_stream(&pod_name, remote_port).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(pod = %pod_name, error = %e, "failed to open port-forward stream");
            return;
        }
    };
    tokio::select! {
        _ = stop.cancelled() => {}
        result = tokio::io::copy_bidirectional(&mut conn, &mut upstream) => {
            if let Err(e) = result {
                debug!(error = %e, "tunnel connection closed with error");
            }
        }
    }
}

/// Retrieves an available port on the host machine by binding an ephemeral
/// listener and reading back the OS-assigned port. The port is released
/// before returning, so it is advisory: a race with another process taking
/// the same port is accepted.
pub async fn available_port() -> Result<u16, std::io::Error> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    Ok(listener.local_addr()?.port())
}
