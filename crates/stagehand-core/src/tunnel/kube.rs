//! Cluster client backed by the kube client library.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{Context, Poll};

use ::kube::api::{Api, ListParams, Portforwarder};
use ::kube::config::{KubeConfigOptions, Kubeconfig};
use ::kube::{Client, Config, ResourceExt};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Pod, Service};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::client::{AsyncReadWrite, ClusterClient, PodHandle, PodStream};
use super::error::TunnelError;
use super::KubectlOptions;

/// Talks to a real cluster, resolved from the kubeconfig the options name.
pub struct KubeClusterClient {
    pods: Api<Pod>,
    services: Api<Service>,
}

impl KubeClusterClient {
    /// Builds a client for the cluster and namespace the options describe.
    /// Without an explicit config path, the default kubeconfig locations are
    /// searched.
    pub async fn from_options(options: &KubectlOptions) -> Result<Self, TunnelError> {
        let config_options = KubeConfigOptions {
            context: options.context_name.clone(),
            cluster: None,
            user: None,
        };
        let config = match &options.config_path {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)
                    .map_err(|e| TunnelError::Config(e.to_string()))?;
                Config::from_custom_kubeconfig(kubeconfig, &config_options)
                    .await
                    .map_err(|e| TunnelError::Config(e.to_string()))?
            }
            None => Config::from_kubeconfig(&config_options)
                .await
                .map_err(|e| TunnelError::Config(e.to_string()))?,
        };
        let client = Client::try_from(config).map_err(TunnelError::Api)?;
        Ok(KubeClusterClient {
            pods: Api::namespaced(client.clone(), &options.namespace),
            services: Api::namespaced(client, &options.namespace),
        })
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_pod(&self, name: &str) -> Result<PodHandle, TunnelError> {
        let pod = self.pods.get(name).await?;
        Ok(pod_handle(&pod))
    }

    async fn service_selector(&self, name: &str) -> Result<BTreeMap<String, String>, TunnelError> {
        let service = self.services.get(name).await?;
        Ok(service
            .spec
            .and_then(|spec| spec.selector)
            .unwrap_or_default())
    }

    async fn list_pods(&self, label_selector: &str) -> Result<Vec<PodHandle>, TunnelError> {
        let params = ListParams::default().labels(label_selector);
        let pods = self.pods.list(&params).await?;
        Ok(pods.items.iter().map(pod_handle).collect())
    }

    async fn open_stream(&self, pod_name: &str, remote_port: u16) -> Result<PodStream, TunnelError> {
        let mut forwarder = self
            .pods
            .portforward(pod_name, &[remote_port])
            .await
            .map_err(|e| TunnelError::StreamSetupFailed(e.to_string()))?;
        let stream = forwarder.take_stream(remote_port).ok_or_else(|| {
            TunnelError::StreamSetupFailed(format!("no stream for remote port {remote_port}"))
        })?;
        Ok(Box::new(ForwardedStream {
            stream: Box::new(stream),
            _forwarder: forwarder,
        }))
    }
}

/// A pod is available for forwarding when it is running.
fn pod_handle(pod: &Pod) -> PodHandle {
    let available = pod
        .status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        == Some("Running");
    PodHandle {
        name: pod.name_any(),
        available,
    }
}

/// Keeps the port-forward connection alive for as long as its stream is in
/// use; dropping the forwarder closes the underlying websocket.
struct ForwardedStream {
    stream: Box<dyn AsyncReadWrite + Send + Unpin>,
    _forwarder: Portforwarder,
}

impl AsyncRead for ForwardedStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for ForwardedStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}
