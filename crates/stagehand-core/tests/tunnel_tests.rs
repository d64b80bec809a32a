use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stagehand_core::tunnel::{
    available_port, ClusterClient, KubeResourceType, PodHandle, PodStream, Tunnel, TunnelError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// In-memory cluster: a fixed pod list behind one service, and port-forward
/// streams that echo whatever they receive.
struct EchoCluster {
    pods: Vec<PodHandle>,
    forwarded_pods: Mutex<Vec<String>>,
}

impl EchoCluster {
    fn new(pods: Vec<PodHandle>) -> Self {
        EchoCluster {
            pods,
            forwarded_pods: Mutex::new(Vec::new()),
        }
    }

    fn forwarded_pods(&self) -> Vec<String> {
        self.forwarded_pods.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterClient for EchoCluster {
    async fn get_pod(&self, name: &str) -> Result<PodHandle, TunnelError> {
        self.pods
            .iter()
            .find(|pod| pod.name == name)
            .cloned()
            .ok_or_else(|| TunnelError::PodNotAvailable {
                pod: name.to_string(),
            })
    }

    async fn service_selector(&self, _name: &str) -> Result<BTreeMap<String, String>, TunnelError> {
        let mut selector = BTreeMap::new();
        selector.insert("app".to_string(), "nginx".to_string());
        Ok(selector)
    }

    async fn list_pods(&self, _label_selector: &str) -> Result<Vec<PodHandle>, TunnelError> {
        Ok(self.pods.clone())
    }

    async fn open_stream(
        &self,
        pod_name: &str,
        _remote_port: u16,
    ) -> Result<PodStream, TunnelError> {
        self.forwarded_pods
            .lock()
            .unwrap()
            .push(pod_name.to_string());
        let (local, remote) = tokio::io::duplex(1024);
        tokio::spawn(async move {
            let (mut reader, mut writer) = tokio::io::split(remote);
            let _ = tokio::io::copy(&mut reader, &mut writer).await;
        });
        Ok(Box::new(local))
    }
}

#[tokio::test]
async fn forwards_to_the_first_available_service_pod() {
    let cluster = Arc::new(EchoCluster::new(vec![
        PodHandle {
            name: "nginx-pending".to_string(),
            available: false,
        },
        PodHandle {
            name: "nginx-running".to_string(),
            available: true,
        },
    ]));

    let local_port = available_port().await.unwrap();
    let mut tunnel = Tunnel::new(
        Arc::clone(&cluster) as Arc<dyn ClusterClient>,
        KubeResourceType::Service,
        "nginx-service",
        local_port,
        80,
    );
    tunnel.forward_port().await.unwrap();

    let mut conn = TcpStream::connect(("127.0.0.1", local_port)).await.unwrap();
    conn.write_all(b"hello tunnel").await.unwrap();
    let mut buf = [0u8; 12];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello tunnel");

    // The startup check and the connection both went to the running pod.
    let forwarded = cluster.forwarded_pods();
    assert!(!forwarded.is_empty());
    assert!(forwarded.iter().all(|pod| pod == "nginx-running"));
    tunnel.close();
}

#[tokio::test]
async fn forwards_to_a_pod_by_name() {
    let cluster = Arc::new(EchoCluster::new(vec![PodHandle {
        name: "nginx-pod".to_string(),
        available: true,
    }]));

    let local_port = available_port().await.unwrap();
    let mut tunnel = Tunnel::new(
        Arc::clone(&cluster) as Arc<dyn ClusterClient>,
        KubeResourceType::Pod,
        "nginx-pod",
        local_port,
        80,
    );
    tunnel.forward_port().await.unwrap();

    let mut conn = TcpStream::connect(("127.0.0.1", local_port)).await.unwrap();
    conn.write_all(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    conn.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");

    tunnel.close();
}

#[tokio::test]
async fn service_with_no_available_pod_fails() {
    let cluster = Arc::new(EchoCluster::new(vec![PodHandle {
        name: "nginx-pending".to_string(),
        available: false,
    }]));

    let local_port = available_port().await.unwrap();
    let mut tunnel = Tunnel::new(
        cluster as Arc<dyn ClusterClient>,
        KubeResourceType::Service,
        "nginx-service",
        local_port,
        80,
    );

    let err = tunnel.forward_port().await.unwrap_err();
    assert!(matches!(err, TunnelError::ServiceUnavailable { .. }));
}

#[tokio::test]
async fn unavailable_pod_fails() {
    let cluster = Arc::new(EchoCluster::new(vec![PodHandle {
        name: "nginx-pending".to_string(),
        available: false,
    }]));

    let local_port = available_port().await.unwrap();
    let mut tunnel = Tunnel::new(
        cluster as Arc<dyn ClusterClient>,
        KubeResourceType::Pod,
        "nginx-pending",
        local_port,
        80,
    );

    let err = tunnel.forward_port().await.unwrap_err();
    assert!(matches!(err, TunnelError::PodNotAvailable { .. }));
}

/// A cluster where every pod looks fine but no stream can ever be opened.
struct BrokenForwardCluster;

#[async_trait]
impl ClusterClient for BrokenForwardCluster {
    async fn get_pod(&self, name: &str) -> Result<PodHandle, TunnelError> {
        Ok(PodHandle {
            name: name.to_string(),
            available: true,
        })
    }

    async fn service_selector(&self, _name: &str) -> Result<BTreeMap<String, String>, TunnelError> {
        Ok(BTreeMap::new())
    }

    async fn list_pods(&self, _label_selector: &str) -> Result<Vec<PodHandle>, TunnelError> {
        Ok(vec![PodHandle {
            name: "nginx-pod".to_string(),
            available: true,
        }])
    }

    async fn open_stream(
        &self,
        _pod_name: &str,
        _remote_port: u16,
    ) -> Result<PodStream, TunnelError> {
        Err(TunnelError::StreamSetupFailed(
            "forwarding disabled".to_string(),
        ))
    }
}

#[tokio::test]
async fn stream_setup_failure_is_surfaced_at_startup() {
    let local_port = available_port().await.unwrap();
    let mut tunnel = Tunnel::new(
        Arc::new(BrokenForwardCluster) as Arc<dyn ClusterClient>,
        KubeResourceType::Pod,
        "nginx-pod",
        local_port,
        80,
    );

    let err = tunnel.forward_port().await.unwrap_err();
    assert!(matches!(err, TunnelError::StreamSetupFailed(_)));

    // Startup failed, so nothing is listening on the local port.
    assert!(TcpStream::connect(("127.0.0.1", local_port)).await.is_err());
}

#[tokio::test]
async fn closed_tunnel_stops_accepting() {
    let cluster = Arc::new(EchoCluster::new(vec![PodHandle {
        name: "nginx-pod".to_string(),
        available: true,
    }]));

    let local_port = available_port().await.unwrap();
    let mut tunnel = Tunnel::new(
        cluster as Arc<dyn ClusterClient>,
        KubeResourceType::Pod,
        "nginx-pod",
        local_port,
        80,
    );
    tunnel.forward_port().await.unwrap();
    tunnel.close();

    // The accept loop exits once the stop signal fires; give it a moment and
    // then check that new connections no longer reach an echo stream.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    match TcpStream::connect(("127.0.0.1", local_port)).await {
        // The listener is dropped with the task, so connecting fails...
        Err(_) => {}
        // ...or the connection is accepted by the OS backlog and then closed
        // without ever being served.
        Ok(mut conn) => {
            let mut buf = [0u8; 1];
            let n = conn.read(&mut buf).await.unwrap_or(0);
            assert_eq!(n, 0);
        }
    }
}

#[tokio::test]
async fn available_port_is_usable() {
    let port = available_port().await.unwrap();
    assert!(port > 0);

    // The port was released, so binding it again works.
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .unwrap();
    drop(listener);
}
