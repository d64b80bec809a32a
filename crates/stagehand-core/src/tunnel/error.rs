use thiserror::Error;

/// Errors that can occur while managing a port-forward tunnel.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// The service's selector matched no available pod.
    #[error("kubernetes service {service} does not have an available pod")]
    ServiceUnavailable { service: String },

    /// The requested pod exists but is not running.
    #[error("kubernetes pod {pod} is not available")]
    PodNotAvailable { pod: String },

    /// The port-forward stream could not be established.
    #[error("failed to set up port-forward stream: {0}")]
    StreamSetupFailed(String),

    /// The kube client could not be configured.
    #[error("kubernetes configuration error: {0}")]
    Config(String),

    /// The cluster API rejected a request.
    #[error("kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// IO error on the local side of the tunnel.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
