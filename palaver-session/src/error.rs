use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("websocket connect to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media permission denied")]
    PermissionDenied,
    #[error("no usable capture device: {0}")]
    NoDevice(String),
    #[error("media backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum PeerError {
    #[error(transparent)]
    Rtc(#[from] webrtc::Error),
    #[error("{0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session terminated")]
    Terminated,
}
