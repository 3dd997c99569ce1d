use palaver_core::IceServerConfig;
use palaver_core::utils::DEFAULT_STUN_ADDR;

/// Configuration for one room session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// STUN/TURN servers handed to the peer-connection manager.
    pub ice_servers: Vec<IceServerConfig>,
    /// Whether start-call requests camera capture in addition to audio.
    pub enable_video: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_owned()],
                username: None,
                credential: None,
            }],
            enable_video: true,
        }
    }
}
