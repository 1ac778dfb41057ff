// On-disk client configuration: where the overlay's socket lives, whether
// the client may start it on demand, and default verbosity. Loaded with
// `ron`, the same crate the wider toolchain's config files are written in.

use ron::de::from_reader;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientConfigError {
    #[error("couldn't open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("couldn't parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ron::de::SpannedError,
    },
}

/// Client connection configuration (spec §4.G, §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub socket_path: Option<String>,
    pub start: bool,
    pub verbose: bool,
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig { socket_path: None, start: false, verbose: false }
    }
}

impl ClientConfig {
    /// The socket path to connect to: the configured override, or the
    /// `${XDG_RUNTIME_DIR:-/tmp}/shimeji-overlayd.sock` default (spec §6).
    pub fn resolved_socket_path(&self) -> String {
        self.socket_path.clone().unwrap_or_else(crate::client::default_socket_path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<ClientConfig, ClientConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ClientConfigError::Open {
            path: path.display().to_string(),
            source,
        })?;
        from_reader(file).map_err(|source| ClientConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_the_default_socket_path() {
        std::env::remove_var("XDG_RUNTIME_DIR");
        let config = ClientConfig::default();
        assert_eq!(config.resolved_socket_path(), "/tmp/shimeji-overlayd.sock");
    }

    #[test]
    fn loads_a_ron_file_overriding_the_socket_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.ron");
        std::fs::write(&path, r#"(socket_path: Some("/tmp/custom.sock"), start: true, verbose: false)"#).unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.resolved_socket_path(), "/tmp/custom.sock");
        assert!(config.start);
    }
}
