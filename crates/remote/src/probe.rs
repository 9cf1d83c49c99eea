//! Startup connectivity check

use crate::endpoint::RemoteEndpoint;
use crate::rsync::run_checked;
use crate::{ConnectivityCheck, Result, SyncError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::info;

/// Seconds ssh may spend establishing the probe connection
const CONNECT_TIMEOUT_SECS: u32 = 10;

/// Probes the endpoint the mirror is written to
///
/// Remote endpoints: a non-interactive `ssh host true`.
/// Local endpoints: the destination directory must exist.
pub struct EndpointProbe {
    endpoint: RemoteEndpoint,
    ssh_binary: String,
    key_file: Option<PathBuf>,
}

impl EndpointProbe {
    pub fn new(endpoint: RemoteEndpoint, ssh_binary: impl Into<String>, key_file: Option<PathBuf>) -> Self {
        Self {
            endpoint,
            ssh_binary: ssh_binary.into(),
            key_file,
        }
    }

    fn ssh_args(&self, host: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-o".into(),
            "BatchMode=yes".into(),
            "-o".into(),
            format!("ConnectTimeout={}", CONNECT_TIMEOUT_SECS).into(),
        ];
        if let Some(key) = &self.key_file {
            args.push("-i".into());
            args.push(key.clone().into_os_string());
        }
        args.push(host.into());
        args.push("true".into());
        args
    }
}

#[async_trait]
impl ConnectivityCheck for EndpointProbe {
    async fn probe(&self) -> Result<()> {
        match &self.endpoint {
            RemoteEndpoint::Ssh { host, .. } => {
                run_checked(&self.ssh_binary, &self.ssh_args(host))
                    .await
                    .map_err(|e| SyncError::Unreachable(format!("{}: {}", host, e)))?;
            }
            RemoteEndpoint::Local(path) => {
                let is_dir = tokio::fs::metadata(path)
                    .await
                    .map(|m| m.is_dir())
                    .unwrap_or(false);
                if !is_dir {
                    return Err(SyncError::Unreachable(format!(
                        "{} is not a directory",
                        path.display()
                    )));
                }
            }
        }

        info!("Remote endpoint {} reachable", self.endpoint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_directory_reachable() {
        let temp_dir = TempDir::new().unwrap();
        let endpoint = RemoteEndpoint::Local(temp_dir.path().to_path_buf());
        let probe = EndpointProbe::new(endpoint, "ssh", None);

        assert!(probe.probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_local_missing_directory_unreachable() {
        let temp_dir = TempDir::new().unwrap();
        let endpoint = RemoteEndpoint::Local(temp_dir.path().join("missing"));
        let probe = EndpointProbe::new(endpoint, "ssh", None);

        let err = probe.probe().await.unwrap_err();
        assert!(matches!(err, SyncError::Unreachable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ssh_failure_is_unreachable() {
        let endpoint = RemoteEndpoint::parse("me@nas:/srv").unwrap();
        // `false` stands in for an ssh that cannot connect
        let probe = EndpointProbe::new(endpoint, "false", None);

        let err = probe.probe().await.unwrap_err();
        assert!(matches!(err, SyncError::Unreachable(_)));
    }

    #[test]
    fn test_ssh_args() {
        let endpoint = RemoteEndpoint::parse("me@nas:/srv").unwrap();
        let probe = EndpointProbe::new(endpoint, "ssh", Some(PathBuf::from("/keys/id")));

        let args: Vec<String> = probe
            .ssh_args("me@nas")
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "-i",
                "/keys/id",
                "me@nas",
                "true"
            ]
        );
    }
}
