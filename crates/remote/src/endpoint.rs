//! Remote endpoint parsing

use crate::{Result, SyncError};
use std::fmt;
use std::path::PathBuf;

/// Destination of the mirror
///
/// Uses rsync's convention: `[user@]host:path` is reached over ssh,
/// anything without a host part is a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEndpoint {
    Ssh { host: String, path: String },
    Local(PathBuf),
}

impl RemoteEndpoint {
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(SyncError::InvalidEndpoint("empty endpoint".to_string()));
        }

        // A colon before the first slash separates host from path
        let first_slash = spec.find('/').unwrap_or(spec.len());
        match spec.find(':') {
            Some(colon) if colon < first_slash => {
                let (host, path) = (&spec[..colon], &spec[colon + 1..]);
                if host.is_empty() || host.ends_with('@') {
                    return Err(SyncError::InvalidEndpoint(format!("missing host in '{}'", spec)));
                }
                Ok(RemoteEndpoint::Ssh {
                    host: host.to_string(),
                    path: path.to_string(),
                })
            }
            _ => Ok(RemoteEndpoint::Local(PathBuf::from(spec))),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, RemoteEndpoint::Ssh { .. })
    }

    /// Destination argument for rsync, always a directory (trailing slash)
    pub fn rsync_destination(&self) -> String {
        let mut dest = self.to_string();
        if !dest.ends_with('/') {
            dest.push('/');
        }
        dest
    }
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteEndpoint::Ssh { host, path } => write!(f, "{}:{}", host, path),
            RemoteEndpoint::Local(path) => write!(f, "{}", path.display()),
        }
    }
}
