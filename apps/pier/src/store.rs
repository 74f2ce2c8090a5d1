use crate::descriptor::{SessionDescriptor, TargetIdentity};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use time::OffsetDateTime;

const STORE_DIR: &str = ".pier";
const SESSIONS_DIR: &str = "sessions";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to determine home directory for session records")]
    NoHome,
    #[error("a debug session for {target} is already recorded at {path}; stop it first or remove the record")]
    SessionActive { target: String, path: PathBuf },
    #[error("failed to write session record {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode session record: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("failed to read session record {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid session record {path}: {source}")]
    Decode {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// On-disk description of a live forwarding session. Carries enough for an
/// external process to locate and display the running tunnel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub component: String,
    pub application: String,
    pub namespace: String,
    pub local_port: u16,
    pub remote_port: u16,
    pub pair: String,
    pub pid: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
}

impl SessionRecord {
    pub fn for_session(descriptor: &SessionDescriptor) -> Self {
        let pair = descriptor.pair();
        let target = descriptor.target();
        Self {
            component: target.component.clone(),
            application: target.application.clone(),
            namespace: target.namespace.clone(),
            local_port: pair.local,
            remote_port: pair.remote,
            pair: descriptor.pair_text(),
            pid: std::process::id(),
            started_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Files one TOML record per target identity under a root directory,
/// `~/.pier/sessions` by default.
#[derive(Clone, Debug)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn open_default() -> Result<Self, StoreError> {
        Ok(Self::new(Self::default_root()?))
    }

    pub fn default_root() -> Result<PathBuf, StoreError> {
        let base = BaseDirs::new().ok_or(StoreError::NoHome)?;
        Ok(base.home_dir().join(STORE_DIR).join(SESSIONS_DIR))
    }

    pub fn record_path(&self, target: &TargetIdentity) -> PathBuf {
        self.root.join(format!("{}.toml", target.record_key()))
    }

    /// Records a session start. Refuses when a live record already exists for
    /// the same target.
    pub fn write(&self, target: &TargetIdentity, record: &SessionRecord) -> Result<(), StoreError> {
        let path = self.record_path(target);
        if path.exists() {
            return Err(StoreError::SessionActive {
                target: target.to_string(),
                path,
            });
        }
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Write {
            path: self.root.clone(),
            source,
        })?;
        let serialized = toml::to_string_pretty(record)?;
        fs::write(&path, serialized).map_err(|source| StoreError::Write { path, source })
    }

    /// Lookup-by-key for sibling tooling; `None` when no session is recorded.
    pub fn read(&self, target: &TargetIdentity) -> Result<Option<SessionRecord>, StoreError> {
        let path = self.record_path(target);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).map_err(|source| StoreError::Read {
            path: path.clone(),
            source,
        })?;
        let record = toml::from_str(&raw).map_err(|source| StoreError::Decode { path, source })?;
        Ok(Some(record))
    }

    /// Best-effort removal on session exit. Tolerates a missing record and
    /// never fails teardown; a real removal error is only logged.
    pub fn delete(&self, target: &TargetIdentity) {
        let path = self.record_path(target);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(
                    target: "pier::store",
                    path = %path.display(),
                    error = %err,
                    "failed to remove session record"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{PortPair, SessionDescriptor};

    fn temp_store() -> SessionStore {
        let root = std::env::temp_dir().join(format!("pier-store-{}", uuid::Uuid::new_v4()));
        SessionStore::new(root)
    }

    fn descriptor() -> SessionDescriptor {
        SessionDescriptor::new(
            PortPair {
                local: 9000,
                remote: 5858,
            },
            TargetIdentity {
                component: "backend".into(),
                application: "shop".into(),
                namespace: "dev".into(),
            },
        )
    }

    #[test]
    fn write_read_delete_round_trip() {
        let store = temp_store();
        let descriptor = descriptor();
        let record = SessionRecord::for_session(&descriptor);

        store.write(descriptor.target(), &record).expect("write");
        let read = store
            .read(descriptor.target())
            .expect("read")
            .expect("record present");
        assert_eq!(read.pair, "9000:5858");
        assert_eq!(read.local_port, 9000);
        assert_eq!(read.remote_port, 5858);
        assert_eq!(read.pid, std::process::id());

        store.delete(descriptor.target());
        assert!(store.read(descriptor.target()).expect("read").is_none());
        fs::remove_dir_all(&store.root).ok();
    }

    #[test]
    fn second_write_for_live_record_is_rejected() {
        let store = temp_store();
        let descriptor = descriptor();
        let record = SessionRecord::for_session(&descriptor);

        store.write(descriptor.target(), &record).expect("write");
        let err = store.write(descriptor.target(), &record).unwrap_err();
        assert!(matches!(err, StoreError::SessionActive { .. }));

        store.delete(descriptor.target());
        fs::remove_dir_all(&store.root).ok();
    }

    #[test]
    fn delete_of_missing_record_is_a_no_op() {
        let store = temp_store();
        let descriptor = descriptor();
        store.delete(descriptor.target());
        assert!(store.read(descriptor.target()).expect("read").is_none());
    }
}
