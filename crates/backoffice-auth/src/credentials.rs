//! Session credential storage
//!
//! Two key-value scopes back a session. The durable scope is a JSON file that
//! survives restarts; every write uses atomic temp-file + rename. The volatile
//! scope lives in process memory and disappears with the process. "Remember
//! me" at login picks the scope; login always wipes both first, so at most one
//! scope holds a credential pair at a time.
//!
//! Reads check the durable scope first, then the volatile one. Both scopes are
//! guarded by tokio Mutexes; operations touching both always lock durable
//! before volatile.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::constants::{
    ACCESS_EXPIRES_KEY, ACCESS_TOKEN_KEY, REFRESH_EXPIRES_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS,
    USER_KEY,
};
use crate::error::{Error, Result};
use crate::roles::SessionUser;

/// Which key-value scope an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// File-backed, survives restarts
    Durable,
    /// In-memory, cleared when the process ends
    Volatile,
}

impl Scope {
    pub fn label(&self) -> &'static str {
        match self {
            Scope::Durable => "durable",
            Scope::Volatile => "volatile",
        }
    }
}

/// Access + refresh credentials with absolute expirations.
///
/// Expirations are unix timestamps in milliseconds, computed at storage time
/// from the backend's seconds delta.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
    pub access_expires: u64,
    pub refresh_expires: u64,
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"[REDACTED]")
            .field("refresh", &"[REDACTED]")
            .field("access_expires", &self.access_expires)
            .field("refresh_expires", &self.refresh_expires)
            .finish()
    }
}

impl CredentialPair {
    fn write_into(&self, entries: &mut HashMap<String, String>) {
        entries.insert(ACCESS_TOKEN_KEY.into(), self.access.clone());
        entries.insert(REFRESH_TOKEN_KEY.into(), self.refresh.clone());
        entries.insert(ACCESS_EXPIRES_KEY.into(), self.access_expires.to_string());
        entries.insert(REFRESH_EXPIRES_KEY.into(), self.refresh_expires.to_string());
    }

    /// Both tokens must be present; a missing or garbled expiry reads as 0.
    fn read_from(entries: &HashMap<String, String>) -> Option<Self> {
        let expiry = |key: &str| {
            entries
                .get(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
        };
        Some(Self {
            access: entries.get(ACCESS_TOKEN_KEY)?.clone(),
            refresh: entries.get(REFRESH_TOKEN_KEY)?.clone(),
            access_expires: expiry(ACCESS_EXPIRES_KEY),
            refresh_expires: expiry(REFRESH_EXPIRES_KEY),
        })
    }
}

/// Two-scope session store shared by the whole client.
pub struct SessionStore {
    path: PathBuf,
    durable: Mutex<HashMap<String, String>>,
    volatile: Mutex<HashMap<String, String>>,
}

impl SessionStore {
    /// Load the durable scope from `path`; the volatile scope starts empty.
    ///
    /// If the file doesn't exist it is created as `{}` (nobody signed in).
    pub async fn load(path: PathBuf) -> Result<Self> {
        let durable = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing session file: {e}")))?;
            info!(path = %path.display(), keys = entries.len(), "loaded durable session");
            entries
        } else {
            info!(path = %path.display(), "session file not found, starting signed out");
            if let Some(dir) = path.parent() {
                if !dir.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(dir)
                        .await
                        .map_err(|e| Error::Io(format!("creating session directory: {e}")))?;
                }
            }
            let entries = HashMap::new();
            write_atomic(&path, &entries).await?;
            entries
        };

        Ok(Self {
            path,
            durable: Mutex::new(durable),
            volatile: Mutex::new(HashMap::new()),
        })
    }

    /// Raw read of one key in one scope.
    pub async fn get(&self, scope: Scope, key: &str) -> Option<String> {
        match scope {
            Scope::Durable => self.durable.lock().await.get(key).cloned(),
            Scope::Volatile => self.volatile.lock().await.get(key).cloned(),
        }
    }

    /// Raw write of one key in one scope. Durable writes hit disk.
    pub async fn set(&self, scope: Scope, key: &str, value: String) -> Result<()> {
        match scope {
            Scope::Durable => {
                let mut entries = self.durable.lock().await;
                entries.insert(key.to_string(), value);
                write_atomic(&self.path, &entries).await
            }
            Scope::Volatile => {
                self.volatile.lock().await.insert(key.to_string(), value);
                Ok(())
            }
        }
    }

    /// Raw removal of one key in one scope, returning the old value.
    pub async fn remove(&self, scope: Scope, key: &str) -> Result<Option<String>> {
        match scope {
            Scope::Durable => {
                let mut entries = self.durable.lock().await;
                let removed = entries.remove(key);
                if removed.is_some() {
                    write_atomic(&self.path, &entries).await?;
                }
                Ok(removed)
            }
            Scope::Volatile => Ok(self.volatile.lock().await.remove(key)),
        }
    }

    /// First value found for `key`, durable scope first.
    async fn lookup(&self, key: &str) -> Option<String> {
        if let Some(value) = self.get(Scope::Durable, key).await {
            return Some(value);
        }
        self.get(Scope::Volatile, key).await
    }

    pub async fn access_token(&self) -> Option<String> {
        self.lookup(ACCESS_TOKEN_KEY).await
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.lookup(REFRESH_TOKEN_KEY).await
    }

    /// Whether an access credential is stored in either scope.
    pub async fn is_signed_in(&self) -> bool {
        self.access_token().await.is_some()
    }

    /// The stored pair and the scope holding it.
    pub async fn credentials(&self) -> Option<(Scope, CredentialPair)> {
        if let Some(pair) = CredentialPair::read_from(&*self.durable.lock().await) {
            return Some((Scope::Durable, pair));
        }
        CredentialPair::read_from(&*self.volatile.lock().await).map(|pair| (Scope::Volatile, pair))
    }

    /// The signed-in user's profile, if one was stored at login.
    pub async fn user(&self) -> Option<SessionUser> {
        let raw = self.lookup(USER_KEY).await?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "stored user profile is not valid JSON, ignoring");
                None
            }
        }
    }

    /// Store a fresh login. Both scopes are wiped first.
    pub async fn store_login(
        &self,
        pair: &CredentialPair,
        user: Option<&serde_json::Value>,
        scope: Scope,
    ) -> Result<()> {
        let mut durable = self.durable.lock().await;
        let mut volatile = self.volatile.lock().await;
        for key in SESSION_KEYS {
            durable.remove(*key);
            volatile.remove(*key);
        }

        let target = match scope {
            Scope::Durable => &mut *durable,
            Scope::Volatile => &mut *volatile,
        };
        pair.write_into(target);
        if let Some(user) = user {
            target.insert(USER_KEY.into(), user.to_string());
        }

        debug!(scope = scope.label(), "stored login credentials");
        write_atomic(&self.path, &durable).await
    }

    /// Replace the pair after a refresh, in whichever scope currently holds it.
    ///
    /// If neither scope holds a pair (signed out while the refresh was in
    /// flight) the pair goes to the volatile scope so nothing is resurrected
    /// on disk. Returns the scope written.
    pub async fn replace_credentials(&self, pair: &CredentialPair) -> Result<Scope> {
        let mut durable = self.durable.lock().await;
        if durable.contains_key(REFRESH_TOKEN_KEY) {
            pair.write_into(&mut durable);
            write_atomic(&self.path, &durable).await?;
            debug!(scope = "durable", "replaced credentials");
            return Ok(Scope::Durable);
        }
        drop(durable);

        pair.write_into(&mut *self.volatile.lock().await);
        debug!(scope = "volatile", "replaced credentials");
        Ok(Scope::Volatile)
    }

    /// Remove every session key from both scopes.
    pub async fn clear(&self) -> Result<()> {
        let mut durable = self.durable.lock().await;
        let mut volatile = self.volatile.lock().await;
        let mut touched_disk = false;
        for key in SESSION_KEYS {
            touched_disk |= durable.remove(*key).is_some();
            volatile.remove(*key);
        }
        if touched_disk {
            write_atomic(&self.path, &durable).await?;
        }
        debug!("cleared session credentials");
        Ok(())
    }
}

/// Write the durable scope to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains bearer tokens.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing session: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("session path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted durable session");
    Ok(())
}
