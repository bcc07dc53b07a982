use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::token::Token;

const CREDENTIAL_FILE_VERSION: u32 = 1;

/// Persistence for the token across restarts.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Token>, AuthError>;
    fn save(&self, token: &Token) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

/// File-backed credential store using a TOML file.
///
/// # Example
/// ```no_run
/// use nightbot_sr::auth::{CredentialStore, FileCredentialStore, Token};
///
/// let store = FileCredentialStore::new_default();
/// store.save(&Token::bearer("access"))?;
/// # Ok::<(), nightbot_sr::auth::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `credentials.toml` inside [`crate::config::default_data_dir`].
    pub fn new_default() -> Self {
        Self::in_dir(&crate::config::default_data_dir())
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("credentials.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Token>, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Io(err.to_string())),
        };
        let file: CredentialFile = toml::from_str(&raw)?;
        if file.version != CREDENTIAL_FILE_VERSION {
            return Err(AuthError::Serialization(format!(
                "unsupported credentials file version {} at {}",
                file.version,
                self.path.display()
            )));
        }
        Ok(Some(file.token))
    }

    fn save(&self, token: &Token) -> Result<(), AuthError> {
        Self::ensure_parent(&self.path)?;
        let file = CredentialFile {
            version: CREDENTIAL_FILE_VERSION,
            token: token.clone(),
            saved_at: Utc::now(),
        };
        let serialized = toml::to_string(&file)?;
        fs::write(&self.path, serialized)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Io(err.to_string())),
        }
    }
}

/// Credential store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<Token>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Token>, AuthError> {
        Ok(self
            .token
            .lock()
            .map_err(|_| AuthError::Io("credential lock poisoned".into()))?
            .clone())
    }

    fn save(&self, token: &Token) -> Result<(), AuthError> {
        *self
            .token
            .lock()
            .map_err(|_| AuthError::Io("credential lock poisoned".into()))? = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self
            .token
            .lock()
            .map_err(|_| AuthError::Io("credential lock poisoned".into()))? = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialFile {
    version: u32,
    token: Token,
    saved_at: DateTime<Utc>,
}
