//! Session store: the signed-in credential, kept in memory and in durable local storage.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use crate::client::error::{ClientError, StorageError, ValidationError};

/// Identity of the signed-in user.
///
/// Persisted under the well-known keys `token`, `username` and `userId`. A session without a
/// token carries no username or user id either.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub username: Option<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
}

impl Session {
    fn signed_in(token: String, username: String, user_id: i64) -> Self {
        Self {
            token: Some(token),
            username: Some(username),
            user_id: Some(user_id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// drops identity fields left behind without a token
    fn normalized(self) -> Self {
        if self.is_authenticated() {
            self
        } else {
            Self::default()
        }
    }
}

/// Durable client-local storage for the session record.
pub trait Storage: Send + Sync {
    fn load(&self) -> Result<Option<Session>, StorageError>;
    /// replaces the whole record in one step
    fn save(&self, session: &Session) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Keeps the session as a json file; writes go through a sibling temp file and a rename.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(session)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Process-local storage. Clones share the same record, which lets a test play a restart by
/// opening a second [`SessionStore`] over a clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    record: Arc<Mutex<Option<Session>>>,
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Option<Session>, StorageError> {
        Ok(self.record.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: &Session) -> Result<(), StorageError> {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

/// The single writer of the session. Shared by reference between the gateway and the
/// controllers; login and logout hold the write lock across the storage update, so readers
/// only ever observe a whole session or none.
pub struct SessionStore {
    storage: Box<dyn Storage>,
    current: RwLock<Session>,
}

impl SessionStore {
    /// Hydrates from `storage`. A missing or unreadable record starts signed out.
    pub fn open(storage: impl Storage + 'static) -> Self {
        let current = match storage.load() {
            Ok(Some(session)) => session.normalized(),
            Ok(None) => Session::default(),
            Err(e) => {
                warn!("ignoring unreadable session record, {}", e);
                Session::default()
            }
        };
        Self {
            storage: Box::new(storage),
            current: RwLock::new(current),
        }
    }

    /// Replaces any prior session. Nothing changes when the record cannot be persisted.
    pub fn login(&self, token: impl Into<String>, username: impl Into<String>, user_id: i64) -> Result<(), ClientError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ValidationError::EmptyToken.into());
        }
        let session = Session::signed_in(token, username.into(), user_id);
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.storage.save(&session)?;
        info!("signed in as user_id={}", user_id);
        *current = session;
        Ok(())
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        self.storage.clear()?;
        if current.is_authenticated() {
            info!("signed out user_id={:?}", current.user_id);
        }
        *current = Session::default();
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn token(&self) -> Option<String> {
        self.read().token.clone()
    }

    pub fn username(&self) -> Option<String> {
        self.read().username.clone()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.read().user_id
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}
