use crate::error::{CoreError, Result};
use crate::types::User;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Key the logged-in user record is stored under.
pub const USER_KEY: &str = "user";

/// A small persistent key/value store backed by one JSON object on disk.
///
/// Every call reads or rewrites the whole file; the store only ever holds a
/// handful of keys.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a key. A missing file or key is `Ok(None)`; a value that does not
    /// decode as `T` is an error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_all()?.remove(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Write a key. A store file that is not a JSON object is replaced.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let mut entries = self.read_for_update()?;
        entries.insert(key.to_string(), serde_json::to_value(value)?);
        self.write_all(&entries)
    }

    /// Delete a key. A store file that is not a JSON object is reset to an
    /// empty one.
    pub fn remove(&self, key: &str) -> Result<()> {
        match self.read_all() {
            Ok(mut entries) => {
                if entries.remove(key).is_some() {
                    self.write_all(&entries)?;
                }
                Ok(())
            }
            Err(CoreError::Json(_)) => self.write_all(&Map::new()),
            Err(e) => Err(e),
        }
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_for_update(&self) -> Result<Map<String, Value>> {
        match self.read_all() {
            Err(CoreError::Json(_)) => Ok(Map::new()),
            other => other,
        }
    }

    fn write_all(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

/// The mock login state. There are no credentials; logging in just persists
/// the user record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    user: Option<User>,
}

impl Session {
    /// Load the stored user, if any.
    pub fn restore(store: &LocalStore) -> Result<Self> {
        Ok(Self {
            user: store.get(USER_KEY)?,
        })
    }

    pub fn login(&mut self, store: &LocalStore, user: User) -> Result<()> {
        store.set(USER_KEY, &user)?;
        self.user = Some(user);
        Ok(())
    }

    pub fn logout(&mut self, store: &LocalStore) -> Result<()> {
        store.remove(USER_KEY)?;
        self.user = None;
        Ok(())
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user() -> User {
        User {
            name: "Mika".to_string(),
            avatar: "avatars/mika.png".to_string(),
            email: "mika@example.com".to_string(),
        }
    }

    #[test]
    fn restore_without_file_is_logged_out() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("session.json"));
        let session = Session::restore(&store).unwrap();
        assert!(!session.is_logged_in());
    }

    #[test]
    fn login_persists_across_restore() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("nested/session.json"));

        let mut session = Session::default();
        session.login(&store, user()).unwrap();
        assert!(session.is_logged_in());

        let restored = Session::restore(&store).unwrap();
        assert_eq!(restored.user(), Some(&user()));
    }

    #[test]
    fn logout_removes_only_the_user_key() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("session.json"));
        store.set("theme", &"dark").unwrap();

        let mut session = Session::default();
        session.login(&store, user()).unwrap();
        session.logout(&store).unwrap();

        assert!(!session.is_logged_in());
        assert!(!Session::restore(&store).unwrap().is_logged_in());
        assert_eq!(store.get::<String>("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn corrupt_user_record_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("session.json"));
        store.set(USER_KEY, &42).unwrap();

        let result = Session::restore(&store);
        assert!(matches!(result.unwrap_err(), CoreError::Json(_)));
    }

    #[test]
    fn login_and_logout_recover_from_corrupt_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        let store = LocalStore::new(&path);

        assert!(Session::restore(&store).is_err());
        let mut session = Session::default();
        session.login(&store, user()).unwrap();
        assert_eq!(Session::restore(&store).unwrap().user(), Some(&user()));

        std::fs::write(&path, "[1, 2").unwrap();
        session.logout(&store).unwrap();
        assert!(!session.is_logged_in());
        assert!(!Session::restore(&store).unwrap().is_logged_in());
    }

    #[test]
    fn unreadable_store_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = LocalStore::new(path);
        assert!(store.get::<User>(USER_KEY).is_err());
    }
}
