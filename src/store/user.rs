use crate::core::{constant::PLACEHOLDER_AUTH_TOKEN, Error};
use serde::Serialize;
use std::{collections::HashMap, sync::Mutex};

/// A chat participant as created through `POST /start`.
///
/// Users are immutable once created and live for the process lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub username: String,
    pub auth_token: String,
}

struct UserMap {
    users: HashMap<String, User>,
    anon_counter: u64,
}

// ========================// UserRegistry //======================== //

/// Process-wide user registry behind a single lock.
///
/// The lock also covers the anonymous-name counter, so two concurrent
/// allocations can never mint the same name.
pub struct UserRegistry {
    inner: Mutex<UserMap>,
}

impl UserRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(UserMap {
                users: HashMap::new(),
                anon_counter: 1,
            }),
        }
    }

    /// Create a user, assigning an `anonymous<N>` name when none is given.
    /// A taken username leaves the registry unchanged.
    pub fn create(&self, username: Option<String>) -> Result<User, Error> {
        let mut inner = self.inner.lock().unwrap();

        let username = match username.filter(|name| !name.is_empty()) {
            Some(name) => name,
            None => {
                let name = format!("anonymous{}", inner.anon_counter);
                inner.anon_counter += 1;
                name
            }
        };

        if inner.users.contains_key(&username) {
            return Err(Error::DuplicateUsername(username));
        }

        let user = User {
            username: username.clone(),
            auth_token: PLACEHOLDER_AUTH_TOKEN.to_owned(),
        };
        inner.users.insert(username, user.clone());
        Ok(user)
    }

    pub fn lookup(&self, username: &str) -> Option<User> {
        self.inner.lock().unwrap().users.get(username).cloned()
    }

    /// Snapshot of the full username -> user map.
    pub fn list(&self) -> HashMap<String, User> {
        self.inner.lock().unwrap().users.clone()
    }

    pub fn num_users(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }
}

// ========================// tests //======================== //

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashSet, sync::Arc};

    #[test]
    fn explicit_username_is_kept() {
        let registry = UserRegistry::new();
        let user = registry.create(Some("bob".to_owned())).unwrap();

        assert_eq!(user.username, "bob");
        assert_eq!(user.auth_token, PLACEHOLDER_AUTH_TOKEN);
        assert_eq!(registry.lookup("bob").unwrap().username, "bob");
    }

    #[test]
    fn duplicate_username_is_rejected_without_change() {
        let registry = UserRegistry::new();
        registry.create(Some("bob".to_owned())).unwrap();

        let err = registry.create(Some("bob".to_owned())).unwrap_err();
        assert!(matches!(err, Error::DuplicateUsername(name) if name == "bob"));
        assert_eq!(registry.num_users(), 1);
    }

    #[test]
    fn empty_username_gets_an_anonymous_name() {
        let registry = UserRegistry::new();

        let first = registry.create(None).unwrap();
        let second = registry.create(Some(String::new())).unwrap();

        assert_eq!(first.username, "anonymous1");
        assert_eq!(second.username, "anonymous2");
    }

    #[test]
    fn lookup_of_unknown_user_is_none() {
        let registry = UserRegistry::new();
        assert!(registry.lookup("nobody").is_none());
    }

    #[tokio::test]
    async fn concurrent_anonymous_creates_are_distinct() {
        let registry = Arc::new(UserRegistry::new());

        let mut handles = Vec::new();
        for _ in 0..100 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move { registry.create(None).unwrap() }));
        }

        let mut names = HashSet::new();
        for handle in handles {
            let user = handle.await.unwrap();
            assert!(user.username.starts_with("anonymous"));
            assert!(names.insert(user.username), "duplicate anonymous name");
        }

        assert_eq!(names.len(), 100);
        assert_eq!(registry.num_users(), 100);
    }
}
