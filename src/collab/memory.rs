//! In-process collaborators for tests and local use.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{AuthProvider, BackendError, User, VoteFilter, VoteRecord, VoteStore};

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>, BackendError> {
    m.lock()
        .map_err(|_| BackendError::Backend("in-memory state poisoned".to_string()))
}

#[derive(Debug, Default)]
struct Accounts {
    // email -> (password, uid)
    by_email: HashMap<String, (String, String)>,
    current: Option<User>,
    next_uid: u64,
}

/// Email/password accounts held in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuth {
    state: Mutex<Accounts>,
}

impl InMemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthProvider for InMemoryAuth {
    fn current_user(&self) -> Option<User> {
        self.state.lock().ok().and_then(|s| s.current.clone())
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let mut state = lock(&self.state)?;
        let email = email.trim().to_lowercase();
        let Some((stored, uid)) = state.by_email.get(&email) else {
            return Err(BackendError::Backend("invalid email or password".to_string()));
        };
        if stored != password {
            return Err(BackendError::Backend("invalid email or password".to_string()));
        }
        let user = User { uid: uid.clone(), email };
        state.current = Some(user.clone());
        Ok(user)
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let mut state = lock(&self.state)?;
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(BackendError::Backend(format!("invalid email: '{email}'")));
        }
        if password.len() < 2 {
            return Err(BackendError::Backend("password too short".to_string()));
        }
        if state.by_email.contains_key(&email) {
            return Err(BackendError::Backend(format!("account already exists: {email}")));
        }

        state.next_uid += 1;
        let uid = format!("user-{}", state.next_uid);
        state
            .by_email
            .insert(email.clone(), (password.to_string(), uid.clone()));
        let user = User { uid, email };
        state.current = Some(user.clone());
        Ok(user)
    }

    fn sign_out(&self) -> Result<(), BackendError> {
        lock(&self.state)?.current = None;
        Ok(())
    }
}

/// Vote documents keyed by uid.
#[derive(Debug, Default)]
pub struct InMemoryVoteStore {
    docs: Mutex<HashMap<String, VoteRecord>>,
}

impl InMemoryVoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VoteStore for InMemoryVoteStore {
    fn get(&self, uid: &str) -> Result<Option<VoteRecord>, BackendError> {
        Ok(lock(&self.docs)?.get(uid).cloned())
    }

    fn put(&self, uid: &str, record: VoteRecord) -> Result<(), BackendError> {
        lock(&self.docs)?.insert(uid.to_string(), record);
        Ok(())
    }

    fn count(&self, filter: VoteFilter) -> Result<u64, BackendError> {
        Ok(lock(&self.docs)?.values().filter(|r| filter.matches(r)).count() as u64)
    }
}
