//! External collaborators: authentication and the vote store.
//!
//! The dashboard core never depends on these. They are reached through
//! [`Services`], which is built once at startup and passed down explicitly.
//! When the backend is not configured, `Services` carries the reason instead
//! of live handles and every vote operation reports [`BackendError::Unconfigured`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub mod config;
pub mod memory;

pub use config::BackendConfig;
pub use memory::{InMemoryAuth, InMemoryVoteStore};

/// The statement users vote on.
pub const STANCE_TEXT: &str = "Based on the sales data trends, I support policies that improve supply planning to reduce stockouts and optimize warehouse-to-retail flow.";

/// Bumped whenever [`STANCE_TEXT`] changes.
pub const STANCE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend not configured: {0}")]
    Unconfigured(String),
    #[error("sign in to vote")]
    NotSignedIn,
    #[error("a vote is already registered for this account")]
    AlreadyVoted,
    #[error("backend request failed: {0}")]
    Backend(String),
}

/// An authenticated user. Only `uid` is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Yes,
    No,
}

/// One vote document, keyed by uid in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub vote: VoteChoice,
    pub voted_at: DateTime<Utc>,
    pub stance_version: u32,
    pub stance_text: String,
    pub uid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteFilter {
    All,
    Choice(VoteChoice),
}

impl VoteFilter {
    pub fn matches(self, record: &VoteRecord) -> bool {
        match self {
            VoteFilter::All => true,
            VoteFilter::Choice(choice) => record.vote == choice,
        }
    }
}

pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;
    fn sign_in(&self, email: &str, password: &str) -> Result<User, BackendError>;
    fn sign_up(&self, email: &str, password: &str) -> Result<User, BackendError>;
    fn sign_out(&self) -> Result<(), BackendError>;
}

pub trait VoteStore: Send + Sync {
    fn get(&self, uid: &str) -> Result<Option<VoteRecord>, BackendError>;
    fn put(&self, uid: &str, record: VoteRecord) -> Result<(), BackendError>;
    fn count(&self, filter: VoteFilter) -> Result<u64, BackendError>;
}

/// Yes/no/total counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub yes: u64,
    pub no: u64,
    pub total: u64,
}

impl VoteTally {
    /// Rounded share of yes votes, 0 when nobody voted.
    pub fn yes_pct(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.yes as f64 / self.total as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }

    /// Complement of [`VoteTally::yes_pct`], 0 when nobody voted.
    pub fn no_pct(&self) -> u8 {
        if self.total == 0 { 0 } else { 100 - self.yes_pct() }
    }
}

/// Optional handles to the external collaborators.
#[derive(Clone, Default)]
pub struct Services {
    pub auth: Option<Arc<dyn AuthProvider>>,
    pub votes: Option<Arc<dyn VoteStore>>,
    pub init_error: Option<String>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("auth", &self.auth.is_some())
            .field("votes", &self.votes.is_some())
            .field("init_error", &self.init_error)
            .finish()
    }
}

impl Services {
    pub fn new(auth: Arc<dyn AuthProvider>, votes: Arc<dyn VoteStore>) -> Self {
        Self {
            auth: Some(auth),
            votes: Some(votes),
            init_error: None,
        }
    }

    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self {
            auth: None,
            votes: None,
            init_error: Some(reason.into()),
        }
    }

    /// Build from the environment.
    ///
    /// No network backend ships with this crate, so a complete configuration
    /// is served by the in-memory collaborators.
    pub fn from_env() -> Self {
        match BackendConfig::from_env() {
            Ok(cfg) => {
                info!(project = %cfg.project_id, "backend configured; using in-memory collaborators");
                Self::new(Arc::new(InMemoryAuth::new()), Arc::new(InMemoryVoteStore::new()))
            }
            Err(BackendError::Unconfigured(reason)) => Self::unconfigured(reason),
            Err(err) => Self::unconfigured(err.to_string()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.auth.is_some() && self.votes.is_some()
    }

    /// One-line status for front-ends.
    pub fn status_line(&self) -> String {
        match (&self.init_error, self.is_configured()) {
            (_, true) => "Voting backend: connected".to_string(),
            (Some(reason), false) => format!("Voting backend: offline ({reason})"),
            (None, false) => "Voting backend: offline".to_string(),
        }
    }

    fn require_votes(&self) -> Result<&Arc<dyn VoteStore>, BackendError> {
        self.votes.as_ref().ok_or_else(|| self.unconfigured_error())
    }

    fn require_auth(&self) -> Result<&Arc<dyn AuthProvider>, BackendError> {
        self.auth.as_ref().ok_or_else(|| self.unconfigured_error())
    }

    fn unconfigured_error(&self) -> BackendError {
        BackendError::Unconfigured(
            self.init_error
                .clone()
                .unwrap_or_else(|| "no backend services".to_string()),
        )
    }

    /// Current user, if auth is configured and someone is signed in.
    pub fn current_user(&self) -> Option<User> {
        self.auth.as_ref().and_then(|a| a.current_user())
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let user = self.require_auth()?.sign_in(email, password)?;
        info!(uid = %user.uid, "signed in");
        Ok(user)
    }

    pub fn sign_up(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let user = self.require_auth()?.sign_up(email, password)?;
        info!(uid = %user.uid, "account created");
        Ok(user)
    }

    pub fn sign_out(&self) -> Result<(), BackendError> {
        self.require_auth()?.sign_out()
    }

    /// The signed-in user's existing vote.
    pub fn my_vote(&self) -> Result<Option<VoteChoice>, BackendError> {
        let votes = self.require_votes()?;
        let Some(user) = self.current_user() else {
            return Ok(None);
        };
        Ok(votes.get(&user.uid)?.map(|r| r.vote))
    }

    /// Record the signed-in user's vote on the current stance. One vote per user.
    pub fn cast_vote(&self, choice: VoteChoice) -> Result<VoteRecord, BackendError> {
        let votes = self.require_votes()?;
        let user = self.require_auth()?.current_user().ok_or(BackendError::NotSignedIn)?;

        if votes.get(&user.uid)?.is_some() {
            return Err(BackendError::AlreadyVoted);
        }

        let record = VoteRecord {
            vote: choice,
            voted_at: Utc::now(),
            stance_version: STANCE_VERSION,
            stance_text: STANCE_TEXT.to_string(),
            uid: user.uid.clone(),
        };
        votes.put(&user.uid, record.clone())?;
        info!(uid = %user.uid, vote = ?choice, "vote recorded");
        Ok(record)
    }

    pub fn tally(&self) -> Result<VoteTally, BackendError> {
        let votes = self.require_votes()?;
        Ok(VoteTally {
            yes: votes.count(VoteFilter::Choice(VoteChoice::Yes))?,
            no: votes.count(VoteFilter::Choice(VoteChoice::No))?,
            total: votes.count(VoteFilter::All)?,
        })
    }
}
