//! Player accounts: signup, login, password recovery and high scores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;

use super::memory::MemoryAccounts;
use super::supabase::{SupabaseClient, SupabaseError};

/// Avatar given to players who skip the picker
pub const DEFAULT_AVATAR_ID: u32 = 1;

/// Stored account row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub highest_score: u32,
    pub avatar_id: u32,
    pub security_question: String,
    /// Stored lower-cased
    pub security_answer: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            username: self.username.clone(),
            highest_score: self.highest_score,
            avatar_id: self.avatar_id,
        }
    }
}

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub username: String,
    pub highest_score: u32,
    pub avatar_id: u32,
}

/// Signup request
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub avatar_id: Option<u32>,
    pub security_question: String,
    pub security_answer: String,
}

/// Outcome of submitting a final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HighScoreUpdate {
    /// Whether the stored high score changed
    pub updated: bool,
    pub new_high_score: u32,
}

#[derive(Clone)]
enum AccountBackend {
    Supabase {
        client: SupabaseClient,
        table: String,
    },
    Memory(MemoryAccounts),
}

/// Account store operations
#[derive(Clone)]
pub struct AccountStore {
    backend: AccountBackend,
}

impl AccountStore {
    /// Supabase when configured, otherwise in-memory
    pub fn new(config: &Config) -> Self {
        match &config.supabase {
            Some(supabase) => Self {
                backend: AccountBackend::Supabase {
                    client: SupabaseClient::new(supabase),
                    table: supabase.accounts_table.clone(),
                },
            },
            None => Self::in_memory(),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backend: AccountBackend::Memory(MemoryAccounts::new()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            AccountBackend::Supabase { .. } => "supabase",
            AccountBackend::Memory(_) => "memory",
        }
    }

    /// Create an account
    pub async fn signup(&self, new: NewAccount) -> Result<Account, AccountError> {
        let id = Uuid::new_v4();
        let account = Account {
            id,
            password_hash: password_digest(id, &new.password),
            username: new.username,
            highest_score: 0,
            avatar_id: new.avatar_id.unwrap_or(DEFAULT_AVATAR_ID),
            security_question: new.security_question,
            security_answer: new.security_answer.to_lowercase(),
            created_at: Utc::now(),
        };

        let created = match &self.backend {
            AccountBackend::Supabase { client, table } => {
                client
                    .insert::<_, Account>(table, &account)
                    .await
                    .map_err(|e| {
                        if e.is_conflict() {
                            AccountError::UsernameTaken
                        } else {
                            AccountError::Backend(e)
                        }
                    })?
            }
            AccountBackend::Memory(memory) => {
                memory.insert(account).ok_or(AccountError::UsernameTaken)?
            }
        };

        info!(user_id = %created.id, username = %created.username, "Account created");
        Ok(created)
    }

    /// Check credentials
    pub async fn login(&self, username: &str, password: &str) -> Result<Account, AccountError> {
        let account = self
            .find_by_username(username)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if account.password_hash != password_digest(account.id, password) {
            debug!(username = %username, "Password mismatch");
            return Err(AccountError::InvalidCredentials);
        }

        Ok(account)
    }

    /// Security question chosen at signup
    pub async fn security_question(&self, username: &str) -> Result<String, AccountError> {
        self.find_by_username(username)
            .await?
            .map(|a| a.security_question)
            .ok_or(AccountError::NotFound)
    }

    /// Set a new password if the security answer matches (case-insensitive)
    pub async fn reset_password(
        &self,
        username: &str,
        answer: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        let account = self
            .find_by_username(username)
            .await?
            .ok_or(AccountError::NotFound)?;

        if account.security_answer != answer.to_lowercase() {
            return Err(AccountError::WrongAnswer);
        }

        let password_hash = password_digest(account.id, new_password);
        match &self.backend {
            AccountBackend::Supabase { client, table } => {
                #[derive(Serialize)]
                struct PasswordUpdate {
                    password_hash: String,
                }

                let rows: Vec<Account> = client
                    .update(
                        table,
                        &[("id", format!("eq.{}", account.id))],
                        &PasswordUpdate { password_hash },
                    )
                    .await?;
                if rows.is_empty() {
                    return Err(AccountError::NotFound);
                }
            }
            AccountBackend::Memory(memory) => {
                if !memory.set_password_hash(account.id, password_hash) {
                    return Err(AccountError::NotFound);
                }
            }
        }

        info!(user_id = %account.id, "Password reset");
        Ok(())
    }

    /// Submit a final score; the stored high score only ever rises
    pub async fn record_score(
        &self,
        user_id: Uuid,
        score: u32,
    ) -> Result<HighScoreUpdate, AccountError> {
        let update = match &self.backend {
            AccountBackend::Supabase { client, table } => {
                #[derive(Serialize)]
                struct ScoreUpdate {
                    highest_score: u32,
                }

                let raised: Vec<Account> = client
                    .update(
                        table,
                        &[
                            ("id", format!("eq.{}", user_id)),
                            ("highest_score", format!("lt.{}", score)),
                        ],
                        &ScoreUpdate {
                            highest_score: score,
                        },
                    )
                    .await?;

                if raised.is_empty() {
                    let current = self.find_by_id(user_id).await?.ok_or(AccountError::NotFound)?;
                    HighScoreUpdate {
                        updated: false,
                        new_high_score: current.highest_score,
                    }
                } else {
                    HighScoreUpdate {
                        updated: true,
                        new_high_score: score,
                    }
                }
            }
            AccountBackend::Memory(memory) => memory
                .raise_high_score(user_id, score)
                .ok_or(AccountError::NotFound)?,
        };

        info!(
            user_id = %user_id,
            score,
            high_score = update.new_high_score,
            updated = update.updated,
            "Score recorded"
        );
        Ok(update)
    }

    /// All players, best high score first
    pub async fn leaderboard(&self) -> Result<Vec<PlayerSummary>, AccountError> {
        match &self.backend {
            AccountBackend::Supabase { client, table } => Ok(client
                .get(
                    table,
                    &[
                        ("select", "id,username,highest_score,avatar_id".to_string()),
                        ("order", "highest_score.desc".to_string()),
                    ],
                )
                .await?),
            AccountBackend::Memory(memory) => {
                let mut players: Vec<PlayerSummary> =
                    memory.all().iter().map(Account::summary).collect();
                players.sort_by(|a, b| {
                    b.highest_score
                        .cmp(&a.highest_score)
                        .then_with(|| a.username.cmp(&b.username))
                });
                Ok(players)
            }
        }
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<Account>, AccountError> {
        match &self.backend {
            AccountBackend::Supabase { client, table } => Ok(client
                .get_one(table, &[("id", format!("eq.{}", user_id))])
                .await?),
            AccountBackend::Memory(memory) => Ok(memory.find_by_id(user_id)),
        }
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, AccountError> {
        match &self.backend {
            AccountBackend::Supabase { client, table } => Ok(client
                .get_one(table, &[("username", format!("eq.{}", username))])
                .await?),
            AccountBackend::Memory(memory) => Ok(memory.find_by_username(username)),
        }
    }
}

/// SHA-256 of the password salted with the account id, hex encoded
fn password_digest(id: Uuid, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Account errors
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Username already exists")]
    UsernameTaken,

    #[error("User not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Incorrect security answer")]
    WrongAnswer,

    #[error("Account backend error: {0}")]
    Backend(#[from] SupabaseError),
}
