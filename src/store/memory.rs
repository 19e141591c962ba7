//! In-process account table, used when no Supabase project is configured

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::accounts::{Account, HighScoreUpdate};

/// Accounts keyed by id with a unique username index
#[derive(Clone, Default)]
pub struct MemoryAccounts {
    accounts: Arc<DashMap<Uuid, Account>>,
    usernames: Arc<DashMap<String, Uuid>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the username is taken; `None` on conflict
    pub fn insert(&self, account: Account) -> Option<Account> {
        match self.usernames.entry(account.username.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(account.id);
                self.accounts.insert(account.id, account.clone());
                Some(account)
            }
        }
    }

    pub fn find_by_username(&self, username: &str) -> Option<Account> {
        let id = *self.usernames.get(username)?;
        self.find_by_id(id)
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<Account> {
        self.accounts.get(&id).map(|a| a.value().clone())
    }

    pub fn set_password_hash(&self, id: Uuid, password_hash: String) -> bool {
        match self.accounts.get_mut(&id) {
            Some(mut account) => {
                account.password_hash = password_hash;
                true
            }
            None => false,
        }
    }

    /// Raise the stored high score if `score` beats it
    pub fn raise_high_score(&self, id: Uuid, score: u32) -> Option<HighScoreUpdate> {
        let mut account = self.accounts.get_mut(&id)?;
        let updated = score > account.highest_score;
        if updated {
            account.highest_score = score;
        }
        Some(HighScoreUpdate {
            updated,
            new_high_score: account.highest_score,
        })
    }

    pub fn all(&self) -> Vec<Account> {
        self.accounts.iter().map(|a| a.value().clone()).collect()
    }
}
