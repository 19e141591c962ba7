//! Account storage (Supabase REST or in-memory)

pub mod accounts;
pub mod memory;
pub mod supabase;

pub use accounts::{AccountError, AccountStore, HighScoreUpdate, NewAccount, PlayerSummary};
pub use supabase::SupabaseClient;
