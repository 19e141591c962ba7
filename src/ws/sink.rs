//! Score sink that persists final scores through the account store

use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::game::ScoreSink;
use crate::store::AccountStore;
use crate::ws::protocol::ServerMsg;

/// Spawns the store write and reports the high score back to the client
#[derive(Clone)]
pub struct StoreScoreSink {
    store: AccountStore,
    user_id: Uuid,
    outbound: mpsc::UnboundedSender<ServerMsg>,
}

impl StoreScoreSink {
    pub fn new(
        store: AccountStore,
        user_id: Uuid,
        outbound: mpsc::UnboundedSender<ServerMsg>,
    ) -> Self {
        Self {
            store,
            user_id,
            outbound,
        }
    }
}

impl ScoreSink for StoreScoreSink {
    fn record_final_score(&mut self, score: u32) {
        let store = self.store.clone();
        let user_id = self.user_id;
        let outbound = self.outbound.clone();

        tokio::spawn(async move {
            let msg = match store.record_score(user_id, score).await {
                Ok(update) => ServerMsg::HighScore {
                    score,
                    new_high_score: update.new_high_score,
                    updated: update.updated,
                },
                Err(e) => {
                    warn!(user_id = %user_id, score, error = %e, "Failed to record score");
                    ServerMsg::error("score_not_saved", e.to_string())
                }
            };

            // Client may already be gone
            let _ = outbound.send(msg);
        });
    }
}
