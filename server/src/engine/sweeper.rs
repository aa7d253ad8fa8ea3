use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::task::JoinHandle;
use tracing::debug;

use super::chat_engine::ChatEngine;

/// One pass of the background sweep: drop expired effects (a backstop for
/// the lazy check on the poll path) and evict long-inactive presence
/// records. Returns (effects removed, users removed).
pub fn sweep_once(engine: &ChatEngine, presence_idle: Duration) -> (usize, usize) {
    let now = Utc::now();
    let effects = engine.moderation().expire_effects(now);
    let users = engine.presence().sweep_inactive(presence_idle, None, now);
    (effects, users)
}

/// Spawn the periodic sweep task. Uses the same sharded-map discipline as
/// the request handlers; each sweep is bounded in-memory work.
pub fn spawn_sweeper(
    engine: Arc<ChatEngine>,
    interval: std::time::Duration,
    presence_idle: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let (effects, users) = sweep_once(&engine, presence_idle);
            if effects > 0 || users > 0 {
                debug!(effects, users, "sweep evicted stale records");
            }
        }
    })
}
