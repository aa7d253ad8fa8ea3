//! The concurrent chat-state engine: room registry, bounded message logs
//! with cursor-based retrieval, presence/typing tracking, and the
//! moderation overlay evaluated on every poll.

pub mod chat_engine;
pub mod error;
pub mod messages;
pub mod moderation;
pub mod presence;
pub mod profiles;
pub mod rate_limiter;
pub mod rooms;
pub mod sweeper;
pub mod validation;
