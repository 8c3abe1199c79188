pub mod connection;
pub mod history;
pub mod leaderboards;
pub mod models;
pub mod players;
pub mod previous_scores;
pub mod scores;
pub mod setup;

pub use connection::{DbConn, DbPool, create_pool, get_connection};
pub use models::*;
