pub mod parsers;
pub mod scoresaber_client;
pub mod tokens;

pub use scoresaber_client::ScoreSaberClient;
