pub mod audio;
pub mod messages;
pub mod snapshot;
pub mod tts;
mod feedback_manager;

pub use feedback_manager::*;

pub const TTS_PATH: &str = "/functions/v1/text-to-speech";
pub const SNAPSHOT_PATH: &str = "/rest/v1/performance_snapshots";

#[derive(Debug)]
pub enum FeedbackError {
    Configuration(String),
    Speech(String),
    Snapshot(String),
}
