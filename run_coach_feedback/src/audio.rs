use std::time::Duration;

use tokio::sync::oneshot;

/// Completion signal for one playback. The sender side is dropped when the
/// clip is stopped early, which also releases anyone waiting.
pub type PlaybackDone = oneshot::Receiver<()>;

/// An audio playback resource. At most one clip is active at a time:
/// starting a new clip stops and releases the previous one first.
pub trait AudioSink: Send + Sync {
    /// Begins playback of an mp3 clip and returns its completion signal.
    fn start(&self, audio: Vec<u8>) -> PlaybackDone;

    /// Stops and releases the active playback, if any.
    fn stop(&self);
}

/// Sink for environments without an audio device. Logs and completes
/// immediately.
pub struct NullSink;

impl AudioSink for NullSink {
    fn start(&self, audio: Vec<u8>) -> PlaybackDone {
        tracing::debug!("Discarding {} bytes of speech audio (no audio device)", audio.len());
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(());
        rx
    }

    fn stop(&self) {}
}

/// Longest the session-complete flow waits for playback to finish.
pub const PLAYBACK_WAIT: Duration = Duration::from_secs(30);

/// Plays a clip and waits for it to finish, giving up after `wait` and
/// proceeding regardless of whether playback actually completed.
pub async fn play_and_wait(sink: &dyn AudioSink, audio: Vec<u8>, wait: Duration) {
    let done = sink.start(audio);

    match tokio::time::timeout(wait, done).await {
        // A dropped sender means the clip was stopped, which also ends the wait
        Ok(_) => tracing::debug!("Audio playback completed"),
        Err(_) => tracing::warn!("Audio playback did not complete within {:?}", wait),
    }
}

#[cfg(test)]
struct StuckSink;

#[cfg(test)]
impl AudioSink for StuckSink {
    fn start(&self, _audio: Vec<u8>) -> PlaybackDone {
        let (tx, rx) = oneshot::channel();
        // Keep the sender alive so the receiver never resolves
        std::mem::forget(tx);
        rx
    }

    fn stop(&self) {}
}

#[tokio::test]
async fn null_sink_completes_immediately() {
    play_and_wait(&NullSink, vec![0; 16], Duration::from_secs(1)).await;
}

#[tokio::test]
async fn wait_gives_up_after_timeout() {
    let before = std::time::Instant::now();
    play_and_wait(&StuckSink, vec![0; 16], Duration::from_millis(50)).await;
    assert!(before.elapsed() >= Duration::from_millis(50));
}
