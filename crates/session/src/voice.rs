//! Simulated voice channel
//!
//! Stands in for the external voice pipeline in local runs and tests:
//! records spoken lines, exposes a scriptable transcript, and lets the
//! caller trigger the disconnect signal (or schedule an automatic hangup).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use intake_agent_core::{
    TranscriptTurn, TransportError, TurnRole, VadHandle, VoiceChannel, VoiceConnector,
};

/// In-memory voice channel for one room.
pub struct SimulatedVoiceChannel {
    room_name: String,
    opened: Mutex<bool>,
    spoken: Mutex<Vec<String>>,
    turns: Mutex<Vec<TranscriptTurn>>,
    disconnect: watch::Sender<bool>,
}

impl SimulatedVoiceChannel {
    pub fn new(room_name: impl Into<String>) -> Self {
        let (disconnect, _) = watch::channel(false);
        Self {
            room_name: room_name.into(),
            opened: Mutex::new(false),
            spoken: Mutex::new(Vec::new()),
            turns: Mutex::new(Vec::new()),
            disconnect,
        }
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn was_opened(&self) -> bool {
        *self.opened.lock()
    }

    /// Lines spoken through [`VoiceChannel::say`], in order.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().clone()
    }

    /// Script a patient reply into the transcript.
    pub fn push_patient_turn(&self, content: impl Into<String>) {
        self.turns
            .lock()
            .push(TranscriptTurn::new(TurnRole::Patient, content));
    }

    /// Signal the remote disconnect.
    pub fn trigger_disconnect(&self) {
        let _ = self.disconnect.send(true);
    }
}

#[async_trait]
impl VoiceChannel for SimulatedVoiceChannel {
    async fn open(&self) -> Result<(), TransportError> {
        *self.opened.lock() = true;
        tracing::debug!(room = %self.room_name, "simulated voice channel opened");
        Ok(())
    }

    async fn say(&self, text: &str, allow_interruptions: bool) -> Result<(), TransportError> {
        if !*self.opened.lock() {
            return Err(TransportError::Channel("channel not open".to_string()));
        }
        tracing::debug!(
            room = %self.room_name,
            allow_interruptions,
            "simulated speech: {text}"
        );
        self.spoken.lock().push(text.to_string());
        self.turns
            .lock()
            .push(TranscriptTurn::new(TurnRole::Agent, text));
        Ok(())
    }

    async fn disconnected(&self) {
        let mut rx = self.disconnect.subscribe();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }

    fn transcript(&self) -> Vec<TranscriptTurn> {
        self.turns.lock().clone()
    }

    async fn close(&self) -> Result<(), TransportError> {
        *self.opened.lock() = false;
        Ok(())
    }
}

/// Connector that hands out simulated channels and keeps a reference to
/// every channel it created.
#[derive(Default)]
pub struct SimulatedVoiceConnector {
    auto_hangup: Option<Duration>,
    channels: Mutex<Vec<Arc<SimulatedVoiceChannel>>>,
}

impl SimulatedVoiceConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hang every created channel up after the given duration, so a run
    /// without a scripted disconnect still terminates.
    pub fn with_auto_hangup(duration: Duration) -> Self {
        Self {
            auto_hangup: Some(duration),
            channels: Mutex::new(Vec::new()),
        }
    }

    /// Channels created so far, in creation order.
    pub fn channels(&self) -> Vec<Arc<SimulatedVoiceChannel>> {
        self.channels.lock().clone()
    }
}

#[async_trait]
impl VoiceConnector for SimulatedVoiceConnector {
    async fn connect(
        &self,
        room_name: &str,
        vad: &VadHandle,
    ) -> Result<Arc<dyn VoiceChannel>, TransportError> {
        tracing::info!(
            room = %room_name,
            vad_loaded = vad.is_loaded(),
            "connecting simulated voice channel"
        );
        let channel = Arc::new(SimulatedVoiceChannel::new(room_name));
        self.channels.lock().push(channel.clone());

        if let Some(delay) = self.auto_hangup {
            let hangup = channel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                hangup.trigger_disconnect();
            });
        }

        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_say_requires_open_channel() {
        let channel = SimulatedVoiceChannel::new("intake-abc");
        assert!(channel.say("hello", true).await.is_err());

        channel.open().await.unwrap();
        channel.say("hello", true).await.unwrap();
        assert_eq!(channel.spoken(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_disconnected_resolves_after_trigger() {
        let channel = Arc::new(SimulatedVoiceChannel::new("intake-abc"));
        let waiter = channel.clone();
        let handle = tokio::spawn(async move { waiter.disconnected().await });

        channel.trigger_disconnect();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnected_resolves_when_already_triggered() {
        let channel = SimulatedVoiceChannel::new("intake-abc");
        channel.trigger_disconnect();
        channel.disconnected().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_hangup_triggers_disconnect() {
        let connector = SimulatedVoiceConnector::with_auto_hangup(Duration::from_secs(5));
        let channel = connector
            .connect("intake-abc", &VadHandle::disabled())
            .await
            .unwrap();
        channel.disconnected().await;
    }

    #[tokio::test]
    async fn test_transcript_interleaves_turns() {
        let channel = SimulatedVoiceChannel::new("intake-abc");
        channel.open().await.unwrap();
        channel.say("Hello, do you have a minute?", true).await.unwrap();
        channel.push_patient_turn("Sure.");

        let turns = channel.transcript();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, TurnRole::Agent);
        assert_eq!(turns[1].role, TurnRole::Patient);
    }
}
