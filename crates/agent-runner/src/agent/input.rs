//! Human input sources

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use crate::error::{Result, RunnerError};

#[async_trait]
pub trait UserInput: Send + Sync {
    /// Wait for the human's next reply
    async fn read(&self, prompt: &str) -> Result<String>;
}

/// Input fed through a channel, one message per reply
pub struct ChannelInput {
    rx: Mutex<mpsc::Receiver<String>>,
}

impl ChannelInput {
    pub fn channel(buffer: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx: Mutex::new(rx) })
    }
}

#[async_trait]
impl UserInput for ChannelInput {
    async fn read(&self, _prompt: &str) -> Result<String> {
        self.rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| RunnerError::Input("input channel closed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_input_delivers_in_order() {
        let (tx, input) = ChannelInput::channel(4);
        tx.send("first".into()).await.unwrap();
        tx.send("second".into()).await.unwrap();

        assert_eq!(input.read("> ").await.unwrap(), "first");
        assert_eq!(input.read("> ").await.unwrap(), "second");

        drop(tx);
        assert!(matches!(input.read("> ").await, Err(RunnerError::Input(_))));
    }
}
