//! Channel registry with exponential-backoff-with-jitter reconnect.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{instrument, warn};

use crate::channel::Channel;
use crate::error::ChannelError;
use crate::types::ChannelStatus;

const BACKOFF_BASE_SECS: u64 = 5;
const BACKOFF_MAX_SECS: u64 = 300;
const MAX_ATTEMPTS: u32 = 10;
const JITTER_FRACTION: f64 = 0.10;

pub struct ChannelManager {
    channels: HashMap<String, Box<dyn Channel + Send + Sync>>,
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelManager {
    pub fn new() -> Self {
        Self { channels: HashMap::new() }
    }

    pub fn register(&mut self, channel: Box<dyn Channel + Send + Sync>) {
        self.channels.insert(channel.name().to_string(), channel);
    }

    #[instrument(skip(self))]
    pub async fn connect_all(&mut self) -> Result<(), ChannelError> {
        let names: Vec<String> = self.channels.keys().cloned().collect();
        for name in names {
            let mut channel = self.channels.remove(&name).expect("just listed");
            let result = connect_with_backoff(&name, channel.as_mut()).await;
            self.channels.insert(name, channel);
            result?;
        }
        Ok(())
    }

    pub async fn disconnect_all(&mut self) {
        for (name, channel) in self.channels.iter_mut() {
            if let Err(err) = channel.disconnect().await {
                warn!(channel = %name, %err, "error disconnecting channel");
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&(dyn Channel + Send + Sync)> {
        self.channels.get(name).map(|c| c.as_ref())
    }

    pub fn statuses(&self) -> Vec<(String, ChannelStatus)> {
        let mut out: Vec<(String, ChannelStatus)> = self.channels.iter().map(|(name, c)| (name.clone(), c.status())).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

async fn connect_with_backoff(name: &str, channel: &mut (dyn Channel + Send + Sync)) -> Result<(), ChannelError> {
    let mut attempt = 0u32;
    let mut backoff = BACKOFF_BASE_SECS;

    loop {
        attempt += 1;
        match channel.connect().await {
            Ok(()) => return Ok(()),
            Err(err) => {
                if attempt >= MAX_ATTEMPTS {
                    warn!(channel = %name, %err, attempt, "giving up reconnecting");
                    return Err(err);
                }
                let sleep_secs = backoff + jitter_secs(backoff);
                warn!(channel = %name, %err, attempt, sleep_secs, "reconnect failed, backing off");
                tokio::time::sleep(std::time::Duration::from_secs(sleep_secs)).await;
                backoff = (backoff * 2).min(BACKOFF_MAX_SECS);
            }
        }
    }
}

/// Deterministic jitter derived from the clock's sub-second resolution —
/// no `rand` dependency needed for a reconnect loop.
fn jitter_secs(base_secs: u64) -> u64 {
    let max_jitter = ((base_secs as f64) * JITTER_FRACTION).max(1.0) as u64;
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.subsec_nanos()).unwrap_or(0);
    nanos as u64 % max_jitter.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use crate::types::OutboundMessage;

    struct FlakyChannel {
        name: String,
        fail_times: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Channel for FlakyChannel {
        fn name(&self) -> &str {
            &self.name
        }
        async fn connect(&mut self) -> Result<(), ChannelError> {
            if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(ChannelError::ConnectionFailed("not yet".into()));
            }
            Ok(())
        }
        async fn disconnect(&mut self) -> Result<(), ChannelError> {
            Ok(())
        }
        async fn send(&self, _msg: &OutboundMessage) -> Result<(), ChannelError> {
            Ok(())
        }
        fn status(&self) -> ChannelStatus {
            ChannelStatus::Connected
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_after_transient_failures() {
        let mut manager = ChannelManager::new();
        manager.register(Box::new(FlakyChannel { name: "test".into(), fail_times: Arc::new(AtomicU32::new(2)) }));

        manager.connect_all().await.unwrap();
        assert_eq!(manager.statuses()[0].1, ChannelStatus::Connected);
    }
}
