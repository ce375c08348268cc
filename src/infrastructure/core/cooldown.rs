use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

/// Cooldown gate armed after a provider rate-limit response.
///
/// Workers await any active cooldown before issuing their next provider
/// call, so one 429 pauses the whole pool instead of each worker hammering
/// the provider in turn.
pub struct CooldownGate {
    until: RwLock<Option<Instant>>,
    duration: Duration,
}

impl CooldownGate {
    pub fn new(duration: Duration) -> Self {
        Self {
            until: RwLock::new(None),
            duration,
        }
    }

    pub async fn arm(&self) {
        let mut until = self.until.write().await;
        *until = Some(Instant::now() + self.duration);
        warn!("Provider rate limit hit, cooling down for {:?}", self.duration);
    }

    /// Sleep out any active cooldown, then clear it if it has expired.
    pub async fn wait_if_armed(&self) {
        let deadline = { *self.until.read().await };
        let Some(deadline) = deadline else {
            return;
        };

        let now = Instant::now();
        if deadline > now {
            tokio::time::sleep(deadline - now).await;
        }

        let mut until = self.until.write().await;
        // Only clear an expired deadline; another worker may have re-armed.
        if let Some(current) = *until
            && current <= Instant::now()
        {
            *until = None;
        }
    }
}
