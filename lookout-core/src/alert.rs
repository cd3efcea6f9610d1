//! Cooldown-gated special alert for one object category

use crate::config::AlertConfig;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// Which labels trigger the alert and what it says
#[derive(Debug, Clone)]
pub struct AlertRule {
    keywords: Vec<String>,
    message: String,
    banner: String,
}

impl AlertRule {
    pub fn new(keywords: Vec<String>, message: impl Into<String>, banner: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            message: message.into(),
            banner: banner.into(),
        }
    }

    pub fn from_config(config: &AlertConfig) -> Self {
        Self::new(config.keywords.clone(), config.message.clone(), config.banner.clone())
    }

    /// Case-insensitive substring match of `label` against the keywords
    pub fn matches(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.keywords.iter().any(|k| !k.is_empty() && label.contains(k.as_str()))
    }

    /// Utterance queued when the gate fires
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Text drawn on the frame while a trigger object is visible
    pub fn banner(&self) -> &str {
        &self.banner
    }
}

/// Limits the alert to one firing per cooldown period
pub struct AlertGate {
    cooldown: Duration,
    last_alert: Mutex<Option<Instant>>,
}

impl AlertGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert: Mutex::new(None),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Fire if the cooldown has elapsed since the last firing (or it never fired)
    pub fn should_alert(&self, now: Instant) -> bool {
        let mut last_alert = self.last_alert.lock();

        if let Some(last) = *last_alert {
            if now.saturating_duration_since(last) < self.cooldown {
                return false;
            }
        }

        *last_alert = Some(now);
        debug!("Alert gate fired");
        true
    }

    pub fn last_alert(&self) -> Option<Instant> {
        *self.last_alert.lock()
    }
}
