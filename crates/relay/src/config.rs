#![forbid(unsafe_code)]

//! Per-channel configuration.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `RELAY_CHANNEL_NAME` | Name reported in logs and churn events |
//! | `RELAY_TRACE_CHURN` | `1`/`true`/`yes`/`on` attaches a [`TracingObserver`] |

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::observer::{ChurnObserver, TracingObserver};

const DEFAULT_NAME: &str = "event";

/// Configuration for one channel.
#[derive(Clone)]
pub struct ChannelConfig {
    /// Label used in log fields and churn notifications.
    pub name: Cow<'static, str>,
    /// Notified on every add/remove. `None` disables churn reporting.
    pub observer: Option<Rc<dyn ChurnObserver>>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: Cow::Borrowed(DEFAULT_NAME),
            observer: None,
        }
    }
}

impl fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("name", &self.name)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl ChannelConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the channel name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach a churn observer, replacing any previous one.
    #[must_use]
    pub fn with_observer(mut self, observer: impl ChurnObserver + 'static) -> Self {
        self.observer = Some(Rc::new(observer));
        self
    }

    /// Attach a [`TracingObserver`].
    #[must_use]
    pub fn with_churn_tracing(self) -> Self {
        self.with_observer(TracingObserver)
    }

    /// Build from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Build using a custom environment lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(name) = get_env("RELAY_CHANNEL_NAME").filter(|n| !n.trim().is_empty()) {
            config.name = Cow::Owned(name.trim().to_owned());
        }
        if get_env("RELAY_TRACE_CHURN").is_some_and(|v| env_flag(&v)) {
            config = config.with_churn_tracing();
        }
        config
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
