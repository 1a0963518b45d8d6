//! Badge and notification surfaces the coordinator drives.
use std::sync::Mutex;

use crate::protocol::TabId;
use crate::verdict::Badge;

/// Title of the phishing notification.
pub const PHISHING_NOTIFICATION_TITLE: &str = "Phishing warning";

pub trait BadgeSurface: Send + Sync {
    /// Apply a badge to one tab, or globally when `tab` is `None`.
    fn set_badge(&self, tab: Option<TabId>, badge: &Badge);
}

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Surface that reports through `tracing`: badges at info, notifications at warn.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSurface;

impl BadgeSurface for LogSurface {
    fn set_badge(&self, tab: Option<TabId>, badge: &Badge) {
        match tab {
            Some(tab) => tracing::info!(tab = tab.0, text = %badge.text, color = %badge.color, "badge"),
            None => tracing::info!(text = %badge.text, color = %badge.color, "badge"),
        }
    }
}

impl Notifier for LogSurface {
    fn notify(&self, title: &str, message: &str) {
        tracing::warn!("{title}: {message}");
    }
}

/// Surface that keeps everything it is asked to show.
#[derive(Debug, Default)]
pub struct MemorySurface {
    badges: Mutex<Vec<(Option<TabId>, Badge)>>,
    notifications: Mutex<Vec<(String, String)>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent badge applied to `tab`.
    pub fn badge_for(&self, tab: Option<TabId>) -> Option<Badge> {
        let badges = self.badges.lock().ok()?;
        badges
            .iter()
            .rev()
            .find(|(t, _)| *t == tab)
            .map(|(_, b)| b.clone())
    }

    pub fn badges(&self) -> Vec<(Option<TabId>, Badge)> {
        self.badges.lock().map(|b| b.clone()).unwrap_or_default()
    }

    pub fn notifications(&self) -> Vec<(String, String)> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }
}

impl BadgeSurface for MemorySurface {
    fn set_badge(&self, tab: Option<TabId>, badge: &Badge) {
        if let Ok(mut badges) = self.badges.lock() {
            badges.push((tab, badge.clone()));
        }
    }
}

impl Notifier for MemorySurface {
    fn notify(&self, title: &str, message: &str) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push((title.to_string(), message.to_string()));
        }
    }
}
