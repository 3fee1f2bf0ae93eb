//! Push notifications and notification clicks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Worker;

const ICON: &str = "/icon.png";
const DEFAULT_BODY: &str = "You have a new message";
const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

pub const ACTION_EXPLORE: &str = "explore";
pub const ACTION_CLOSE: &str = "close";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationData {
    /// Unix milliseconds when the notification was built.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

/// A notification ready to be shown by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// A plain notification with no actions.
    pub fn simple(title: &str, body: &str, tag: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            icon: ICON.to_string(),
            badge: ICON.to_string(),
            tag: tag.map(str::to_string),
            vibrate: Vec::new(),
            data: NotificationData { date_of_arrival: chrono::Utc::now().timestamp_millis(), primary_key: 1 },
            actions: Vec::new(),
        }
    }
}

/// Build the notification for a push message.
///
/// The payload text becomes the body; an empty push gets a generic body.
pub fn push_notification(app_name: &str, payload: Option<&str>) -> Notification {
    let body = payload.filter(|p| !p.is_empty()).unwrap_or(DEFAULT_BODY);
    let mut notification = Notification::simple(&format!("{} notification", display_name(app_name)), body, None);
    notification.vibrate = VIBRATE_PATTERN.to_vec();
    notification.actions = vec![
        NotificationAction { action: ACTION_EXPLORE.into(), title: "View details".into(), icon: ICON.into() },
        NotificationAction { action: ACTION_CLOSE.into(), title: "Close".into(), icon: ICON.into() },
    ];
    notification
}

/// Capitalize the first letter of an app name for display.
pub fn display_name(app_name: &str) -> String {
    let mut chars = app_name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// What the host should do after a notification click.
///
/// The notification itself is always closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    OpenWindow { url: String },
    Dismiss,
}

/// Resolve a click on the notification body (`None`) or one of its actions.
pub fn notification_click(action: Option<&str>) -> ClickOutcome {
    match action {
        Some(ACTION_CLOSE) => ClickOutcome::Dismiss,
        _ => ClickOutcome::OpenWindow { url: "/".to_string() },
    }
}

impl Worker {
    pub fn on_push(&self, payload: Option<&str>) -> Notification {
        tracing::info!(has_payload = payload.is_some(), "received push message");
        push_notification(&self.app_name, payload)
    }

    pub fn on_notification_click(&self, action: Option<&str>) -> ClickOutcome {
        let outcome = notification_click(action);
        if outcome == ClickOutcome::Dismiss {
            tracing::debug!("notification dismissed");
        } else {
            tracing::debug!(action = action.unwrap_or("<body>"), "notification opened app");
        }
        outcome
    }
}
