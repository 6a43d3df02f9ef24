//! Notification dispatch
//!
//! Every notification is first recorded in-app, then handed to the delivery
//! sink with a small bounded retry. Nothing here returns an error: callers
//! have already committed the state change the notification describes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::external::NotificationSink;
use crate::store::SharedRepository;
use crate::types::{Complaint, EscalationTier, Notification, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Delivery attempts per notification (at least one is always made)
    pub attempts: u32,
    /// Pause between attempts, in milliseconds
    pub backoff_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            backoff_ms: 250,
        }
    }
}

/// Subject and body of one outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn submitted(case_number: &str) -> Self {
        Self {
            subject: format!("Complaint {} Submitted", case_number),
            body: format!(
                "Your complaint {} has been submitted successfully. We will process it shortly.",
                case_number
            ),
        }
    }

    pub fn assigned(complaint: &Complaint) -> Self {
        Self {
            subject: format!("New Assignment: {}", complaint.case_number),
            body: format!(
                "Complaint {} (Priority: {}) has been assigned to you. Deadline: {}",
                complaint.case_number,
                complaint.priority.as_str().to_uppercase(),
                complaint.sla_deadline.format("%Y-%m-%d %H:%M UTC")
            ),
        }
    }

    pub fn escalation(case_number: &str, tier: EscalationTier) -> Self {
        Self {
            subject: format!("Escalation Alert: {}", case_number),
            body: format!(
                "ESCALATION ALERT: Complaint {} has been escalated to {}.",
                case_number,
                tier.describe()
            ),
        }
    }

    pub fn status_changed(complaint: &Complaint) -> Self {
        Self {
            subject: format!("Complaint {} Updated", complaint.case_number),
            body: format!(
                "Your complaint {} is now {}.",
                complaint.case_number, complaint.status
            ),
        }
    }
}

/// Sink that only writes the message to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn notify(&self, user: &User, subject: &str, _message: &str) -> bool {
        info!(user = %user.id, email = %user.email, subject, "Notification delivered");
        true
    }
}

/// Records and delivers notifications
#[derive(Clone)]
pub struct Notifier {
    repo: SharedRepository,
    sink: Arc<dyn NotificationSink>,
    config: NotifyConfig,
}

impl Notifier {
    pub fn new(repo: SharedRepository, sink: Arc<dyn NotificationSink>, config: NotifyConfig) -> Self {
        Self { repo, sink, config }
    }

    /// Record the in-app notification and attempt delivery.
    ///
    /// Returns whether the sink accepted the message. Failures are logged.
    pub async fn send(
        &self,
        user: &User,
        complaint: Option<&Complaint>,
        message: &Message,
        at: DateTime<Utc>,
    ) -> bool {
        let record = Notification {
            id: Uuid::new_v4(),
            user_id: user.id,
            complaint_id: complaint.map(|c| c.id),
            subject: message.subject.clone(),
            message: message.body.clone(),
            read: false,
            sent_at: at,
        };
        if let Err(e) = self.repo.record_notification(&record).await {
            warn!(user = %user.id, error = %e, "Failed to record notification");
        }

        let attempts = self.config.attempts.max(1);
        for attempt in 1..=attempts {
            if self.sink.notify(user, &message.subject, &message.body).await {
                debug!(user = %user.id, attempt, "Notification sent");
                return true;
            }
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(self.config.backoff_ms)).await;
            }
        }

        warn!(
            user = %user.id,
            subject = %message.subject,
            attempts,
            "Notification delivery failed"
        );
        false
    }
}
