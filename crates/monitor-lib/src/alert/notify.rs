//! Notification dispatch seam
//!
//! The core calls the dispatcher synchronously per admitted alert and
//! tolerates any failure; retry and backoff policy belongs to the
//! dispatcher implementation, not here.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::{AlertRecord, Severity};

/// Delivery channel for admitted alerts
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver one alert; an error means the alert stays unsent
    async fn deliver(&self, alert: &AlertRecord) -> Result<()>;
}

/// Dispatcher that emits structured log events instead of paging anyone
///
/// The delivery channel of last resort; useful for development and as
/// the default when no external channel is wired up.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDispatcher;

impl LogDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn deliver(&self, alert: &AlertRecord) -> Result<()> {
        if alert.severity >= Severity::Critical {
            warn!(
                event = "alert_notification",
                patient_id = %alert.patient_id,
                alert_type = %alert.alert_type,
                severity = %alert.severity,
                message = %alert.message,
                "ALERT"
            );
        } else {
            info!(
                event = "alert_notification",
                patient_id = %alert.patient_id,
                alert_type = %alert.alert_type,
                severity = %alert.severity,
                message = %alert.message,
                "ALERT"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn log_dispatcher_always_confirms_delivery() {
        let alert = AlertRecord {
            id: "a-1".to_string(),
            patient_id: "p-1".to_string(),
            alert_type: "heart_rate".to_string(),
            severity: Severity::Critical,
            message: "Critical Alert: test".to_string(),
            timestamp: Utc::now(),
            sent: false,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        };

        assert!(LogDispatcher::new().deliver(&alert).await.is_ok());
    }
}
