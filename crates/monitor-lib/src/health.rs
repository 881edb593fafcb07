//! Health check infrastructure for the vitals monitor
//!
//! Tracks the pipeline's collaborators (stores, notifier) for liveness
//! and readiness probes served by the agent binary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Compute overall status from component statuses
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const PIPELINE: &str = "pipeline";
    pub const HISTORY_STORE: &str = "history_store";
    pub const ANOMALY_STORE: &str = "anomaly_store";
    pub const ALERT_STORE: &str = "alert_store";
    pub const NOTIFIER: &str = "notifier";
}

/// Failure counts from one pipeline pass, per collaborator seam
///
/// Read failures leave the pass degraded but complete (detection or
/// dedup skipped); write failures mean records were lost.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeamFailures {
    /// History window queries that failed (statistical detection skipped)
    pub history_reads: usize,
    /// Anomaly records lost to store failures
    pub anomaly_writes: usize,
    /// Dedup lookups that failed (alert skipped to avoid storming)
    pub alert_reads: usize,
    /// Alert records lost to store failures
    pub alert_writes: usize,
    /// Alert deliveries that failed or timed out
    pub notifications: usize,
}

impl SeamFailures {
    pub fn any(&self) -> bool {
        self.history_reads
            + self.anomaly_writes
            + self.alert_reads
            + self.alert_writes
            + self.notifications
            > 0
    }
}

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    /// Update component health status
    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    /// Mark component as healthy
    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Mark component as degraded
    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    /// Mark component as unhealthy
    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Fold one pipeline pass into component health
    ///
    /// A clean pass restores every component to healthy, so a recovered
    /// collaborator clears its earlier degradation on the next sample.
    /// Lost records mark the owning store unhealthy; failed reads and
    /// failed deliveries only degrade, since the pass still completed.
    pub async fn observe_pass(&self, failures: &SeamFailures) {
        self.set_healthy(components::PIPELINE).await;

        if failures.history_reads > 0 {
            self.set_degraded(
                components::HISTORY_STORE,
                "History window query failed, statistical detection skipped",
            )
            .await;
        } else {
            self.set_healthy(components::HISTORY_STORE).await;
        }

        if failures.anomaly_writes > 0 {
            self.set_unhealthy(
                components::ANOMALY_STORE,
                "Anomaly records lost to store failures",
            )
            .await;
        } else {
            self.set_healthy(components::ANOMALY_STORE).await;
        }

        if failures.alert_writes > 0 {
            self.set_unhealthy(
                components::ALERT_STORE,
                "Alert records lost to store failures",
            )
            .await;
        } else if failures.alert_reads > 0 {
            self.set_degraded(
                components::ALERT_STORE,
                "Dedup lookup failed, alert skipped",
            )
            .await;
        } else {
            self.set_healthy(components::ALERT_STORE).await;
        }

        if failures.notifications > 0 {
            self.set_degraded(components::NOTIFIER, "Alert delivery failed or timed out")
                .await;
        } else {
            self.set_healthy(components::NOTIFIER).await;
        }
    }

    /// Set readiness status
    pub async fn set_ready(&self, ready: bool) {
        let mut r = self.ready.write().await;
        *r = ready;
    }

    /// Get health response
    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Get readiness response
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        // Not ready if any critical component is unhealthy
        let critical_healthy = health.status != ComponentStatus::Unhealthy;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Monitor not yet initialized".to_string()),
            }
        } else if !critical_healthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}
