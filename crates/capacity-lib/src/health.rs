//! Service health for the capacity report server
//!
//! The record source and the rollup engine report their own state. A source
//! that keeps failing escalates from degraded to unhealthy, which takes the
//! server out of `/readyz` until a fetch succeeds again.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive failed fetches before the record source counts as unhealthy
pub const DEFAULT_SOURCE_FAILURE_THRESHOLD: u32 = 3;

/// Parts of the server that report health
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    /// Snapshot and mapping input
    RecordSource,
    /// Rollup engine
    Engine,
}

impl Component {
    pub const ALL: [Component; 2] = [Component::RecordSource, Component::Engine];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::RecordSource => "record_source",
            Component::Engine => "engine",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Serving, but the last operation had problems
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }

    fn worst(self, other: ComponentStatus) -> ComponentStatus {
        match (self, other) {
            (ComponentStatus::Unhealthy, _) | (_, ComponentStatus::Unhealthy) => {
                ComponentStatus::Unhealthy
            }
            (ComponentStatus::Degraded, _) | (_, ComponentStatus::Degraded) => {
                ComponentStatus::Degraded
            }
            _ => ComponentStatus::Healthy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failed operations since the last success
    #[serde(default)]
    pub consecutive_failures: u32,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>, consecutive_failures: u32) -> Self {
        Self {
            status,
            message,
            consecutive_failures,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None, 0)
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<Component, ComponentHealth>,
    /// Newest reporting date served since startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report_date: Option<NaiveDate>,
}

impl HealthResponse {
    pub fn compute_status(components: &BTreeMap<Component, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .fold(ComponentStatus::Healthy, |worst, c| worst.worst(c.status))
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct HealthState {
    components: BTreeMap<Component, ComponentHealth>,
    last_report_date: Option<NaiveDate>,
    ready: bool,
}

/// Shared registry of component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
    source_failure_threshold: u32,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::with_source_failure_threshold(DEFAULT_SOURCE_FAILURE_THRESHOLD)
    }

    pub fn with_source_failure_threshold(threshold: u32) -> Self {
        Self {
            state: Arc::new(RwLock::new(HealthState::default())),
            source_failure_threshold: threshold.max(1),
        }
    }

    /// Register every component as healthy
    pub async fn register_all(&self) {
        let mut state = self.state.write().await;
        for component in Component::ALL {
            state.components.insert(component, ComponentHealth::healthy());
        }
    }

    pub async fn set_healthy(&self, component: Component) {
        self.state
            .write()
            .await
            .components
            .insert(component, ComponentHealth::healthy());
    }

    pub async fn set_degraded(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentStatus::Degraded, message.into())
            .await;
    }

    pub async fn set_unhealthy(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentStatus::Unhealthy, message.into())
            .await;
    }

    async fn set(&self, component: Component, status: ComponentStatus, message: String) {
        let mut state = self.state.write().await;
        let failures = state
            .components
            .get(&component)
            .map_or(0, |c| c.consecutive_failures);
        state
            .components
            .insert(component, ComponentHealth::new(status, Some(message), failures));
    }

    /// A source fetch completed
    pub async fn source_succeeded(&self) {
        self.set_healthy(Component::RecordSource).await;
    }

    /// A source fetch failed; returns the record source's new status
    ///
    /// Degraded until `source_failure_threshold` failures in a row, then
    /// unhealthy.
    pub async fn source_failed(&self, message: impl Into<String>) -> ComponentStatus {
        let mut state = self.state.write().await;
        let failures = state
            .components
            .get(&Component::RecordSource)
            .map_or(0, |c| c.consecutive_failures)
            .saturating_add(1);
        let status = if failures >= self.source_failure_threshold {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        };
        state.components.insert(
            Component::RecordSource,
            ComponentHealth::new(status, Some(message.into()), failures),
        );
        status
    }

    /// Remember a served reporting date, keeping the newest
    pub async fn report_served(&self, report_date: NaiveDate) {
        let mut state = self.state.write().await;
        state.last_report_date = state.last_report_date.max(Some(report_date));
    }

    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: HealthResponse::compute_status(&state.components),
            components: state.components.clone(),
            last_report_date: state.last_report_date,
        }
    }

    /// Ready once startup finished and no component is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        if !state.ready {
            return ReadinessResponse {
                ready: false,
                reason: Some("Report service not yet initialized".to_string()),
            };
        }

        let failing: Vec<String> = state
            .components
            .iter()
            .filter(|(_, h)| !h.status.is_operational())
            .map(|(component, h)| match &h.message {
                Some(message) => format!("{} ({})", component, message),
                None => component.to_string(),
            })
            .collect();

        if failing.is_empty() {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some(format!("Unhealthy components: {}", failing.join(", "))),
            }
        }
    }
}
