//! Health reporting for the application context.
//!
//! A report is a list of component checks. Components are either required
//! (the database) or optional (the config generator); any failing required
//! component makes the whole report unhealthy regardless of the score.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Minimum share of healthy components for an overall healthy report.
pub const HEALTHY_SCORE_THRESHOLD: f64 = 0.8;

/// Aggregated health of the application.
///
/// # Example
/// ```no_run
/// use dashsync_app::utils::health::{ComponentHealth, HealthStatus};
///
/// let status = HealthStatus::new()
///     .add_component(ComponentHealth::healthy("database"))
///     .add_component(ComponentHealth::unhealthy("config_generator", "no api key").optional())
///     .finish();
///
/// assert_eq!(status.score, 0.5);
/// assert!(!status.is_healthy);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub is_healthy: bool,
    /// Share of healthy components, 0.0 to 1.0.
    pub score: f64,
    pub message: Option<String>,
    pub components: Vec<ComponentHealth>,
    /// Unix seconds at which the report was taken.
    pub timestamp: i64,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            is_healthy: true,
            score: 1.0,
            message: None,
            components: Vec::new(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn add_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }

    /// Compute score and verdict from the collected components.
    pub fn finish(mut self) -> Self {
        if self.components.is_empty() {
            return self;
        }

        let healthy = self.components.iter().filter(|c| c.is_healthy).count();
        self.score = healthy as f64 / self.components.len() as f64;

        let failed_required: Vec<&str> = self
            .components
            .iter()
            .filter(|c| c.required && !c.is_healthy)
            .map(|c| c.name.as_str())
            .collect();

        self.is_healthy = failed_required.is_empty() && self.score >= HEALTHY_SCORE_THRESHOLD;
        self.message = if !failed_required.is_empty() {
            Some(format!("required components failing: {}", failed_required.join(", ")))
        } else if !self.is_healthy {
            Some("too many optional components failing".to_string())
        } else {
            None
        };
        self
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            is_healthy: false,
            score: 0.0,
            message: Some(message.into()),
            components: Vec::new(),
            timestamp: Utc::now().timestamp(),
        }
    }

    pub fn component(&self, name: &str) -> Option<&ComponentHealth> {
        self.components.iter().find(|c| c.name == name)
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Health of a single component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub is_healthy: bool,
    /// Required components fail the whole report.
    pub required: bool,
    pub message: Option<String>,
}

impl ComponentHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: true, required: true, message: None }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self { name: name.into(), is_healthy: false, required: true, message: Some(message.into()) }
    }

    /// Mark the component as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_healthy() {
        let status = HealthStatus::new().finish();
        assert!(status.is_healthy);
        assert_eq!(status.score, 1.0);
        assert!(status.message.is_none());
        assert!(status.timestamp > 0);
    }

    #[test]
    fn failing_required_component_fails_report() {
        let status = HealthStatus::new()
            .add_component(ComponentHealth::unhealthy("database", "locked"))
            .add_component(ComponentHealth::healthy("a"))
            .add_component(ComponentHealth::healthy("b"))
            .add_component(ComponentHealth::healthy("c"))
            .add_component(ComponentHealth::healthy("d"))
            .finish();

        assert_eq!(status.score, 0.8);
        assert!(!status.is_healthy);
        assert!(status.message.expect("message should be set").contains("database"));
    }

    #[test]
    fn optional_failures_tolerated_up_to_threshold() {
        let status = HealthStatus::new()
            .add_component(ComponentHealth::healthy("database"))
            .add_component(ComponentHealth::healthy("cache"))
            .add_component(ComponentHealth::healthy("sync"))
            .add_component(ComponentHealth::healthy("discovery"))
            .add_component(ComponentHealth::unhealthy("config_generator", "no key").optional())
            .finish();

        assert!(status.is_healthy);
        let generator = status.component("config_generator").expect("component should exist");
        assert!(!generator.required);
        assert_eq!(generator.message.as_deref(), Some("no key"));
    }

    #[test]
    fn optional_failures_below_threshold_fail_report() {
        let status = HealthStatus::new()
            .add_component(ComponentHealth::healthy("database"))
            .add_component(ComponentHealth::unhealthy("config_generator", "down").optional())
            .finish();

        assert_eq!(status.score, 0.5);
        assert!(!status.is_healthy);
    }

    #[test]
    fn unhealthy_constructor_sets_message() {
        let status = HealthStatus::unhealthy("context closed");
        assert!(!status.is_healthy);
        assert_eq!(status.message.as_deref(), Some("context closed"));
    }
}
