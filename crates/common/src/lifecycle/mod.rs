//! Status and health reporting for long-lived components
//!
//! Services report a [`ManagerStatus`] for their lifecycle phase and build a
//! [`ManagerHealth`] snapshot out of per-component [`ComponentHealth`]
//! entries when asked for a health check.

use std::fmt;
use std::time::SystemTime;

/// Lifecycle phase of a managed component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerStatus {
    /// Created but not initialized
    Created,
    /// Initialization in progress
    Initializing,
    /// Running and operational
    Running,
    /// Shutdown in progress
    ShuttingDown,
    /// Shut down, no further work is accepted
    Shutdown,
    /// Initialization or shutdown failed
    Error,
}

impl ManagerStatus {
    /// Whether the component accepts work in this phase
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for ManagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "Shutting Down"),
            Self::Shutdown => write!(f, "Shutdown"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// Health snapshot of a managed component
#[derive(Debug, Clone)]
pub struct ManagerHealth {
    /// Overall health status
    pub is_healthy: bool,
    /// Health score from 0.0 (unhealthy) to 1.0 (perfectly healthy)
    pub score: f64,
    /// Optional health message
    pub message: Option<String>,
    /// Individual component health checks
    pub components: Vec<ComponentHealth>,
    /// Timestamp of health check
    pub timestamp: SystemTime,
}

impl ManagerHealth {
    /// Create a healthy status
    pub fn healthy() -> Self {
        Self {
            is_healthy: true,
            score: 1.0,
            message: None,
            components: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Create an unhealthy status with a message
    pub fn unhealthy<S: Into<String>>(message: S) -> Self {
        Self {
            is_healthy: false,
            score: 0.0,
            message: Some(message.into()),
            components: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Create a degraded status with a score
    pub fn degraded<S: Into<String>>(score: f64, message: S) -> Self {
        Self {
            is_healthy: score > 0.5,
            score: score.clamp(0.0, 1.0),
            message: Some(message.into()),
            components: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Build a snapshot from component checks.
    ///
    /// Score is the healthy fraction of components; overall health requires
    /// every component to be healthy.
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        if components.is_empty() {
            return Self::healthy();
        }

        let healthy = components.iter().filter(|c| c.is_healthy).count();
        #[allow(clippy::cast_precision_loss)]
        let score = healthy as f64 / components.len() as f64;
        let message = components
            .iter()
            .filter(|c| !c.is_healthy)
            .map(|c| match &c.message {
                Some(msg) => format!("{}: {msg}", c.name),
                None => c.name.clone(),
            })
            .collect::<Vec<_>>();

        Self {
            is_healthy: healthy == components.len(),
            score,
            message: if message.is_empty() { None } else { Some(message.join("; ")) },
            components,
            timestamp: SystemTime::now(),
        }
    }

    /// Add a component health check
    pub fn with_component(mut self, component: ComponentHealth) -> Self {
        self.components.push(component);
        self
    }
}

/// Health of one component within a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Whether the component is operating normally
    pub is_healthy: bool,
    /// Detail when unhealthy
    pub message: Option<String>,
}

impl ComponentHealth {
    /// Healthy component
    pub fn healthy<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), is_healthy: true, message: None }
    }

    /// Unhealthy component with a reason
    pub fn unhealthy<S: Into<String>, M: Into<String>>(name: S, message: M) -> Self {
        Self { name: name.into(), is_healthy: false, message: Some(message.into()) }
    }
}
