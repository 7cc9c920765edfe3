//! Instance power state machine
//!
//! Only `Stopped` and `Running` can be observed remotely. `Stopping` and
//! `Starting` exist while the reconciler is driving a transition and are
//! left once the waiter sees the target status.

use crate::error::{CloudError, Result};
use crate::model::Instance;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Stopped,
    Stopping,
    Running,
    Starting,
}

impl PowerState {
    /// Derive the state of a freshly read instance
    ///
    /// An instance caught mid-transition (`cleaning`, `migrating`, ...) is a
    /// [`CloudError::Conflict`]: nothing disruptive may be started on it.
    pub fn observe(instance: &Instance) -> Result<Self> {
        if instance.is_transitioning() {
            return Err(CloudError::Conflict(format!(
                "instance {} is transitioning (status: {})",
                instance.id, instance.status
            )));
        }
        if instance.is_up() {
            Ok(PowerState::Running)
        } else {
            Ok(PowerState::Stopped)
        }
    }

    pub fn begin_shutdown(self) -> Result<Self> {
        match self {
            PowerState::Running => Ok(PowerState::Stopping),
            other => Err(invalid("shutdown", other)),
        }
    }

    pub fn finish_shutdown(self) -> Result<Self> {
        match self {
            PowerState::Stopping => Ok(PowerState::Stopped),
            other => Err(invalid("complete shutdown", other)),
        }
    }

    pub fn begin_boot(self) -> Result<Self> {
        match self {
            PowerState::Stopped => Ok(PowerState::Starting),
            other => Err(invalid("boot", other)),
        }
    }

    pub fn finish_boot(self) -> Result<Self> {
        match self {
            PowerState::Starting => Ok(PowerState::Running),
            other => Err(invalid("complete boot", other)),
        }
    }

    pub fn is_running(self) -> bool {
        self == PowerState::Running
    }
}

fn invalid(action: &str, state: PowerState) -> CloudError {
    CloudError::Conflict(format!("cannot {} while {}", action, state))
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::Stopped => write!(f, "stopped"),
            PowerState::Stopping => write!(f, "stopping"),
            PowerState::Running => write!(f, "running"),
            PowerState::Starting => write!(f, "starting"),
        }
    }
}
