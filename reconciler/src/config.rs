// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runtime configuration for the reconciler's retry and poll windows

use anyhow::Context;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Default window for retrying route creation against readiness races.
const fn default_create_window() -> Duration {
    Duration::from_secs(2 * 60)
}

const fn default_create_retry_interval() -> Duration {
    Duration::from_secs(5)
}

/// Default window for a just-created route to become visible to reads.
const fn default_convergence_window() -> Duration {
    Duration::from_secs(15)
}

const fn default_convergence_poll_interval() -> Duration {
    Duration::from_secs(1)
}

/// Default window for retrying route deletion against readiness races.
const fn default_delete_window() -> Duration {
    Duration::from_secs(5 * 60)
}

const fn default_delete_retry_interval() -> Duration {
    Duration::from_secs(5)
}

/// Configuration used to initialize a [`RouteReconciler`]
///
/// All windows bound fixed-interval polling loops; a window elapsing is the
/// only cancellation mechanism the reconciler has.
///
/// [`RouteReconciler`]: crate::reconciler::RouteReconciler
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// How long to keep retrying a create call that fails with the
    /// transient invalid-parameter class.
    #[serde(default = "default_create_window")]
    pub create_window: Duration,

    /// Interval between create retries.
    #[serde(default = "default_create_retry_interval")]
    pub create_retry_interval: Duration,

    /// How long to poll for a just-created route to become visible.
    #[serde(default = "default_convergence_window")]
    pub convergence_window: Duration,

    /// Interval between convergence polls.
    #[serde(default = "default_convergence_poll_interval")]
    pub convergence_poll_interval: Duration,

    /// How long to keep retrying a delete call that fails with the
    /// transient invalid-parameter class.
    #[serde(default = "default_delete_window")]
    pub delete_window: Duration,

    /// Interval between delete retries.
    #[serde(default = "default_delete_retry_interval")]
    pub delete_retry_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            create_window: default_create_window(),
            create_retry_interval: default_create_retry_interval(),
            convergence_window: default_convergence_window(),
            convergence_poll_interval: default_convergence_poll_interval(),
            delete_window: default_delete_window(),
            delete_retry_interval: default_delete_retry_interval(),
        }
    }
}

impl ReconcilerConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
    ) -> Result<ReconcilerConfig, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }
}
