//! Planner configuration, loaded from JSON.
//!
//! Every field has a default matching the deployed service, so an empty
//! object is a valid configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::booking_source::BookingSourceConfig;
use crate::error::ConfigError;
use crate::solver::{CostModel, SolveOptions};

const DEFAULT_CAPACITY: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub cost: CostModel,
    /// Seats per vehicle.
    pub capacity: u32,
    /// Solver wall-clock budget in milliseconds. Unbounded when absent.
    pub time_budget_ms: Option<u64>,
    /// Station a vehicle in every region with riders, even if sharing a
    /// vehicle elsewhere would be cheaper.
    pub require_vehicle_per_demand_region: bool,
    pub booking_source: BookingSourceConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cost: CostModel::default(),
            capacity: DEFAULT_CAPACITY,
            time_budget_ms: None,
            require_vehicle_per_demand_region: false,
            booking_source: BookingSourceConfig::default(),
        }
    }
}

impl PlannerConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cost
            .validate()
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be positive".to_string()));
        }
        if self.booking_source.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "booking source base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn solve_options(&self) -> SolveOptions {
        SolveOptions {
            time_budget: self.time_budget_ms.map(Duration::from_millis),
            require_vehicle_per_demand_region: self.require_vehicle_per_demand_region,
        }
    }
}
