use async_trait::async_trait;
use thiserror::Error;

use crate::domain::weather::{Coordinates, ForecastPeriod, UsState, WeatherAlert};

/// Failures of an external capability call for a single target
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("No data for {0}")]
    NoData(String),

    #[error("Unsupported location: {0}")]
    UnsupportedTarget(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),
}

/// Weather data source used by the Worker Agent
///
/// Treated as a black box: returns data for the target or an explicit error.
/// An empty alert list means "no active alerts", not a failure.
#[async_trait]
pub trait WeatherCapability: Send + Sync {
    /// Active alerts for a state
    async fn alerts(&self, state: &UsState) -> Result<Vec<WeatherAlert>, CapabilityError>;

    /// Forecast periods for a point
    async fn forecast(&self, point: Coordinates) -> Result<Vec<ForecastPeriod>, CapabilityError>;
}
