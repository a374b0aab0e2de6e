use cadence_scheduler::FrameInfo;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be a finite positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("invalid clock config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// How real elapsed time is turned into frame deltas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Ignore real time and step by this many seconds per frame.
    pub fixed_delta: Option<f64>,
    /// Upper bound on a single frame delta, so a stall does not teleport
    /// every animation to its end.
    pub max_delta: f64,
    pub time_scale: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            fixed_delta: None,
            max_delta: 0.25,
            time_scale: 1.0,
        }
    }
}

impl ClockConfig {
    pub fn fixed(delta: f64) -> Self {
        Self {
            fixed_delta: Some(delta),
            ..Self::default()
        }
    }

    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        let config: ClockConfig = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut fields = vec![("max_delta", self.max_delta), ("time_scale", self.time_scale)];
        if let Some(delta) = self.fixed_delta {
            fields.push(("fixed_delta", delta));
        }
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(())
    }
}

/// Process clock advanced once per host-loop tick.
#[derive(Debug, Clone)]
pub struct FrameClock {
    config: ClockConfig,
    info: FrameInfo,
}

impl FrameClock {
    pub fn new(config: ClockConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            info: FrameInfo::default(),
        })
    }

    /// Start the next frame, `real_delta` seconds after the previous one.
    pub fn advance(&mut self, real_delta: f64) -> FrameInfo {
        let raw = match self.config.fixed_delta {
            Some(delta) => delta,
            None if real_delta.is_finite() => real_delta.clamp(0.0, self.config.max_delta),
            None => 0.0,
        };
        let delta = raw * self.config.time_scale;

        self.info.frame += 1;
        self.info.delta = delta;
        self.info.time += delta;
        self.info
    }

    pub fn info(&self) -> FrameInfo {
        self.info
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn reset(&mut self) {
        self.info = FrameInfo::default();
    }
}
