//! Controller sizing and limits.
//!
//! Channel counts come from the platform description of the block (device
//! tree or board code); the core only validates them.

use crate::error::{PwmError, Result};
use crate::layout::{MAX_CAPTURE_CHANNELS, MAX_OUTPUT_CHANNELS};

/// Configuration for one PWM block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerConfig {
    pub name: String,
    pub output_channels: u32,
    pub capture_channels: u32,
    /// Counter value at which one output period ends.
    pub max_counter: u32,
    pub max_prescale: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: "sti-pwm".to_string(),
            output_channels: MAX_OUTPUT_CHANNELS,
            capture_channels: MAX_CAPTURE_CHANNELS,
            max_counter: 255,
            max_prescale: 0xff,
        }
    }
}

impl ControllerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ControllerConfigBuilder {
        ControllerConfigBuilder::default()
    }

    /// Number of channel indices exposed to the framework.
    pub fn npwm(&self) -> u32 {
        self.output_channels.max(self.capture_channels)
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_channels == 0 && self.capture_channels == 0 {
            return Err(PwmError::Config("no channels configured".into()));
        }
        if self.output_channels > MAX_OUTPUT_CHANNELS {
            return Err(PwmError::Config(format!(
                "{} output channels requested, hardware has {}",
                self.output_channels, MAX_OUTPUT_CHANNELS
            )));
        }
        if self.capture_channels > MAX_CAPTURE_CHANNELS {
            return Err(PwmError::Config(format!(
                "{} capture channels requested, hardware has {}",
                self.capture_channels, MAX_CAPTURE_CHANNELS
            )));
        }
        if self.max_counter == 0 {
            return Err(PwmError::Config("max_counter must be non-zero".into()));
        }
        // Two 4-bit halves in the control register.
        if self.max_prescale > 0xff {
            return Err(PwmError::Config(format!(
                "max_prescale {:#x} does not fit the prescaler fields",
                self.max_prescale
            )));
        }
        Ok(())
    }
}

/// Builder for [`ControllerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ControllerConfigBuilder {
    config: ControllerConfig,
}

impl ControllerConfigBuilder {
    /// Sets the name used in log messages.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn output_channels(mut self, count: u32) -> Self {
        self.config.output_channels = count;
        self
    }

    pub fn capture_channels(mut self, count: u32) -> Self {
        self.config.capture_channels = count;
        self
    }

    pub fn max_counter(mut self, max: u32) -> Self {
        self.config.max_counter = max;
        self
    }

    pub fn max_prescale(mut self, max: u32) -> Self {
        self.config.max_prescale = max;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<ControllerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
