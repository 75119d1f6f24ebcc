//! Scheduler configuration.

use serde::{Deserialize, Serialize};

use crate::error::{SchedulerError, SchedulerResult};

/// Default time slice, in milliseconds, before the work loop yields to the host.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 5;

/// Scheduler settings.
///
/// Deserializable so it can be embedded in a larger settings file; every
/// field has a default.
///
/// ## Example
///
/// ```
/// use arbor_scheduler::SchedulerConfig;
///
/// let config = SchedulerConfig::default().with_frame_interval(8);
/// assert_eq!(config.frame_interval_ms, 8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
	/// How long one host tick may run before `should_yield` turns true.
	pub frame_interval_ms: u64,
}

impl Default for SchedulerConfig {
	fn default() -> Self {
		Self {
			frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
		}
	}
}

impl SchedulerConfig {
	/// Set the frame interval.
	pub fn with_frame_interval(mut self, ms: u64) -> Self {
		self.frame_interval_ms = ms;
		self
	}

	/// Check that the settings are usable.
	pub fn validate(&self) -> SchedulerResult<()> {
		if self.frame_interval_ms == 0 {
			return Err(SchedulerError::InvalidFrameInterval(self.frame_interval_ms));
		}
		Ok(())
	}
}
