//! Runtime configuration.
//!
//! ## Example
//!
//! ```
//! use arbor_reconciler::config::RuntimeConfig;
//! use arbor_scheduler::Priority;
//!
//! let config = RuntimeConfig::from_toml_str(
//!     r#"
//!     default_update_priority = "user_blocking"
//!     time_slicing = false
//!
//!     [scheduler]
//!     frame_interval_ms = 8
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.default_update_priority, Priority::UserBlocking);
//! assert_eq!(config.scheduler.frame_interval_ms, 8);
//! ```

use arbor_scheduler::{Priority, SchedulerConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ArborError, ArborResult};

/// Settings of a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
	/// Scheduler time slice.
	pub scheduler: SchedulerConfig,
	/// Priority of updates dispatched outside of an event listener.
	pub default_update_priority: Priority,
	/// When false, every render runs to completion without yielding.
	pub time_slicing: bool,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		Self {
			scheduler: SchedulerConfig::default(),
			default_update_priority: Priority::Normal,
			time_slicing: true,
		}
	}
}

impl RuntimeConfig {
	/// Parse and validate a TOML document.
	pub fn from_toml_str(source: &str) -> ArborResult<Self> {
		let config: RuntimeConfig = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	/// Disable or enable time slicing.
	pub fn with_time_slicing(mut self, enabled: bool) -> Self {
		self.time_slicing = enabled;
		self
	}

	/// Set the priority of updates outside of events.
	pub fn with_default_update_priority(mut self, priority: Priority) -> Self {
		self.default_update_priority = priority;
		self
	}

	/// Check that the settings are usable.
	pub fn validate(&self) -> ArborResult<()> {
		self.scheduler.validate()?;
		if self.default_update_priority == Priority::Immediate && self.time_slicing {
			// Immediate tasks are always expired, so slicing would never apply.
			return Err(ArborError::InvalidConfig(
				"time_slicing has no effect with an immediate default priority".to_string(),
			));
		}
		Ok(())
	}
}
