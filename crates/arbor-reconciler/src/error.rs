//! Runtime error types.

use arbor_scheduler::SchedulerError;
use thiserror::Error;

/// Result type for runtime construction and configuration.
pub type ArborResult<T> = Result<T, ArborError>;

/// Errors surfaced at the configuration boundary.
///
/// Rendering, dispatching and committing never return errors. Panics from
/// components, effects or listeners unwind through the scheduler tick that
/// ran them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArborError {
	/// The settings file is not valid TOML or does not match the schema.
	#[error("failed to parse runtime configuration: {0}")]
	Parse(#[from] toml::de::Error),

	/// Scheduler settings were rejected.
	#[error(transparent)]
	Scheduler(#[from] SchedulerError),

	/// Runtime settings were rejected.
	#[error("invalid runtime configuration: {0}")]
	InvalidConfig(String),
}
