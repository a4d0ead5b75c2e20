use thiserror::Error;

/// Result alias for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Everything that can refuse a graph update or configuration.
#[derive(Debug, Error)]
pub enum GraphError {
	/// A payload node has no id. The whole update is rejected.
	#[error("node at index {index} has no id")]
	InvalidNode {
		/// Position of the node in the payload.
		index: usize,
	},

	/// A dynamic graph was built without an engine.
	#[error("simulation engine unavailable: {0}")]
	SimulationUnavailable(String),

	/// A physics parameter is non-finite or out of range.
	#[error("simulation parameter `{parameter}` is invalid: {value}")]
	SimulationMisconfigured {
		/// Configuration key, as spelled in JSON.
		parameter: &'static str,
		/// Offending value.
		value: f64,
	},

	/// Configuration JSON failed to parse.
	#[error("invalid graph configuration: {0}")]
	InvalidConfig(#[from] serde_json::Error),
}
