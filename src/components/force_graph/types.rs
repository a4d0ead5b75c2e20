use serde::Deserialize;

use super::config::{LinkOverrides, NodeOverrides};

/// One vertex of an incoming graph payload.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct GraphNode {
	/// Unique identifier. An empty id rejects the whole payload.
	#[serde(default)]
	pub id: String,
	/// Palette group used when no explicit color is given.
	#[serde(default)]
	pub group: Option<u32>,
	/// Fixed x coordinate, used verbatim by static graphs and as a seed otherwise.
	#[serde(default)]
	pub x: Option<f64>,
	/// Fixed y coordinate.
	#[serde(default)]
	pub y: Option<f64>,
	/// Per-node display overrides.
	#[serde(flatten)]
	pub overrides: NodeOverrides,
}

impl GraphNode {
	/// Node with just an id.
	pub fn new(id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			..Default::default()
		}
	}

	/// Builder for payload coordinates.
	pub fn at(mut self, x: f64, y: f64) -> Self {
		self.x = Some(x);
		self.y = Some(y);
		self
	}
}

/// One directed edge of an incoming graph payload.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct GraphLink {
	/// Explicit identity; derived from the endpoint pair when absent.
	#[serde(default)]
	pub id: Option<String>,
	/// Source node id. Missing or unknown endpoints exclude the link during
	/// reconciliation instead of failing the parse.
	#[serde(default)]
	pub source: String,
	/// Target node id.
	#[serde(default)]
	pub target: String,
	/// Per-link display overrides.
	#[serde(flatten)]
	pub overrides: LinkOverrides,
}

impl GraphLink {
	/// Link without an explicit id or overrides.
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			..Default::default()
		}
	}
}

/// A complete graph payload. Each update replaces the previous one.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct GraphData {
	/// Payload order; the first node is the render root.
	#[serde(default)]
	pub nodes: Vec<GraphNode>,
	/// Directed edges between payload nodes.
	#[serde(default)]
	pub links: Vec<GraphLink>,
}

impl GraphData {
	/// Parse a `{ "nodes": [...], "links": [...] }` document.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn link_without_target_still_parses() {
		let data = GraphData::from_json(
			r#"{"nodes":[{"id":"1"},{"id":"2"}],"links":[{"source":"1","target":"2"},{"source":"1"}]}"#,
		)
		.unwrap();
		assert_eq!(data.nodes.len(), 2);
		assert_eq!(
			data.links,
			vec![GraphLink::new("1", "2"), GraphLink::new("1", "")]
		);
	}

	#[test]
	fn overrides_are_read_inline() {
		let data = GraphData::from_json(
			r#"{"nodes":[{"id":"a","label":"Alpha","size":300,"x":4,"y":2}],"links":[]}"#,
		)
		.unwrap();
		let node = &data.nodes[0];
		assert_eq!(node.overrides.label.as_deref(), Some("Alpha"));
		assert_eq!(node.overrides.size, Some(300.0));
		assert_eq!((node.x, node.y), (Some(4.0), Some(2.0)));
	}
}
