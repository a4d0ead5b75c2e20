//! Layered graph configuration.
//!
//! A fully populated [`GraphConfig`] comes from the defaults below, optionally
//! overlaid with a partial JSON document. Node and link display settings are
//! then overlaid once more per entity through [`NodeOverrides`] and
//! [`LinkOverrides`], field by field.

use log::warn;
use serde::Deserialize;

use super::error::Result;
use super::types::GraphNode;

/// Palette used for nodes that carry a `group` but no explicit color.
pub const GROUP_COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Node glyph.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SymbolType {
	/// Filled disc.
	#[default]
	Circle,
	/// Plus sign.
	Cross,
	/// Square rotated onto its corner, slightly taller than wide.
	Diamond,
	/// Axis-aligned square.
	Square,
	/// Five-pointed star.
	Star,
	/// Upward equilateral triangle.
	Triangle,
	/// Three-armed "Y".
	Wye,
}

/// Link stroke pattern.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
	/// Continuous stroke.
	#[default]
	Solid,
	/// Long dashes.
	Dashed,
	/// Short dots.
	Dotted,
}

/// Physics tuning handed verbatim to the simulation engine.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct D3Config {
	/// Activity level the layout settles towards.
	pub alpha_target: f64,
	/// Negative values repel, positive values attract.
	pub gravity: f64,
	/// Preferred distance between linked nodes.
	pub link_length: f64,
	/// Spring stiffness multiplier.
	pub link_strength: f64,
	/// Keep links out of the physics; they are still drawn.
	pub disable_link_force: bool,
}

impl Default for D3Config {
	fn default() -> Self {
		Self {
			alpha_target: 0.05,
			gravity: -100.0,
			link_length: 100.0,
			link_strength: 1.0,
			disable_link_force: false,
		}
	}
}

/// Resolved display settings shared by every node.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeConfig {
	/// Fill color.
	pub color: String,
	/// Label color.
	pub font_color: String,
	/// Label size in pixels.
	pub font_size: f64,
	/// 0 to 1.
	pub opacity: f64,
	/// Draw the label next to the symbol.
	pub render_label: bool,
	/// Symbol area; the drawn extent is `size / 10` pixels.
	pub size: f64,
	/// Outline color, `"none"` for no outline.
	pub stroke_color: String,
	/// Outline width in pixels.
	pub stroke_width: f64,
	/// Glyph.
	pub symbol_type: SymbolType,
}

impl Default for NodeConfig {
	fn default() -> Self {
		Self {
			color: "#d3d3d3".into(),
			font_color: "black".into(),
			font_size: 8.0,
			opacity: 1.0,
			render_label: true,
			size: 200.0,
			stroke_color: "none".into(),
			stroke_width: 1.5,
			symbol_type: SymbolType::Circle,
		}
	}
}

/// Per-node overlay; every `Some` field replaces the common value.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeOverrides {
	/// Text drawn next to the node; defaults to the id.
	pub label: Option<String>,
	/// Explicit fill color. Takes precedence over the group palette.
	pub color: Option<String>,
	/// See [`NodeConfig::font_color`].
	pub font_color: Option<String>,
	/// See [`NodeConfig::font_size`].
	pub font_size: Option<f64>,
	/// See [`NodeConfig::opacity`].
	pub opacity: Option<f64>,
	/// See [`NodeConfig::render_label`].
	pub render_label: Option<bool>,
	/// See [`NodeConfig::size`].
	pub size: Option<f64>,
	/// See [`NodeConfig::stroke_color`].
	pub stroke_color: Option<String>,
	/// See [`NodeConfig::stroke_width`].
	pub stroke_width: Option<f64>,
	/// See [`NodeConfig::symbol_type`].
	pub symbol_type: Option<SymbolType>,
}

impl NodeConfig {
	/// Copy of `self` with every `Some` override applied.
	pub fn merged(&self, overrides: &NodeOverrides) -> NodeConfig {
		NodeConfig {
			color: overrides.color.clone().unwrap_or_else(|| self.color.clone()),
			font_color: overrides
				.font_color
				.clone()
				.unwrap_or_else(|| self.font_color.clone()),
			font_size: overrides.font_size.unwrap_or(self.font_size),
			opacity: overrides.opacity.unwrap_or(self.opacity),
			render_label: overrides.render_label.unwrap_or(self.render_label),
			size: overrides.size.unwrap_or(self.size),
			stroke_color: overrides
				.stroke_color
				.clone()
				.unwrap_or_else(|| self.stroke_color.clone()),
			stroke_width: overrides.stroke_width.unwrap_or(self.stroke_width),
			symbol_type: overrides.symbol_type.unwrap_or(self.symbol_type),
		}
	}

	/// Resolve the settings for one payload node. An explicit color wins over
	/// the group palette, which wins over the common color.
	pub fn for_node(&self, node: &GraphNode) -> NodeConfig {
		let mut resolved = self.merged(&node.overrides);
		if let (None, Some(group)) = (&node.overrides.color, node.group) {
			resolved.color = GROUP_COLORS[group as usize % GROUP_COLORS.len()].into();
		}
		resolved
	}
}

/// Resolved display settings shared by every link.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkConfig {
	/// Stroke and arrowhead color.
	pub color: String,
	/// Label color.
	pub font_color: String,
	/// Label size in pixels.
	pub font_size: f64,
	/// 0 to 1.
	pub opacity: f64,
	/// Draw the label at the link midpoint.
	pub render_label: bool,
	/// Stroke width in pixels at zoom 1.
	pub stroke_width: f64,
	/// Stroke pattern.
	pub line_type: LineType,
}

impl Default for LinkConfig {
	fn default() -> Self {
		Self {
			color: "#d3d3d3".into(),
			font_color: "black".into(),
			font_size: 8.0,
			opacity: 1.0,
			render_label: false,
			stroke_width: 1.5,
			line_type: LineType::Solid,
		}
	}
}

/// Per-link overlay, the link counterpart of [`NodeOverrides`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkOverrides {
	/// Text drawn at the link midpoint.
	pub label: Option<String>,
	/// See [`LinkConfig::color`].
	pub color: Option<String>,
	/// See [`LinkConfig::font_color`].
	pub font_color: Option<String>,
	/// See [`LinkConfig::font_size`].
	pub font_size: Option<f64>,
	/// See [`LinkConfig::opacity`].
	pub opacity: Option<f64>,
	/// See [`LinkConfig::render_label`].
	pub render_label: Option<bool>,
	/// See [`LinkConfig::stroke_width`].
	pub stroke_width: Option<f64>,
	/// See [`LinkConfig::line_type`].
	pub line_type: Option<LineType>,
}

impl LinkConfig {
	/// Copy of `self` with every `Some` override applied.
	pub fn merged(&self, overrides: &LinkOverrides) -> LinkConfig {
		LinkConfig {
			color: overrides.color.clone().unwrap_or_else(|| self.color.clone()),
			font_color: overrides
				.font_color
				.clone()
				.unwrap_or_else(|| self.font_color.clone()),
			font_size: overrides.font_size.unwrap_or(self.font_size),
			opacity: overrides.opacity.unwrap_or(self.opacity),
			render_label: overrides.render_label.unwrap_or(self.render_label),
			stroke_width: overrides.stroke_width.unwrap_or(self.stroke_width),
			line_type: overrides.line_type.unwrap_or(self.line_type),
		}
	}
}

/// Graph level configuration.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
	/// Release a dropped node back to the simulation instead of pinning it.
	pub automatic_rearrange_after_drop_node: bool,
	/// Disable node dragging; presses on nodes pan instead.
	pub freeze_all_drag_events: bool,
	/// Seconds.
	pub focus_animation_duration: f64,
	/// Zoom level used when focusing a node.
	pub focus_zoom: f64,
	/// Canvas height in pixels when the parent gives no size.
	pub height: f64,
	/// Canvas width in pixels when the parent gives no size.
	pub width: f64,
	/// Upper zoom bound.
	pub max_zoom: f64,
	/// Lower zoom bound, strictly positive.
	pub min_zoom: f64,
	/// Starting zoom, 1 when unset.
	pub initial_zoom: Option<f64>,
	/// No simulation at all; positions come verbatim from the payload.
	pub static_graph: bool,
	/// Like `static_graph`, but nodes can still be dragged.
	pub static_graph_with_drag_and_drop: bool,
	/// Minimum spacing between two visual refreshes.
	pub refresh_interval_ms: u64,
	/// Physics tuning.
	pub d3: D3Config,
	/// Common node settings, overlaid per node.
	pub node: NodeConfig,
	/// Common link settings, overlaid per link.
	pub link: LinkConfig,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			automatic_rearrange_after_drop_node: false,
			freeze_all_drag_events: false,
			focus_animation_duration: 0.75,
			focus_zoom: 1.0,
			height: 600.0,
			width: 800.0,
			max_zoom: 8.0,
			min_zoom: 0.125,
			initial_zoom: None,
			static_graph: false,
			static_graph_with_drag_and_drop: false,
			refresh_interval_ms: 50,
			d3: D3Config::default(),
			node: NodeConfig::default(),
			link: LinkConfig::default(),
		}
	}
}

impl GraphConfig {
	/// Overlay a partial JSON document on the defaults and normalize the result.
	pub fn from_json(json: &str) -> Result<Self> {
		let config: GraphConfig = serde_json::from_str(json)?;
		Ok(config.resolved())
	}

	/// Either static flavour: the simulation is never registered.
	pub fn is_static(&self) -> bool {
		self.static_graph || self.static_graph_with_drag_and_drop
	}

	/// `k` limited to `[min_zoom, max_zoom]`; NaN maps to `min_zoom`.
	pub fn clamp_zoom(&self, k: f64) -> f64 {
		if k.is_nan() {
			return self.min_zoom;
		}
		k.clamp(self.min_zoom, self.max_zoom)
	}

	/// Bring out-of-range values back to the nearest valid bound.
	/// Idempotent.
	pub fn resolved(mut self) -> Self {
		if self.min_zoom > self.max_zoom {
			warn!(
				"minZoom {} exceeds maxZoom {}, swapping",
				self.min_zoom, self.max_zoom
			);
			std::mem::swap(&mut self.min_zoom, &mut self.max_zoom);
		}
		if !(self.min_zoom > 0.0) {
			warn!("minZoom {} is not positive, using default", self.min_zoom);
			self.min_zoom = GraphConfig::default().min_zoom;
		}
		if !(self.max_zoom >= self.min_zoom) {
			warn!("maxZoom {} below minZoom {}, raising it", self.max_zoom, self.min_zoom);
			self.max_zoom = self.min_zoom;
		}
		let focus = self.clamp_zoom(self.focus_zoom);
		if focus != self.focus_zoom {
			warn!("focusZoom {} clamped to {}", self.focus_zoom, focus);
			self.focus_zoom = focus;
		}
		if let Some(initial) = self.initial_zoom {
			let clamped = self.clamp_zoom(initial);
			if clamped != initial {
				warn!("initialZoom {} clamped to {}", initial, clamped);
			}
			self.initial_zoom = Some(clamped);
		}
		if self.focus_animation_duration < 0.0 {
			self.focus_animation_duration = 0.0;
		}
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn partial_json_keeps_defaults() {
		let config = GraphConfig::from_json(
			r#"{ "staticGraph": true, "d3": { "linkLength": 250 }, "node": { "color": "red" } }"#,
		)
		.unwrap();
		assert!(config.static_graph);
		assert_eq!(config.d3.link_length, 250.0);
		assert_eq!(config.d3.gravity, -100.0);
		assert_eq!(config.node.color, "red");
		assert_eq!(config.node.size, 200.0);
		assert_eq!(config.max_zoom, 8.0);
	}

	#[test]
	fn malformed_json_is_rejected() {
		assert!(GraphConfig::from_json("{ \"width\": \"wide\" }").is_err());
	}

	#[test]
	fn focus_zoom_is_clamped_to_bounds() {
		let config = GraphConfig {
			focus_zoom: 20.0,
			initial_zoom: Some(0.01),
			..Default::default()
		}
		.resolved();
		assert_eq!(config.focus_zoom, 8.0);
		assert_eq!(config.initial_zoom, Some(0.125));
	}

	#[test]
	fn inverted_zoom_bounds_are_swapped() {
		let config = GraphConfig {
			min_zoom: 4.0,
			max_zoom: 0.5,
			..Default::default()
		}
		.resolved();
		assert_eq!((config.min_zoom, config.max_zoom), (0.5, 4.0));
		assert_eq!(config.clamp_zoom(100.0), 4.0);
	}

	#[test]
	fn zero_max_zoom_resolves_to_a_stable_range() {
		let config = GraphConfig::from_json(r#"{ "maxZoom": 0 }"#).unwrap();
		assert_eq!((config.min_zoom, config.max_zoom), (0.125, 0.125));
		assert_eq!(config.focus_zoom, 0.125);
		assert_eq!(config.clone().resolved(), config);
	}

	#[test]
	fn negative_zoom_bounds_fall_back_to_the_default_minimum() {
		let config = GraphConfig {
			min_zoom: -1.0,
			max_zoom: -2.0,
			..Default::default()
		}
		.resolved();
		assert_eq!((config.min_zoom, config.max_zoom), (0.125, 0.125));
		assert_eq!(config.clone().resolved(), config);
	}

	#[test]
	fn node_overrides_win_field_by_field() {
		let common = NodeConfig::default();
		let overrides = NodeOverrides {
			color: Some("red".into()),
			size: Some(300.0),
			symbol_type: Some(SymbolType::Diamond),
			..Default::default()
		};
		let merged = common.merged(&overrides);
		assert_eq!(merged.color, "red");
		assert_eq!(merged.size, 300.0);
		assert_eq!(merged.symbol_type, SymbolType::Diamond);
		assert_eq!(merged.font_size, common.font_size);
	}

	#[test]
	fn group_palette_applies_without_explicit_color() {
		let common = NodeConfig::default();
		let mut node = GraphNode::new("a");
		node.group = Some(12);
		assert_eq!(common.for_node(&node).color, GROUP_COLORS[2]);

		node.overrides.color = Some("black".into());
		assert_eq!(common.for_node(&node).color, "black");
	}

	#[test]
	fn link_overrides_merge() {
		let merged = LinkConfig::default().merged(&LinkOverrides {
			line_type: Some(LineType::Dashed),
			..Default::default()
		});
		assert_eq!(merged.line_type, LineType::Dashed);
		assert_eq!(merged.stroke_width, 1.5);
	}
}
