use std::time::Duration;

use log::{debug, info};
use web_time::Instant;

use super::adjacency::AdjacencyIndex;
use super::config::{GraphConfig, LinkConfig, NodeConfig};
use super::error::Result;
use super::registry::{LinkRegistry, NodeKey, NodeRegistry, Position};
use super::scheduler::{RefreshScheduler, RefreshTicket};
use super::simulation::{ForceGraphEngine, SimulationBridge, SimulationEngine};
use super::traversal::{Drawable, traverse};
use super::types::{GraphData, GraphLink, GraphNode};
use super::viewport::{ViewTransform, Viewport};

/// Extra world-space reach around a node symbol for hit testing.
pub const HIT_SLOP: f64 = 2.0;
/// Pointer travel (px) after which a background press counts as a pan, not a click.
const CLICK_SLOP: f64 = 3.0;

/// Node drag in progress.
#[derive(Clone, Debug, Default)]
pub struct DragState {
	/// Dragged node, `None` when idle.
	pub node: Option<NodeKey>,
	/// Pointer x at press, screen space.
	pub start_x: f64,
	/// Pointer y at press, screen space.
	pub start_y: f64,
	/// Node position at press, world space.
	pub node_start: Position,
}

/// Background pan in progress.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	/// Pointer is held down on the background.
	pub active: bool,
	/// Set once the pointer travelled past the click slop.
	pub moved: bool,
	/// Pointer x at press.
	pub start_x: f64,
	/// Pointer y at press.
	pub start_y: f64,
	/// Transform at press.
	pub transform_start: ViewTransform,
}

/// Counters over the lifetime of one graph instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphStats {
	/// Simulation steps that requested a redraw.
	pub step_notifications: u64,
	/// Redraws granted by the scheduler.
	pub refreshes: u64,
	/// Payload links excluded for referencing unknown nodes, over all updates.
	pub dangling_links: u64,
}

/// One graph instance: registries, derived index, simulation, refresh
/// scheduling and pointer interaction.
///
/// Everything runs on the caller's thread. An update fully completes, index
/// rebuild included, before the next traversal can observe it.
pub struct ForceGraphState<E = ForceGraphEngine> {
	config: GraphConfig,
	nodes: NodeRegistry,
	links: LinkRegistry,
	adjacency: AdjacencyIndex,
	bridge: SimulationBridge<E>,
	scheduler: RefreshScheduler,
	/// Current node drag.
	pub drag: DragState,
	/// Current background pan.
	pub pan: PanState,
	stats: GraphStats,
}

impl ForceGraphState<ForceGraphEngine> {
	/// Graph instance over the `force_graph` engine, or none when static.
	pub fn new(config: GraphConfig) -> Result<Self> {
		let config = config.resolved();
		let bridge = SimulationBridge::from_config(&config)?;
		Ok(Self::with_bridge(config, bridge))
	}
}

impl<E: SimulationEngine> ForceGraphState<E> {
	/// Graph instance over a caller supplied engine.
	pub fn with_engine(config: GraphConfig, engine: Option<E>) -> Result<Self> {
		let config = config.resolved();
		let bridge = SimulationBridge::new(&config, engine)?;
		Ok(Self::with_bridge(config, bridge))
	}

	fn with_bridge(config: GraphConfig, bridge: SimulationBridge<E>) -> Self {
		let scheduler = RefreshScheduler::new(Duration::from_millis(config.refresh_interval_ms));
		Self {
			config,
			nodes: NodeRegistry::new(),
			links: LinkRegistry::new(),
			adjacency: AdjacencyIndex::new(),
			bridge,
			scheduler,
			drag: DragState::default(),
			pan: PanState::default(),
			stats: GraphStats::default(),
		}
	}

	/// Push a new payload. Rejected payloads leave the instance untouched.
	pub fn update_graph(
		&mut self,
		nodes: &[GraphNode],
		links: &[GraphLink],
		node_config: &NodeConfig,
		link_config: &LinkConfig,
	) -> Result<()> {
		let node_stats = self.nodes.reconcile(nodes, node_config)?;
		let link_stats = self.links.reconcile(links, link_config, &self.nodes);
		self.stats.dangling_links += link_stats.dangling as u64;
		self.adjacency.rebuild(&self.links);
		self.bridge.sync(&mut self.nodes, &self.links);

		if let Some(key) = self.drag.node {
			if self.nodes.get_by_key(key).is_none() {
				self.drag = DragState::default();
			}
		}
		self.scheduler.notify();
		debug!(
			"graph updated: {} node(s), {} link(s), nodes {:?}, links {:?}",
			self.nodes.len(),
			self.links.len(),
			node_stats,
			link_stats
		);
		Ok(())
	}

	/// [`update_graph`](Self::update_graph) with the configured common entity settings.
	pub fn update_data(&mut self, data: &GraphData) -> Result<()> {
		let node_config = self.config.node.clone();
		let link_config = self.config.link.clone();
		self.update_graph(&data.nodes, &data.links, &node_config, &link_config)
	}

	/// First node of the latest accepted payload.
	pub fn root_id(&self) -> Option<&str> {
		self.nodes.first().map(|node| node.id.as_str())
	}

	/// What to draw this frame, in drawing order.
	pub fn drawables(&self) -> Vec<Drawable<'_>> {
		traverse(self.root_id(), &self.nodes, &self.links, &self.adjacency)
	}

	/// Advance one frame: a simulation step, any focus animation, then the
	/// refresh throttle. Returns a ticket when a redraw is due.
	pub fn tick(&mut self, dt: f32, now: Instant) -> Option<RefreshTicket> {
		if self.bridge.step(dt, &mut self.nodes, &mut self.scheduler) {
			self.stats.step_notifications += 1;
		}
		if self.bridge.viewport_mut().advance(dt as f64) {
			self.scheduler.notify();
		}
		let ticket = self.scheduler.poll(now);
		if ticket.is_some() {
			self.stats.refreshes += 1;
		}
		ticket
	}

	/// Screen point to world coordinates.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Position {
		self.transform().screen_to_world(sx, sy)
	}

	/// Top-most drawn node under a screen point.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<NodeKey> {
		let world = self.screen_to_graph(sx, sy);
		self.drawables()
			.into_iter()
			.rev()
			.find_map(|drawable| match drawable {
				Drawable::Node(node) => {
					let at = node.position.unwrap_or_default();
					let (dx, dy) = (at.x - world.x, at.y - world.y);
					let reach = node.config.size / 20.0 + HIT_SLOP;
					((dx * dx + dy * dy).sqrt() < reach).then(|| node.key())
				}
				Drawable::Link(_) => None,
			})
	}

	fn drag_enabled(&self) -> bool {
		!self.config.static_graph && !self.config.freeze_all_drag_events && !self.is_disposed()
	}

	/// Start dragging the node under the pointer, or panning if there is none
	/// or dragging is disabled.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		self.pan = PanState::default();
		let hit = self
			.node_at_position(sx, sy)
			.filter(|_| self.drag_enabled());
		if let Some(key) = hit {
			let node_start = self
				.nodes
				.get_by_key(key)
				.and_then(|node| node.position)
				.unwrap_or_default();
			self.drag = DragState {
				node: Some(key),
				start_x: sx,
				start_y: sy,
				node_start,
			};
		} else {
			self.pan = PanState {
				active: true,
				moved: false,
				start_x: sx,
				start_y: sy,
				transform_start: self.transform(),
			};
		}
	}

	/// Continue the current drag or pan.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if let Some(key) = self.drag.node {
			let k = self.transform().k;
			let position = Position::new(
				self.drag.node_start.x + (sx - self.drag.start_x) / k,
				self.drag.node_start.y + (sy - self.drag.start_y) / k,
			);
			self.bridge.move_node(key, position, &mut self.nodes);
			self.scheduler.notify();
		} else if self.pan.active {
			let (dx, dy) = (sx - self.pan.start_x, sy - self.pan.start_y);
			if (dx * dx + dy * dy).sqrt() > CLICK_SLOP {
				self.pan.moved = true;
			}
			let start = self.pan.transform_start;
			self.apply_transform(ViewTransform {
				x: start.x + dx,
				y: start.y + dy,
				k: start.k,
			});
		}
	}

	/// End a drag or pan. Returns the dropped node, if any.
	pub fn pointer_up(&mut self) -> Option<NodeKey> {
		self.pan.active = false;
		let dropped = self.drag.node.take();
		if let Some(key) = dropped {
			if self.config.automatic_rearrange_after_drop_node {
				self.bridge.release_node(key);
			}
		}
		dropped
	}

	/// Whether a click at the screen point hit the background, i.e. no drawn
	/// node and not the tail of a pan gesture.
	pub fn is_background_click(&mut self, sx: f64, sy: f64) -> bool {
		let panned = std::mem::take(&mut self.pan.moved);
		!panned && self.node_at_position(sx, sy).is_none()
	}

	/// Apply a pan/zoom transform from a gesture, zoom clamped.
	pub fn apply_transform(&mut self, transform: ViewTransform) -> ViewTransform {
		let applied = self.bridge.apply_transform(transform);
		self.scheduler.notify();
		applied
	}

	/// Wheel zoom around the pointer.
	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.bridge.viewport_mut().zoom_at(sx, sy, factor);
		self.scheduler.notify();
	}

	/// Animate the view onto a node at the configured focus zoom. Returns
	/// false for unknown or not yet positioned nodes.
	pub fn focus_on(&mut self, id: &str) -> bool {
		let Some(position) = self.nodes.get(id).and_then(|node| node.position) else {
			return false;
		};
		self.bridge.viewport_mut().focus_on(
			position,
			self.config.focus_zoom,
			self.config.focus_animation_duration,
		);
		self.scheduler.notify();
		true
	}

	/// Canvas size changed.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.bridge.viewport_mut().resize(width, height);
		self.scheduler.notify();
	}

	/// Stop the simulation and drop any gesture in progress.
	pub fn dispose(&mut self) {
		self.bridge.dispose();
		self.drag = DragState::default();
		self.pan = PanState::default();
		info!(
			"graph disposed: {} step(s), {} refresh(es)",
			self.stats.step_notifications, self.stats.refreshes
		);
	}

	/// [`dispose`](Self::dispose) has run.
	pub fn is_disposed(&self) -> bool {
		self.bridge.is_disposed()
	}

	/// Current pan/zoom transform.
	pub fn transform(&self) -> ViewTransform {
		self.bridge.viewport().transform()
	}

	/// Visible world rectangle.
	pub fn viewport(&self) -> Viewport {
		self.bridge.viewport().viewport()
	}

	/// Canvas size in pixels.
	pub fn size(&self) -> (f64, f64) {
		self.bridge.viewport().size()
	}

	/// Resolved configuration.
	pub fn config(&self) -> &GraphConfig {
		&self.config
	}

	/// Live node records.
	pub fn nodes(&self) -> &NodeRegistry {
		&self.nodes
	}

	/// Live link records.
	pub fn links(&self) -> &LinkRegistry {
		&self.links
	}

	/// Index over the live links.
	pub fn adjacency(&self) -> &AdjacencyIndex {
		&self.adjacency
	}

	/// Counters so far.
	pub fn stats(&self) -> GraphStats {
		self.stats
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::simulation::test_engine::ScriptedEngine;
	use pretty_assertions::assert_eq;

	fn nodes(ids: &[&str]) -> Vec<GraphNode> {
		ids.iter().map(|id| GraphNode::new(*id)).collect()
	}

	fn links(edges: &[(&str, &str)]) -> Vec<GraphLink> {
		edges.iter().map(|(s, t)| GraphLink::new(*s, *t)).collect()
	}

	fn data(ids: &[&str], edges: &[(&str, &str)]) -> GraphData {
		GraphData {
			nodes: nodes(ids),
			links: links(edges),
		}
	}

	fn scripted() -> ForceGraphState<ScriptedEngine> {
		ForceGraphState::with_engine(GraphConfig::default(), Some(ScriptedEngine::default()))
			.unwrap()
	}

	fn drawn(state: &ForceGraphState<impl SimulationEngine>) -> Vec<String> {
		state
			.drawables()
			.into_iter()
			.map(|drawable| match drawable {
				Drawable::Node(node) => node.id.clone(),
				Drawable::Link(link) => link.id().to_string(),
			})
			.collect()
	}

	#[test]
	fn triangle_payload_renders_each_entity_once() {
		let mut state = ForceGraphState::new(GraphConfig::default()).unwrap();
		state
			.update_data(&data(&["1", "2", "3"], &[("1", "2"), ("2", "3"), ("1", "3")]))
			.unwrap();
		let order = drawn(&state);
		let node_order: Vec<_> = order.iter().filter(|e| !e.contains("->")).collect();
		assert_eq!(node_order, vec!["1", "2", "3"]);
		assert_eq!(order.len(), 6);
		assert_eq!(state.root_id(), Some("1"));
	}

	#[test]
	fn identical_updates_preserve_record_identity() {
		let mut state = ForceGraphState::new(GraphConfig::default()).unwrap();
		let payload = data(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
		state.update_data(&payload).unwrap();
		for _ in 0..5 {
			state.tick(0.016, Instant::now());
		}
		let before: Vec<_> = state.nodes().iter().map(|n| (n.key(), n.position)).collect();

		state.update_data(&payload).unwrap();
		let after: Vec<_> = state.nodes().iter().map(|n| (n.key(), n.position)).collect();
		assert_eq!(before, after);
		assert!(after.iter().all(|(_, position)| position.is_some()));
	}

	#[test]
	fn dangling_link_is_counted_not_fatal() {
		let mut state = scripted();
		state
			.update_data(&data(&["1", "2", "3"], &[("1", "2"), ("3", "4")]))
			.unwrap();
		assert_eq!(state.links().len(), 1);
		assert_eq!(state.stats().dangling_links, 1);
		let targets: Vec<_> = state
			.adjacency()
			.neighbors_of("1", state.links())
			.map(|link| link.target.clone())
			.collect();
		assert_eq!(targets, vec!["2".to_string()]);
	}

	#[test]
	fn invalid_payload_leaves_previous_graph_in_place() {
		let mut state = scripted();
		state.update_data(&data(&["1", "2"], &[("1", "2")])).unwrap();
		let before = drawn(&state);

		let mut bad = data(&["9", "1"], &[]);
		bad.nodes[1].id.clear();
		assert!(state.update_data(&bad).is_err());
		assert_eq!(drawn(&state), before);
		assert_eq!(state.root_id(), Some("1"));
	}

	#[test]
	fn removing_a_node_removes_its_links_everywhere() {
		let mut state = scripted();
		state
			.update_data(&data(&["1", "2", "3"], &[("1", "2"), ("2", "3")]))
			.unwrap();
		state
			.update_data(&data(&["1", "2"], &[("1", "2"), ("2", "3")]))
			.unwrap();
		assert_eq!(state.links().len(), 1);
		assert_eq!(state.adjacency().out_degree("2"), 0);
		assert_eq!(drawn(&state), vec!["1", "1->2", "2"]);
		assert_eq!(state.bridge.engine().map(|e| e.positions.len()), Some(2));
	}

	#[test]
	fn static_graph_never_notifies_steps() {
		let config = GraphConfig {
			static_graph: true,
			..Default::default()
		};
		let mut state = ForceGraphState::new(config).unwrap();
		let mut payload = data(&["a", "b"], &[("a", "b")]);
		payload.nodes[0] = GraphNode::new("a").at(10.0, 20.0);
		payload.nodes[1] = GraphNode::new("b").at(-5.0, 0.5);
		state.update_data(&payload).unwrap();

		let start = Instant::now();
		for frame in 0..30 {
			state.tick(0.016, start + Duration::from_millis(frame * 16));
		}
		assert_eq!(state.stats().step_notifications, 0);
		assert_eq!(
			state.nodes().get("a").unwrap().position,
			Some(Position::new(10.0, 20.0))
		);
		assert_eq!(
			state.nodes().get("b").unwrap().position,
			Some(Position::new(-5.0, 0.5))
		);
	}

	#[test]
	fn ticks_are_throttled_into_refreshes() {
		let mut state = scripted();
		state.update_data(&data(&["a"], &[])).unwrap();
		let start = Instant::now();
		let mut tickets = Vec::new();
		for frame in 0..10 {
			tickets.extend(state.tick(0.016, start + Duration::from_millis(frame * 10)));
		}
		assert_eq!(state.stats().step_notifications, 10);
		// Frames at 0 and 50ms.
		assert_eq!(tickets.len(), 2);
		assert_eq!(tickets[0].coalesced, 2);
		assert!(tickets[0].seq < tickets[1].seq);
	}

	#[test]
	fn zoom_events_are_clamped() {
		let mut state = scripted();
		let applied = state.apply_transform(ViewTransform {
			x: 0.0,
			y: 0.0,
			k: 100.0,
		});
		assert_eq!(applied.k, 8.0);
		assert_eq!(state.viewport().width, 100.0);
	}

	#[test]
	fn background_clicks_skip_nodes_and_pans() {
		let config = GraphConfig {
			static_graph: true,
			..Default::default()
		};
		let mut state = ForceGraphState::new(config).unwrap();
		let payload = GraphData {
			nodes: vec![GraphNode::new("a").at(100.0, 100.0)],
			links: vec![],
		};
		state.update_data(&payload).unwrap();

		assert!(!state.is_background_click(101.0, 99.0));
		assert!(state.is_background_click(400.0, 400.0));

		state.pointer_down(400.0, 400.0);
		state.pointer_move(450.0, 400.0);
		state.pointer_up();
		assert_eq!(state.transform().x, 50.0);
		assert!(!state.is_background_click(450.0, 400.0));
		assert!(state.is_background_click(450.0, 400.0));
	}

	#[test]
	fn dragging_moves_and_pins_nodes() {
		let config = GraphConfig {
			static_graph_with_drag_and_drop: true,
			..Default::default()
		};
		let mut state = ForceGraphState::new(config).unwrap();
		let payload = GraphData {
			nodes: vec![
				GraphNode::new("a").at(100.0, 100.0),
				GraphNode::new("b").at(300.0, 300.0),
			],
			links: links(&[("a", "b")]),
		};
		state.update_data(&payload).unwrap();

		state.pointer_down(300.0, 300.0);
		state.pointer_move(320.0, 290.0);
		let dropped = state.pointer_up();
		assert_eq!(dropped, state.nodes().key_of("b"));
		assert_eq!(
			state.nodes().get("b").unwrap().position,
			Some(Position::new(320.0, 290.0))
		);

		// A later payload does not undo the drag.
		state.update_data(&payload).unwrap();
		assert_eq!(
			state.nodes().get("b").unwrap().position,
			Some(Position::new(320.0, 290.0))
		);
	}

	#[test]
	fn automatic_rearrange_releases_dropped_nodes() {
		let config = GraphConfig {
			automatic_rearrange_after_drop_node: true,
			..Default::default()
		};
		let mut state =
			ForceGraphState::with_engine(config, Some(ScriptedEngine::default())).unwrap();
		state.update_data(&data(&["a"], &[])).unwrap();

		state.pointer_down(0.0, 0.0);
		state.pointer_move(0.0, 40.0);
		let key = state.nodes().key_of("a").unwrap();
		assert!(state.bridge.engine().unwrap().pinned.contains(&key));

		state.pointer_up();
		assert!(state.bridge.engine().unwrap().pinned.is_empty());
		state.tick(0.016, Instant::now());
		assert_eq!(
			state.nodes().get("a").unwrap().position,
			Some(Position::new(1.0, 40.0))
		);
	}

	#[test]
	fn frozen_drag_events_pan_instead() {
		let config = GraphConfig {
			freeze_all_drag_events: true,
			..Default::default()
		};
		let mut state =
			ForceGraphState::with_engine(config, Some(ScriptedEngine::default())).unwrap();
		state.update_data(&data(&["a"], &[])).unwrap();
		state.pointer_down(0.0, 0.0);
		assert!(state.drag.node.is_none());
		assert!(state.pan.active);
	}

	#[test]
	fn focus_requires_a_positioned_node() {
		let mut state = scripted();
		state.update_data(&data(&["a", "b"], &[])).unwrap();
		assert!(!state.focus_on("missing"));
		assert!(state.focus_on("b"));

		let start = Instant::now();
		for frame in 0..60 {
			state.tick(0.016, start + Duration::from_millis(frame * 16));
		}
		// b was at (10, 0) when focus was requested.
		assert_eq!(
			state.transform(),
			ViewTransform {
				x: 390.0,
				y: 300.0,
				k: 1.0
			}
		);
	}

	#[test]
	fn dispose_stops_the_simulation() {
		let mut state = scripted();
		state.update_data(&data(&["a"], &[])).unwrap();
		state.dispose();
		state.tick(0.016, Instant::now());
		assert!(state.is_disposed());
		assert_eq!(state.stats().step_notifications, 0);
	}

	#[test]
	fn link_missing_an_endpoint_is_skipped_not_fatal() {
		let payload = GraphData::from_json(
			r#"{"nodes":[{"id":"1"},{"id":"2"}],"links":[{"source":"1","target":"2"},{"source":"1"}]}"#,
		)
		.unwrap();
		let mut state = scripted();
		state.update_data(&payload).unwrap();
		assert_eq!(state.links().len(), 1);
		assert_eq!(state.stats().dangling_links, 1);
		assert_eq!(drawn(&state), vec!["1", "1->2", "2"]);
	}
}
