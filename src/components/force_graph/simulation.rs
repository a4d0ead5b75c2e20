//! Coupling between the registries and the physics engine.
//!
//! The engine owns its own copy of node state (velocities included). The
//! bridge pushes registry changes into it and copies the resulting positions
//! back into the node records after every step. Positions are the only record
//! field written from here.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{debug, info};

use super::config::GraphConfig;
use super::error::{GraphError, Result};
use super::registry::{LinkRegistry, NodeKey, NodeRegistry, Position};
use super::scheduler::RefreshScheduler;
use super::viewport::{ViewTransform, ViewportState};

const NODE_MASS: f32 = 10.0;
const SEED_RADIUS: f64 = 100.0;
/// `force_charge` produced by the default gravity of -100.
const CHARGE_PER_GRAVITY: f64 = 1.5;
/// `force_spring` produced by the default link length and strength.
const BASE_SPRING: f64 = 0.05;
const BASE_LINK_LENGTH: f64 = 100.0;

/// Physics tuning as configured, before translation to engine parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSettings {
	/// See [`D3Config::gravity`](super::config::D3Config::gravity).
	pub gravity: f64,
	/// Strictly positive.
	pub link_length: f64,
	/// Non-negative.
	pub link_strength: f64,
	/// Kept for callers; the `force_graph` engine has no cooling schedule.
	pub alpha_target: f64,
	/// Links never become engine edges.
	pub disable_link_force: bool,
	/// Centre of the initial layout.
	pub center: Position,
}

impl SimulationSettings {
	/// Settings for `config`, centred on its canvas size.
	pub fn from_config(config: &GraphConfig) -> Self {
		Self {
			gravity: config.d3.gravity,
			link_length: config.d3.link_length,
			link_strength: config.d3.link_strength,
			alpha_target: config.d3.alpha_target,
			disable_link_force: config.d3.disable_link_force,
			center: Position::new(config.width / 2.0, config.height / 2.0),
		}
	}
}

/// A physics engine driven by the bridge.
pub trait SimulationEngine {
	/// Mirror the registries: add unseen nodes, forget removed ones, align links.
	/// Existing nodes keep their engine state.
	///
	/// [`ForceGraphEngine`] cannot remove a single edge, so when a link between
	/// two surviving nodes disappears it rebuilds its graph. Positions and pins
	/// carry over but every node restarts with zero velocity.
	fn sync(&mut self, nodes: &NodeRegistry, links: &LinkRegistry);

	/// Advance the simulation by `dt` seconds.
	fn step(&mut self, dt: f32);

	/// Copy the current engine positions into the node records.
	fn write_positions(&self, nodes: &mut NodeRegistry);

	/// Hold a node at `position` until released.
	fn pin(&mut self, key: NodeKey, position: Position);

	/// Undo [`pin`](Self::pin); the node moves freely again.
	fn release(&mut self, key: NodeKey);
}

/// [`SimulationEngine`] backed by the `force_graph` crate.
pub struct ForceGraphEngine {
	graph: ForceGraph<NodeKey, ()>,
	settings: SimulationSettings,
	indices: HashMap<NodeKey, DefaultNodeIdx>,
	/// Undirected engine edges as ordered key pairs.
	edges: HashSet<(NodeKey, NodeKey)>,
}

impl ForceGraphEngine {
	/// Validates the physics parameters before building the engine graph.
	pub fn new(settings: SimulationSettings) -> Result<Self> {
		let checks = [
			("gravity", settings.gravity, settings.gravity.is_finite()),
			(
				"linkLength",
				settings.link_length,
				settings.link_length.is_finite() && settings.link_length > 0.0,
			),
			(
				"linkStrength",
				settings.link_strength,
				settings.link_strength.is_finite() && settings.link_strength >= 0.0,
			),
		];
		if let Some(&(parameter, value, _)) = checks.iter().find(|(_, _, ok)| !ok) {
			return Err(GraphError::SimulationMisconfigured { parameter, value });
		}
		Ok(Self {
			graph: ForceGraph::new(Self::parameters(&settings)),
			settings,
			indices: HashMap::new(),
			edges: HashSet::new(),
		})
	}

	fn parameters(settings: &SimulationSettings) -> SimulationParameters {
		// The engine's springs have no rest length; weaker springs settle
		// further apart, so the spring constant scales inversely with it.
		let spring =
			BASE_SPRING * settings.link_strength * BASE_LINK_LENGTH / settings.link_length;
		SimulationParameters {
			force_charge: (-settings.gravity * CHARGE_PER_GRAVITY) as f32,
			force_spring: spring as f32,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		}
	}

	fn seed_position(&self, i: usize, count: usize) -> Position {
		let angle = (i as f64) * 2.0 * PI / count.max(1) as f64;
		Position::new(
			self.settings.center.x + SEED_RADIUS * angle.cos(),
			self.settings.center.y + SEED_RADIUS * angle.sin(),
		)
	}

	fn add_node(&mut self, key: NodeKey, x: f32, y: f32, is_anchor: bool) {
		let idx = self.graph.add_node(NodeData {
			x,
			y,
			mass: NODE_MASS,
			is_anchor,
			user_data: key,
		});
		self.indices.insert(key, idx);
	}

	/// Recreate the engine graph without edges, carrying over node positions
	/// and pins. Used when links disappear.
	fn rebuild(&mut self) {
		let mut carried = Vec::with_capacity(self.indices.len());
		self.graph.visit_nodes(|node| {
			carried.push((node.data.user_data, node.data.x, node.data.y, node.data.is_anchor));
		});
		debug!("rebuilding engine graph with {} node(s)", carried.len());
		self.graph = ForceGraph::new(Self::parameters(&self.settings));
		self.indices.clear();
		self.edges.clear();
		for (key, x, y, is_anchor) in carried {
			self.add_node(key, x, y, is_anchor);
		}
	}

	/// Nodes known to the engine.
	pub fn node_count(&self) -> usize {
		self.indices.len()
	}

	/// Undirected engine edges.
	pub fn edge_count(&self) -> usize {
		self.edges.len()
	}
}

impl SimulationEngine for ForceGraphEngine {
	fn sync(&mut self, nodes: &NodeRegistry, links: &LinkRegistry) {
		let stale: Vec<NodeKey> = self
			.indices
			.keys()
			.filter(|key| nodes.get_by_key(**key).is_none())
			.copied()
			.collect();
		for key in stale {
			if let Some(idx) = self.indices.remove(&key) {
				self.graph.remove_node(idx);
			}
		}
		let indices = &self.indices;
		self.edges
			.retain(|(a, b)| indices.contains_key(a) && indices.contains_key(b));

		let count = nodes.len();
		for (i, record) in nodes.iter().enumerate() {
			if self.indices.contains_key(&record.key()) {
				continue;
			}
			let seed = record
				.position
				.or(record.fixed)
				.unwrap_or_else(|| self.seed_position(i, count));
			self.add_node(record.key(), seed.x as f32, seed.y as f32, false);
		}

		let wanted: HashSet<(NodeKey, NodeKey)> = if self.settings.disable_link_force {
			HashSet::new()
		} else {
			links
				.iter()
				.filter(|link| !link.is_self_loop())
				.map(|link| {
					let (a, b) = (link.source_key(), link.target_key());
					(a.min(b), a.max(b))
				})
				.collect()
		};
		if self.edges.iter().any(|edge| !wanted.contains(edge)) {
			self.rebuild();
		}
		for &(a, b) in &wanted {
			if self.edges.contains(&(a, b)) {
				continue;
			}
			if let (Some(&ia), Some(&ib)) = (self.indices.get(&a), self.indices.get(&b)) {
				self.graph.add_edge(ia, ib, EdgeData::default());
				self.edges.insert((a, b));
			}
		}
	}

	fn step(&mut self, dt: f32) {
		self.graph.update(dt);
	}

	fn write_positions(&self, nodes: &mut NodeRegistry) {
		self.graph.visit_nodes(|node| {
			nodes.set_position(
				node.data.user_data,
				Position::new(node.x() as f64, node.y() as f64),
			);
		});
	}

	fn pin(&mut self, key: NodeKey, position: Position) {
		let Some(&idx) = self.indices.get(&key) else {
			return;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = position.x as f32;
				node.data.y = position.y as f32;
				node.data.is_anchor = true;
			}
		});
	}

	fn release(&mut self, key: NodeKey) {
		let Some(&idx) = self.indices.get(&key) else {
			return;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.is_anchor = false;
			}
		});
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StaticMode {
	/// Positions always come from the payload.
	Frozen,
	/// Payload positions seed new nodes; drags move them afterwards.
	DragAndDrop,
}

/// Owns the engine and the view transform of one graph instance.
pub struct SimulationBridge<E = ForceGraphEngine> {
	engine: Option<E>,
	static_mode: Option<StaticMode>,
	viewport: ViewportState,
	steps: u64,
	disposed: bool,
}

impl SimulationBridge<ForceGraphEngine> {
	/// Bridge over a [`ForceGraphEngine`], or no engine at all for static graphs.
	pub fn from_config(config: &GraphConfig) -> Result<Self> {
		let engine = if config.is_static() {
			None
		} else {
			Some(ForceGraphEngine::new(SimulationSettings::from_config(config))?)
		};
		Self::new(config, engine)
	}
}

impl<E: SimulationEngine> SimulationBridge<E> {
	/// Static configurations drop `engine`; dynamic ones require it.
	pub fn new(config: &GraphConfig, engine: Option<E>) -> Result<Self> {
		let static_mode = if config.static_graph {
			Some(StaticMode::Frozen)
		} else if config.static_graph_with_drag_and_drop {
			Some(StaticMode::DragAndDrop)
		} else {
			None
		};
		let engine = match (static_mode, engine) {
			(Some(mode), _) => {
				info!("static graph ({:?}), simulation disabled", mode);
				None
			}
			(None, Some(engine)) => Some(engine),
			(None, None) => {
				return Err(GraphError::SimulationUnavailable(
					"no engine supplied for a dynamic graph".into(),
				));
			}
		};
		let viewport = ViewportState::new(
			config.width,
			config.height,
			config.min_zoom,
			config.max_zoom,
			config.initial_zoom.unwrap_or(1.0),
		);
		Ok(Self {
			engine,
			static_mode,
			viewport,
			steps: 0,
			disposed: false,
		})
	}

	/// Push the current records into the engine, or apply payload
	/// coordinates when static.
	pub fn sync(&mut self, nodes: &mut NodeRegistry, links: &LinkRegistry) {
		match self.static_mode {
			Some(StaticMode::Frozen) => {
				for record in nodes.iter_mut() {
					record.position = record.fixed;
				}
			}
			Some(StaticMode::DragAndDrop) => {
				for record in nodes.iter_mut() {
					if record.position.is_none() {
						record.position = record.fixed;
					}
				}
			}
			None => {
				if let Some(engine) = self.engine.as_mut() {
					engine.sync(nodes, links);
					engine.write_positions(nodes);
				}
			}
		}
	}

	/// Run one engine step, write positions back and notify the scheduler.
	/// Returns false when there is no engine to step.
	pub fn step(
		&mut self,
		dt: f32,
		nodes: &mut NodeRegistry,
		scheduler: &mut RefreshScheduler,
	) -> bool {
		let Some(engine) = self.engine.as_mut() else {
			return false;
		};
		engine.step(dt);
		engine.write_positions(nodes);
		self.steps += 1;
		scheduler.notify();
		true
	}

	/// Move a dragged node. Live graphs pin it inside the engine.
	pub fn move_node(&mut self, key: NodeKey, position: Position, nodes: &mut NodeRegistry) {
		nodes.set_position(key, position);
		if let Some(engine) = self.engine.as_mut() {
			engine.pin(key, position);
		}
	}

	/// Let the engine move a previously dragged node again.
	pub fn release_node(&mut self, key: NodeKey) {
		if let Some(engine) = self.engine.as_mut() {
			engine.release(key);
		}
	}

	/// See [`ViewportState::apply`].
	pub fn apply_transform(&mut self, transform: ViewTransform) -> ViewTransform {
		self.viewport.apply(transform)
	}

	/// View transform and canvas size.
	pub fn viewport(&self) -> &ViewportState {
		&self.viewport
	}

	/// Mutable view state for gestures and focus.
	pub fn viewport_mut(&mut self) -> &mut ViewportState {
		&mut self.viewport
	}

	/// `None` for static graphs and after disposal.
	pub fn engine(&self) -> Option<&E> {
		self.engine.as_ref()
	}

	/// An engine is attached.
	pub fn is_running(&self) -> bool {
		self.engine.is_some()
	}

	/// Either static mode is active.
	pub fn is_static(&self) -> bool {
		self.static_mode.is_some()
	}

	/// Engine steps taken so far.
	pub fn steps(&self) -> u64 {
		self.steps
	}

	/// Release the engine. Later steps are no-ops.
	pub fn dispose(&mut self) {
		if !self.disposed {
			info!("simulation stopped after {} step(s)", self.steps);
		}
		self.engine = None;
		self.disposed = true;
	}

	/// [`dispose`](Self::dispose) has run.
	pub fn is_disposed(&self) -> bool {
		self.disposed
	}
}

#[cfg(test)]
pub(crate) mod test_engine {
	use super::*;

	/// Deterministic engine: places new nodes on a line and shifts every
	/// unpinned node one unit right per step.
	#[derive(Debug, Default)]
	pub(crate) struct ScriptedEngine {
		pub positions: HashMap<NodeKey, Position>,
		pub pinned: HashSet<NodeKey>,
		pub syncs: usize,
		pub edges: usize,
	}

	impl SimulationEngine for ScriptedEngine {
		fn sync(&mut self, nodes: &NodeRegistry, links: &LinkRegistry) {
			self.syncs += 1;
			self.positions.retain(|key, _| nodes.get_by_key(*key).is_some());
			for (i, record) in nodes.iter().enumerate() {
				self.positions
					.entry(record.key())
					.or_insert_with(|| Position::new(i as f64 * 10.0, 0.0));
			}
			self.edges = links.len();
		}

		fn step(&mut self, _dt: f32) {
			for (key, position) in self.positions.iter_mut() {
				if !self.pinned.contains(key) {
					position.x += 1.0;
				}
			}
		}

		fn write_positions(&self, nodes: &mut NodeRegistry) {
			for (key, position) in &self.positions {
				nodes.set_position(*key, *position);
			}
		}

		fn pin(&mut self, key: NodeKey, position: Position) {
			self.positions.insert(key, position);
			self.pinned.insert(key);
		}

		fn release(&mut self, key: NodeKey) {
			self.pinned.remove(&key);
		}
	}
}
