//! Authoritative node and link records.
//!
//! Records live in payload order inside each registry and are addressed by id.
//! Links refer to their endpoints through [`NodeKey`] handles resolved against
//! the [`NodeRegistry`], never through copies of the node.

use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};

use super::config::{LinkConfig, NodeConfig};
use super::error::{GraphError, Result};
use super::types::{GraphLink, GraphNode};

/// Stable handle of a node record. Allocated once when an id is first seen and
/// kept for as long as the id survives reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(u64);

/// World-space coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
	/// Grows rightwards.
	pub x: f64,
	/// Grows downwards.
	pub y: f64,
}

impl Position {
	/// Point at `(x, y)`.
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

/// Registry entry for one live node.
#[derive(Clone, Debug)]
pub struct NodeRecord {
	/// Payload id.
	pub id: String,
	key: NodeKey,
	/// Display label, the id unless overridden.
	pub label: String,
	/// Common node settings merged with this node's overrides.
	pub config: NodeConfig,
	/// Simulation position. `None` until the engine, a static payload or a drag
	/// assigns one. The simulation bridge is the only writer besides dragging.
	pub position: Option<Position>,
	/// Coordinates supplied by the payload.
	pub fixed: Option<Position>,
}

impl NodeRecord {
	fn new(key: NodeKey, node: &GraphNode, defaults: &NodeConfig) -> Self {
		let mut record = Self {
			id: node.id.clone(),
			key,
			label: String::new(),
			config: NodeConfig::default(),
			position: None,
			fixed: None,
		};
		record.apply(node, defaults);
		record
	}

	/// Refresh everything except the position.
	fn apply(&mut self, node: &GraphNode, defaults: &NodeConfig) {
		self.config = defaults.for_node(node);
		self.label = node
			.overrides
			.label
			.clone()
			.unwrap_or_else(|| node.id.clone());
		self.fixed = match (node.x, node.y) {
			(Some(x), Some(y)) => Some(Position::new(x, y)),
			_ => None,
		};
	}

	/// Stable handle of this record.
	pub fn key(&self) -> NodeKey {
		self.key
	}
}

/// Outcome of one node reconciliation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeReconcileStats {
	/// Ids present before and after.
	pub kept: usize,
	/// Ids new in this payload.
	pub added: usize,
	/// Ids dropped by this payload.
	pub removed: usize,
}

/// Live node records in payload order, indexed by id and key.
#[derive(Debug, Default)]
pub struct NodeRegistry {
	records: Vec<NodeRecord>,
	by_id: HashMap<String, usize>,
	by_key: HashMap<NodeKey, usize>,
	next_key: u64,
}

impl NodeRegistry {
	/// Empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Make the registry hold exactly the ids of `payload`, in payload order.
	///
	/// Surviving records keep their key and position; only their display
	/// configuration and payload coordinates are refreshed. The payload is
	/// validated up front so a rejected update changes nothing.
	pub fn reconcile(
		&mut self,
		payload: &[GraphNode],
		defaults: &NodeConfig,
	) -> Result<NodeReconcileStats> {
		if let Some(index) = payload.iter().position(|node| node.id.is_empty()) {
			return Err(GraphError::InvalidNode { index });
		}

		let mut previous: Vec<Option<NodeRecord>> = std::mem::take(&mut self.records)
			.into_iter()
			.map(Some)
			.collect();
		let previous_index = std::mem::take(&mut self.by_id);
		self.records.reserve(payload.len());
		let mut stats = NodeReconcileStats::default();

		for node in payload {
			if let Some(&slot) = self.by_id.get(&node.id) {
				debug!("duplicate node id {:?} in payload, merging", node.id);
				self.records[slot].apply(node, defaults);
				continue;
			}
			let survivor = previous_index
				.get(&node.id)
				.and_then(|&slot| previous[slot].take());
			let record = match survivor {
				Some(mut record) => {
					record.apply(node, defaults);
					stats.kept += 1;
					record
				}
				None => {
					let key = NodeKey(self.next_key);
					self.next_key += 1;
					stats.added += 1;
					NodeRecord::new(key, node, defaults)
				}
			};
			self.by_id.insert(node.id.clone(), self.records.len());
			self.records.push(record);
		}
		stats.removed = previous.iter().flatten().count();

		self.by_key = self
			.records
			.iter()
			.enumerate()
			.map(|(slot, record)| (record.key, slot))
			.collect();
		debug!("nodes reconciled: {:?}", stats);
		Ok(stats)
	}

	/// Record by payload id.
	pub fn get(&self, id: &str) -> Option<&NodeRecord> {
		self.by_id.get(id).map(|&slot| &self.records[slot])
	}

	/// Record by handle; `None` once the node has been removed.
	pub fn get_by_key(&self, key: NodeKey) -> Option<&NodeRecord> {
		self.by_key.get(&key).map(|&slot| &self.records[slot])
	}

	/// Mutable record by handle.
	pub fn get_by_key_mut(&mut self, key: NodeKey) -> Option<&mut NodeRecord> {
		self.by_key.get(&key).map(|&slot| &mut self.records[slot])
	}

	/// Whether `id` is live.
	pub fn contains(&self, id: &str) -> bool {
		self.by_id.contains_key(id)
	}

	/// Key of a live id.
	pub fn key_of(&self, id: &str) -> Option<NodeKey> {
		self.get(id).map(NodeRecord::key)
	}

	/// Move a record. Unknown keys are ignored.
	pub fn set_position(&mut self, key: NodeKey, position: Position) {
		if let Some(record) = self.get_by_key_mut(key) {
			record.position = Some(position);
		}
	}

	/// Records in payload order. The first one is the render root.
	pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
		self.records.iter()
	}

	/// Mutable records in payload order.
	pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NodeRecord> {
		self.records.iter_mut()
	}

	/// Render root.
	pub fn first(&self) -> Option<&NodeRecord> {
		self.records.first()
	}

	/// Number of live nodes.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// True before the first accepted payload or after an empty one.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}

/// Identity of a link record: the explicit payload id, or else the ordered
/// `(source, target)` pair. Equal identities collapse into one record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LinkId {
	/// Id given in the payload.
	Explicit(String),
	/// Derived from the endpoints.
	Pair {
		/// Source node id.
		source: String,
		/// Target node id.
		target: String,
	},
}

impl LinkId {
	/// Identity of a payload link.
	pub fn for_link(link: &GraphLink) -> Self {
		match &link.id {
			Some(id) => LinkId::Explicit(id.clone()),
			None => LinkId::Pair {
				source: link.source.clone(),
				target: link.target.clone(),
			},
		}
	}
}

impl fmt::Display for LinkId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LinkId::Explicit(id) => f.write_str(id),
			LinkId::Pair { source, target } => write!(f, "{source}->{target}"),
		}
	}
}

/// Registry entry for one resolvable link.
#[derive(Clone, Debug)]
pub struct LinkRecord {
	id: LinkId,
	/// Source node id.
	pub source: String,
	/// Target node id.
	pub target: String,
	source_key: NodeKey,
	target_key: NodeKey,
	/// Optional midpoint label.
	pub label: Option<String>,
	/// Common link settings merged with this link's overrides.
	pub config: LinkConfig,
}

impl LinkRecord {
	/// Identity of this record.
	pub fn id(&self) -> &LinkId {
		&self.id
	}

	/// Handle of the source node.
	pub fn source_key(&self) -> NodeKey {
		self.source_key
	}

	/// Handle of the target node.
	pub fn target_key(&self) -> NodeKey {
		self.target_key
	}

	/// Source and target are the same node.
	pub fn is_self_loop(&self) -> bool {
		self.source_key == self.target_key
	}
}

/// Outcome of one link reconciliation. `dangling` counts payload entries that
/// were excluded because an endpoint is unknown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkReconcileStats {
	/// Identities present before and after.
	pub kept: usize,
	/// Identities new in this payload.
	pub added: usize,
	/// Identities dropped by this payload.
	pub removed: usize,
	/// Payload entries with a missing or unknown endpoint.
	pub dangling: usize,
}

/// Live link records in payload order, indexed by [`LinkId`].
#[derive(Debug, Default)]
pub struct LinkRegistry {
	records: Vec<LinkRecord>,
	by_id: HashMap<LinkId, usize>,
	revision: u64,
}

impl LinkRegistry {
	/// Empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Make the registry hold exactly the resolvable links of `payload`.
	/// Links whose endpoints are missing from `nodes` are skipped and counted.
	pub fn reconcile(
		&mut self,
		payload: &[GraphLink],
		defaults: &LinkConfig,
		nodes: &NodeRegistry,
	) -> LinkReconcileStats {
		let mut previous: Vec<Option<LinkRecord>> = std::mem::take(&mut self.records)
			.into_iter()
			.map(Some)
			.collect();
		let previous_index = std::mem::take(&mut self.by_id);
		let mut stats = LinkReconcileStats::default();

		for link in payload {
			let (Some(source_key), Some(target_key)) =
				(nodes.key_of(&link.source), nodes.key_of(&link.target))
			else {
				debug!("skipping link {} -> {}", link.source, link.target);
				stats.dangling += 1;
				continue;
			};
			let id = LinkId::for_link(link);
			let config = defaults.merged(&link.overrides);
			let label = link.overrides.label.clone();

			if let Some(&slot) = self.by_id.get(&id) {
				let record = &mut self.records[slot];
				record.config = config;
				record.label = label;
				continue;
			}
			let record = match previous_index
				.get(&id)
				.and_then(|&slot| previous[slot].take())
			{
				Some(mut record) => {
					record.source.clone_from(&link.source);
					record.target.clone_from(&link.target);
					record.source_key = source_key;
					record.target_key = target_key;
					record.config = config;
					record.label = label;
					stats.kept += 1;
					record
				}
				None => {
					stats.added += 1;
					LinkRecord {
						id: id.clone(),
						source: link.source.clone(),
						target: link.target.clone(),
						source_key,
						target_key,
						label,
						config,
					}
				}
			};
			self.by_id.insert(id, self.records.len());
			self.records.push(record);
		}
		stats.removed = previous.iter().flatten().count();
		self.revision += 1;

		if stats.dangling > 0 {
			warn!(
				"excluded {} link(s) referencing unknown nodes",
				stats.dangling
			);
		}
		debug!("links reconciled: {:?}", stats);
		stats
	}

	/// Record by identity.
	pub fn get(&self, id: &LinkId) -> Option<&LinkRecord> {
		self.by_id.get(id).map(|&slot| &self.records[slot])
	}

	/// Record at a registry slot, as stored by the adjacency index.
	pub fn at(&self, slot: usize) -> Option<&LinkRecord> {
		self.records.get(slot)
	}

	/// Records in payload order.
	pub fn iter(&self) -> impl Iterator<Item = &LinkRecord> {
		self.records.iter()
	}

	/// Bumped on every reconciliation; derived indexes compare against it.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// Number of live links.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// No resolvable links.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}
