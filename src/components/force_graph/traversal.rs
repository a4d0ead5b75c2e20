//! Breadth-first selection of what gets drawn.
//!
//! Starting at the root, every node and link reachable through outgoing links
//! is emitted exactly once, shallow entities first. Nodes outside the root's
//! component are never emitted.

use std::collections::{HashSet, VecDeque};

use super::adjacency::AdjacencyIndex;
use super::registry::{LinkId, LinkRecord, LinkRegistry, NodeKey, NodeRegistry, NodeRecord};

/// One entity to hand to a renderer.
#[derive(Clone, Copy, Debug)]
pub enum Drawable<'a> {
	/// A node reached from the root.
	Node(&'a NodeRecord),
	/// An outgoing link of a reached node.
	Link(&'a LinkRecord),
}

impl Drawable<'_> {
	/// Whether this is a node.
	pub fn is_node(&self) -> bool {
		matches!(self, Drawable::Node(_))
	}
}

/// Drawables reachable from `root_id`, in breadth-first order. Empty when
/// the root is unknown.
pub fn traverse<'a>(
	root_id: Option<&str>,
	nodes: &'a NodeRegistry,
	links: &'a LinkRegistry,
	adjacency: &'a AdjacencyIndex,
) -> Vec<Drawable<'a>> {
	let Some(root) = root_id.and_then(|id| nodes.get(id)) else {
		return Vec::new();
	};

	let mut drawables = vec![Drawable::Node(root)];
	let mut seen_nodes: HashSet<NodeKey> = HashSet::from([root.key()]);
	let mut seen_links: HashSet<&'a LinkId> = HashSet::new();
	let mut queue: VecDeque<&'a NodeRecord> = VecDeque::from([root]);

	while let Some(current) = queue.pop_front() {
		for link in adjacency.neighbors_of(&current.id, links) {
			if seen_links.insert(link.id()) {
				drawables.push(Drawable::Link(link));
			}
			// Endpoints resolve through the registry; a missing one means the
			// index predates the last node reconciliation.
			let Some(target) = nodes.get_by_key(link.target_key()) else {
				continue;
			};
			if seen_nodes.insert(target.key()) {
				drawables.push(Drawable::Node(target));
				queue.push_back(target);
			}
		}
	}
	drawables
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::config::{LinkConfig, NodeConfig};
	use crate::components::force_graph::types::{GraphLink, GraphNode};
	use pretty_assertions::assert_eq;

	struct Fixture {
		nodes: NodeRegistry,
		links: LinkRegistry,
		adjacency: AdjacencyIndex,
	}

	impl Fixture {
		fn new(ids: &[&str], edges: &[(&str, &str)]) -> Self {
			let mut nodes = NodeRegistry::new();
			let payload: Vec<_> = ids.iter().map(|id| GraphNode::new(*id)).collect();
			nodes.reconcile(&payload, &NodeConfig::default()).unwrap();
			let mut links = LinkRegistry::new();
			let edges: Vec<_> = edges.iter().map(|(s, t)| GraphLink::new(*s, *t)).collect();
			links.reconcile(&edges, &LinkConfig::default(), &nodes);
			let mut adjacency = AdjacencyIndex::new();
			adjacency.rebuild(&links);
			Self {
				nodes,
				links,
				adjacency,
			}
		}

		/// Node ids as-is, links as `source->target`.
		fn order(&self, root: Option<&str>) -> Vec<String> {
			traverse(root, &self.nodes, &self.links, &self.adjacency)
				.into_iter()
				.map(|drawable| match drawable {
					Drawable::Node(node) => node.id.clone(),
					Drawable::Link(link) => link.id().to_string(),
				})
				.collect()
		}
	}

	#[test]
	fn triangle_emits_every_entity_once() {
		let fixture = Fixture::new(&["1", "2", "3"], &[("1", "2"), ("2", "3"), ("1", "3")]);
		assert_eq!(
			fixture.order(Some("1")),
			vec!["1", "1->2", "2", "1->3", "3", "2->3"]
		);
	}

	#[test]
	fn shortcut_link_is_emitted_before_descending() {
		let fixture = Fixture::new(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("A", "C")]);
		let order = fixture.order(Some("A"));
		assert_eq!(order[0], "A");
		let ab = order.iter().position(|e| e == "A->B").unwrap();
		let ac = order.iter().position(|e| e == "A->C").unwrap();
		let bc = order.iter().position(|e| e == "B->C").unwrap();
		assert!(ab < bc && ac < bc);
		assert_eq!(order.iter().filter(|e| *e == "C").count(), 1);
	}

	#[test]
	fn cycles_do_not_repeat_entities() {
		let fixture = Fixture::new(
			&["a", "b", "c"],
			&[("a", "b"), ("b", "c"), ("c", "a"), ("a", "a")],
		);
		let order = fixture.order(Some("a"));
		assert_eq!(order, vec!["a", "a->b", "b", "a->a", "b->c", "c", "c->a"]);
		let mut unique = order.clone();
		unique.sort();
		unique.dedup();
		assert_eq!(unique.len(), order.len());
	}

	#[test]
	fn missing_root_draws_nothing() {
		let fixture = Fixture::new(&["1", "2"], &[("1", "2")]);
		assert!(fixture.order(None).is_empty());
		assert!(fixture.order(Some("9")).is_empty());
		assert!(Fixture::new(&[], &[]).order(Some("1")).is_empty());
	}

	#[test]
	fn other_components_are_not_drawn() {
		let fixture = Fixture::new(&["1", "2", "3", "4"], &[("1", "2"), ("3", "4")]);
		assert_eq!(fixture.order(Some("1")), vec!["1", "1->2", "2"]);
	}

	#[test]
	fn links_into_the_root_are_drawn_without_revisiting_it() {
		let fixture = Fixture::new(&["r", "x"], &[("r", "x"), ("x", "r")]);
		let drawn = traverse(
			Some("r"),
			&fixture.nodes,
			&fixture.links,
			&fixture.adjacency,
		);
		assert_eq!(drawn.iter().filter(|d| d.is_node()).count(), 2);
		assert_eq!(drawn.len(), 4);
	}
}
