use std::collections::HashMap;

use super::registry::{LinkRecord, LinkRegistry};

/// Outgoing links per source id, derived from a [`LinkRegistry`].
///
/// Never patched: every registry change is followed by a full [`rebuild`].
///
/// [`rebuild`]: AdjacencyIndex::rebuild
#[derive(Debug, Default)]
pub struct AdjacencyIndex {
	outgoing: HashMap<String, Vec<usize>>,
	revision: Option<u64>,
}

impl AdjacencyIndex {
	/// Index that is not current for any registry yet.
	pub fn new() -> Self {
		Self::default()
	}

	/// Recompute from scratch and stamp with the registry revision.
	pub fn rebuild(&mut self, links: &LinkRegistry) {
		self.outgoing.clear();
		for (slot, link) in links.iter().enumerate() {
			self.outgoing
				.entry(link.source.clone())
				.or_default()
				.push(slot);
		}
		self.revision = Some(links.revision());
	}

	/// Whether the index reflects the current state of `links`.
	pub fn is_current(&self, links: &LinkRegistry) -> bool {
		self.revision == Some(links.revision())
	}

	/// Outgoing links of `node_id` in registry order.
	pub fn neighbors_of<'a>(
		&'a self,
		node_id: &str,
		links: &'a LinkRegistry,
	) -> impl Iterator<Item = &'a LinkRecord> + use<'a> {
		debug_assert!(self.is_current(links), "adjacency index is stale");
		self.outgoing
			.get(node_id)
			.into_iter()
			.flatten()
			.filter_map(|&slot| links.at(slot))
	}

	/// Number of outgoing links of `node_id`.
	pub fn out_degree(&self, node_id: &str) -> usize {
		self.outgoing.get(node_id).map_or(0, Vec::len)
	}
}
