//! Browser entry point for the graph viewer.

use force_graph_view::{App, init_logging};
use leptos::mount::mount_to_body;

fn main() {
	init_logging();
	mount_to_body(App)
}
