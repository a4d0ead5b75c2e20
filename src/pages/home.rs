use leptos::prelude::*;
use log::info;
use web_sys::MouseEvent;

use crate::components::force_graph::config::NodeOverrides;
use crate::components::force_graph::{
	ForceGraphCanvas, GraphConfig, GraphData, GraphLink, GraphNode,
};

/// Generate sample graph data: a random tree rooted at node "0".
fn generate_sample_data(n: usize) -> GraphData {
	let nodes: Vec<GraphNode> = (0..n)
		.map(|i| GraphNode {
			id: i.to_string(),
			group: Some((i % 10) as u32),
			overrides: NodeOverrides {
				label: (i < 10).then(|| format!("Node {}", i)),
				..Default::default()
			},
			..Default::default()
		})
		.collect();

	// Parent to child, so every node is reachable from the root.
	let links: Vec<GraphLink> = (1..n)
		.map(|i| {
			let parent = (rand_simple(i) * (i as f64)) as usize;
			GraphLink::new(parent.to_string(), i.to_string())
		})
		.collect();

	GraphData { nodes, links }
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let (size, set_size) = signal(100usize);
	let graph_data = Signal::derive(move || generate_sample_data(size.get()));
	let (focused, set_focused) = signal(None::<String>);

	let config = GraphConfig {
		initial_zoom: Some(1.0),
		focus_zoom: 2.0,
		..Default::default()
	};

	let on_click_graph = Callback::new(move |_: MouseEvent| {
		info!("background clicked");
		set_focused.set(None);
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<ForceGraphCanvas
					data=graph_data
					config=config
					fullscreen=true
					focused_node_id=focused
					on_click_graph=on_click_graph
				/>
				<div class="graph-overlay">
					<h1>"Force-Directed Graph"</h1>
					<p class="subtitle">"Drag nodes to reposition. Scroll to zoom. Drag background to pan."</p>
					<button on:click=move |_| set_focused.set(Some("0".to_string()))>"Focus root"</button>
					<button on:click=move |_| set_size.update(|n| *n += 10)>"Add nodes"</button>
					<button on:click=move |_| set_size.update(|n| *n = n.saturating_sub(10).max(1))>
						"Remove nodes"
					</button>
				</div>
			</div>
		</ErrorBoundary>
	}
}
