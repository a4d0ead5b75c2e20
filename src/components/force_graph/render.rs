use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::config::{LineType, SymbolType};
use super::registry::{LinkRecord, NodeRecord, NodeRegistry, Position};
use super::simulation::SimulationEngine;
use super::state::ForceGraphState;
use super::traversal::Drawable;

const BACKGROUND: &str = "#ffffff";

/// Draw one frame. Each drawable is handed to its renderer exactly once, in
/// traversal order.
pub fn render<E: SimulationEngine>(state: &ForceGraphState<E>, ctx: &CanvasRenderingContext2d) {
	let (width, height) = state.size();
	let transform = state.transform();
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, width, height);
	ctx.save();
	let _ = ctx.translate(transform.x, transform.y);
	let _ = ctx.scale(transform.k, transform.k);
	for drawable in state.drawables() {
		match drawable {
			Drawable::Node(node) => draw_node(ctx, node, transform.k),
			Drawable::Link(link) => draw_link(ctx, link, state.nodes(), transform.k),
		}
	}
	ctx.restore();
}

fn position_of(record: Option<&NodeRecord>) -> Position {
	record.and_then(|node| node.position).unwrap_or_default()
}

fn node_radius(node: &NodeRecord) -> f64 {
	node.config.size / 20.0
}

fn draw_link(
	ctx: &CanvasRenderingContext2d,
	link: &LinkRecord,
	nodes: &NodeRegistry,
	k: f64,
) {
	let source = nodes.get_by_key(link.source_key());
	let target = nodes.get_by_key(link.target_key());
	let (from, to) = (position_of(source), position_of(target));
	let (dx, dy) = (to.x - from.x, to.y - from.y);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < 0.001 {
		return;
	}
	let config = &link.config;
	let target_radius = target.map_or(0.0, node_radius);
	let arrow_size = 6.0 / k.max(0.5);

	ctx.set_global_alpha(config.opacity);
	ctx.set_stroke_style_str(&config.color);
	ctx.set_line_width(config.stroke_width / k.max(0.5));
	let dash = match config.line_type {
		LineType::Solid => js_sys::Array::new(),
		LineType::Dashed => js_sys::Array::of2(&JsValue::from_f64(8.0), &JsValue::from_f64(4.0)),
		LineType::Dotted => js_sys::Array::of2(&JsValue::from_f64(2.0), &JsValue::from_f64(3.0)),
	};
	let _ = ctx.set_line_dash(&dash);

	let (ux, uy) = (dx / dist, dy / dist);
	ctx.begin_path();
	ctx.move_to(from.x, from.y);
	ctx.line_to(
		to.x - ux * (target_radius + arrow_size),
		to.y - uy * (target_radius + arrow_size),
	);
	ctx.stroke();

	let _ = ctx.set_line_dash(&js_sys::Array::new());
	ctx.set_fill_style_str(&config.color);
	let (tip_x, tip_y) = (to.x - ux * target_radius, to.y - uy * target_radius);
	let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
	let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
	ctx.begin_path();
	ctx.move_to(tip_x, tip_y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();

	if let (true, Some(label)) = (config.render_label, &link.label) {
		ctx.set_fill_style_str(&config.font_color);
		ctx.set_font(&format!("{}px sans-serif", config.font_size));
		let _ = ctx.fill_text(label, from.x + dx / 2.0, from.y + dy / 2.0);
	}
	ctx.set_global_alpha(1.0);
}

fn draw_node(ctx: &CanvasRenderingContext2d, node: &NodeRecord, k: f64) {
	let at = node.position.unwrap_or_default();
	let config = &node.config;
	let radius = node_radius(node);

	ctx.set_global_alpha(config.opacity);
	ctx.begin_path();
	trace_symbol(ctx, config.symbol_type, at, radius);
	ctx.set_fill_style_str(&config.color);
	ctx.fill();
	if config.stroke_color != "none" {
		ctx.set_stroke_style_str(&config.stroke_color);
		ctx.set_line_width(config.stroke_width / k.max(0.5));
		ctx.stroke();
	}

	if config.render_label {
		ctx.set_fill_style_str(&config.font_color);
		ctx.set_font(&format!("{}px sans-serif", config.font_size));
		let _ = ctx.fill_text(&node.label, at.x + radius + 3.0, at.y + 3.0);
	}
	ctx.set_global_alpha(1.0);
}

/// Add the outline of `symbol` centred on `at` to the current path.
fn trace_symbol(ctx: &CanvasRenderingContext2d, symbol: SymbolType, at: Position, r: f64) {
	let polygon = |points: &[(f64, f64)]| {
		for (i, (x, y)) in points.iter().enumerate() {
			if i == 0 {
				ctx.move_to(at.x + x, at.y + y);
			} else {
				ctx.line_to(at.x + x, at.y + y);
			}
		}
		ctx.close_path();
	};
	match symbol {
		SymbolType::Circle => {
			let _ = ctx.arc(at.x, at.y, r, 0.0, 2.0 * PI);
		}
		SymbolType::Square => polygon(&[(-r, -r), (r, -r), (r, r), (-r, r)]),
		SymbolType::Diamond => polygon(&[(0.0, -r * 1.3), (r, 0.0), (0.0, r * 1.3), (-r, 0.0)]),
		SymbolType::Triangle => polygon(&[(0.0, -r), (r * 0.87, r * 0.5), (-r * 0.87, r * 0.5)]),
		SymbolType::Cross => {
			let t = r / 3.0;
			polygon(&[
				(-t, -r),
				(t, -r),
				(t, -t),
				(r, -t),
				(r, t),
				(t, t),
				(t, r),
				(-t, r),
				(-t, t),
				(-r, t),
				(-r, -t),
				(-t, -t),
			]);
		}
		SymbolType::Star => {
			let points: Vec<(f64, f64)> = (0..10)
				.map(|i| {
					let angle = i as f64 * PI / 5.0 - PI / 2.0;
					let reach = if i % 2 == 0 { r } else { r * 0.45 };
					(reach * angle.cos(), reach * angle.sin())
				})
				.collect();
			polygon(&points);
		}
		SymbolType::Wye => {
			let t = r / 4.0;
			let points: Vec<(f64, f64)> = (0..3)
				.flat_map(|arm| {
					let angle = arm as f64 * 2.0 * PI / 3.0 - PI / 2.0;
					let (c, s) = (angle.cos(), angle.sin());
					let (nx, ny) = (-s * t, c * t);
					[
						(nx, ny),
						(c * r + nx, s * r + ny),
						(c * r - nx, s * r - ny),
						(-nx, -ny),
					]
				})
				.collect();
			polygon(&points);
		}
	}
}
