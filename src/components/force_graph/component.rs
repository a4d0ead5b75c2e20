use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::config::GraphConfig;
use super::render;
use super::state::ForceGraphState;
use super::types::GraphData;

/// Fixed simulation step per animation frame, in seconds.
const FRAME_DT: f32 = 0.016;

type SharedState = Rc<RefCell<ForceGraphState>>;
type JsCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Browser resources owned by one mounted canvas.
#[derive(Clone, Default)]
struct Handles {
	animate: JsCallback,
	resize_cb: JsCallback,
	frame_id: Rc<Cell<Option<i32>>>,
}

impl Handles {
	fn release(&self, state: &SharedState) {
		if let Some(window) = web_sys::window() {
			if let Some(id) = self.frame_id.take() {
				let _ = window.cancel_animation_frame(id);
			}
			if let Some(cb) = self.resize_cb.borrow().as_ref() {
				let _ =
					window.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
		state.borrow_mut().dispose();
		self.animate.borrow_mut().take();
		self.resize_cb.borrow_mut().take();
	}
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Canvas that lays out and draws `data` with a force simulation.
///
/// Every change of `data` reconciles the graph in place, so nodes that
/// survive an update keep their positions.
#[component]
pub fn ForceGraphCanvas(
	/// Graph payload.
	#[prop(into)]
	data: Signal<GraphData>,
	/// Graph configuration, defaults when omitted.
	#[prop(optional)]
	config: GraphConfig,
	/// Size the canvas to the window and follow window resizes.
	#[prop(default = false)]
	fullscreen: bool,
	/// Node to animate the view onto.
	#[prop(optional, into)]
	focused_node_id: MaybeProp<String>,
	/// Fired for clicks that land on no node.
	#[prop(optional, into)]
	on_click_graph: Option<Callback<MouseEvent>>,
) -> impl IntoView {
	let state: SharedState = match ForceGraphState::new(config) {
		Ok(state) => Rc::new(RefCell::new(state)),
		Err(err) => {
			error!("force graph unavailable: {err}");
			return view! { <p class="force-graph-error">{err.to_string()}</p> }.into_any();
		}
	};
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let handles = Handles::default();

	let state_data = state.clone();
	Effect::new(move |_| {
		let payload = data.get();
		if let Err(err) = state_data.borrow_mut().update_data(&payload) {
			error!("graph update rejected: {err}");
		}
	});

	let state_focus = state.clone();
	Effect::new(move |_| {
		if let Some(id) = focused_node_id.get() {
			state_focus.borrow_mut().focus_on(&id);
		}
	});

	let (state_init, handles_init) = (state.clone(), handles.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if handles_init.animate.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or_else(|| state_init.borrow().size())
		} else {
			let (cw, ch) = state_init.borrow().size();
			canvas
				.parent_element()
				.map(|p| (p.client_width() as f64, p.client_height() as f64))
				.filter(|(pw, ph)| *pw > 0.0 && *ph > 0.0)
				.unwrap_or((cw, ch))
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		state_init.borrow_mut().resize(w, h);

		let ctx: CanvasRenderingContext2d = match canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|ctx| ctx.dyn_into().ok())
		{
			Some(ctx) => ctx,
			None => {
				error!("canvas 2d context unavailable");
				return;
			}
		};

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*handles_init.resize_cb.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				state_resize.borrow_mut().resize(nw, nh);
			}));
			if let Some(ref cb) = *handles_init.resize_cb.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner, frame_id) = (
			state_init.clone(),
			handles_init.animate.clone(),
			handles_init.frame_id.clone(),
		);
		*handles_init.animate.borrow_mut() = Some(Closure::new(move || {
			{
				let mut s = state_anim.borrow_mut();
				if s.is_disposed() {
					return;
				}
				if s.tick(FRAME_DT, web_time::Instant::now()).is_some() {
					render::render(&*s, &ctx);
				}
			}
			let Some(window) = web_sys::window() else {
				return;
			};
			if let Some(ref cb) = *animate_inner.borrow() {
				frame_id.set(
					window
						.request_animation_frame(cb.as_ref().unchecked_ref())
						.ok(),
				);
			}
		}));
		if let Some(ref cb) = *handles_init.animate.borrow() {
			handles_init
				.frame_id
				.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}
		info!("force graph mounted at {}x{}", w, h);
	});

	let cleanup = StoredValue::new_local((state.clone(), handles));
	on_cleanup(move || {
		cleanup.with_value(|(state, handles)| handles.release(state));
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		if let Some((x, y)) = canvas_point(canvas_ref, &ev) {
			state_md.borrow_mut().pointer_down(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		if let Some((x, y)) = canvas_point(canvas_ref, &ev) {
			state_mm.borrow_mut().pointer_move(x, y);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		state_mu.borrow_mut().pointer_up();
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		state_ml.borrow_mut().pointer_up();
	};

	let state_click = state.clone();
	let on_click = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		let background = state_click.borrow_mut().is_background_click(x, y);
		if let (true, Some(cb)) = (background, on_click_graph) {
			cb.run(ev);
		}
	};

	let state_wh = state;
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some((x, y)) = canvas_point(canvas_ref, &ev) {
			state_wh.borrow_mut().wheel(x, y, ev.delta_y());
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="force-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:click=on_click
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
	.into_any()
}
