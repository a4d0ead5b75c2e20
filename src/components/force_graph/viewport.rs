//! Pan/zoom transform and the visible world rectangle.

use super::registry::Position;

/// Screen-space translation `(x, y)` and scale `k`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal offset in pixels.
	pub x: f64,
	/// Vertical offset in pixels.
	pub y: f64,
	/// Zoom factor.
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	/// Inverse of the transform.
	pub fn screen_to_world(&self, sx: f64, sy: f64) -> Position {
		Position::new((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	fn lerp(&self, to: &ViewTransform, t: f64) -> ViewTransform {
		ViewTransform {
			x: self.x + (to.x - self.x) * t,
			y: self.y + (to.y - self.y) * t,
			k: self.k + (to.k - self.k) * t,
		}
	}
}

/// World-space rectangle visible through the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	/// Left edge.
	pub x: f64,
	/// Top edge.
	pub y: f64,
	/// World units across.
	pub width: f64,
	/// World units down.
	pub height: f64,
}

impl Viewport {
	/// Rectangle seen through a `width` x `height` canvas under `transform`.
	pub fn of(transform: &ViewTransform, width: f64, height: f64) -> Self {
		let k = transform.k;
		Self {
			x: -transform.x / k,
			y: -transform.y / k,
			width: width / k,
			height: height / k,
		}
	}

	/// Edges inclusive.
	pub fn contains(&self, position: Position) -> bool {
		position.x >= self.x
			&& position.x <= self.x + self.width
			&& position.y >= self.y
			&& position.y <= self.y + self.height
	}
}

/// Fast start, slow finish; maps `[0, 1]` onto `[0, 1]`.
pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

#[derive(Clone, Debug)]
struct FocusAnimation {
	from: ViewTransform,
	to: ViewTransform,
	elapsed: f64,
	duration: f64,
}

/// Current transform, zoom bounds, canvas size and any running focus
/// animation.
#[derive(Clone, Debug)]
pub struct ViewportState {
	transform: ViewTransform,
	min_zoom: f64,
	max_zoom: f64,
	width: f64,
	height: f64,
	focus: Option<FocusAnimation>,
}

impl ViewportState {
	/// Untranslated view at `initial_zoom`, clamped.
	pub fn new(width: f64, height: f64, min_zoom: f64, max_zoom: f64, initial_zoom: f64) -> Self {
		let mut state = Self {
			transform: ViewTransform::default(),
			min_zoom,
			max_zoom,
			width,
			height,
			focus: None,
		};
		state.transform.k = state.clamp(initial_zoom);
		state
	}

	fn clamp(&self, k: f64) -> f64 {
		if k.is_nan() {
			return self.min_zoom;
		}
		k.clamp(self.min_zoom, self.max_zoom)
	}

	/// Current transform.
	pub fn transform(&self) -> ViewTransform {
		self.transform
	}

	/// Visible world rectangle.
	pub fn viewport(&self) -> Viewport {
		Viewport::of(&self.transform, self.width, self.height)
	}

	/// Canvas size in pixels.
	pub fn size(&self) -> (f64, f64) {
		(self.width, self.height)
	}

	/// New canvas size; the transform is kept.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	/// Apply a gesture transform verbatim except for the zoom clamp. Cancels a
	/// running focus animation.
	pub fn apply(&mut self, transform: ViewTransform) -> ViewTransform {
		self.focus = None;
		self.transform = ViewTransform {
			k: self.clamp(transform.k),
			..transform
		};
		self.transform
	}

	/// Scale by `factor` around the screen point `(sx, sy)`.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) -> ViewTransform {
		let current = self.transform;
		let k = self.clamp(current.k * factor);
		let ratio = k / current.k;
		self.apply(ViewTransform {
			x: sx - (sx - current.x) * ratio,
			y: sy - (sy - current.y) * ratio,
			k,
		})
	}

	/// Start animating towards `target` centered on screen at zoom `k`.
	pub fn focus_on(&mut self, target: Position, k: f64, duration: f64) {
		let k = self.clamp(k);
		let to = ViewTransform {
			x: self.width / 2.0 - target.x * k,
			y: self.height / 2.0 - target.y * k,
			k,
		};
		if duration <= 0.0 {
			self.focus = None;
			self.transform = to;
			return;
		}
		self.focus = Some(FocusAnimation {
			from: self.transform,
			to,
			elapsed: 0.0,
			duration,
		});
	}

	/// A focus animation is running.
	pub fn is_animating(&self) -> bool {
		self.focus.is_some()
	}

	/// Advance a running focus animation. Returns whether the transform moved.
	pub fn advance(&mut self, dt: f64) -> bool {
		let Some(focus) = self.focus.as_mut() else {
			return false;
		};
		focus.elapsed += dt;
		let t = (focus.elapsed / focus.duration).min(1.0);
		self.transform = focus.from.lerp(&focus.to, ease_out_cubic(t));
		if t >= 1.0 {
			self.transform = focus.to;
			self.focus = None;
		}
		true
	}
}
