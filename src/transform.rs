//! Conversion between the rendered (on-screen, possibly scaled) coordinate space of the
//! map image and its natural pixel space.
//!
//! Positions are always stored in natural pixels. Drag events arrive in viewport
//! coordinates, and icons are drawn relative to the rendered image. Nothing here is
//! cached: callers rebuild a [`MeasuredLayout`] whenever the page reports a layout
//! change and convert again on every render.

#[derive(Clone, Copy)]
#[derive(Debug, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub fn new(x: f64, y: f64) -> Self {
		Point { x, y }
	}
}

#[derive(Clone, Copy)]
#[derive(Debug, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Size {
	pub width: f64,
	pub height: f64,
}

impl Size {
	pub fn new(width: f64, height: f64) -> Self {
		Size { width, height }
	}

	fn is_measured(&self) -> bool {
		self.width > 0.0 && self.height > 0.0
	}
}

/// Bounding rectangle of the rendered image, in viewport coordinates.
#[derive(Clone, Copy)]
#[derive(Debug, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Rect {
	pub left: f64,
	pub top: f64,
	pub width: f64,
	pub height: f64,
}

impl Rect {
	pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
		Rect { left, top, width, height }
	}

	pub fn size(&self) -> Size {
		Size::new(self.width, self.height)
	}
}

/// Rendered-to-natural ratio per axis.
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
pub struct Scale {
	pub x: f64,
	pub y: f64,
}

impl Scale {
	pub const IDENTITY: Scale = Scale { x: 1.0, y: 1.0 };

	/// Falls back to the identity scale until both sizes are known and non-zero.
	pub fn between(rendered: Size, natural: Option<Size>) -> Scale {
		match natural {
			Some(natural) if natural.is_measured() && rendered.is_measured() => Scale {
				x: rendered.width / natural.width,
				y: rendered.height / natural.height,
			},
			_ => Scale::IDENTITY,
		}
	}
}

/// Snapshot of where and how large the map image is drawn.
#[derive(Clone, Copy)]
#[derive(Debug, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct MeasuredLayout {
	pub rendered: Rect,
	/// `None` until the image has loaded and reported its intrinsic size.
	pub natural: Option<Size>,
}

impl MeasuredLayout {
	pub fn new(rendered: Rect, natural: Option<Size>) -> Self {
		MeasuredLayout { rendered, natural }
	}

	pub fn scale(&self) -> Scale {
		Scale::between(self.rendered.size(), self.natural)
	}

	/// Viewport point (e.g. a drop event) to natural image pixels.
	pub fn to_natural(&self, client: Point) -> Point {
		let scale = self.scale();
		Point {
			x: (client.x - self.rendered.left) / scale.x,
			y: (client.y - self.rendered.top) / scale.y,
		}
	}

	/// Natural image pixels to an offset from the rendered image's top-left corner.
	pub fn to_screen(&self, natural: Point) -> Point {
		let scale = self.scale();
		Point {
			x: natural.x * scale.x,
			y: natural.y * scale.y,
		}
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	const EPSILON: f64 = 1e-9;

	fn assert_close(a: Point, b: Point) {
		assert!((a.x - b.x).abs() < EPSILON * a.x.abs().max(1.0), "{:?} != {:?}", a, b);
		assert!((a.y - b.y).abs() < EPSILON * a.y.abs().max(1.0), "{:?} != {:?}", a, b);
	}

	#[test]
	fn half_scale_drop() {
		let layout = MeasuredLayout::new(Rect::new(0.0, 0.0, 400.0, 300.0), Some(Size::new(800.0, 600.0)));
		assert_eq!(layout.scale(), Scale { x: 0.5, y: 0.5 });
		assert_close(layout.to_natural(Point::new(100.0, 100.0)), Point::new(200.0, 200.0));
		assert_close(layout.to_natural(Point::new(150.0, 50.0)), Point::new(300.0, 100.0));
	}

	#[test]
	fn offset_rect_is_subtracted() {
		let layout = MeasuredLayout::new(Rect::new(40.0, 25.0, 1600.0, 600.0), Some(Size::new(800.0, 600.0)));
		assert_close(layout.to_natural(Point::new(240.0, 125.0)), Point::new(100.0, 100.0));
		assert_close(layout.to_screen(Point::new(100.0, 100.0)), Point::new(200.0, 100.0));
	}

	#[test]
	fn unknown_natural_size_uses_identity() {
		let layout = MeasuredLayout::new(Rect::new(10.0, 10.0, 400.0, 300.0), None);
		assert_eq!(layout.scale(), Scale::IDENTITY);
		assert_close(layout.to_natural(Point::new(60.0, 70.0)), Point::new(50.0, 60.0));

		let zero = MeasuredLayout::new(Rect::new(0.0, 0.0, 400.0, 300.0), Some(Size::new(0.0, 0.0)));
		assert_eq!(zero.scale(), Scale::IDENTITY);
		let p = zero.to_natural(Point::new(5.0, 5.0));
		assert!(p.x.is_finite() && p.y.is_finite());
	}

	#[test]
	fn unrendered_image_uses_identity() {
		let layout = MeasuredLayout::new(Rect::new(0.0, 0.0, 0.0, 0.0), Some(Size::new(800.0, 600.0)));
		assert_eq!(layout.scale(), Scale::IDENTITY);
	}

	#[test]
	fn dropped_point_is_drawn_where_it_was_dropped() {
		let layout = MeasuredLayout::new(Rect::new(12.0, 80.0, 640.0, 360.0), Some(Size::new(1920.0, 1080.0)));
		let client = Point::new(300.25, 211.75);
		assert_close(layout.to_screen(layout.to_natural(client)), Point::new(288.25, 131.75));
	}
}
