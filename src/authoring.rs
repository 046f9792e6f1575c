//! Building a new map: name it, choose a floor-plan image, drag cameras and
//! gateways onto it, then submit everything in one multipart request.

use log::{debug, error, info, warn};

use crate::api::Backend;
use crate::common::{ItemKind, MapImage, MapItem, NewMap, PlacementKey, Position};
use crate::status::Status;
use crate::transform::{MeasuredLayout, Point};



pub const REQUIRED: &str = "A map name and an image are required.";
pub const SAVED: &str = "Map saved successfully!";
pub const SAVE_FAILED: &str = "Error saving map.";

#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
pub enum AuthoringState {
	Empty,
	NameEntered,
	ImageChosen,
	PlacingItems,
	Submitted,
}

impl AuthoringState {
	/// What the operator should do next.
	pub fn hint(&self) -> &'static str {
		match self {
			AuthoringState::Empty => "Enter a map name and choose a floor plan image.",
			AuthoringState::NameEntered => "Choose a floor plan image.",
			AuthoringState::ImageChosen => "Drag cameras and gateways onto the map.",
			AuthoringState::PlacingItems => "Keep placing items, or save the map.",
			AuthoringState::Submitted => "Map saved. Enter a name to start another one.",
		}
	}
}

/// Where a drag ended.
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropTarget {
	MapArea,
	Elsewhere,
}

/// A placed item as drawn over the rendered image, offset from its top-left corner.
#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct PlacedIcon {
	pub key: PlacementKey,
	pub label: String,
	pub left: f64,
	pub top: f64,
}

#[derive(Clone)]
#[derive(Debug, Default)]
pub struct MapAuthoring {
	palette: Vec<MapItem>,
	name: String,
	image: Option<MapImage>,
	/// First-placement order; a re-drop replaces the entry in place.
	positions: Vec<Position>,
	dragging: Option<PlacementKey>,
	layout: Option<MeasuredLayout>,
	submitted: bool,
	status: Option<Status>,
}

impl MapAuthoring {
	/// Fetches the cameras and gateways that can be placed.
	pub async fn reload_palette(&mut self, backend: &dyn Backend) {
		let mut palette = Vec::new();
		match backend.list_cameras().await {
			Ok(cameras) => palette.extend(cameras.into_iter().map(MapItem::Camera)),
			Err(err) => error!("Failed to fetch cameras for map authoring; error was {}", err),
		}
		match backend.list_gateways().await {
			Ok(gateways) => palette.extend(gateways.into_iter().map(MapItem::Gateway)),
			Err(err) => error!("Failed to fetch gateways for map authoring; error was {}", err),
		}
		self.palette = palette;
	}

	pub fn state(&self) -> AuthoringState {
		if !self.positions.is_empty() {
			AuthoringState::PlacingItems
		} else if self.image.is_some() {
			AuthoringState::ImageChosen
		} else if !self.name.is_empty() {
			AuthoringState::NameEntered
		} else if self.submitted {
			AuthoringState::Submitted
		} else {
			AuthoringState::Empty
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn image(&self) -> Option<&MapImage> {
		self.image.as_ref()
	}

	pub fn status(&self) -> Option<&Status> {
		self.status.as_ref()
	}

	/// Palette entries without a position yet.
	pub fn unplaced(&self) -> Vec<&MapItem> {
		self.palette.iter()
			.filter(|item| !self.positions.iter().any(|position| position.key() == item.key()))
			.collect()
	}

	pub fn positions(&self) -> &[Position] {
		&self.positions
	}

	pub fn set_name(&mut self, name: &str) {
		self.name = name.to_string();
		self.submitted = false;
	}

	/// A new image invalidates the previous measurement but keeps placements.
	pub fn choose_image(&mut self, image: MapImage) {
		info!("Map image chosen: {} ({} bytes)", image.file_name, image.bytes.len());
		self.image = Some(image);
		self.layout = None;
		self.submitted = false;
	}

	/// Replaces the measured layout; called on every layout-change notification.
	pub fn update_layout(&mut self, layout: MeasuredLayout) {
		self.layout = Some(layout);
	}

	/// Records the drag source. Keys not in the palette are ignored.
	pub fn drag_start(&mut self, key: PlacementKey) -> bool {
		if self.palette.iter().any(|item| item.key() == key) {
			self.dragging = Some(key);
			true
		} else {
			warn!("Drag started for unknown item {}", key);
			false
		}
	}

	pub fn dragging(&self) -> Option<PlacementKey> {
		self.dragging
	}

	/// Ends the current drag. Only a drop on the map area, with an image shown and
	/// measured, stores a position; everything else just clears the drag.
	pub fn drop_at(&mut self, client: Point, target: DropTarget) -> Option<Position> {
		let key = self.dragging.take()?;
		if target != DropTarget::MapArea {
			debug!("Drop of {} outside the map area ignored", key);
			return None;
		}
		let layout = match (&self.image, self.layout) {
			(Some(_), Some(layout)) => layout,
			_ => {
				debug!("Drop of {} before the image was measured ignored", key);
				return None;
			},
		};

		let natural = layout.to_natural(client);
		let position = Position { id: key.id, kind: key.kind, pos_x: natural.x, pos_y: natural.y };
		match self.positions.iter_mut().find(|existing| existing.key() == key) {
			Some(existing) => *existing = position,
			None => self.positions.push(position),
		}
		self.submitted = false;
		Some(position)
	}

	/// Placed items in rendered-image offsets, recomputed from the current layout.
	pub fn placed_icons(&self) -> Vec<PlacedIcon> {
		let layout = self.layout.unwrap_or_default();
		self.positions.iter()
			.map(|position| {
				let screen = layout.to_screen(Point::new(position.pos_x, position.pos_y));
				PlacedIcon {
					key: position.key(),
					label: self.label_for(position.key()),
					left: screen.x,
					top: screen.y,
				}
			})
			.collect()
	}

	fn label_for(&self, key: PlacementKey) -> String {
		match self.palette.iter().find(|item| item.key() == key) {
			Some(item) => item.label().to_string(),
			None => match key.kind {
				ItemKind::Camera => format!("Camera {}", key.id),
				ItemKind::Gateway => format!("Gateway {}", key.id),
			},
		}
	}

	/// Sends name, image and positions as one creation request. Success clears the
	/// form; failure keeps it for another attempt.
	pub async fn submit(&mut self, backend: &dyn Backend) -> &Status {
		let image = match &self.image {
			Some(image) if !self.name.trim().is_empty() => image.clone(),
			_ => return self.status.insert(Status::error(REQUIRED)),
		};
		let map = NewMap {
			name: self.name.trim().to_string(),
			image,
			positions: self.positions.clone(),
		};

		let status = match backend.create_map(&map).await {
			Ok(created) => {
				info!("Created map {} (id {:?}) with {} placements", map.name, created.map_id, map.positions.len());
				self.name.clear();
				self.image = None;
				self.positions.clear();
				self.dragging = None;
				self.layout = None;
				self.submitted = true;
				Status::success(SAVED)
			},
			Err(err) => {
				error!("Failed to save map {}; error was {}", map.name, err);
				Status::error(err.user_message(SAVE_FAILED))
			},
		};
		self.status.insert(status)
	}
}
