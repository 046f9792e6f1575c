//! Read-only map view with live people-near-gateway counts.
//!
//! Mounting fetches the map once, then a background task re-fetches it on a fixed
//! interval and replaces the snapshot wholesale. Each tick issues its own request;
//! slow requests are not deduplicated and whichever lands last wins. Dropping the
//! viewer aborts the task together with any request it still has in flight.
//!
//! A map the backend does not know is never polled. The task also stops by itself
//! once nobody has read the view for `IDLE_INTERVALS` intervals, so a tab closed
//! without saying goodbye does not keep a timer alive.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::sync::RwLock;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant};

use crate::api::Backend;
use crate::common::*;
use crate::error::ApiError;
use crate::modal::Modal;
use crate::transform::{MeasuredLayout, Point};
use crate::video::{StreamLocator, VideoPlayer};



pub const LOAD_FAILED: &str = "Error fetching map details.";
pub const NO_PEOPLE: &str = "No people associated with this gateway right now.";

/// Polling stops after this many intervals without a reader.
pub const IDLE_INTERVALS: u32 = 3;

#[derive(Clone)]
#[derive(Debug, Default)]
pub struct MapSnapshot {
	/// `None` until the first successful fetch.
	pub detail: Option<MapDetail>,
	pub error: Option<String>,
	pub refreshes: u64,
}

/// One icon drawn over the rendered map, offset from the image's top-left corner.
#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct MapIcon {
	pub key: PlacementKey,
	pub label: String,
	pub left: f64,
	pub top: f64,
	/// Nearby people; always zero for cameras.
	pub people: usize,
}

#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct MapView {
	pub name: Option<String>,
	pub image_url: Option<String>,
	pub icons: Vec<MapIcon>,
	pub error: Option<String>,
}

#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
pub enum Selection {
	Camera(CameraId),
	Gateway(GatewayId),
}

#[derive(Clone)]
#[derive(Debug)]
pub enum MapModal {
	Camera { camera_id: CameraId, name: String, player: VideoPlayer },
	People { gateway_id: GatewayId, gateway: String, people: PersonList },
}

impl MapSnapshot {
	pub fn failed(err: &ApiError) -> Self {
		MapSnapshot { detail: None, error: Some(err.user_message(LOAD_FAILED)), refreshes: 0 }
	}

	pub fn view(&self, layout: Option<MeasuredLayout>) -> MapView {
		let layout = layout.unwrap_or_default();
		let detail = match &self.detail {
			Some(detail) => detail,
			None => return MapView { name: None, image_url: None, icons: Vec::new(), error: self.error.clone() },
		};

		let cameras = detail.cameras.iter().map(|camera| {
			let screen = layout.to_screen(Point::new(camera.pos_x, camera.pos_y));
			MapIcon {
				key: PlacementKey::camera(camera.camera_id),
				label: camera.name.clone(),
				left: screen.x,
				top: screen.y,
				people: 0,
			}
		});
		let gateways = detail.gateways.iter().map(|gateway| {
			let screen = layout.to_screen(Point::new(gateway.pos_x, gateway.pos_y));
			MapIcon {
				key: PlacementKey::gateway(gateway.gateway_id),
				label: gateway.label(),
				left: screen.x,
				top: screen.y,
				people: gateway.people.len(),
			}
		});

		MapView {
			name: Some(detail.name.clone()),
			image_url: Some(detail.image_url.clone()),
			icons: cameras.chain(gateways).collect(),
			error: self.error.clone(),
		}
	}

	/// Modal for a clicked icon, built from the current snapshot.
	pub fn modal_for(&self, selection: Selection, streams: &StreamLocator) -> Modal<MapModal> {
		let detail = match &self.detail {
			Some(detail) => detail,
			None => return Modal::closed(),
		};
		match selection {
			Selection::Camera(id) => match detail.camera(id) {
				Some(camera) => Modal::showing(MapModal::Camera {
					camera_id: id,
					name: camera.name.clone(),
					player: VideoPlayer::new(streams.playlist_url(id)),
				}),
				None => Modal::closed(),
			},
			Selection::Gateway(id) => match detail.gateway(id) {
				Some(gateway) => Modal::showing(MapModal::People {
					gateway_id: id,
					gateway: gateway.label(),
					people: gateway.people.clone(),
				}),
				None => Modal::closed(),
			},
		}
	}
}

pub struct MapViewer {
	map_id: MapId,
	snapshot: Arc<RwLock<MapSnapshot>>,
	layout: RwLock<Option<MeasuredLayout>>,
	last_seen: Arc<RwLock<Instant>>,
	poller: JoinHandle<()>,
}

impl MapViewer {
	/// Fetches the map once, then starts polling every `interval`.
	///
	/// Fails without starting the poller when the backend does not know the map.
	pub async fn mount(backend: Arc<dyn Backend>, map_id: MapId, interval: Duration) -> Result<Self, ApiError> {
		let snapshot = Arc::new(RwLock::new(MapSnapshot::default()));
		if let Err(err @ ApiError::NotFound { .. }) = refresh(backend.as_ref(), map_id, &snapshot).await {
			return Err(err);
		}

		info!("Polling map {} every {:?}", map_id, interval);
		let last_seen = Arc::new(RwLock::new(Instant::now()));
		let poller = tokio::spawn(poll(backend, map_id, interval, snapshot.clone(), last_seen.clone()));
		Ok(MapViewer {
			map_id,
			snapshot,
			layout: RwLock::new(None),
			last_seen,
			poller,
		})
	}

	/// False once the poller stopped on its own after going idle.
	pub fn is_polling(&self) -> bool {
		!self.poller.is_finished()
	}

	#[cfg(test)]
	pub async fn snapshot(&self) -> MapSnapshot {
		self.snapshot.read().await.clone()
	}

	pub async fn update_layout(&self, layout: MeasuredLayout) {
		*self.layout.write().await = Some(layout);
	}

	/// Icons converted through the most recently reported layout.
	/// Reading the view marks the map as still being watched.
	pub async fn view(&self) -> MapView {
		*self.last_seen.write().await = Instant::now();
		let layout = *self.layout.read().await;
		self.snapshot.read().await.view(layout)
	}

	pub async fn open(&self, selection: Selection, streams: &StreamLocator) -> Modal<MapModal> {
		self.snapshot.read().await.modal_for(selection, streams)
	}
}

impl Drop for MapViewer {
	fn drop(&mut self) {
		info!("Stopped polling map {}", self.map_id);
		self.poller.abort();
	}
}

async fn poll(
	backend: Arc<dyn Backend>,
	map_id: MapId,
	interval: Duration,
	snapshot: Arc<RwLock<MapSnapshot>>,
	last_seen: Arc<RwLock<Instant>>,
) {
	let idle_after = interval * IDLE_INTERVALS;
	let mut ticker = time::interval_at(Instant::now() + interval, interval);
	// Owned here so ending the poll task also aborts outstanding requests.
	let mut inflight = JoinSet::new();
	loop {
		tokio::select! {
			_ = ticker.tick() => {
				if last_seen.read().await.elapsed() >= idle_after {
					info!("Map {} has no viewers; polling stopped", map_id);
					return;
				}
				let backend = backend.clone();
				let snapshot = snapshot.clone();
				inflight.spawn(async move {
					let _ = refresh(backend.as_ref(), map_id, &snapshot).await;
				});
			},
			Some(_) = inflight.join_next(), if !inflight.is_empty() => {},
		}
	}
}

async fn refresh(backend: &dyn Backend, map_id: MapId, snapshot: &RwLock<MapSnapshot>) -> Result<(), ApiError> {
	let result = backend.get_map(map_id).await;
	let mut snapshot = snapshot.write().await;
	match result {
		Ok(detail) => {
			debug!("Map {} refreshed", map_id);
			snapshot.detail = Some(detail);
			snapshot.error = None;
			snapshot.refreshes += 1;
			Ok(())
		},
		Err(err) => {
			error!("Failed to refresh map {}; error was {}", map_id, err);
			snapshot.error = Some(err.user_message(LOAD_FAILED));
			Err(err)
		},
	}
}
