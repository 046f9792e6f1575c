use log::{error, info};

use crate::api::Backend;
use crate::common::{CameraPosition, MapId, MapSummary};
use crate::status::Status;



pub const LOAD_FAILED: &str = "Error fetching maps. Check that the backend is running.";
pub const DELETE_FAILED: &str = "Error removing map.";
pub const CAMERAS_FAILED: &str = "Error adding cameras to the map.";

/// Map dashboard: list of stored maps.
#[derive(Clone)]
#[derive(Debug, Default)]
pub struct MapDashboard {
	pub maps: Vec<MapSummary>,
	/// Set when the list could not be fetched; the page shows it instead of the list.
	pub load_error: Option<String>,
}

impl MapDashboard {
	pub async fn load(backend: &dyn Backend) -> Self {
		match backend.list_maps().await {
			Ok(maps) => {
				info!("Received {} maps", maps.len());
				MapDashboard { maps, load_error: None }
			},
			Err(err) => {
				error!("Failed to fetch maps; error was {}", err);
				MapDashboard { maps: Vec::new(), load_error: Some(LOAD_FAILED.to_string()) }
			},
		}
	}

	/// Drops the map from the local copy only once the backend confirmed.
	pub async fn delete(&mut self, backend: &dyn Backend, id: MapId) -> Status {
		match backend.delete_map(id).await {
			Ok(()) => {
				self.maps.retain(|map| map.id != id);
				Status::success("Map removed.")
			},
			Err(err) => {
				error!("Failed to delete map {}; error was {}", id, err);
				Status::error(err.user_message(DELETE_FAILED))
			},
		}
	}
}

/// Appends camera placements to an existing map (legacy camera-only payload).
pub async fn add_cameras(backend: &dyn Backend, id: MapId, cameras: &[CameraPosition]) -> Status {
	if cameras.is_empty() {
		return Status::error("Camera list is required.");
	}
	match backend.add_cameras_to_map(id, cameras).await {
		Ok(()) => Status::success("Cameras added to the map."),
		Err(err) => {
			error!("Failed to add cameras to map {}; error was {}", id, err);
			Status::error(err.user_message(CAMERAS_FAILED))
		},
	}
}
