use log::{error, info};

use crate::api::Backend;
use crate::common::{Camera, CameraId, CameraList, NewCamera};
use crate::filter::{self, ListFilter};
use crate::status::Status;



pub const VALIDATING: &str = "Validating RTSP URL...";
pub const ADDING: &str = "Adding camera to the system...";
pub const ADDED: &str = "Camera added successfully!";
pub const UPDATED: &str = "Camera updated successfully!";
pub const DELETED: &str = "Camera removed.";
pub const REQUIRED: &str = "Name and RTSP URL are required.";
pub const ADD_FAILED: &str = "Error adding camera. Check the data entered and try again.";
pub const UPDATE_FAILED: &str = "Error updating camera. Check the data entered and try again.";
pub const DELETE_FAILED: &str = "Error removing camera.";
pub const LOAD_FAILED: &str = "Error loading cameras.";

/// Fields of the add/edit camera form.
#[derive(Clone)]
#[derive(Debug, Default, PartialEq)]
#[derive(FromForm)]
pub struct CameraForm {
	#[field(name = "nome", default = String::new())]
	pub name: String,
	#[field(default = String::new())]
	pub rtsp_url: String,
	#[field(name = "agrupamento", default = String::new())]
	pub group: String,
}

impl CameraForm {
	pub fn is_complete(&self) -> bool {
		!self.name.trim().is_empty() && !self.rtsp_url.trim().is_empty()
	}

	fn to_new_camera(&self) -> NewCamera {
		NewCamera {
			name: self.name.trim().to_string(),
			rtsp_url: self.rtsp_url.trim().to_string(),
			group: self.group.trim().to_string(),
		}
	}
}

/// Camera list page: the fetched collection plus its filter state.
#[derive(Clone)]
#[derive(Debug, Default)]
pub struct CameraDashboard {
	pub cameras: CameraList,
	pub load_error: Option<String>,
}

impl CameraDashboard {
	pub async fn load(backend: &dyn Backend) -> Self {
		match backend.list_cameras().await {
			Ok(cameras) => CameraDashboard { cameras, load_error: None },
			Err(err) => {
				error!("Failed to fetch cameras; error was {}", err);
				CameraDashboard { cameras: Vec::new(), load_error: Some(LOAD_FAILED.to_string()) }
			},
		}
	}

	pub fn visible(&self, filter: &ListFilter) -> Vec<&Camera> {
		filter.apply(&self.cameras)
	}

	pub fn groups(&self) -> Vec<String> {
		filter::groups(&self.cameras)
	}

	pub fn get(&self, id: CameraId) -> Option<&Camera> {
		self.cameras.iter().find(|camera| camera.id == id)
	}
}

/// Validates the RTSP URL with the backend, then creates the camera.
///
/// The two calls are sequential and not atomic; a rejected URL means the create
/// call is never issued.
pub async fn add_camera(backend: &dyn Backend, form: &CameraForm) -> Status {
	if !form.is_complete() {
		return Status::error(REQUIRED);
	}
	let camera = form.to_new_camera();

	info!("{} ({})", VALIDATING, camera.name);
	if let Err(err) = backend.validate_rtsp(&camera.rtsp_url).await {
		error!("RTSP validation failed for camera {}; error was {}", camera.name, err);
		return Status::error(err.user_message(ADD_FAILED));
	}

	info!("{} ({})", ADDING, camera.name);
	match backend.create_camera(&camera).await {
		Ok(()) => Status::success(ADDED),
		Err(err) => {
			error!("Failed to add camera {}; error was {}", camera.name, err);
			Status::error(err.user_message(ADD_FAILED))
		},
	}
}

/// Same validate-then-write sequence as [`add_camera`], against an existing record.
pub async fn update_camera(backend: &dyn Backend, id: CameraId, form: &CameraForm) -> Status {
	if !form.is_complete() {
		return Status::error(REQUIRED);
	}
	let camera = form.to_new_camera();

	if let Err(err) = backend.validate_rtsp(&camera.rtsp_url).await {
		error!("RTSP validation failed for camera {}; error was {}", id, err);
		return Status::error(err.user_message(UPDATE_FAILED));
	}
	match backend.update_camera(id, &camera).await {
		Ok(()) => Status::success(UPDATED),
		Err(err) => {
			error!("Failed to update camera {}; error was {}", id, err);
			Status::error(err.user_message(UPDATE_FAILED))
		},
	}
}

pub async fn delete_camera(backend: &dyn Backend, id: CameraId) -> Status {
	match backend.delete_camera(id).await {
		Ok(()) => Status::success(DELETED),
		Err(err) => {
			error!("Failed to delete camera {}; error was {}", id, err);
			Status::error(err.user_message(DELETE_FAILED))
		},
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{camera, FakeBackend};

	fn form(name: &str, rtsp_url: &str, group: &str) -> CameraForm {
		CameraForm { name: name.to_string(), rtsp_url: rtsp_url.to_string(), group: group.to_string() }
	}

	#[tokio::test]
	async fn validation_precedes_creation() {
		let backend = FakeBackend::new();
		let status = add_camera(&backend, &form("Lobby", "rtsp://10.0.0.9/live", "A")).await;
		assert_eq!(status, Status::success(ADDED));
		assert_eq!(backend.calls(), vec!["validate_rtsp", "create_camera"]);
		assert_eq!(backend.cameras.lock().unwrap()[0].name, "Lobby");
	}

	#[tokio::test]
	async fn rejected_rtsp_never_creates() {
		let backend = FakeBackend::new();
		backend.fail("validate_rtsp", Some("Could not connect to the RTSP stream."));
		let status = add_camera(&backend, &form("Lobby", "rtsp://bad", "A")).await;
		assert_eq!(status, Status::error("Error: Could not connect to the RTSP stream."));
		assert_eq!(backend.count("create_camera"), 0);
		assert!(backend.cameras.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn create_failure_without_text_is_generic() {
		let backend = FakeBackend::new();
		backend.fail("create_camera", None);
		let status = add_camera(&backend, &form("Lobby", "rtsp://10.0.0.9/live", "")).await;
		assert_eq!(status, Status::error(ADD_FAILED));
		assert_eq!(backend.calls(), vec!["validate_rtsp", "create_camera"]);
	}

	#[tokio::test]
	async fn incomplete_form_sends_nothing() {
		let backend = FakeBackend::new();
		let status = add_camera(&backend, &form("  ", "rtsp://x", "")).await;
		assert_eq!(status, Status::error(REQUIRED));
		assert!(backend.calls().is_empty());
	}

	#[tokio::test]
	async fn load_and_filter() {
		let backend = FakeBackend::new().with_cameras(vec![camera(1, "Lobby", "A"), camera(2, "Back", "B")]);
		let dashboard = CameraDashboard::load(&backend).await;
		assert_eq!(dashboard.visible(&ListFilter::new("lob", "")), vec![&dashboard.cameras[0]]);
		assert!(dashboard.visible(&ListFilter::new("lob", "B")).is_empty());
		assert_eq!(dashboard.groups(), vec!["A".to_string(), "B".to_string()]);
	}

	#[tokio::test]
	async fn failed_load_is_empty_with_message() {
		let backend = FakeBackend::new();
		backend.fail("list_cameras", None);
		let dashboard = CameraDashboard::load(&backend).await;
		assert!(dashboard.cameras.is_empty());
		assert_eq!(dashboard.load_error.as_deref(), Some(LOAD_FAILED));
	}

	#[tokio::test]
	async fn update_and_delete() {
		let backend = FakeBackend::new().with_cameras(vec![camera(1, "Lobby", "A")]);
		let status = update_camera(&backend, 1, &form("Lobby 2", "rtsp://10.0.0.1/alt", "C")).await;
		assert_eq!(status, Status::success(UPDATED));
		assert_eq!(backend.cameras.lock().unwrap()[0].name, "Lobby 2");

		assert_eq!(delete_camera(&backend, 1).await, Status::success(DELETED));
		assert!(delete_camera(&backend, 1).await.is_error());
	}
}
