//! In-memory `Backend` that records every call, for view and route tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::api::{ApiResult, Backend};
use crate::common::*;
use crate::error::ApiError;



#[derive(Default)]
pub struct FakeBackend {
	pub cameras: Mutex<CameraList>,
	pub gateways: Mutex<GatewayList>,
	pub people: Mutex<PersonList>,
	pub maps: Mutex<Vec<MapSummary>>,
	pub details: Mutex<HashMap<MapId, MapDetail>>,
	pub active_macs: Mutex<Vec<String>>,
	pub created_maps: Mutex<Vec<NewMap>>,
	pub map_cameras: Mutex<Vec<(MapId, Vec<CameraPosition>)>>,
	detail_delay: Mutex<Option<Duration>>,
	calls: Mutex<Vec<&'static str>>,
	failures: Mutex<HashMap<&'static str, Option<String>>>,
}

impl FakeBackend {
	pub fn new() -> Self {
		FakeBackend::default()
	}

	pub fn with_cameras(self, cameras: CameraList) -> Self {
		*self.cameras.lock().unwrap() = cameras;
		self
	}

	pub fn with_gateways(self, gateways: GatewayList) -> Self {
		*self.gateways.lock().unwrap() = gateways;
		self
	}

	pub fn with_people(self, people: PersonList) -> Self {
		*self.people.lock().unwrap() = people;
		self
	}

	pub fn with_maps(self, maps: Vec<MapSummary>) -> Self {
		*self.maps.lock().unwrap() = maps;
		self
	}

	pub fn with_detail(self, detail: MapDetail) -> Self {
		self.details.lock().unwrap().insert(detail.map_id, detail);
		self
	}

	pub fn with_active_macs(self, macs: &[&str]) -> Self {
		*self.active_macs.lock().unwrap() = macs.iter().map(|mac| mac.to_string()).collect();
		self
	}

	/// Every map detail request takes `delay` before answering.
	pub fn delay_detail(&self, delay: Duration) {
		*self.detail_delay.lock().unwrap() = Some(delay);
	}

	/// Makes `operation` fail with a 400 carrying `message`.
	pub fn fail(&self, operation: &'static str, message: Option<&str>) {
		self.failures.lock().unwrap().insert(operation, message.map(str::to_string));
	}

	pub fn heal(&self, operation: &'static str) {
		self.failures.lock().unwrap().remove(operation);
	}

	pub fn calls(&self) -> Vec<&'static str> {
		self.calls.lock().unwrap().clone()
	}

	pub fn count(&self, operation: &str) -> usize {
		self.calls.lock().unwrap().iter().filter(|call| **call == operation).count()
	}

	fn record(&self, operation: &'static str) -> ApiResult<()> {
		self.calls.lock().unwrap().push(operation);
		match self.failures.lock().unwrap().get(operation) {
			Some(message) => Err(ApiError::Rejected { status: 400, message: message.clone() }),
			None => Ok(()),
		}
	}
}

fn not_found() -> ApiError {
	ApiError::NotFound { message: None }
}

#[rocket::async_trait]
impl Backend for FakeBackend {
	async fn list_cameras(&self) -> ApiResult<CameraList> {
		self.record("list_cameras")?;
		Ok(self.cameras.lock().unwrap().clone())
	}

	async fn create_camera(&self, camera: &NewCamera) -> ApiResult<()> {
		self.record("create_camera")?;
		let mut cameras = self.cameras.lock().unwrap();
		let id = cameras.iter().map(|camera| camera.id).max().unwrap_or(0) + 1;
		cameras.push(Camera {
			id,
			name: camera.name.clone(),
			rtsp_url: camera.rtsp_url.clone(),
			group: Some(camera.group.clone()).filter(|group| !group.is_empty()),
		});
		Ok(())
	}

	async fn update_camera(&self, id: CameraId, camera: &NewCamera) -> ApiResult<()> {
		self.record("update_camera")?;
		let mut cameras = self.cameras.lock().unwrap();
		let existing = cameras.iter_mut().find(|existing| existing.id == id).ok_or_else(not_found)?;
		existing.name = camera.name.clone();
		existing.rtsp_url = camera.rtsp_url.clone();
		existing.group = Some(camera.group.clone());
		Ok(())
	}

	async fn delete_camera(&self, id: CameraId) -> ApiResult<()> {
		self.record("delete_camera")?;
		let mut cameras = self.cameras.lock().unwrap();
		let before = cameras.len();
		cameras.retain(|camera| camera.id != id);
		if cameras.len() == before { Err(not_found()) } else { Ok(()) }
	}

	async fn validate_rtsp(&self, _rtsp_url: &str) -> ApiResult<()> {
		self.record("validate_rtsp")
	}

	async fn list_maps(&self) -> ApiResult<Vec<MapSummary>> {
		self.record("list_maps")?;
		Ok(self.maps.lock().unwrap().clone())
	}

	async fn create_map(&self, map: &NewMap) -> ApiResult<MapCreated> {
		self.record("create_map")?;
		let mut created = self.created_maps.lock().unwrap();
		created.push(map.clone());
		Ok(MapCreated { map_id: Some(created.len() as MapId), message: None })
	}

	async fn get_map(&self, id: MapId) -> ApiResult<MapDetail> {
		self.record("get_map")?;
		let delay = *self.detail_delay.lock().unwrap();
		if let Some(delay) = delay {
			tokio::time::sleep(delay).await;
		}
		self.details.lock().unwrap().get(&id).cloned().ok_or_else(not_found)
	}

	async fn add_cameras_to_map(&self, id: MapId, cameras: &[CameraPosition]) -> ApiResult<()> {
		self.record("add_cameras_to_map")?;
		self.map_cameras.lock().unwrap().push((id, cameras.to_vec()));
		Ok(())
	}

	async fn delete_map(&self, id: MapId) -> ApiResult<()> {
		self.record("delete_map")?;
		self.maps.lock().unwrap().retain(|map| map.id != id);
		Ok(())
	}

	async fn list_gateways(&self) -> ApiResult<GatewayList> {
		self.record("list_gateways")?;
		Ok(self.gateways.lock().unwrap().clone())
	}

	async fn list_active_gateways(&self) -> ApiResult<Vec<String>> {
		self.record("list_active_gateways")?;
		Ok(self.active_macs.lock().unwrap().clone())
	}

	async fn register_gateway(&self, gateway: &NewGateway) -> ApiResult<()> {
		self.record("register_gateway")?;
		let mut gateways = self.gateways.lock().unwrap();
		let id = gateways.iter().map(|gateway| gateway.id).max().unwrap_or(0) + 1;
		gateways.push(Gateway {
			id,
			mac: gateway.mac.clone(),
			name: Some(gateway.name.clone()),
			sector: Some(gateway.sector.clone()),
		});
		Ok(())
	}

	async fn delete_gateway(&self, id: GatewayId) -> ApiResult<()> {
		self.record("delete_gateway")?;
		self.gateways.lock().unwrap().retain(|gateway| gateway.id != id);
		Ok(())
	}

	async fn get_gateway(&self, id: GatewayId) -> ApiResult<Gateway> {
		self.record("get_gateway")?;
		self.gateways.lock().unwrap().iter().find(|gateway| gateway.id == id).cloned().ok_or_else(not_found)
	}

	async fn people_near_gateway(&self, id: GatewayId) -> ApiResult<PersonList> {
		self.record("people_near_gateway")?;
		let details = self.details.lock().unwrap();
		Ok(details.values()
			.filter_map(|detail| detail.gateway(id))
			.flat_map(|gateway| gateway.people.iter().cloned())
			.collect())
	}

	async fn list_people(&self) -> ApiResult<PersonList> {
		self.record("list_people")?;
		Ok(self.people.lock().unwrap().clone())
	}

	async fn register_person(&self, person: &NewPerson) -> ApiResult<()> {
		self.record("register_person")?;
		let mut people = self.people.lock().unwrap();
		let id = people.iter().map(|person| person.id).max().unwrap_or(0) + 1;
		people.push(Person {
			id,
			name: person.name.clone(),
			sector: Some(person.sector.clone()).filter(|sector| !sector.is_empty()),
			ibeacon_mac: Some(person.ibeacon_mac.clone()),
		});
		Ok(())
	}

	async fn update_person(&self, id: PersonId, person: &NewPerson) -> ApiResult<()> {
		self.record("update_person")?;
		let mut people = self.people.lock().unwrap();
		let existing = people.iter_mut().find(|existing| existing.id == id).ok_or_else(not_found)?;
		existing.name = person.name.clone();
		existing.sector = Some(person.sector.clone()).filter(|sector| !sector.is_empty());
		existing.ibeacon_mac = Some(person.ibeacon_mac.clone());
		Ok(())
	}

	async fn delete_person(&self, id: PersonId) -> ApiResult<()> {
		self.record("delete_person")?;
		self.people.lock().unwrap().retain(|person| person.id != id);
		Ok(())
	}
}

pub fn camera(id: CameraId, name: &str, group: &str) -> Camera {
	Camera {
		id,
		name: name.to_string(),
		rtsp_url: format!("rtsp://10.0.0.{}/stream", id),
		group: Some(group.to_string()),
	}
}

pub fn gateway(id: GatewayId, name: &str, sector: &str) -> Gateway {
	Gateway {
		id,
		mac: format!("AA:BB:CC:DD:EE:{:02X}", id),
		name: Some(name.to_string()),
		sector: Some(sector.to_string()),
	}
}

pub fn person(id: PersonId, name: &str, sector: &str) -> Person {
	Person {
		id,
		name: name.to_string(),
		sector: Some(sector.to_string()),
		ibeacon_mac: Some(format!("BE:AC:00:00:00:{:02X}", id)),
	}
}

pub fn floor_detail(map_id: MapId) -> MapDetail {
	MapDetail {
		map_id,
		name: "Floor1".to_string(),
		image_url: "static/maps/floor1.png".to_string(),
		cameras: vec![CameraPlacement {
			camera_id: 1,
			name: "Lobby".to_string(),
			rtsp_url: Some("rtsp://10.0.0.1/stream".to_string()),
			group: Some("A".to_string()),
			pos_x: 200.0,
			pos_y: 200.0,
		}],
		gateways: vec![GatewayPlacement {
			gateway_id: 5,
			name: Some("Entrance".to_string()),
			mac: Some("AA:BB:CC:DD:EE:05".to_string()),
			sector: Some("North".to_string()),
			pos_x: 400.0,
			pos_y: 100.0,
			people: vec![person(9, "Ana", "Ops")],
		}],
	}
}
