use log::{error, info};

use crate::api::Backend;
use crate::common::{Gateway, GatewayId, GatewayList, NewGateway, PersonList};
use crate::filter::{self, ListFilter};
use crate::status::Status;



pub const SCAN_FAILED: &str = "Error fetching active gateways. Try again.";
pub const REQUIRED: &str = "Fill in every field before submitting.";
pub const REGISTER_FAILED: &str = "Error registering the gateway. Check the data and try again.";
pub const DELETED: &str = "Gateway removed.";
pub const DELETE_FAILED: &str = "Error removing gateway.";
pub const LOAD_FAILED: &str = "Error loading gateways.";
pub const PEOPLE_FAILED: &str = "Error loading people near this gateway.";

#[derive(Clone)]
#[derive(Debug, Default, PartialEq)]
#[derive(FromForm)]
pub struct GatewayForm {
	#[field(default = String::new())]
	pub mac: String,
	#[field(name = "nome", default = String::new())]
	pub name: String,
	#[field(name = "setor", default = String::new())]
	pub sector: String,
}

/// Registration flow: scan for active MACs, pick one, attach name and sector.
#[derive(Clone)]
#[derive(Debug, Default)]
pub struct GatewayRegistration {
	pub active: Vec<String>,
	pub selected: Option<String>,
	pub name: String,
	pub sector: String,
	pub status: Option<Status>,
}

impl GatewayRegistration {
	pub async fn scan(&mut self, backend: &dyn Backend) {
		match backend.list_active_gateways().await {
			Ok(active) => {
				info!("Scan found {} active gateways", active.len());
				self.active = active;
				self.status = None;
			},
			Err(err) => {
				error!("Failed to list active gateways; error was {}", err);
				self.status = Some(Status::error(SCAN_FAILED));
			},
		}
	}

	/// Only MACs from the last scan can be selected.
	pub fn select(&mut self, mac: &str) -> bool {
		if self.active.iter().any(|active| active == mac) {
			self.selected = Some(mac.to_string());
			true
		} else {
			false
		}
	}

	/// A MAC outside the last scan clears the selection.
	pub fn fill(&mut self, form: &GatewayForm) {
		if !form.mac.is_empty() && !self.select(&form.mac) {
			self.selected = None;
		}
		self.name = form.name.clone();
		self.sector = form.sector.clone();
	}

	pub async fn register(&mut self, backend: &dyn Backend) -> &Status {
		let mac = match self.selected.clone() {
			Some(mac) if !self.name.trim().is_empty() && !self.sector.trim().is_empty() => mac,
			_ => return self.status.insert(Status::error(REQUIRED)),
		};

		let gateway = NewGateway {
			name: self.name.trim().to_string(),
			mac,
			sector: self.sector.trim().to_string(),
		};
		let status = match backend.register_gateway(&gateway).await {
			Ok(()) => {
				info!("Registered gateway {} ({})", gateway.name, gateway.mac);
				*self = GatewayRegistration::default();
				Status::success(format!("Gateway \"{}\" registered successfully!", gateway.name))
			},
			Err(err) => {
				error!("Failed to register gateway {}; error was {}", gateway.mac, err);
				Status::error(err.user_message(REGISTER_FAILED))
			},
		};
		self.status.insert(status)
	}
}

#[derive(Clone)]
#[derive(Debug, Default)]
pub struct GatewayDashboard {
	pub gateways: GatewayList,
	pub load_error: Option<String>,
}

impl GatewayDashboard {
	pub async fn load(backend: &dyn Backend) -> Self {
		match backend.list_gateways().await {
			Ok(gateways) => GatewayDashboard { gateways, load_error: None },
			Err(err) => {
				error!("Failed to fetch gateways; error was {}", err);
				GatewayDashboard { gateways: Vec::new(), load_error: Some(LOAD_FAILED.to_string()) }
			},
		}
	}

	pub fn visible(&self, filter: &ListFilter) -> Vec<&Gateway> {
		filter.apply(&self.gateways)
	}

	pub fn sectors(&self) -> Vec<String> {
		filter::groups(&self.gateways)
	}
}

/// A gateway and the people the backend currently places near it.
#[derive(Clone)]
#[derive(Debug, PartialEq)]
pub struct GatewayPeople {
	pub gateway: Gateway,
	pub people: PersonList,
}

pub async fn people_near(backend: &dyn Backend, id: GatewayId) -> Result<GatewayPeople, Status> {
	let fetched = async {
		let gateway = backend.get_gateway(id).await?;
		let people = backend.people_near_gateway(id).await?;
		Ok::<_, crate::error::ApiError>(GatewayPeople { gateway, people })
	};
	fetched.await.map_err(|err| {
		error!("Failed to fetch people near gateway {}; error was {}", id, err);
		Status::error(err.user_message(PEOPLE_FAILED))
	})
}

pub async fn delete_gateway(backend: &dyn Backend, id: GatewayId) -> Status {
	match backend.delete_gateway(id).await {
		Ok(()) => Status::success(DELETED),
		Err(err) => {
			error!("Failed to delete gateway {}; error was {}", id, err);
			Status::error(err.user_message(DELETE_FAILED))
		},
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{floor_detail, gateway, FakeBackend};

	#[tokio::test]
	async fn scan_select_register() {
		let backend = FakeBackend::new().with_active_macs(&["AA:01", "AA:02"]);
		let mut registration = GatewayRegistration::default();
		registration.scan(&backend).await;
		assert_eq!(registration.active, vec!["AA:01".to_string(), "AA:02".to_string()]);

		assert!(!registration.select("FF:FF"));
		assert!(registration.select("AA:02"));
		registration.name = "Entrance".to_string();
		registration.sector = "North".to_string();

		let status = registration.register(&backend).await.clone();
		assert_eq!(status, Status::success("Gateway \"Entrance\" registered successfully!"));
		assert!(registration.selected.is_none());
		assert!(registration.active.is_empty());
		assert!(registration.name.is_empty());

		let gateways = backend.gateways.lock().unwrap();
		assert_eq!(gateways[0].mac, "AA:02");
		assert_eq!(gateways[0].sector.as_deref(), Some("North"));
	}

	#[tokio::test]
	async fn register_requires_every_field() {
		let backend = FakeBackend::new();
		let mut registration = GatewayRegistration::default();
		registration.fill(&GatewayForm { mac: "AA:01".to_string(), name: "Entrance".to_string(), sector: String::new() });
		assert_eq!(registration.register(&backend).await, &Status::error(REQUIRED));
		assert!(backend.calls().is_empty());
	}

	#[tokio::test]
	async fn failed_registration_keeps_fields() {
		let backend = FakeBackend::new().with_active_macs(&["AA:01"]);
		backend.fail("register_gateway", None);
		let mut registration = GatewayRegistration::default();
		registration.scan(&backend).await;
		registration.fill(&GatewayForm { mac: "AA:01".to_string(), name: "Entrance".to_string(), sector: "North".to_string() });
		assert_eq!(registration.register(&backend).await, &Status::error(REGISTER_FAILED));
		assert_eq!(registration.selected.as_deref(), Some("AA:01"));
		assert_eq!(registration.name, "Entrance");
	}

	#[tokio::test]
	async fn unscanned_mac_is_not_registered() {
		let backend = FakeBackend::new().with_active_macs(&["AA:01"]);
		let mut registration = GatewayRegistration::default();
		registration.scan(&backend).await;
		assert!(registration.select("AA:01"));

		registration.fill(&GatewayForm { mac: "FF:FF".to_string(), name: "Rogue".to_string(), sector: "North".to_string() });
		assert_eq!(registration.selected, None);
		assert_eq!(registration.register(&backend).await, &Status::error(REQUIRED));
		assert_eq!(backend.count("register_gateway"), 0);
	}

	#[tokio::test]
	async fn scan_failure_sets_message() {
		let backend = FakeBackend::new();
		backend.fail("list_active_gateways", None);
		let mut registration = GatewayRegistration::default();
		registration.scan(&backend).await;
		assert_eq!(registration.status, Some(Status::error(SCAN_FAILED)));
	}

	#[tokio::test]
	async fn people_near_gateway() {
		let backend = FakeBackend::new()
			.with_gateways(vec![gateway(5, "Entrance", "North")])
			.with_detail(floor_detail(1));
		let found = people_near(&backend, 5).await.unwrap();
		assert_eq!(found.gateway.label(), "Entrance");
		assert_eq!(found.people.len(), 1);
		assert!(people_near(&backend, 6).await.is_err());
	}
}
