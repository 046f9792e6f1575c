use log::{error, info};

use crate::api::Backend;
use crate::common::{NewPerson, Person, PersonId, PersonList};
use crate::filter::{self, ListFilter};
use crate::status::Status;



pub const REQUIRED: &str = "Fill in the required fields.";
pub const REGISTER_FAILED: &str = "Error registering the person. Check the data and try again.";
pub const UPDATE_FAILED: &str = "Error updating the person. Check the data and try again.";
pub const DELETED: &str = "Person removed.";
pub const DELETE_FAILED: &str = "Error removing person.";
pub const LOAD_FAILED: &str = "Error loading people.";

/// Name and iBeacon MAC are required; sector is optional.
#[derive(Clone)]
#[derive(Debug, Default, PartialEq)]
#[derive(FromForm)]
pub struct PersonForm {
	#[field(name = "nome", default = String::new())]
	pub name: String,
	#[field(name = "setor", default = String::new())]
	pub sector: String,
	#[field(default = String::new())]
	pub ibeacon_mac: String,
}

impl PersonForm {
	pub fn is_complete(&self) -> bool {
		!self.name.trim().is_empty() && !self.ibeacon_mac.trim().is_empty()
	}

	fn to_new_person(&self) -> NewPerson {
		NewPerson {
			name: self.name.trim().to_string(),
			sector: self.sector.trim().to_string(),
			ibeacon_mac: self.ibeacon_mac.trim().to_string(),
		}
	}
}

impl From<&Person> for PersonForm {
	fn from(person: &Person) -> Self {
		PersonForm {
			name: person.name.clone(),
			sector: person.sector.clone().unwrap_or_default(),
			ibeacon_mac: person.ibeacon_mac.clone().unwrap_or_default(),
		}
	}
}

#[derive(Clone)]
#[derive(Debug, Default)]
pub struct PeopleDashboard {
	pub people: PersonList,
	pub load_error: Option<String>,
}

impl PeopleDashboard {
	pub async fn load(backend: &dyn Backend) -> Self {
		match backend.list_people().await {
			Ok(people) => PeopleDashboard { people, load_error: None },
			Err(err) => {
				error!("Failed to fetch people; error was {}", err);
				PeopleDashboard { people: Vec::new(), load_error: Some(LOAD_FAILED.to_string()) }
			},
		}
	}

	pub fn visible(&self, filter: &ListFilter) -> Vec<&Person> {
		filter.apply(&self.people)
	}

	pub fn sectors(&self) -> Vec<String> {
		filter::groups(&self.people)
	}

	pub fn get(&self, id: PersonId) -> Option<&Person> {
		self.people.iter().find(|person| person.id == id)
	}
}

pub async fn register_person(backend: &dyn Backend, form: &PersonForm) -> Status {
	if !form.is_complete() {
		return Status::error(REQUIRED);
	}
	let person = form.to_new_person();
	match backend.register_person(&person).await {
		Ok(()) => {
			info!("Registered person {} with beacon {}", person.name, person.ibeacon_mac);
			Status::success(format!("Person \"{}\" registered successfully!", person.name))
		},
		Err(err) => {
			error!("Failed to register person {}; error was {}", person.name, err);
			Status::error(err.user_message(REGISTER_FAILED))
		},
	}
}

pub async fn update_person(backend: &dyn Backend, id: PersonId, form: &PersonForm) -> Status {
	if !form.is_complete() {
		return Status::error(REQUIRED);
	}
	match backend.update_person(id, &form.to_new_person()).await {
		Ok(()) => Status::success(format!("Person \"{}\" updated.", form.name.trim())),
		Err(err) => {
			error!("Failed to update person {}; error was {}", id, err);
			Status::error(err.user_message(UPDATE_FAILED))
		},
	}
}

pub async fn delete_person(backend: &dyn Backend, id: PersonId) -> Status {
	match backend.delete_person(id).await {
		Ok(()) => Status::success(DELETED),
		Err(err) => {
			error!("Failed to delete person {}; error was {}", id, err);
			Status::error(err.user_message(DELETE_FAILED))
		},
	}
}
