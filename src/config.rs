use std::time::Duration;

use rocket::figment::Figment;
use rocket::figment::providers::{Env, Format, Serialized, Toml};

use crate::video::StreamLocator;



pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000/api";

/// Everything the dashboard needs to reach the backend and the stream server.
#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
	/// Base of the REST API; resource paths are joined onto it.
	pub backend_url: String,
	pub request_timeout_secs: u64,
	pub poll_interval_secs: u64,
	pub stream_base: String,
	pub stream_collection: String,
	/// Unused authoring and registration sessions are dropped after this long.
	pub session_idle_secs: u64,
}

impl Default for DashboardConfig {
	fn default() -> Self {
		DashboardConfig {
			backend_url: DEFAULT_BACKEND_URL.to_string(),
			request_timeout_secs: 10,
			poll_interval_secs: 5,
			stream_base: "/streams".to_string(),
			stream_collection: "output".to_string(),
			session_idle_secs: 30 * 60,
		}
	}
}

impl DashboardConfig {
	/// Defaults, then each TOML file in order, then `DASHBOARD_*` environment variables.
	pub fn figment<'a>(files: impl IntoIterator<Item = &'a str>) -> Figment {
		let mut figment = rocket::Config::figment()
			.merge(Serialized::defaults(DashboardConfig::default()));
		for file in files {
			figment = figment.merge(Toml::file(file));
		}
		figment.merge(Env::prefixed("DASHBOARD_"))
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs.max(1))
	}

	pub fn session_idle(&self) -> Duration {
		Duration::from_secs(self.session_idle_secs)
	}

	pub fn stream_locator(&self) -> StreamLocator {
		StreamLocator::new(&self.stream_base, &self.stream_collection)
	}
}
