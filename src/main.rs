#[macro_use] extern crate rocket;
#[macro_use] extern crate serde_derive;

use std::sync::Arc;

use clap::{Command, Arg, ArgAction};
use log::info;
use rocket::{Request, Response};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;

use crate::api::{Backend, HttpBackend};
use crate::config::DashboardConfig;

mod api;
mod authoring;
mod cameras;
mod common;
mod config;
mod error;
mod filter;
mod gateways;
mod html;
mod maps;
mod modal;
mod people;
mod rest_api;
mod session;
mod status;
#[cfg(test)]
mod testing;
mod transform;
mod video;
mod viewing;



// Pages and map snapshots change every few seconds, so nothing should be served from a cache.
pub struct NoStore;

#[rocket::async_trait]
impl Fairing for NoStore {
	fn info(&self) -> Info {
		Info {
			name: "Disable caching of dashboard responses",
			kind: Kind::Response
		}
	}

	async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
		response.set_header(Header::new("Cache-Control", "no-store"));
	}
}


#[rocket::main]
async fn main() -> anyhow::Result<()> {
	let matches = Command::new("camera-dashboard")
		.version("0.1.0")
		.about("Admin dashboard for cameras, gateways and people tracking.")
		.arg(
			Arg::new("config")
				.action(ArgAction::Append)	// Allow argument to be specified multiple times
				.short('c')
				.long("config")
				.help("TOML file with dashboard config")
		)
		.arg(
			Arg::new("backend")
				.long("backend")
				.help("Base URL of the REST API, e.g. http://localhost:5000/api")
		)
		.get_matches();

	let files = matches.get_many::<String>("config")
		.map(|filenames| filenames.map(|v| v.as_str()).collect::<Vec<_>>())
		.unwrap_or_default();
	let mut figment = DashboardConfig::figment(files);
	if let Some(backend_url) = matches.get_one::<String>("backend") {
		figment = figment.merge(("backend_url", backend_url.as_str()));
	}

	let config: DashboardConfig = figment.extract()?;
	info!("Using backend at {}", config.backend_url);
	let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config)?);

	rocket::custom(figment)
		.attach(rest_api::stage(config, backend))
		.attach(NoStore)
		.launch()
		.await?;

	anyhow::Ok(())
}
