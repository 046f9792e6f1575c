use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::common::*;
use crate::config::DashboardConfig;
use crate::error::ApiError;



pub type ApiResult<T> = Result<T, ApiError>;

/// Everything the dashboard asks of the REST backend.
///
/// One method per backend operation, no retries and no caching. Views hold an
/// `Arc<dyn Backend>` so pages and tests can swap the transport.
#[rocket::async_trait]
pub trait Backend: Send + Sync {
	async fn list_cameras(&self) -> ApiResult<CameraList>;
	async fn create_camera(&self, camera: &NewCamera) -> ApiResult<()>;
	async fn update_camera(&self, id: CameraId, camera: &NewCamera) -> ApiResult<()>;
	async fn delete_camera(&self, id: CameraId) -> ApiResult<()>;
	async fn validate_rtsp(&self, rtsp_url: &str) -> ApiResult<()>;

	async fn list_maps(&self) -> ApiResult<Vec<MapSummary>>;
	async fn create_map(&self, map: &NewMap) -> ApiResult<MapCreated>;
	async fn get_map(&self, id: MapId) -> ApiResult<MapDetail>;
	async fn add_cameras_to_map(&self, id: MapId, cameras: &[CameraPosition]) -> ApiResult<()>;
	async fn delete_map(&self, id: MapId) -> ApiResult<()>;

	async fn list_gateways(&self) -> ApiResult<GatewayList>;
	/// MAC addresses of gateways currently heard by the backend.
	async fn list_active_gateways(&self) -> ApiResult<Vec<String>>;
	async fn register_gateway(&self, gateway: &NewGateway) -> ApiResult<()>;
	async fn delete_gateway(&self, id: GatewayId) -> ApiResult<()>;
	async fn get_gateway(&self, id: GatewayId) -> ApiResult<Gateway>;
	async fn people_near_gateway(&self, id: GatewayId) -> ApiResult<PersonList>;

	async fn list_people(&self) -> ApiResult<PersonList>;
	async fn register_person(&self, person: &NewPerson) -> ApiResult<()>;
	async fn update_person(&self, id: PersonId, person: &NewPerson) -> ApiResult<()>;
	async fn delete_person(&self, id: PersonId) -> ApiResult<()>;
}


pub struct HttpBackend {
	client: reqwest::Client,
	base: Url,
}

impl HttpBackend {
	pub fn new(config: &DashboardConfig) -> ApiResult<Self> {
		let mut base = Url::parse(&config.backend_url)?;
		// Url::join drops the last segment unless the base ends in a slash.
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());
			base.set_path(&path);
		}
		let client = reqwest::Client::builder()
			.timeout(config.request_timeout())
			.build()?;
		Ok(HttpBackend { client, base })
	}

	fn endpoint(&self, path: &str) -> ApiResult<Url> {
		Ok(self.base.join(path.trim_start_matches('/'))?)
	}

	async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
		let response = request.send().await?;
		check_status(response).await
	}

	async fn fetch<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
		let url = self.endpoint(path)?;
		debug!("GET {}", url);
		let response = self.send(self.client.get(url)).await?;
		Ok(response.json::<T>().await?)
	}

	async fn post_json<B: serde::Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> ApiResult<()> {
		let url = self.endpoint(path)?;
		debug!("POST {}", url);
		self.send(self.client.post(url).json(body)).await?;
		Ok(())
	}

	async fn put_json<B: serde::Serialize + ?Sized + Sync>(&self, path: &str, body: &B) -> ApiResult<()> {
		let url = self.endpoint(path)?;
		debug!("PUT {}", url);
		self.send(self.client.put(url).json(body)).await?;
		Ok(())
	}

	async fn delete(&self, path: &str) -> ApiResult<()> {
		let url = self.endpoint(path)?;
		debug!("DELETE {}", url);
		self.send(self.client.delete(url)).await?;
		Ok(())
	}
}

async fn check_status(response: Response) -> ApiResult<Response> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}

	let body = response.text().await.unwrap_or_default();
	let message = serde_json::from_str::<BackendMessage>(&body)
		.ok()
		.and_then(|message| message.error.or(message.message));
	warn!("Backend answered {} with {:?}", status, message);

	if status == StatusCode::NOT_FOUND {
		Err(ApiError::NotFound { message })
	} else {
		Err(ApiError::Rejected { status: status.as_u16(), message })
	}
}

/// Multipart body for map creation: `name`, `map_image`, JSON `positions`.
fn map_form(map: &NewMap) -> ApiResult<Form> {
	let image = Part::bytes(map.image.bytes.clone())
		.file_name(map.image.file_name.clone())
		.mime_str(&map.image.content_type)?;
	Ok(Form::new()
		.text("name", map.name.clone())
		.part("map_image", image)
		.text("positions", map.positions_json()?))
}

#[rocket::async_trait]
impl Backend for HttpBackend {
	async fn list_cameras(&self) -> ApiResult<CameraList> {
		self.fetch("cameras").await
	}

	async fn create_camera(&self, camera: &NewCamera) -> ApiResult<()> {
		self.post_json("cameras", camera).await
	}

	async fn update_camera(&self, id: CameraId, camera: &NewCamera) -> ApiResult<()> {
		self.put_json(&format!("cameras/{}", id), camera).await
	}

	async fn delete_camera(&self, id: CameraId) -> ApiResult<()> {
		self.delete(&format!("cameras/{}", id)).await
	}

	async fn validate_rtsp(&self, rtsp_url: &str) -> ApiResult<()> {
		self.post_json("cameras/validate", &RtspCheck { rtsp_url: rtsp_url.to_string() }).await
	}

	async fn list_maps(&self) -> ApiResult<Vec<MapSummary>> {
		self.fetch("maps").await
	}

	async fn create_map(&self, map: &NewMap) -> ApiResult<MapCreated> {
		let url = self.endpoint("maps")?;
		debug!("POST {} (multipart, {} positions)", url, map.positions.len());
		let response = self.send(self.client.post(url).multipart(map_form(map)?)).await?;
		match response.json::<MapCreated>().await {
			Ok(created) => Ok(created),
			Err(err) => {
				warn!("Map created but the reply could not be decoded; error was {}", err);
				Ok(MapCreated::default())
			},
		}
	}

	async fn get_map(&self, id: MapId) -> ApiResult<MapDetail> {
		self.fetch(&format!("maps/{}", id)).await
	}

	async fn add_cameras_to_map(&self, id: MapId, cameras: &[CameraPosition]) -> ApiResult<()> {
		let body = CameraPositions { cameras: cameras.to_vec() };
		self.post_json(&format!("maps/{}/cameras", id), &body).await
	}

	async fn delete_map(&self, id: MapId) -> ApiResult<()> {
		self.delete(&format!("maps/{}", id)).await
	}

	async fn list_gateways(&self) -> ApiResult<GatewayList> {
		self.fetch("gateways").await
	}

	async fn list_active_gateways(&self) -> ApiResult<Vec<String>> {
		self.fetch("gateways/active").await
	}

	async fn register_gateway(&self, gateway: &NewGateway) -> ApiResult<()> {
		self.post_json("gateways", gateway).await
	}

	async fn delete_gateway(&self, id: GatewayId) -> ApiResult<()> {
		self.delete(&format!("gateways/{}", id)).await
	}

	async fn get_gateway(&self, id: GatewayId) -> ApiResult<Gateway> {
		self.fetch(&format!("gateways/{}", id)).await
	}

	async fn people_near_gateway(&self, id: GatewayId) -> ApiResult<PersonList> {
		self.fetch(&format!("gateways/{}/people", id)).await
	}

	async fn list_people(&self) -> ApiResult<PersonList> {
		self.fetch("people").await
	}

	async fn register_person(&self, person: &NewPerson) -> ApiResult<()> {
		self.post_json("people", person).await
	}

	async fn update_person(&self, id: PersonId, person: &NewPerson) -> ApiResult<()> {
		self.put_json(&format!("people/{}", id), person).await
	}

	async fn delete_person(&self, id: PersonId) -> ApiResult<()> {
		self.delete(&format!("people/{}", id)).await
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	fn backend(url: &str) -> HttpBackend {
		let config = DashboardConfig { backend_url: url.to_string(), ..DashboardConfig::default() };
		HttpBackend::new(&config).unwrap()
	}

	#[test]
	fn paths_join_under_api_prefix() {
		let local = backend("http://localhost:5000/api");
		assert_eq!(local.endpoint("cameras").unwrap().as_str(), "http://localhost:5000/api/cameras");
		assert_eq!(local.endpoint("/maps/4/cameras").unwrap().as_str(), "http://localhost:5000/api/maps/4/cameras");

		let remote = backend("http://10.0.0.2/api/");
		assert_eq!(remote.endpoint("gateways/active").unwrap().as_str(), "http://10.0.0.2/api/gateways/active");
	}

	#[test]
	fn relative_backend_url_is_rejected() {
		let config = DashboardConfig { backend_url: "/api".to_string(), ..DashboardConfig::default() };
		assert!(matches!(HttpBackend::new(&config), Err(ApiError::Request(_))));
	}

	fn floor_map() -> NewMap {
		NewMap {
			name: "Floor1".to_string(),
			image: MapImage {
				file_name: "floor1.png".to_string(),
				content_type: "image/png".to_string(),
				bytes: vec![0x89, 0x50, 0x4e, 0x47],
			},
			positions: vec![Position { id: 1, kind: ItemKind::Camera, pos_x: 200.0, pos_y: 200.0 }],
		}
	}

	#[test]
	fn map_form_carries_positions_json() {
		let map = floor_map();
		assert!(map_form(&map).is_ok());
		assert_eq!(map.positions_json().unwrap(), r#"[{"id":1,"type":"camera","pos_x":200,"pos_y":200}]"#);
	}

	#[tokio::test]
	async fn unreachable_backend_is_a_transport_error() {
		let backend = backend("http://127.0.0.1:9/api");
		match backend.list_cameras().await {
			Err(ApiError::Transport(_)) | Err(ApiError::Timeout) => {},
			other => panic!("unexpected result {:?}", other.map(|cameras| cameras.len())),
		}
	}

	#[tokio::test]
	async fn created_map_with_unreadable_reply_still_succeeds() {
		use tokio::io::{AsyncReadExt, AsyncWriteExt};

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			let (mut socket, _) = listener.accept().await.unwrap();
			let mut request = Vec::new();
			let mut chunk = [0u8; 1024];
			// The multipart body ends with the closing boundary `--\r\n`.
			while !request.ends_with(b"--\r\n") {
				let read = socket.read(&mut chunk).await.unwrap();
				if read == 0 {
					break;
				}
				request.extend_from_slice(&chunk[..read]);
			}
			socket.write_all(b"HTTP/1.1 201 Created\r\nContent-Type: text/html\r\nContent-Length: 9\r\nConnection: close\r\n\r\n<p>ok</p>").await.unwrap();
		});

		let local = backend(&format!("http://{}/api", addr));
		assert_eq!(local.create_map(&floor_map()).await.unwrap(), MapCreated::default());
	}
}
