use std::fmt;



pub type CameraId = u64;
pub type GatewayId = u64;
pub type PersonId = u64;
pub type MapId = u64;
pub type CameraList = Vec<Camera>;
pub type GatewayList = Vec<Gateway>;
pub type PersonList = Vec<Person>;

#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Camera {
	pub id: CameraId,
	pub name: String,
	pub rtsp_url: String,
	/// Free-text group label.
	#[serde(rename = "agrupamento", default)]
	pub group: Option<String>,
}

#[derive(Clone)]
#[derive(Debug, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct NewCamera {
	pub name: String,
	pub rtsp_url: String,
	#[serde(rename = "agrupamento")]
	pub group: String,
}

#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize, Deserialize)]
pub struct RtspCheck {
	pub rtsp_url: String,
}

#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Gateway {
	pub id: GatewayId,
	pub mac: String,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub sector: Option<String>,
}

impl Gateway {
	/// Human name when one was registered, the MAC otherwise.
	pub fn label(&self) -> &str {
		match self.name.as_deref() {
			Some(name) if !name.is_empty() => name,
			_ => &self.mac,
		}
	}
}

#[derive(Clone)]
#[derive(Debug, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct NewGateway {
	pub name: String,
	pub mac: String,
	pub sector: String,
}

#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Person {
	pub id: PersonId,
	pub name: String,
	#[serde(default)]
	pub sector: Option<String>,
	#[serde(default)]
	pub ibeacon_mac: Option<String>,
}

#[derive(Clone)]
#[derive(Debug, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct NewPerson {
	pub name: String,
	pub sector: String,
	pub ibeacon_mac: String,
}

#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct MapSummary {
	pub id: MapId,
	pub name: String,
	pub image_url: String,
}

/// Full map as returned by the detail endpoint. Positions are in natural image pixels.
#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct MapDetail {
	pub map_id: MapId,
	pub name: String,
	pub image_url: String,
	pub cameras: Vec<CameraPlacement>,
	// Camera-only backends omit this.
	#[serde(default)]
	pub gateways: Vec<GatewayPlacement>,
}

impl MapDetail {
	pub fn gateway(&self, id: GatewayId) -> Option<&GatewayPlacement> {
		self.gateways.iter().find(|gateway| gateway.gateway_id == id)
	}

	pub fn camera(&self, id: CameraId) -> Option<&CameraPlacement> {
		self.cameras.iter().find(|camera| camera.camera_id == id)
	}
}

#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct CameraPlacement {
	pub camera_id: CameraId,
	pub name: String,
	#[serde(default)]
	pub rtsp_url: Option<String>,
	#[serde(rename = "agrupamento", default)]
	pub group: Option<String>,
	pub pos_x: f64,
	pub pos_y: f64,
}

#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct GatewayPlacement {
	pub gateway_id: GatewayId,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub mac: Option<String>,
	#[serde(default)]
	pub sector: Option<String>,
	pub pos_x: f64,
	pub pos_y: f64,
	#[serde(default)]
	pub people: PersonList,
}

impl GatewayPlacement {
	pub fn label(&self) -> String {
		self.name.clone()
			.filter(|name| !name.is_empty())
			.or_else(|| self.mac.clone())
			.unwrap_or_else(|| format!("Gateway {}", self.gateway_id))
	}
}

#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
	Camera,
	Gateway,
}

impl fmt::Display for ItemKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ItemKind::Camera => write!(f, "camera"),
			ItemKind::Gateway => write!(f, "gateway"),
		}
	}
}

/// Identifies one placeable entity on a map: the entity id plus its type tag.
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
pub struct PlacementKey {
	pub id: u64,
	#[serde(rename = "type")]
	pub kind: ItemKind,
}

impl PlacementKey {
	pub fn camera(id: CameraId) -> Self {
		PlacementKey { id, kind: ItemKind::Camera }
	}

	pub fn gateway(id: GatewayId) -> Self {
		PlacementKey { id, kind: ItemKind::Gateway }
	}
}

impl fmt::Display for PlacementKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}", self.kind, self.id)
	}
}

/// Something that can be dragged onto a map.
#[derive(Clone)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum MapItem {
	Camera(Camera),
	Gateway(Gateway),
}

impl MapItem {
	pub fn key(&self) -> PlacementKey {
		match self {
			MapItem::Camera(camera) => PlacementKey::camera(camera.id),
			MapItem::Gateway(gateway) => PlacementKey::gateway(gateway.id),
		}
	}

	pub fn label(&self) -> &str {
		match self {
			MapItem::Camera(camera) => &camera.name,
			MapItem::Gateway(gateway) => gateway.label(),
		}
	}
}

/// Whole pixels go out as integers (`200`), anything else as a float.
fn pixel<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
	if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
		serializer.serialize_i64(*value as i64)
	} else {
		serializer.serialize_f64(*value)
	}
}

/// A placement in natural image coordinates, as sent in the map creation form.
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct Position {
	pub id: u64,
	#[serde(rename = "type")]
	pub kind: ItemKind,
	#[serde(serialize_with = "pixel")]
	pub pos_x: f64,
	#[serde(serialize_with = "pixel")]
	pub pos_y: f64,
}

impl Position {
	pub fn key(&self) -> PlacementKey {
		PlacementKey { id: self.id, kind: self.kind }
	}
}

/// Legacy camera-only placement used by the add-cameras-to-map endpoint.
#[derive(Clone, Copy)]
#[derive(Debug, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct CameraPosition {
	pub camera_id: CameraId,
	#[serde(serialize_with = "pixel")]
	pub pos_x: f64,
	#[serde(serialize_with = "pixel")]
	pub pos_y: f64,
}

#[derive(Clone)]
#[derive(Debug)]
#[derive(Serialize, Deserialize)]
pub struct CameraPositions {
	pub cameras: Vec<CameraPosition>,
}

#[derive(Clone)]
#[derive(Debug, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct MapCreated {
	#[serde(default)]
	pub map_id: Option<MapId>,
	#[serde(default)]
	pub message: Option<String>,
}

/// Body the backend attaches to most responses, successful or not.
#[derive(Clone)]
#[derive(Debug, Default)]
#[derive(Serialize, Deserialize)]
pub struct BackendMessage {
	#[serde(default)]
	pub message: Option<String>,
	#[serde(default)]
	pub error: Option<String>,
}

#[derive(Clone)]
#[derive(Debug, PartialEq)]
pub struct MapImage {
	pub file_name: String,
	pub content_type: String,
	pub bytes: Vec<u8>,
}

#[derive(Clone)]
#[derive(Debug, PartialEq)]
pub struct NewMap {
	pub name: String,
	pub image: MapImage,
	pub positions: Vec<Position>,
}

impl NewMap {
	/// Value of the `positions` multipart field.
	pub fn positions_json(&self) -> serde_json::Result<String> {
		serde_json::to_string(&self.positions)
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn camera_group_maps_to_agrupamento() {
		let camera: Camera = serde_json::from_value(json!({
			"id": 3,
			"name": "Lobby",
			"rtsp_url": "rtsp://10.0.0.3/stream",
			"agrupamento": "A"
		})).unwrap();
		assert_eq!(camera.group.as_deref(), Some("A"));

		let camera: Camera = serde_json::from_value(json!({
			"id": 4,
			"name": "Dock",
			"rtsp_url": "rtsp://10.0.0.4/stream",
			"agrupamento": null
		})).unwrap();
		assert_eq!(camera.group, None);
	}

	#[test]
	fn map_detail_without_gateways() {
		let detail: MapDetail = serde_json::from_value(json!({
			"map_id": 1,
			"name": "Floor1",
			"image_url": "static/maps/floor1.png",
			"cameras": [
				{"camera_id": 2, "name": "Lobby", "rtsp_url": "rtsp://x", "agrupamento": "A", "pos_x": 10.5, "pos_y": 20.0}
			]
		})).unwrap();
		assert!(detail.gateways.is_empty());
		assert_eq!(detail.camera(2).map(|c| c.pos_x), Some(10.5));
	}

	#[test]
	fn map_item_is_tagged() {
		let item = MapItem::Gateway(Gateway {
			id: 7,
			mac: "AA:BB:CC:DD:EE:FF".to_string(),
			name: None,
			sector: Some("Dock".to_string()),
		});
		let value = serde_json::to_value(&item).unwrap();
		assert_eq!(value["type"], "gateway");
		assert_eq!(value["data"]["mac"], "AA:BB:CC:DD:EE:FF");
		assert_eq!(item.label(), "AA:BB:CC:DD:EE:FF");
		assert_eq!(item.key().to_string(), "gateway-7");
	}

	#[test]
	fn legacy_camera_position_shape() {
		let body = CameraPositions {
			cameras: vec![CameraPosition { camera_id: 1, pos_x: 5.0, pos_y: 6.0 }],
		};
		assert_eq!(
			serde_json::to_value(&body).unwrap(),
			json!({"cameras": [{"camera_id": 1, "pos_x": 5, "pos_y": 6}]})
		);
	}

	#[test]
	fn whole_pixels_serialize_as_integers() {
		let position = Position { id: 1, kind: ItemKind::Camera, pos_x: 200.0, pos_y: 50.5 };
		assert_eq!(serde_json::to_string(&position).unwrap(), r#"{"id":1,"type":"camera","pos_x":200,"pos_y":50.5}"#);

		let back: Position = serde_json::from_str(r#"{"id":1,"type":"camera","pos_x":200,"pos_y":50.5}"#).unwrap();
		assert_eq!(back, position);
	}
}
