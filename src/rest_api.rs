use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::ContentType;
use rocket::request::FlashMessage;
use rocket::response::content::RawHtml;
use rocket::response::{Flash, Redirect};
use rocket::serde::json::{json, Json, Value};
use rocket::State;

use log::{error, info, warn};

use crate::api::Backend;
use crate::authoring::{DropTarget, MapAuthoring, PlacedIcon};
use crate::cameras::{self, CameraDashboard, CameraForm};
use crate::common::{CameraId, CameraPosition, GatewayId, MapId, MapImage, PersonId, PlacementKey};
use crate::config::DashboardConfig;
use crate::error::ApiError;
use crate::filter::ListFilter;
use crate::gateways::{self, GatewayDashboard, GatewayForm, GatewayRegistration};
use crate::html::{self, CameraModal};
use crate::maps::{self, MapDashboard};
use crate::modal::Modal;
use crate::people::{self, PeopleDashboard, PersonForm};
use crate::session::{SessionId, Sessions};
use crate::status::Status;
use crate::transform::{MeasuredLayout, Point};
use crate::video::{PlaybackSupport, PlayerEvent, PlayerPhase, StreamLocator, Strategy, VideoPlayer};
use crate::viewing::{MapSnapshot, MapView, MapViewer, Selection};



/// Shared, read-only context for every route.
pub struct Dashboard {
	backend: Arc<dyn Backend>,
	config: DashboardConfig,
	streams: StreamLocator,
}

impl Dashboard {
	pub fn new(backend: Arc<dyn Backend>, config: DashboardConfig) -> Self {
		let streams = config.stream_locator();
		Dashboard { backend, config, streams }
	}

	fn backend(&self) -> &dyn Backend {
		self.backend.as_ref()
	}
}

pub type Viewers = RwLock<HashMap<MapId, MapViewer>>;
pub type Authoring = Sessions<MapAuthoring>;
pub type Registrations = Sessions<GatewayRegistration>;

const AUTHORING: &str = "/cadastrar-mapa";
const REGISTRATION: &str = "/cadastrar-gateway";


// Cameras

#[get("/?<adicionar>&<ver>&<editar>&<filter..>")]
async fn camera_dashboard(
	adicionar: bool,
	ver: Option<CameraId>,
	editar: Option<CameraId>,
	filter: ListFilter,
	flash: Option<FlashMessage<'_>>,
	dashboard: &State<Dashboard>,
) -> RawHtml<String> {
	let cameras = CameraDashboard::load(dashboard.backend()).await;
	let mut overlay = Modal::closed();
	if adicionar {
		overlay.open(CameraModal::Add);
	} else if let Some(camera) = editar.and_then(|id| cameras.get(id)) {
		overlay.open(CameraModal::Edit(camera.clone()));
	} else if let Some(id) = ver {
		overlay.open(CameraModal::Watch(VideoPlayer::new(dashboard.streams.playlist_url(id))));
	}
	let status = Status::from_flash(flash);
	html::cameras_page(&cameras, &filter, status.as_ref(), &overlay)
}

#[post("/cameras", data = "<form>")]
async fn add_camera(form: Form<CameraForm>, dashboard: &State<Dashboard>) -> Flash<Redirect> {
	let status = cameras::add_camera(dashboard.backend(), &form).await;
	let to = if status.is_error() { "/?adicionar=true" } else { "/" };
	status.redirect(to.to_string())
}

#[post("/cameras/<id>/editar", data = "<form>")]
async fn edit_camera(id: CameraId, form: Form<CameraForm>, dashboard: &State<Dashboard>) -> Flash<Redirect> {
	let status = cameras::update_camera(dashboard.backend(), id, &form).await;
	let to = if status.is_error() { format!("/?editar={}", id) } else { "/".to_string() };
	status.redirect(to)
}

#[post("/cameras/<id>/remover")]
async fn remove_camera(id: CameraId, dashboard: &State<Dashboard>) -> Flash<Redirect> {
	cameras::delete_camera(dashboard.backend(), id).await.redirect("/".to_string())
}

#[get("/camera/<id>")]
fn camera_view(id: CameraId, dashboard: &State<Dashboard>) -> RawHtml<String> {
	html::camera_page(&VideoPlayer::new(dashboard.streams.playlist_url(id)))
}


// Video

#[derive(Deserialize)]
struct PlaybackRequest {
	src: String,
	support: PlaybackSupport,
}

#[derive(Serialize)]
struct PlaybackPlan {
	strategy: Option<Strategy>,
	start_on: Option<PlayerEvent>,
}

#[post("/video/plano", data = "<request>")]
fn playback_plan(request: Json<PlaybackRequest>) -> Json<PlaybackPlan> {
	let request = request.into_inner();
	let mut player = VideoPlayer::new(request.src);
	let strategy = match player.mount(request.support) {
		PlayerPhase::Loading(strategy) => Some(strategy),
		_ => None,
	};
	Json(PlaybackPlan { strategy, start_on: strategy.map(|strategy| strategy.start_event()) })
}


// Map authoring

#[derive(FromForm)]
struct MapUpload<'r> {
	#[field(name = "nome", default = String::new())]
	name: String,
	map_image: Option<TempFile<'r>>,
}

#[derive(Deserialize)]
struct DropRequest {
	client_x: f64,
	client_y: f64,
	target: DropTarget,
	#[serde(default)]
	layout: Option<MeasuredLayout>,
}

/// `novo` starts a blank map; otherwise the session's work in progress is shown.
#[get("/cadastrar-mapa?<novo>")]
async fn authoring_page(novo: bool, session: SessionId, dashboard: &State<Dashboard>, sessions: &State<Authoring>) -> RawHtml<String> {
	let state = if novo { sessions.reset(&session).await } else { sessions.get(&session).await };
	let mut authoring = state.lock().await;
	authoring.reload_palette(dashboard.backend()).await;
	html::authoring_page(&authoring)
}

#[get("/cadastrar-mapa2")]
fn legacy_authoring_page() -> Redirect {
	Redirect::permanent(AUTHORING)
}

async fn read_upload(file: &TempFile<'_>) -> std::io::Result<MapImage> {
	let bytes = match file.path() {
		Some(path) => tokio::fs::read(path).await?,
		None => return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "upload was not stored on disk")),
	};
	let content_type = file.content_type().cloned().unwrap_or(ContentType::Binary);
	let name = file.name().unwrap_or("map");
	let file_name = match content_type.extension() {
		Some(extension) => format!("{}.{}", name, extension),
		None => name.to_string(),
	};
	Ok(MapImage { file_name, content_type: content_type.to_string(), bytes })
}

#[post("/cadastrar-mapa/imagem", data = "<upload>")]
async fn choose_map_image(upload: Form<MapUpload<'_>>, session: SessionId, sessions: &State<Authoring>) -> Redirect {
	let state = sessions.get(&session).await;
	let mut authoring = state.lock().await;
	authoring.set_name(&upload.name);
	if let Some(file) = upload.map_image.as_ref().filter(|file| file.len() > 0) {
		match read_upload(file).await {
			Ok(image) => authoring.choose_image(image),
			Err(err) => error!("Failed to read uploaded map image; error was {}", err),
		}
	}
	Redirect::to(AUTHORING)
}

#[get("/cadastrar-mapa/imagem")]
async fn map_image_preview(session: SessionId, sessions: &State<Authoring>) -> Option<(ContentType, Vec<u8>)> {
	let state = sessions.get(&session).await;
	let authoring = state.lock().await;
	authoring.image().map(|image| {
		let content_type = ContentType::parse_flexible(&image.content_type).unwrap_or(ContentType::Binary);
		(content_type, image.bytes.clone())
	})
}

#[post("/cadastrar-mapa/arrastar", data = "<key>")]
async fn drag_item(key: Json<PlacementKey>, session: SessionId, sessions: &State<Authoring>) -> Json<bool> {
	let state = sessions.get(&session).await;
	let started = state.lock().await.drag_start(key.into_inner());
	Json(started)
}

#[post("/cadastrar-mapa/soltar", data = "<request>")]
async fn drop_item(request: Json<DropRequest>, session: SessionId, sessions: &State<Authoring>) -> Json<Vec<PlacedIcon>> {
	let state = sessions.get(&session).await;
	let mut authoring = state.lock().await;
	if let Some(layout) = request.layout {
		authoring.update_layout(layout);
	}
	authoring.drop_at(Point::new(request.client_x, request.client_y), request.target);
	Json(authoring.placed_icons())
}

#[post("/cadastrar-mapa/layout", data = "<layout>")]
async fn authoring_layout(layout: Json<MeasuredLayout>, session: SessionId, sessions: &State<Authoring>) -> Json<Vec<PlacedIcon>> {
	let state = sessions.get(&session).await;
	let mut authoring = state.lock().await;
	authoring.update_layout(layout.into_inner());
	Json(authoring.placed_icons())
}

#[post("/cadastrar-mapa/salvar")]
async fn save_map(session: SessionId, dashboard: &State<Dashboard>, sessions: &State<Authoring>) -> Redirect {
	let state = sessions.get(&session).await;
	state.lock().await.submit(dashboard.backend()).await;
	Redirect::to(AUTHORING)
}


// Map dashboard and viewing

#[get("/dashboard-mapas")]
async fn map_dashboard(flash: Option<FlashMessage<'_>>, dashboard: &State<Dashboard>) -> RawHtml<String> {
	let maps = MapDashboard::load(dashboard.backend()).await;
	html::maps_page(&maps, Status::from_flash(flash).as_ref())
}

#[post("/dashboard-mapas/<id>/remover")]
async fn remove_map(id: MapId, dashboard: &State<Dashboard>, viewers: &State<Viewers>) -> Flash<Redirect> {
	let mut maps = MapDashboard::default();
	let status = maps.delete(dashboard.backend(), id).await;
	if !status.is_error() {
		viewers.write().await.remove(&id);
	}
	status.redirect("/dashboard-mapas".to_string())
}

/// Starts polling `id` unless a live viewer already does.
async fn mount_viewer(id: MapId, dashboard: &Dashboard, viewers: &Viewers) -> Result<(), ApiError> {
	if viewers.read().await.get(&id).map_or(false, MapViewer::is_polling) {
		return Ok(());
	}
	let viewer = MapViewer::mount(dashboard.backend.clone(), id, dashboard.config.poll_interval()).await?;
	let mut viewers = viewers.write().await;
	viewers.retain(|_, viewer| viewer.is_polling());
	// Another request may have mounted it meanwhile; keep the first one.
	viewers.entry(id).or_insert(viewer);
	Ok(())
}

#[get("/mapa/<id>?<camera>&<gateway>")]
async fn map_view(
	id: MapId,
	camera: Option<CameraId>,
	gateway: Option<GatewayId>,
	dashboard: &State<Dashboard>,
	viewers: &State<Viewers>,
) -> RawHtml<String> {
	if let Err(err) = mount_viewer(id, dashboard, viewers).await {
		warn!("Not viewing map {}; error was {}", id, err);
		return html::map_page(id, &MapSnapshot::failed(&err).view(None), &Modal::closed(), 0);
	}
	let viewers = viewers.read().await;
	let (view, overlay) = match viewers.get(&id) {
		Some(viewer) => {
			let selection = camera.map(Selection::Camera).or(gateway.map(Selection::Gateway));
			let overlay = match selection {
				Some(selection) => viewer.open(selection, &dashboard.streams).await,
				None => Modal::closed(),
			};
			(viewer.view().await, overlay)
		},
		None => (MapSnapshot::default().view(None), Modal::closed()),
	};
	html::map_page(id, &view, &overlay, dashboard.config.poll_interval().as_secs())
}

/// Only maps opened through `/mapa/<id>` and still polling answer; anything else is a 404.
#[get("/mapa/<id>/estado")]
async fn map_state(id: MapId, viewers: &State<Viewers>) -> Option<Json<MapView>> {
	let viewers = viewers.read().await;
	let viewer = viewers.get(&id).filter(|viewer| viewer.is_polling())?;
	Some(Json(viewer.view().await))
}

#[post("/mapa/<id>/layout", data = "<layout>")]
async fn map_layout(id: MapId, layout: Json<MeasuredLayout>, viewers: &State<Viewers>) -> Option<Json<MapView>> {
	let viewers = viewers.read().await;
	let viewer = viewers.get(&id).filter(|viewer| viewer.is_polling())?;
	viewer.update_layout(layout.into_inner()).await;
	Some(Json(viewer.view().await))
}

#[post("/mapa/<id>/sair")]
async fn leave_map(id: MapId, viewers: &State<Viewers>) -> Value {
	let removed = viewers.write().await.remove(&id).is_some();
	if removed {
		info!("Map {} view closed", id);
	}
	json!({ "status": "ok", "unmounted": removed })
}

#[post("/mapa/<id>/cameras", data = "<cameras>")]
async fn add_cameras_to_map(id: MapId, cameras: Json<Vec<CameraPosition>>, dashboard: &State<Dashboard>) -> Value {
	match maps::add_cameras(dashboard.backend(), id, &cameras).await {
		Status::Success(message) => json!({ "status": "ok", "message": message }),
		Status::Error(reason) => json!({ "status": "error", "reason": reason }),
	}
}


// Gateways

/// `novo` discards any scan or half-filled registration from an earlier visit.
#[get("/cadastrar-gateway?<novo>&<pessoas>&<filter..>")]
async fn gateway_page(
	novo: bool,
	pessoas: Option<GatewayId>,
	filter: ListFilter,
	session: SessionId,
	dashboard: &State<Dashboard>,
	sessions: &State<Registrations>,
) -> RawHtml<String> {
	let state = if novo { sessions.reset(&session).await } else { sessions.get(&session).await };
	let gateways = GatewayDashboard::load(dashboard.backend()).await;
	let mut overlay = Modal::closed();
	if let Some(id) = pessoas {
		match gateways::people_near(dashboard.backend(), id).await {
			Ok(found) => overlay.open(found),
			Err(status) => warn!("{}", status.text()),
		}
	}
	let registration = state.lock().await;
	html::gateways_page(&registration, &gateways, &filter, &overlay)
}

#[post("/cadastrar-gateway/scan")]
async fn scan_gateways(session: SessionId, dashboard: &State<Dashboard>, sessions: &State<Registrations>) -> Redirect {
	let state = sessions.get(&session).await;
	state.lock().await.scan(dashboard.backend()).await;
	Redirect::to(REGISTRATION)
}

#[derive(FromForm)]
struct MacSelection {
	mac: String,
}

#[post("/cadastrar-gateway/selecionar", data = "<selection>")]
async fn select_gateway(selection: Form<MacSelection>, session: SessionId, sessions: &State<Registrations>) -> Redirect {
	let state = sessions.get(&session).await;
	if !state.lock().await.select(&selection.mac) {
		warn!("Ignoring selection of {}, not in the last scan", selection.mac);
	}
	Redirect::to(REGISTRATION)
}

#[post("/cadastrar-gateway", data = "<form>")]
async fn register_gateway(
	form: Form<GatewayForm>,
	session: SessionId,
	dashboard: &State<Dashboard>,
	sessions: &State<Registrations>,
) -> Redirect {
	let state = sessions.get(&session).await;
	let mut registration = state.lock().await;
	registration.fill(&form);
	registration.register(dashboard.backend()).await;
	Redirect::to(REGISTRATION)
}

#[post("/gateways/<id>/remover")]
async fn remove_gateway(id: GatewayId, session: SessionId, dashboard: &State<Dashboard>, sessions: &State<Registrations>) -> Redirect {
	let status = gateways::delete_gateway(dashboard.backend(), id).await;
	sessions.get(&session).await.lock().await.status = Some(status);
	Redirect::to(REGISTRATION)
}


// People

#[get("/cadastrar-pessoa?<editar>&<filter..>")]
async fn people_page(
	editar: Option<PersonId>,
	filter: ListFilter,
	flash: Option<FlashMessage<'_>>,
	dashboard: &State<Dashboard>,
) -> RawHtml<String> {
	let people = PeopleDashboard::load(dashboard.backend()).await;
	let editing = editar.and_then(|id| people.get(id));
	html::people_page(&people, &filter, editing, Status::from_flash(flash).as_ref())
}

#[post("/cadastrar-pessoa", data = "<form>")]
async fn register_person(form: Form<PersonForm>, dashboard: &State<Dashboard>) -> Flash<Redirect> {
	people::register_person(dashboard.backend(), &form).await.redirect("/cadastrar-pessoa".to_string())
}

#[post("/pessoas/<id>", data = "<form>")]
async fn update_person(id: PersonId, form: Form<PersonForm>, dashboard: &State<Dashboard>) -> Flash<Redirect> {
	let status = people::update_person(dashboard.backend(), id, &form).await;
	let to = if status.is_error() { format!("/cadastrar-pessoa?editar={}", id) } else { "/cadastrar-pessoa".to_string() };
	status.redirect(to)
}

#[post("/pessoas/<id>/remover")]
async fn remove_person(id: PersonId, dashboard: &State<Dashboard>) -> Flash<Redirect> {
	people::delete_person(dashboard.backend(), id).await.redirect("/cadastrar-pessoa".to_string())
}


#[catch(404)]
fn not_found() -> Value {
	json!({
		"status": "error",
		"reason": "Resource was not found."
	})
}



pub fn stage(config: DashboardConfig, backend: Arc<dyn Backend>) -> rocket::fairing::AdHoc {
	// Per-session form state, locked across backend calls with tokio locks.
	let authoring: Authoring = Sessions::new(config.session_idle());
	let registration: Registrations = Sessions::new(config.session_idle());
	let viewers: Viewers = RwLock::new(HashMap::new());
	let dashboard = Dashboard::new(backend, config);

	rocket::fairing::AdHoc::on_ignite("Dashboard", move |rocket| async move {
		rocket
			.manage(dashboard)
			.manage(authoring)
			.manage(registration)
			.manage(viewers)
			.register("/", catchers![not_found])
			.mount("/", routes![
				camera_dashboard, add_camera, edit_camera, remove_camera, camera_view,
				playback_plan,
				authoring_page, legacy_authoring_page, choose_map_image, map_image_preview,
				drag_item, drop_item, authoring_layout, save_map,
				map_dashboard, remove_map, map_view, map_state, map_layout, leave_map, add_cameras_to_map,
				gateway_page, scan_gateways, select_gateway, register_gateway, remove_gateway,
				people_page, register_person, update_person, remove_person,
			])
	})
}
