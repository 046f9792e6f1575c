//! Server-side rendering of the dashboard pages.
//!
//! Pages are plain strings. Browser scripts only report events (drag, drop,
//! layout changes, playback support) back to the server and redraw what it returns.

use std::fmt::Write;

use rocket::response::content::RawHtml;

use crate::authoring::MapAuthoring;
use crate::cameras::CameraDashboard;
use crate::common::{Camera, ItemKind, MapId, Person};
use crate::filter::ListFilter;
use crate::gateways::{GatewayDashboard, GatewayPeople, GatewayRegistration};
use crate::maps::MapDashboard;
use crate::modal::Modal;
use crate::people::{PeopleDashboard, PersonForm};
use crate::status::Status;
use crate::video::{VideoPlayer, HLS_MIME};
use crate::viewing::{MapIcon, MapModal, MapView, NO_PEOPLE};



const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0; }
nav { background: #222; padding: 8px 16px; }
nav a { color: #eee; margin-right: 16px; text-decoration: none; }
main { padding: 20px; }
table { border-collapse: collapse; }
td, th { border: 1px solid #ccc; padding: 4px 8px; }
.status-success { color: green; }
.status-error { color: red; }
.modal-backdrop { position: fixed; inset: 0; background: rgba(0,0,0,.5); display: flex; align-items: center; justify-content: center; }
.modal-body { background: #fff; padding: 20px; min-width: 480px; max-width: 90vw; position: relative; }
.modal-close { position: absolute; top: 8px; right: 12px; text-decoration: none; font-size: 20px; }
.map-content { display: flex; gap: 20px; }
.item-list { min-width: 200px; }
.item-list-item { cursor: grab; padding: 4px; border: 1px solid #ddd; margin-bottom: 4px; }
.map-area { flex: 1; min-height: 400px; border: 2px dashed #aaa; }
.map-preview { position: relative; display: inline-block; }
.map-image { max-width: 100%; display: block; }
.map-icon { position: absolute; transform: translate(-50%, -50%); cursor: pointer; text-decoration: none; }
.people-count { background: red; color: #fff; border-radius: 8px; padding: 0 5px; font-size: 12px; }
"#;

const AUTHORING_SCRIPT: &str = r#"
(() => {
  const area = document.getElementById('map-area');
  const img = document.getElementById('map-image');
  const overlay = document.getElementById('map-icons');
  let pending = Promise.resolve();
  const post = (url, body) => fetch(url, { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify(body) }).then(r => r.json());
  const measure = () => {
    if (!img) return null;
    const r = img.getBoundingClientRect();
    return { rendered: { left: r.left, top: r.top, width: r.width, height: r.height },
             natural: img.naturalWidth > 0 ? { width: img.naturalWidth, height: img.naturalHeight } : null };
  };
  const draw = icons => {
    if (!overlay) return;
    overlay.innerHTML = '';
    for (const icon of icons) {
      const el = document.createElement('span');
      el.className = 'map-icon';
      el.style.left = icon.left + 'px';
      el.style.top = icon.top + 'px';
      el.textContent = (icon.key.type === 'camera' ? '📷 ' : '📡 ') + icon.label;
      overlay.appendChild(el);
    }
  };
  const relayout = () => { const layout = measure(); if (layout) post('/cadastrar-mapa/layout', layout).then(draw); };
  document.querySelectorAll('[data-item]').forEach(el => el.addEventListener('dragstart', () => {
    pending = post('/cadastrar-mapa/arrastar', JSON.parse(el.dataset.item));
  }));
  document.addEventListener('dragover', e => e.preventDefault());
  document.addEventListener('drop', async e => {
    e.preventDefault();
    await pending;
    const target = area && area.contains(e.target) ? 'map_area' : 'elsewhere';
    draw(await post('/cadastrar-mapa/soltar', { client_x: e.clientX, client_y: e.clientY, target, layout: measure() }));
  });
  if (img) { if (img.complete) relayout(); img.addEventListener('load', relayout); }
  window.addEventListener('resize', relayout);
})();
"#;

const VIEWER_SCRIPT: &str = r#"
(() => {
  const root = document.getElementById('map-view');
  const img = document.getElementById('map-image');
  const overlay = document.getElementById('map-icons');
  const base = root.dataset.base;
  const poll = Number(root.dataset.poll) * 1000;
  const measure = () => {
    const r = img.getBoundingClientRect();
    return { rendered: { left: r.left, top: r.top, width: r.width, height: r.height },
             natural: img.naturalWidth > 0 ? { width: img.naturalWidth, height: img.naturalHeight } : null };
  };
  const draw = view => {
    overlay.innerHTML = '';
    for (const icon of view.icons) {
      const a = document.createElement('a');
      a.className = 'map-icon';
      a.style.left = icon.left + 'px';
      a.style.top = icon.top + 'px';
      a.href = '?' + icon.key.type + '=' + icon.key.id;
      a.title = icon.label;
      a.textContent = icon.key.type === 'camera' ? '📷' : '📡';
      if (icon.people > 0) {
        const badge = document.createElement('span');
        badge.className = 'people-count';
        badge.textContent = icon.people;
        a.appendChild(badge);
      }
      overlay.appendChild(a);
    }
  };
  let timer = null;
  // 404 means the server stopped polling this map; reloading mounts it again.
  const apply = r => {
    if (r.status === 404) { clearInterval(timer); location.reload(); return; }
    return r.json().then(draw);
  };
  const relayout = () => fetch(base + '/layout', { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify(measure()) }).then(apply);
  if (img.complete) relayout();
  img.addEventListener('load', relayout);
  window.addEventListener('resize', relayout);
  timer = setInterval(() => fetch(base + '/estado').then(apply), poll);
  window.addEventListener('pagehide', () => { clearInterval(timer); navigator.sendBeacon(base + '/sair'); });
})();
"#;

const PLAYER_SCRIPT: &str = r#"
document.querySelectorAll('video[data-src]').forEach(async video => {
  const src = video.dataset.src;
  const support = { segment_loader: !!(window.Hls && Hls.isSupported()), native_hls: video.canPlayType(video.dataset.mime) !== '' };
  const plan = await fetch('/video/plano', { method: 'POST', headers: { 'Content-Type': 'application/json' }, body: JSON.stringify({ src, support }) }).then(r => r.json());
  if (plan.strategy === 'segment_loader') {
    const hls = new Hls();
    hls.loadSource(src);
    hls.attachMedia(video);
    hls.on(Hls.Events.MANIFEST_PARSED, () => video.play());
  } else if (plan.strategy === 'native') {
    video.src = src;
    video.addEventListener(plan.start_on.replace('_', ''), () => video.play(), { once: true });
  } else {
    video.insertAdjacentText('afterend', 'Live video is not supported by this browser.');
  }
});
"#;

pub fn escape(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			'"' => escaped.push_str("&quot;"),
			'\'' => escaped.push_str("&#39;"),
			_ => escaped.push(c),
		}
	}
	escaped
}

fn page(title: &str, body: &str) -> RawHtml<String> {
	RawHtml(format!(
		r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title><style>{style}</style></head>
<body>
<nav>
<a href="/">Cameras</a>
<a href="/dashboard-mapas">Maps</a>
<a href="/cadastrar-mapa?novo=true">New map</a>
<a href="/cadastrar-gateway?novo=true">Gateways</a>
<a href="/cadastrar-pessoa">People</a>
</nav>
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
		title = escape(title),
		style = STYLE,
		body = body,
	))
}

fn status_line(status: Option<&Status>) -> String {
	match status {
		Some(Status::Success(text)) => format!(r#"<p class="status-success">{}</p>"#, escape(text)),
		Some(Status::Error(text)) => format!(r#"<p class="status-error">{}</p>"#, escape(text)),
		None => String::new(),
	}
}

/// Overlay wrapper; closing is a link back to `close_href`.
fn modal<T>(modal: &Modal<T>, close_href: &str, render: impl Fn(&T) -> String) -> String {
	match modal.content() {
		Some(content) => format!(
			r#"<div class="modal-backdrop"><div class="modal-body"><a class="modal-close" href="{}">&times;</a>{}</div></div>"#,
			escape(close_href),
			render(content),
		),
		None => String::new(),
	}
}

fn filter_form(action: &str, filter: &ListFilter, groups: &[String], group_label: &str) -> String {
	let mut options = format!(r#"<option value="">All {}</option>"#, escape(group_label));
	for group in groups {
		let selected = if *group == filter.group { " selected" } else { "" };
		let _ = write!(options, r#"<option value="{0}"{1}>{0}</option>"#, escape(group), selected);
	}
	format!(
		r#"<form method="get" action="{}">
<input type="text" name="nome" placeholder="Search by name" value="{}">
<select name="grupo">{}</select>
<button type="submit">Filter</button>
</form>"#,
		escape(action),
		escape(&filter.name),
		options,
	)
}

pub fn video(player: &VideoPlayer) -> String {
	format!(
		r#"<video controls autoplay muted style="width:100%" data-src="{}" data-mime="{}"></video>
<script src="https://cdn.jsdelivr.net/npm/hls.js@1"></script>
<script>{}</script>"#,
		escape(player.src()),
		HLS_MIME,
		PLAYER_SCRIPT,
	)
}

pub enum CameraModal {
	Add,
	Edit(Camera),
	Watch(VideoPlayer),
}

fn camera_form(action: &str, camera: Option<&Camera>, submit: &str) -> String {
	let (name, rtsp_url, group) = match camera {
		Some(camera) => (camera.name.as_str(), camera.rtsp_url.as_str(), camera.group.as_deref().unwrap_or("")),
		None => ("", "", ""),
	};
	format!(
		r#"<form method="post" action="{}">
<input type="text" name="nome" placeholder="Camera name" value="{}" required>
<input type="text" name="rtsp_url" placeholder="RTSP URL" value="{}" required>
<input type="text" name="agrupamento" placeholder="Group" value="{}">
<button type="submit">{}</button>
</form>"#,
		escape(action),
		escape(name),
		escape(rtsp_url),
		escape(group),
		escape(submit),
	)
}

pub fn cameras_page(dashboard: &CameraDashboard, filter: &ListFilter, status: Option<&Status>, overlay: &Modal<CameraModal>) -> RawHtml<String> {
	let mut body = String::new();
	body.push_str(r#"<p><a href="/?adicionar=true">Add camera</a></p>"#);
	body.push_str(&status_line(status));
	body.push_str(&filter_form("/", filter, &dashboard.groups(), "groups"));

	if let Some(error) = &dashboard.load_error {
		body.push_str(&status_line(Some(&Status::error(error.as_str()))));
	}

	body.push_str("<table><thead><tr><th>Name</th><th>Group</th><th>RTSP URL</th><th>Actions</th></tr></thead><tbody>");
	for camera in dashboard.visible(filter) {
		let _ = write!(
			body,
			r#"<tr><td>{name}</td><td>{group}</td><td>{url}</td><td>
<a href="/?ver={id}">View</a>
<a href="/camera/{id}">Open</a>
<a href="/?editar={id}">Edit</a>
<form method="post" action="/cameras/{id}/remover" style="display:inline"><button type="submit">Remove</button></form>
</td></tr>"#,
			id = camera.id,
			name = escape(&camera.name),
			group = escape(camera.group.as_deref().unwrap_or("")),
			url = escape(&camera.rtsp_url),
		);
	}
	body.push_str("</tbody></table>");

	body.push_str(&modal(overlay, "/", |content| match content {
		CameraModal::Add => format!("<h2>Add new camera</h2>{}", camera_form("/cameras", None, "Add camera")),
		CameraModal::Edit(camera) => format!(
			"<h2>Edit camera</h2>{}",
			camera_form(&format!("/cameras/{}/editar", camera.id), Some(camera), "Save"),
		),
		CameraModal::Watch(player) => video(player),
	}));

	page("Camera dashboard", &body)
}

pub fn camera_page(player: &VideoPlayer) -> RawHtml<String> {
	page("Camera", &video(player))
}

pub fn authoring_page(authoring: &MapAuthoring) -> RawHtml<String> {
	let mut body = String::new();
	let _ = write!(
		body,
		r#"<form method="post" action="/cadastrar-mapa/imagem" enctype="multipart/form-data">
<input type="text" name="nome" placeholder="Map name" value="{}">
<input type="file" name="map_image" accept="image/*">
<button type="submit">Use image</button>
</form>"#,
		escape(authoring.name()),
	);
	let _ = write!(body, r#"<p class="hint">{}</p>"#, authoring.state().hint());
	body.push_str(&status_line(authoring.status()));

	body.push_str(r#"<div class="map-content"><div class="item-list">"#);
	for (kind, heading) in [(ItemKind::Camera, "Available cameras"), (ItemKind::Gateway, "Available gateways")] {
		let _ = write!(body, "<h3>{}</h3>", heading);
		for item in authoring.unplaced().into_iter().filter(|item| item.key().kind == kind) {
			let key = item.key();
			let _ = write!(
				body,
				r#"<div class="item-list-item" draggable="true" data-item='{{"id":{},"type":"{}"}}'>{}</div>"#,
				key.id,
				key.kind,
				escape(item.label()),
			);
		}
	}
	body.push_str(r#"</div><div class="map-area" id="map-area">"#);
	if authoring.image().is_some() {
		body.push_str(r#"<div class="map-preview"><img id="map-image" class="map-image" src="/cadastrar-mapa/imagem" alt="Map"><div id="map-icons">"#);
		for icon in authoring.placed_icons() {
			let _ = write!(
				body,
				r#"<span class="map-icon" style="left:{}px;top:{}px">{}</span>"#,
				icon.left,
				icon.top,
				escape(&icon.label),
			);
		}
		body.push_str("</div></div>");
	}
	body.push_str("</div></div>");
	body.push_str(r#"<form method="post" action="/cadastrar-mapa/salvar"><button type="submit">Save map</button></form>"#);
	let _ = write!(body, "<script>{}</script>", AUTHORING_SCRIPT);

	page("New map", &body)
}

pub fn maps_page(dashboard: &MapDashboard, status: Option<&Status>) -> RawHtml<String> {
	let mut body = status_line(status);
	if let Some(error) = &dashboard.load_error {
		body.push_str(&format!("<p>{}</p>", escape(error)));
		return page("Map dashboard", &body);
	}
	if dashboard.maps.is_empty() {
		body.push_str("<p>No maps available.</p>");
	}
	for map in &dashboard.maps {
		let _ = write!(
			body,
			r#"<div class="map-item"><h3>{name}</h3>
<a href="/mapa/{id}">View</a>
<form method="post" action="/dashboard-mapas/{id}/remover" style="display:inline"><button type="submit">Remove</button></form>
</div>"#,
			id = map.id,
			name = escape(&map.name),
		);
	}
	page("Map dashboard", &body)
}

fn map_icon(icon: &MapIcon) -> String {
	let glyph = match icon.key.kind {
		ItemKind::Camera => "📷",
		ItemKind::Gateway => "📡",
	};
	let badge = if icon.people > 0 {
		format!(r#"<span class="people-count">{}</span>"#, icon.people)
	} else {
		String::new()
	};
	format!(
		r#"<a class="map-icon" style="left:{}px;top:{}px" href="?{}={}" title="{}">{}{}</a>"#,
		icon.left,
		icon.top,
		icon.key.kind,
		icon.key.id,
		escape(&icon.label),
		glyph,
		badge,
	)
}

fn people_list(gateway: &str, people: &[Person]) -> String {
	let mut html = format!("<h2>Gateway: {}</h2><h3>Nearby people:</h3>", escape(gateway));
	if people.is_empty() {
		let _ = write!(html, "<p>{}</p>", NO_PEOPLE);
		return html;
	}
	html.push_str("<ul>");
	for person in people {
		let _ = write!(
			html,
			"<li>{} - Sector: {}</li>",
			escape(&person.name),
			escape(person.sector.as_deref().unwrap_or("")),
		);
	}
	html.push_str("</ul>");
	html
}

pub fn map_page(map_id: MapId, view: &MapView, overlay: &Modal<MapModal>, poll_secs: u64) -> RawHtml<String> {
	let image_url = match &view.image_url {
		Some(image_url) => image_url,
		None => {
			let body = match &view.error {
				Some(error) => format!(r#"<p class="status-error">{}</p>"#, escape(error)),
				None => "<p>Loading...</p>".to_string(),
			};
			return page("Map", &body);
		},
	};

	let mut body = String::new();
	if let Some(error) = &view.error {
		body.push_str(&status_line(Some(&Status::error(error.as_str()))));
	}
	let _ = write!(
		body,
		r#"<div id="map-view" class="map-preview" data-base="/mapa/{}" data-poll="{}"><img id="map-image" class="map-image" src="/{}" alt="Map"><div id="map-icons">"#,
		map_id,
		poll_secs,
		escape(image_url.trim_start_matches('/')),
	);
	for icon in &view.icons {
		body.push_str(&map_icon(icon));
	}
	body.push_str("</div></div>");
	body.push_str(&modal(overlay, &format!("/mapa/{}", map_id), |content| match content {
		MapModal::Camera { name, player, .. } => format!("<h2>{}</h2>{}", escape(name), video(player)),
		MapModal::People { gateway, people, .. } => people_list(gateway, people),
	}));
	let _ = write!(body, "<script>{}</script>", VIEWER_SCRIPT);

	page(view.name.as_deref().unwrap_or("Map"), &body)
}

pub fn gateways_page(
	registration: &GatewayRegistration,
	dashboard: &GatewayDashboard,
	filter: &ListFilter,
	overlay: &Modal<GatewayPeople>,
) -> RawHtml<String> {
	let mut body = String::new();
	body.push_str(r#"<form method="post" action="/cadastrar-gateway/scan"><button type="submit">List active gateways</button></form>"#);

	if !registration.active.is_empty() {
		body.push_str("<h2>Active gateways</h2><ul>");
		for mac in &registration.active {
			let checked = if registration.selected.as_deref() == Some(mac.as_str()) { " checked" } else { "" };
			let _ = write!(
				body,
				r#"<li><form method="post" action="/cadastrar-gateway/selecionar" style="display:inline"><label><input type="radio" name="mac" value="{0}"{1} onchange="this.form.submit()"> {0}</label></form></li>"#,
				escape(mac),
				checked,
			);
		}
		body.push_str("</ul>");
	}

	if let Some(mac) = &registration.selected {
		let _ = write!(
			body,
			r#"<h2>Register gateway</h2><p><strong>Selected MAC:</strong> {mac}</p>
<form method="post" action="/cadastrar-gateway">
<input type="hidden" name="mac" value="{mac}">
<label>Name: <input type="text" name="nome" value="{name}" placeholder="Gateway name"></label>
<label>Sector: <input type="text" name="setor" value="{sector}" placeholder="Gateway sector"></label>
<button type="submit">Register gateway</button>
</form>"#,
			mac = escape(mac),
			name = escape(&registration.name),
			sector = escape(&registration.sector),
		);
	}
	body.push_str(&status_line(registration.status.as_ref()));

	body.push_str("<h2>Registered gateways</h2>");
	body.push_str(&filter_form("/cadastrar-gateway", filter, &dashboard.sectors(), "sectors"));
	if let Some(error) = &dashboard.load_error {
		body.push_str(&status_line(Some(&Status::error(error.as_str()))));
	}
	body.push_str("<table><thead><tr><th>Name</th><th>MAC</th><th>Sector</th><th>Actions</th></tr></thead><tbody>");
	for gateway in dashboard.visible(filter) {
		let _ = write!(
			body,
			r#"<tr><td>{name}</td><td>{mac}</td><td>{sector}</td><td>
<a href="/cadastrar-gateway?pessoas={id}">People</a>
<form method="post" action="/gateways/{id}/remover" style="display:inline"><button type="submit">Remove</button></form>
</td></tr>"#,
			id = gateway.id,
			name = escape(gateway.label()),
			mac = escape(&gateway.mac),
			sector = escape(gateway.sector.as_deref().unwrap_or("")),
		);
	}
	body.push_str("</tbody></table>");
	body.push_str(&modal(overlay, "/cadastrar-gateway", |found| people_list(found.gateway.label(), &found.people)));

	page("Gateway registration", &body)
}

fn person_form(action: &str, form: &PersonForm, submit: &str) -> String {
	format!(
		r#"<form method="post" action="{}">
<label>Name: <span style="color:red">*</span> <input type="text" name="nome" value="{}" placeholder="Person name"></label>
<label>Sector: <input type="text" name="setor" value="{}" placeholder="Sector (optional)"></label>
<label>iBeacon MAC: <span style="color:red">*</span> <input type="text" name="ibeacon_mac" value="{}" placeholder="iBeacon MAC"></label>
<button type="submit">{}</button>
</form>"#,
		escape(action),
		escape(&form.name),
		escape(&form.sector),
		escape(&form.ibeacon_mac),
		escape(submit),
	)
}

pub fn people_page(dashboard: &PeopleDashboard, filter: &ListFilter, editing: Option<&Person>, status: Option<&Status>) -> RawHtml<String> {
	let mut body = match editing {
		Some(person) => person_form(&format!("/pessoas/{}", person.id), &PersonForm::from(person), "Save"),
		None => person_form("/cadastrar-pessoa", &PersonForm::default(), "Register person"),
	};
	body.push_str(&status_line(status));

	body.push_str("<h2>Registered people</h2>");
	body.push_str(&filter_form("/cadastrar-pessoa", filter, &dashboard.sectors(), "sectors"));
	if let Some(error) = &dashboard.load_error {
		body.push_str(&status_line(Some(&Status::error(error.as_str()))));
	}
	body.push_str("<table><thead><tr><th>Name</th><th>Sector</th><th>iBeacon MAC</th><th>Actions</th></tr></thead><tbody>");
	for person in dashboard.visible(filter) {
		let _ = write!(
			body,
			r#"<tr><td>{name}</td><td>{sector}</td><td>{mac}</td><td>
<a href="/cadastrar-pessoa?editar={id}">Edit</a>
<form method="post" action="/pessoas/{id}/remover" style="display:inline"><button type="submit">Remove</button></form>
</td></tr>"#,
			id = person.id,
			name = escape(&person.name),
			sector = escape(person.sector.as_deref().unwrap_or("")),
			mac = escape(person.ibeacon_mac.as_deref().unwrap_or("")),
		);
	}
	body.push_str("</tbody></table>");

	page("People registration", &body)
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::common::PlacementKey;

	#[test]
	fn escapes_markup() {
		assert_eq!(escape(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
	}

	#[test]
	fn gateway_icon_shows_count() {
		let icon = MapIcon { key: PlacementKey::gateway(5), label: "Entrance".to_string(), left: 10.0, top: 20.5, people: 3 };
		let html = map_icon(&icon);
		assert!(html.contains("left:10px;top:20.5px"));
		assert!(html.contains(r#"href="?gateway=5""#));
		assert!(html.contains(r#"<span class="people-count">3</span>"#));

		let quiet = MapIcon { people: 0, ..icon };
		assert!(!map_icon(&quiet).contains("people-count"));
	}

	#[test]
	fn empty_people_list_message() {
		assert!(people_list("Entrance", &[]).contains(NO_PEOPLE));
	}

	#[test]
	fn closed_modal_renders_nothing() {
		let closed: Modal<CameraModal> = Modal::closed();
		assert_eq!(modal(&closed, "/", |_| "x".to_string()), "");
	}

	#[test]
	fn authoring_page_shows_next_step() {
		let RawHtml(html) = authoring_page(&MapAuthoring::default());
		assert!(html.contains("Enter a map name and choose a floor plan image."));
	}

	#[test]
	fn video_declares_hls_type() {
		let html = video(&VideoPlayer::new("/streams/output/1/stream.m3u8".to_string()));
		assert!(html.contains(r#"data-src="/streams/output/1/stream.m3u8""#));
		assert!(html.contains(r#"data-mime="application/vnd.apple.mpegurl""#));
	}
}
