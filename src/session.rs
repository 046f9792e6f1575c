//! Per-browser view state.
//!
//! Each browser gets a random id in a cookie; forms that span several requests
//! (map authoring, gateway registration) keep their state under that id. Sessions
//! nobody touched for the configured idle time are dropped.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use rocket::http::{Cookie, SameSite};
use rocket::request::{self, FromRequest, Request};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;



pub const COOKIE: &str = "dashboard_session";

#[derive(Clone)]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
	pub fn new(id: &str) -> Self {
		SessionId(id.to_string())
	}

	fn generate() -> Self {
		SessionId(format!("{:032x}", rand::random::<u128>()))
	}
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionId {
	type Error = Infallible;

	async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
		let cookies = request.cookies();
		let id = match cookies.get(COOKIE) {
			Some(cookie) if !cookie.value().is_empty() => SessionId::new(cookie.value()),
			_ => {
				let id = SessionId::generate();
				debug!("Starting session {}", id.0);
				cookies.add(Cookie::build((COOKIE, id.0.clone()))
					.path("/")
					.http_only(true)
					.same_site(SameSite::Lax));
				id
			},
		};
		request::Outcome::Success(id)
	}
}

struct Entry<T> {
	state: Arc<Mutex<T>>,
	last_used: Instant,
}

pub struct Sessions<T> {
	entries: RwLock<HashMap<SessionId, Entry<T>>>,
	idle: Duration,
}

impl<T: Default> Sessions<T> {
	pub fn new(idle: Duration) -> Self {
		Sessions { entries: RwLock::new(HashMap::new()), idle }
	}

	/// State for `session`, created on first use.
	pub async fn get(&self, session: &SessionId) -> Arc<Mutex<T>> {
		let mut entries = self.entries.write().await;
		let now = self.evict(&mut entries);
		let entry = entries.entry(session.clone()).or_insert_with(|| Entry {
			state: Arc::new(Mutex::new(T::default())),
			last_used: now,
		});
		entry.last_used = now;
		entry.state.clone()
	}

	/// Throws away whatever `session` had and starts over.
	pub async fn reset(&self, session: &SessionId) -> Arc<Mutex<T>> {
		let mut entries = self.entries.write().await;
		let now = self.evict(&mut entries);
		let state = Arc::new(Mutex::new(T::default()));
		entries.insert(session.clone(), Entry { state: state.clone(), last_used: now });
		state
	}

	fn evict(&self, entries: &mut HashMap<SessionId, Entry<T>>) -> Instant {
		let now = Instant::now();
		let before = entries.len();
		entries.retain(|_, entry| now.duration_since(entry.last_used) < self.idle);
		if entries.len() < before {
			debug!("Dropped {} idle sessions", before - entries.len());
		}
		now
	}

	#[cfg(test)]
	pub async fn len(&self) -> usize {
		self.entries.read().await.len()
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn sessions_are_isolated() {
		let sessions: Sessions<Vec<u32>> = Sessions::new(Duration::from_secs(60));
		let alice = SessionId::new("alice");
		let bob = SessionId::new("bob");

		sessions.get(&alice).await.lock().await.push(1);
		assert!(sessions.get(&bob).await.lock().await.is_empty());
		assert_eq!(*sessions.get(&alice).await.lock().await, vec![1]);

		sessions.reset(&alice).await;
		assert!(sessions.get(&alice).await.lock().await.is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn idle_sessions_are_dropped() {
		let sessions: Sessions<Vec<u32>> = Sessions::new(Duration::from_secs(60));
		sessions.get(&SessionId::new("alice")).await.lock().await.push(1);

		tokio::time::sleep(Duration::from_secs(30)).await;
		sessions.get(&SessionId::new("bob")).await;
		assert_eq!(sessions.len().await, 2);

		tokio::time::sleep(Duration::from_secs(45)).await;
		sessions.get(&SessionId::new("bob")).await;
		assert_eq!(sessions.len().await, 1);
		assert!(sessions.get(&SessionId::new("alice")).await.lock().await.is_empty());
	}

	#[test]
	fn generated_ids_differ() {
		assert_ne!(SessionId::generate(), SessionId::generate());
	}
}
