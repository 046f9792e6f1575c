//! Live camera playback over HLS.
//!
//! The page reports what the browser can do; the player picks one strategy and
//! makes a single attempt. There is no retry, reconnect or quality switching.

use log::{info, warn};

use crate::common::CameraId;



pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// Builds playlist URLs of the form `{base}/{collection}/{camera}/stream.m3u8`.
#[derive(Clone)]
#[derive(Debug, PartialEq)]
pub struct StreamLocator {
	base: String,
	collection: String,
}

impl StreamLocator {
	pub fn new(base: &str, collection: &str) -> Self {
		StreamLocator {
			base: base.trim_end_matches('/').to_string(),
			collection: collection.trim_matches('/').to_string(),
		}
	}

	pub fn playlist_url(&self, camera: CameraId) -> String {
		format!("{}/{}/{}/stream.m3u8", self.base, self.collection, camera)
	}
}

/// Browser capabilities relevant to HLS.
#[derive(Clone, Copy)]
#[derive(Debug, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct PlaybackSupport {
	/// A script-side segment loader (Media Source Extensions) is available.
	pub segment_loader: bool,
	/// `<video>` reports it can play the HLS MIME type by itself.
	pub native_hls: bool,
}

#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
	SegmentLoader,
	Native,
}

impl Strategy {
	/// Segment loader wins when both are available.
	pub fn choose(support: PlaybackSupport) -> Option<Strategy> {
		if support.segment_loader {
			Some(Strategy::SegmentLoader)
		} else if support.native_hls {
			Some(Strategy::Native)
		} else {
			None
		}
	}

	/// Event after which playback is started.
	pub fn start_event(&self) -> PlayerEvent {
		match self {
			Strategy::SegmentLoader => PlayerEvent::ManifestParsed,
			Strategy::Native => PlayerEvent::LoadedMetadata,
		}
	}
}

#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerEvent {
	ManifestParsed,
	LoadedMetadata,
}

#[derive(Clone, Copy)]
#[derive(Debug, PartialEq, Eq)]
pub enum PlayerPhase {
	Idle,
	Loading(Strategy),
	Unsupported,
}

/// One mounted `<video>` element and its single best-effort playback attempt.
#[derive(Clone)]
#[derive(Debug)]
pub struct VideoPlayer {
	src: String,
	phase: PlayerPhase,
}

impl VideoPlayer {
	pub fn new(src: String) -> Self {
		VideoPlayer { src, phase: PlayerPhase::Idle }
	}

	pub fn src(&self) -> &str {
		&self.src
	}

	/// Attaches the source using whichever strategy the browser supports.
	pub fn mount(&mut self, support: PlaybackSupport) -> PlayerPhase {
		if self.phase != PlayerPhase::Idle {
			return self.phase;
		}
		self.phase = match Strategy::choose(support) {
			Some(strategy) => {
				info!("Loading {} via {:?}", self.src, strategy);
				PlayerPhase::Loading(strategy)
			},
			None => {
				warn!("No HLS playback available for {}", self.src);
				PlayerPhase::Unsupported
			},
		};
		self.phase
	}
}
