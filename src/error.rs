use thiserror::Error;



#[derive(Error, Debug)]
pub enum ApiError {
	#[error("Backend request timed out")]
	Timeout,

	#[error("Backend unreachable: {0}")]
	Transport(String),

	#[error("Not found{}", suffix(.message))]
	NotFound { message: Option<String> },

	#[error("Backend rejected request ({status}){}", suffix(.message))]
	Rejected { status: u16, message: Option<String> },

	#[error("Malformed backend response: {0}")]
	Decode(String),

	#[error("Invalid request: {0}")]
	Request(String),
}

fn suffix(message: &Option<String>) -> String {
	match message {
		Some(message) => format!(": {}", message),
		None => String::new(),
	}
}

impl ApiError {
	/// Error text supplied by the backend, if any.
	pub fn backend_message(&self) -> Option<&str> {
		match self {
			ApiError::NotFound { message } | ApiError::Rejected { message, .. } => message.as_deref(),
			_ => None,
		}
	}

	/// Short text for the page: the backend's own error when it sent one, the fallback otherwise.
	pub fn user_message(&self, fallback: &str) -> String {
		match self.backend_message() {
			Some(message) => format!("Error: {}", message),
			None => fallback.to_string(),
		}
	}
}

impl From<reqwest::Error> for ApiError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_timeout() {
			ApiError::Timeout
		} else if err.is_decode() {
			ApiError::Decode(err.to_string())
		} else if err.is_builder() {
			ApiError::Request(err.to_string())
		} else {
			ApiError::Transport(err.to_string())
		}
	}
}

impl From<serde_json::Error> for ApiError {
	fn from(err: serde_json::Error) -> Self {
		ApiError::Request(err.to_string())
	}
}

impl From<url::ParseError> for ApiError {
	fn from(err: url::ParseError) -> Self {
		ApiError::Request(err.to_string())
	}
}
