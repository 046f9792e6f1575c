use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};



/// Transient status line shown under a form or list.
#[derive(Clone)]
#[derive(Debug, PartialEq, Eq)]
pub enum Status {
	Success(String),
	Error(String),
}

impl Status {
	pub fn success(text: impl Into<String>) -> Self {
		Status::Success(text.into())
	}

	pub fn error(text: impl Into<String>) -> Self {
		Status::Error(text.into())
	}

	pub fn is_error(&self) -> bool {
		matches!(self, Status::Error(_))
	}

	pub fn text(&self) -> &str {
		match self {
			Status::Success(text) | Status::Error(text) => text,
		}
	}

	/// Post-redirect-get: carry the status to the next page load.
	pub fn redirect(self, to: String) -> Flash<Redirect> {
		match self {
			Status::Success(text) => Flash::success(Redirect::to(to), text),
			Status::Error(text) => Flash::error(Redirect::to(to), text),
		}
	}

	pub fn from_flash(flash: Option<FlashMessage<'_>>) -> Option<Status> {
		flash.map(|flash| match flash.kind() {
			"error" => Status::error(flash.message()),
			_ => Status::success(flash.message()),
		})
	}
}
