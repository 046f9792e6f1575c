/// Overlay container shown on top of a page; closing is navigation back to the page.
#[derive(Clone)]
#[derive(Debug, PartialEq)]
pub struct Modal<T> {
	content: Option<T>,
}

impl<T> Default for Modal<T> {
	fn default() -> Self {
		Modal { content: None }
	}
}

impl<T> Modal<T> {
	pub fn closed() -> Self {
		Modal::default()
	}

	pub fn showing(content: T) -> Self {
		Modal { content: Some(content) }
	}

	/// Replaces whatever was showing.
	pub fn open(&mut self, content: T) {
		self.content = Some(content);
	}

	pub fn content(&self) -> Option<&T> {
		self.content.as_ref()
	}
}
