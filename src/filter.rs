use std::collections::BTreeSet;

use crate::common::{Camera, Gateway, Person};



/// Records that can be narrowed by name and by their group or sector label.
pub trait Filterable {
	fn name(&self) -> &str;
	fn group(&self) -> Option<&str>;
}

impl Filterable for Camera {
	fn name(&self) -> &str {
		&self.name
	}

	fn group(&self) -> Option<&str> {
		self.group.as_deref()
	}
}

impl Filterable for Gateway {
	fn name(&self) -> &str {
		self.label()
	}

	fn group(&self) -> Option<&str> {
		self.sector.as_deref()
	}
}

impl Filterable for Person {
	fn name(&self) -> &str {
		&self.name
	}

	fn group(&self) -> Option<&str> {
		self.sector.as_deref()
	}
}

/// Client-side filter over an already fetched collection.
///
/// An empty field means "no constraint". The name matches as a case-insensitive
/// substring, the group must match exactly.
#[derive(Clone)]
#[derive(Debug, Default, PartialEq)]
#[derive(FromForm)]
pub struct ListFilter {
	#[field(name = "nome", default = String::new())]
	pub name: String,
	#[field(name = "grupo", default = String::new())]
	pub group: String,
}

impl ListFilter {
	pub fn new(name: &str, group: &str) -> Self {
		ListFilter { name: name.to_string(), group: group.to_string() }
	}

	pub fn is_empty(&self) -> bool {
		self.name.trim().is_empty() && self.group.is_empty()
	}

	pub fn matches<T: Filterable>(&self, item: &T) -> bool {
		let needle = self.name.trim().to_lowercase();
		if !needle.is_empty() && !item.name().to_lowercase().contains(&needle) {
			return false;
		}
		if !self.group.is_empty() && item.group() != Some(self.group.as_str()) {
			return false;
		}
		true
	}

	pub fn apply<'a, T: Filterable>(&self, items: &'a [T]) -> Vec<&'a T> {
		items.iter().filter(|item| self.matches(*item)).collect()
	}
}

/// Distinct, sorted group labels for the group selector.
pub fn groups<T: Filterable>(items: &[T]) -> Vec<String> {
	items.iter()
		.filter_map(|item| item.group())
		.filter(|group| !group.is_empty())
		.map(str::to_string)
		.collect::<BTreeSet<_>>()
		.into_iter()
		.collect()
}
