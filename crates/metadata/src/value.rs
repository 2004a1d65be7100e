/// A single SQL value, in SQLite's storage classes.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
	Null,
	Integer(i64),
	Real(f64),
	Text(String),
	Blob(Vec<u8>),
}

pub type SqlRow = Vec<SqlValue>;

impl SqlValue {
	#[must_use]
	pub const fn as_i64(&self) -> Option<i64> {
		match self {
			Self::Integer(value) => Some(*value),
			_ => None,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(value) => Some(value),
			_ => None,
		}
	}
}

impl From<i64> for SqlValue {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}

impl From<f64> for SqlValue {
	fn from(value: f64) -> Self {
		Self::Real(value)
	}
}

impl From<String> for SqlValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<&str> for SqlValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<Vec<u8>> for SqlValue {
	fn from(value: Vec<u8>) -> Self {
		Self::Blob(value)
	}
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
	fn from(value: Option<T>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}
