//! Schema validation for TOML configuration tables.
//!
//! Configuration is validated as a raw `toml::Value` before it is
//! deserialised, so that errors name the offending field instead of surfacing
//! as a generic serde message.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

/// Type of a configuration field.
#[derive(Debug)]
pub enum FieldType {
	String,
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	/// `0x`-prefixed hex string decoding to at most `max_bytes` bytes.
	Hex { max_bytes: usize },
	/// One of a fixed set of strings.
	OneOf(&'static [&'static str]),
}

/// Type alias for field validator functions.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A field definition with name and type.
pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("field_type", &self.field_type)
			.field("validator", &self.validator.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom validator that runs after the type check.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}
}

/// Schema definition with required and optional fields.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML table against this schema. Field names in errors are
	/// prefixed with `scope` (e.g. `chains.sepolia`).
	pub fn validate(&self, scope: &str, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: scope.to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let name = format!("{}.{}", scope, field.name);
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(name.clone()))?;
			check_field(&name, field, value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				check_field(&format!("{}.{}", scope, field.name), field, value)?;
			}
		}

		Ok(())
	}
}

fn check_field(name: &str, field: &Field, value: &toml::Value) -> Result<(), ValidationError> {
	validate_field_type(name, value, &field.field_type)?;

	if let Some(validator) = &field.validator {
		validator(value).map_err(|message| ValidationError::InvalidValue {
			field: name.to_string(),
			message,
		})?;
	}

	Ok(())
}

fn mismatch(field_name: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

/// Validates that a value matches the expected field type.
fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(mismatch(field_name, "string", value));
			}
		}
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| mismatch(field_name, "integer", value))?;

			if let Some(min_val) = min {
				if int_val < *min_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is less than minimum {}", int_val, min_val),
					});
				}
			}

			if let Some(max_val) = max {
				if int_val > *max_val {
					return Err(ValidationError::InvalidValue {
						field: field_name.to_string(),
						message: format!("Value {} is greater than maximum {}", int_val, max_val),
					});
				}
			}
		}
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(mismatch(field_name, "boolean", value));
			}
		}
		FieldType::Hex { max_bytes } => {
			let s = value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "hex string", value))?;
			let digits = s
				.strip_prefix("0x")
				.ok_or_else(|| ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: "must start with 0x".to_string(),
				})?;
			if digits.is_empty() || digits.len() > max_bytes * 2 {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("must encode between 1 and {} bytes", max_bytes),
				});
			}
			if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: "must be valid hexadecimal".to_string(),
				});
			}
		}
		FieldType::OneOf(allowed) => {
			let s = value
				.as_str()
				.ok_or_else(|| mismatch(field_name, "string", value))?;
			if !allowed.contains(&s) {
				return Err(ValidationError::InvalidValue {
					field: field_name.to_string(),
					message: format!("expected one of {:?}, got '{}'", allowed, s),
				});
			}
		}
	}

	Ok(())
}

/// Validator for RPC and relayer endpoints.
pub fn http_url(value: &toml::Value) -> Result<(), String> {
	match value.as_str() {
		Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
		_ => Err("URL must start with http:// or https://".to_string()),
	}
}

/// Trait implemented by components that validate their own configuration.
pub trait ConfigSchema: Send + Sync {
	/// Validates a TOML table found at `scope` in the configuration file.
	fn validate(&self, scope: &str, config: &toml::Value) -> Result<(), ValidationError>;
}
