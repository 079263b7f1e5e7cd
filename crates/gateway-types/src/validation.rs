//! Configuration validation utilities for the gateway.
//!
//! Backend implementations (storage, relay host) receive their configuration as
//! raw TOML tables. Each backend describes the table it expects with a
//! [`Schema`]; the schema is checked before the backend is constructed so that
//! misconfiguration fails at startup rather than mid-operation.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
	/// Error that occurs when a required field is missing.
	#[error("Missing required field: {0}")]
	MissingField(String),
	/// Error that occurs when a field has an invalid value.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	/// Error that occurs when field type is incorrect.
	#[error("Type mismatch for field '{field}': expected {expected}, got {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

impl ValidationError {
	/// Prefixes the field path, used when reporting errors from nested tables.
	fn nested(self, parent: &str) -> Self {
		match self {
			ValidationError::MissingField(f) => {
				ValidationError::MissingField(format!("{}.{}", parent, f))
			},
			ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
				field: format!("{}.{}", parent, field),
				message,
			},
			ValidationError::TypeMismatch {
				field,
				expected,
				actual,
			} => ValidationError::TypeMismatch {
				field: format!("{}.{}", parent, field),
				expected,
				actual,
			},
		}
	}
}

/// The type a configuration field must have.
#[derive(Debug)]
pub enum FieldType {
	String,
	/// Integer with optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
	/// A 20-byte hex address string.
	Address,
	/// A non-negative amount, as an integer or a decimal/0x-hex string.
	Amount,
	/// Array whose elements all have the inner type.
	Array(Box<FieldType>),
	/// Nested table with its own schema.
	Table(Schema),
}

/// Custom check run after type validation succeeds.
pub type FieldValidator = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A named field in a schema.
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

	/// Attaches a custom validator that returns an error message on failure.
	pub fn with_validator<F>(mut self, validator: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.validator = Some(Box::new(validator));
		self
	}

	fn check(&self, value: &toml::Value) -> Result<(), ValidationError> {
		validate_field_type(&self.name, value, &self.field_type)?;
		if let Some(validator) = &self.validator {
			validator(value).map_err(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})?;
		}
		Ok(())
	}
}

/// Required and optional fields of a TOML table.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Validates a TOML value against this schema.
	///
	/// Required fields must be present; optional fields are checked only when
	/// present. Unknown keys are ignored.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config
			.as_table()
			.ok_or_else(|| ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "table".to_string(),
				actual: config.type_str().to_string(),
			})?;

		for field in &self.required {
			let value = table
				.get(&field.name)
				.ok_or_else(|| ValidationError::MissingField(field.name.clone()))?;
			field.check(value)?;
		}

		for field in &self.optional {
			if let Some(value) = table.get(&field.name) {
				field.check(value)?;
			}
		}

		Ok(())
	}
}

fn type_mismatch(field_name: &str, expected: &str, value: &toml::Value) -> ValidationError {
	ValidationError::TypeMismatch {
		field: field_name.to_string(),
		expected: expected.to_string(),
		actual: value.type_str().to_string(),
	}
}

fn validate_field_type(
	field_name: &str,
	value: &toml::Value,
	expected_type: &FieldType,
) -> Result<(), ValidationError> {
	match expected_type {
		FieldType::String => {
			if !value.is_str() {
				return Err(type_mismatch(field_name, "string", value));
			}
		},
		FieldType::Integer { min, max } => {
			let int_val = value
				.as_integer()
				.ok_or_else(|| type_mismatch(field_name, "integer", value))?;

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
		},
		FieldType::Boolean => {
			if !value.is_bool() {
				return Err(type_mismatch(field_name, "boolean", value));
			}
		},
		FieldType::Address => {
			let s = value
				.as_str()
				.ok_or_else(|| type_mismatch(field_name, "address string", value))?;
			Address::from_str(s).map_err(|e| ValidationError::InvalidValue {
				field: field_name.to_string(),
				message: format!("Invalid address '{}': {}", s, e),
			})?;
		},
		FieldType::Amount => {
			parse_amount(value).map_err(|message| ValidationError::InvalidValue {
				field: field_name.to_string(),
				message,
			})?;
		},
		FieldType::Array(inner_type) => {
			let array = value
				.as_array()
				.ok_or_else(|| type_mismatch(field_name, "array", value))?;

			for (i, item) in array.iter().enumerate() {
				validate_field_type(&format!("{}[{}]", field_name, i), item, inner_type)?;
			}
		},
		FieldType::Table(schema) => {
			schema.validate(value).map_err(|e| e.nested(field_name))?;
		},
	}

	Ok(())
}

/// Parses an amount from a TOML integer or string (decimal or 0x-prefixed hex).
pub fn parse_amount(value: &toml::Value) -> Result<U256, String> {
	match value {
		toml::Value::Integer(i) if *i >= 0 => Ok(U256::from(*i as u64)),
		toml::Value::Integer(i) => Err(format!("Amount cannot be negative: {}", i)),
		toml::Value::String(s) => {
			U256::from_str(s).map_err(|e| format!("Invalid amount '{}': {}", s, e))
		},
		other => Err(format!("Expected integer or string amount, got {}", other.type_str())),
	}
}

/// A configuration schema that can validate TOML values.
///
/// Implemented once per backend so that the builder can validate every
/// configured implementation before constructing it.
#[async_trait]
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(input: &str) -> toml::Value {
		toml::from_str(input).unwrap()
	}

	#[test]
	fn test_required_field_missing() {
		let schema = Schema::new(vec![Field::new("seller", FieldType::Address)], vec![]);
		let result = schema.validate(&parse("other = 1"));
		assert!(matches!(result, Err(ValidationError::MissingField(f)) if f == "seller"));
	}

	#[test]
	fn test_address_field() {
		let schema = Schema::new(vec![Field::new("seller", FieldType::Address)], vec![]);
		assert!(schema
			.validate(&parse(
				r#"seller = "0x5FbDB2315678afecb367f032d93F642f64180aa3""#
			))
			.is_ok());
		assert!(matches!(
			schema.validate(&parse(r#"seller = "0x1234""#)),
			Err(ValidationError::InvalidValue { .. })
		));
		assert!(matches!(
			schema.validate(&parse("seller = 5")),
			Err(ValidationError::TypeMismatch { .. })
		));
	}

	#[test]
	fn test_amount_field_accepts_integer_and_strings() {
		assert_eq!(parse_amount(&toml::Value::Integer(242)).unwrap(), U256::from(242u64));
		assert_eq!(
			parse_amount(&toml::Value::String("0xf2".into())).unwrap(),
			U256::from(242u64)
		);
		assert_eq!(
			parse_amount(&toml::Value::String("1000000000000000000000".into())).unwrap(),
			U256::from(10u64).pow(U256::from(21u64))
		);
		assert!(parse_amount(&toml::Value::Integer(-1)).is_err());
		assert!(parse_amount(&toml::Value::Boolean(true)).is_err());
	}

	#[test]
	fn test_integer_bounds() {
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"initial_height",
				FieldType::Integer {
					min: Some(0),
					max: None,
				},
			)],
		);
		assert!(schema.validate(&parse("initial_height = 3")).is_ok());
		assert!(schema.validate(&parse("initial_height = -3")).is_err());
		assert!(schema.validate(&parse("")).is_ok());
	}

	#[test]
	fn test_nested_array_of_tables_reports_path() {
		let account = Schema::new(
			vec![
				Field::new("address", FieldType::Address),
				Field::new("balance", FieldType::Amount),
			],
			vec![],
		);
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"accounts",
				FieldType::Array(Box::new(FieldType::Table(account))),
			)],
		);

		let result = schema.validate(&parse(
			r#"
[[accounts]]
address = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
"#,
		));
		assert!(matches!(result, Err(ValidationError::MissingField(f)) if f == "accounts[0].balance"));
	}

	#[test]
	fn test_custom_validator() {
		let schema = Schema::new(
			vec![Field::new("kind", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some("unique_item") | Some("fungible_unit") => Ok(()),
					other => Err(format!("unknown shop kind {:?}", other)),
				}
			})],
			vec![],
		);
		assert!(schema.validate(&parse(r#"kind = "unique_item""#)).is_ok());
		assert!(schema.validate(&parse(r#"kind = "auction""#)).is_err());
	}
}
