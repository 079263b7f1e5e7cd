//! Storage module for the payment gateway.
//!
//! This module provides abstractions for durable storage of gateway state,
//! supporting an in-memory backend for tests and a file backend that survives
//! restarts.

use async_trait::async_trait;
use gateway_types::ConfigSchema;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// Writes must be atomic per key: a reader sees either the previous value or
/// the new one, never a torn write.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes, replacing any previous value.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// High-level storage service that provides typed operations.
///
/// Values are serialized to JSON and stored under `namespace:id`.
pub struct StorageService {
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value, overwriting any previous one.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.set_bytes(&Self::key(namespace, id), bytes)
			.await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Like [`retrieve`](Self::retrieve), but maps a missing key to `None`.
	pub async fn retrieve_optional<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryStorage;
	use serde::Deserialize;

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	struct Snapshot {
		paused: bool,
		counter: u64,
	}

	#[tokio::test]
	async fn test_store_and_retrieve_typed() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let snapshot = Snapshot {
			paused: true,
			counter: 3,
		};

		service.store("gateway_state", "abc", &snapshot).await.unwrap();
		assert!(service.exists("gateway_state", "abc").await.unwrap());

		let loaded: Snapshot = service.retrieve("gateway_state", "abc").await.unwrap();
		assert_eq!(loaded, snapshot);
	}

	#[tokio::test]
	async fn test_retrieve_optional_missing() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		let loaded: Option<Snapshot> = service
			.retrieve_optional("gateway_state", "missing")
			.await
			.unwrap();
		assert!(loaded.is_none());

		let result: Result<Snapshot, _> = service.retrieve("gateway_state", "missing").await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_retrieve_wrong_shape_is_serialization_error() {
		let backend = MemoryStorage::new();
		backend
			.set_bytes("gateway_state:bad", b"not json".to_vec())
			.await
			.unwrap();
		let service = StorageService::new(Box::new(backend));

		let result: Result<Snapshot, _> = service.retrieve("gateway_state", "bad").await;
		assert!(matches!(result, Err(StorageError::Serialization(_))));
	}

	#[tokio::test]
	async fn test_remove() {
		let service = StorageService::new(Box::new(MemoryStorage::new()));
		service
			.store("gateway_state", "x", &Snapshot {
				paused: false,
				counter: 0,
			})
			.await
			.unwrap();
		service.remove("gateway_state", "x").await.unwrap();
		assert!(!service.exists("gateway_state", "x").await.unwrap());
	}
}
