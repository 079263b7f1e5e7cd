//! File-based storage backend.
//!
//! Each key is stored as one file under the configured directory. Writes go to
//! a temporary file that is then renamed over the target, so a crash mid-write
//! leaves the previous value intact. The directory is guarded by an exclusive
//! lock file: a second gateway process pointed at the same directory fails to
//! start instead of interleaving writes with the first.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use fs2::FileExt;
use gateway_types::{ConfigSchema, Field, FieldType, Schema, ValidationError};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tokio::fs;

const LOCK_FILE: &str = ".gateway.lock";

/// Fixed-size file header.
///
/// Binary layout (8 bytes total):
/// - [0-3]: Magic bytes "PGWS"
/// - [4-5]: Version (u16, little-endian)
/// - [6-7]: Reserved
#[derive(Debug, Clone, Copy)]
struct FileHeader {
	version: u16,
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"PGWS";
	const VERSION: u16 = 1;
	const SIZE: usize = 8;

	fn current() -> Self {
		Self {
			version: Self::VERSION,
		}
	}

	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes
	}

	fn deserialize(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE {
			return Err(StorageError::Backend("File too small for header".into()));
		}
		if &bytes[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("Unrecognized file format".into()));
		}

		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported file version: {}",
				version
			)));
		}

		Ok(Self { version })
	}
}

/// File-based storage implementation.
pub struct FileStorage {
	base_path: PathBuf,
	/// Held for the lifetime of the backend; dropping it releases the lock.
	_lock: File,
}

impl FileStorage {
	/// Opens (creating if needed) the storage directory and takes its lock.
	pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let base_path = base_path.into();
		std::fs::create_dir_all(&base_path).map_err(|e| {
			StorageError::Backend(format!(
				"Failed to create storage directory {}: {}",
				base_path.display(),
				e
			))
		})?;

		let lock = acquire_lock(&base_path)?;
		tracing::debug!(path = %base_path.display(), "Acquired storage lock");

		Ok(Self {
			base_path,
			_lock: lock,
		})
	}

	/// Converts a storage key to a filesystem-safe file path.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', ':', '\\'], "_");
		self.base_path.join(format!("{}.bin", safe_key))
	}
}

fn acquire_lock(base_path: &Path) -> Result<File, StorageError> {
	let lock_path = base_path.join(LOCK_FILE);
	let file = OpenOptions::new()
		.create(true)
		.truncate(false)
		.write(true)
		.open(&lock_path)
		.map_err(|e| StorageError::Backend(e.to_string()))?;

	file.try_lock_exclusive().map_err(|_| {
		StorageError::Backend(format!(
			"Storage directory {} is in use by another process",
			base_path.display()
		))
	})?;

	Ok(file)
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);

		let data = match fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			},
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		FileHeader::deserialize(&data)?;
		Ok(data[FileHeader::SIZE..].to_vec())
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		let mut file_data = Vec::with_capacity(FileHeader::SIZE + value.len());
		file_data.extend_from_slice(&FileHeader::current().serialize());
		file_data.extend_from_slice(&value);

		// Write atomically by writing to temp file then renaming
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, file_data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		fs::try_exists(self.get_file_path(key))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/gateway")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/gateway");

	Ok(Box::new(FileStorage::open(storage_path)?))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[tokio::test]
	async fn test_roundtrip_and_delete() {
		let dir = tempdir().unwrap();
		let storage = FileStorage::open(dir.path()).unwrap();

		let key = "gateway_state:0x5fbdb2315678afecb367f032d93f642f64180aa3";
		storage.set_bytes(key, b"{\"paused\":false}".to_vec()).await.unwrap();
		assert!(storage.exists(key).await.unwrap());
		assert_eq!(
			storage.get_bytes(key).await.unwrap(),
			b"{\"paused\":false}".to_vec()
		);

		storage.delete(key).await.unwrap();
		assert!(!storage.exists(key).await.unwrap());
		assert!(matches!(
			storage.get_bytes(key).await,
			Err(StorageError::NotFound)
		));
		// Deleting again is not an error
		storage.delete(key).await.unwrap();
	}

	#[tokio::test]
	async fn test_values_survive_reopen() {
		let dir = tempdir().unwrap();
		{
			let storage = FileStorage::open(dir.path()).unwrap();
			storage.set_bytes("a:b", b"persisted".to_vec()).await.unwrap();
		}

		let storage = FileStorage::open(dir.path()).unwrap();
		assert_eq!(storage.get_bytes("a:b").await.unwrap(), b"persisted".to_vec());
	}

	#[test]
	fn test_second_open_fails_while_locked() {
		let dir = tempdir().unwrap();
		let _first = FileStorage::open(dir.path()).unwrap();

		let second = FileStorage::open(dir.path());
		assert!(matches!(second, Err(StorageError::Backend(msg)) if msg.contains("in use")));
	}

	#[tokio::test]
	async fn test_rejects_foreign_file() {
		let dir = tempdir().unwrap();
		let storage = FileStorage::open(dir.path()).unwrap();
		std::fs::write(dir.path().join("x_y.bin"), b"garbage!!").unwrap();

		assert!(matches!(
			storage.get_bytes("x:y").await,
			Err(StorageError::Backend(_))
		));
	}

	#[test]
	fn test_factory_uses_storage_path() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("nested");
		let mut table = toml::map::Map::new();
		table.insert(
			"storage_path".to_string(),
			toml::Value::String(path.to_string_lossy().into_owned()),
		);

		let storage = create_storage(&toml::Value::Table(table));
		assert!(storage.is_ok());
		assert!(path.join(LOCK_FILE).exists());
	}

	#[test]
	fn test_schema_rejects_non_string_path() {
		let mut table = toml::map::Map::new();
		table.insert("storage_path".to_string(), toml::Value::Integer(3));
		assert!(FileStorageSchema
			.validate(&toml::Value::Table(table))
			.is_err());
	}
}
