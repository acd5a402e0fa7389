//! Local key-value persistence for the cart.
//!
//! The cart lives under a single fixed key as a JSON array of line items.
//! It is read once when the store starts and rewritten in full after every
//! successful mutation.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rocketshoes_core::Cart;
use thiserror::Error;

/// Key the cart is stored under.
pub const CART_STORAGE_KEY: &str = "@RocketShoes:cart";

/// Errors that can occur reading or writing the key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Value could not be encoded or the backing file could not be decoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Synchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value stored under `key` in a single write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Load the persisted cart.
///
/// A missing key yields an empty cart. So does a value that cannot be read
/// or parsed (including one with duplicate product ids); that case is
/// logged since it means local state was lost.
pub fn load_cart(store: &dyn KeyValueStore) -> Cart {
    let raw = match store.get(CART_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Cart::new(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read stored cart, starting empty");
            return Cart::new();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Stored cart is unparseable, starting empty");
        Cart::new()
    })
}

/// Persist the full cart under [`CART_STORAGE_KEY`].
///
/// # Errors
///
/// Returns `StorageError` if encoding or the write fails.
pub fn save_cart(store: &dyn KeyValueStore, cart: &Cart) -> Result<(), StorageError> {
    let raw = serde_json::to_string(cart)?;
    store.set(CART_STORAGE_KEY, &raw)
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-process store, for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// FileStore
// =============================================================================

/// File-backed store.
///
/// Keeps a JSON object of `key -> value` in one file. Writes go to a
/// sibling temp file which is then renamed over the original, so a reader
/// never sees a half-written file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, creating its parent directory if needed.
    /// The file itself is created on first write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StorageError::Serialize(e)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Storage file is unparseable, overwriting"
                );
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        map.insert(key.to_string(), value.to_string());

        let tmp = self.temp_path();
        fs::write(&tmp, serde_json::to_vec(&map)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rocketshoes_core::{LineItem, Product, ProductId};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("rocketshoes_storage_{}", Uuid::new_v4()))
            .join("storage.json")
    }

    fn sample_cart() -> Cart {
        let mut cart = Cart::new();
        let mut item = LineItem::new(Product::new(ProductId::new(2), "Tênis", Decimal::new(1399, 1)));
        item.amount = 3;
        cart.push(item).unwrap();
        cart.push(LineItem::new(Product::new(ProductId::new(1), "Bota", Decimal::new(200, 0))))
            .unwrap();
        cart
    }

    #[test]
    fn test_load_missing_key_is_empty() {
        let store = MemoryStore::new();
        assert!(load_cart(&store).is_empty());
    }

    #[test]
    fn test_load_garbage_is_empty() {
        let store = MemoryStore::new();
        store.set(CART_STORAGE_KEY, "{not json").unwrap();
        assert!(load_cart(&store).is_empty());

        store.set(CART_STORAGE_KEY, r#"{"id": 1}"#).unwrap();
        assert!(load_cart(&store).is_empty());
    }

    #[test]
    fn test_memory_round_trip() {
        let store = MemoryStore::new();
        let cart = sample_cart();
        save_cart(&store, &cart).unwrap();

        assert_eq!(load_cart(&store), cart);
        assert_eq!(store.keys(), vec![CART_STORAGE_KEY.to_string()]);
    }

    #[test]
    fn test_file_store_round_trip_across_instances() {
        let path = temp_store_path();
        let cart = sample_cart();
        {
            let store = FileStore::open(&path).unwrap();
            save_cart(&store, &cart).unwrap();
        }

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(load_cart(&reopened), cart);
        assert!(!reopened.temp_path().exists());

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_file_store_keeps_other_keys() {
        let path = temp_store_path();
        let store = FileStore::open(&path).unwrap();
        store.set("theme", "dark").unwrap();
        save_cart(&store, &sample_cart()).unwrap();

        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
        assert!(store.get(CART_STORAGE_KEY).unwrap().is_some());

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_file_store_missing_file_reads_none() {
        let path = temp_store_path();
        let store = FileStore::open(&path).unwrap();
        assert!(store.get(CART_STORAGE_KEY).unwrap().is_none());

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_file_store_corrupt_file_is_error_but_cart_loads_empty() {
        let path = temp_store_path();
        let store = FileStore::open(&path).unwrap();
        fs::write(&path, b"][").unwrap();

        assert!(matches!(
            store.get(CART_STORAGE_KEY),
            Err(StorageError::Serialize(_))
        ));
        assert!(load_cart(&store).is_empty());

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn test_file_store_overwrites_corrupt_file_on_save() {
        let path = temp_store_path();
        let store = FileStore::open(&path).unwrap();
        fs::write(&path, b"][").unwrap();

        let cart = sample_cart();
        save_cart(&store, &cart).unwrap();

        assert_eq!(load_cart(&store), cart);
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(load_cart(&reopened), cart);
        assert!(!store.temp_path().exists());

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
