use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::warn;

use super::{Store, keys};
use crate::error::{Error, Result};

/// Typed access to the non-credential keys: layout flags and the cached
/// adversarial image from the last scan.
#[derive(Debug, Clone)]
pub struct Preferences {
    store: Store,
}

impl Preferences {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn sidebar_collapsed(&self) -> Result<bool> {
        let Some(raw) = self.store.get(keys::SIDEBAR_COLLAPSED)? else {
            return Ok(false);
        };

        match serde_json::from_str::<bool>(&raw) {
            Ok(value) => Ok(value),
            Err(_) => {
                warn!(value = %raw, "ignoring unreadable sidebar flag");
                Ok(false)
            }
        }
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) -> Result<()> {
        self.store
            .set(keys::SIDEBAR_COLLAPSED, if collapsed { "true" } else { "false" })
    }

    pub fn toggle_sidebar(&self) -> Result<bool> {
        let collapsed = !self.sidebar_collapsed()?;
        self.set_sidebar_collapsed(collapsed)?;
        Ok(collapsed)
    }

    pub fn cache_adversarial_image(&self, base64_image: &str) -> Result<()> {
        self.store.set(keys::ADV_IMAGE, base64_image)
    }

    pub fn cached_adversarial_image(&self) -> Result<Option<String>> {
        self.store.get(keys::ADV_IMAGE)
    }

    pub fn adversarial_image_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.cached_adversarial_image()?
            .map(|encoded| {
                STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| Error::Storage(format!("cached image is not base64: {}", e)))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidebar_defaults_to_expanded() {
        let prefs = Preferences::new(Store::memory());
        assert!(!prefs.sidebar_collapsed().unwrap());
    }

    #[test]
    fn test_sidebar_toggle_persists_json_flag() {
        let store = Store::memory();
        let prefs = Preferences::new(store.clone());

        assert!(prefs.toggle_sidebar().unwrap());
        assert_eq!(
            store.get(keys::SIDEBAR_COLLAPSED).unwrap(),
            Some("true".to_string())
        );
        assert!(!prefs.toggle_sidebar().unwrap());
    }

    #[test]
    fn test_garbage_sidebar_flag_reads_as_expanded() {
        let store = Store::memory();
        store.set(keys::SIDEBAR_COLLAPSED, "maybe").unwrap();
        assert!(!Preferences::new(store).sidebar_collapsed().unwrap());
    }

    #[test]
    fn test_adversarial_image_decoding() {
        let prefs = Preferences::new(Store::memory());
        assert_eq!(prefs.adversarial_image_bytes().unwrap(), None);

        prefs.cache_adversarial_image("iVBORw0KGgo=").unwrap();
        let bytes = prefs.adversarial_image_bytes().unwrap().unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");

        prefs.cache_adversarial_image("%%%").unwrap();
        assert!(prefs.adversarial_image_bytes().is_err());
    }
}
