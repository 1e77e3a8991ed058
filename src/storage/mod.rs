mod backend;
mod preferences;
mod store;

pub use backend::{Backend, FileBackend, MemoryBackend};
pub use preferences::Preferences;
pub use store::{ContextId, StorageEvent, StorageEvents, Store};

pub mod keys {
    pub const AUTH_TOKEN: &str = "authToken";
    pub const SIDEBAR_COLLAPSED: &str = "sidebar-collapsed";
    pub const ADV_IMAGE: &str = "adv_image";
}
