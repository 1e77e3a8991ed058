use crate::config::Config;
use crate::error::Result;
use crate::http::ApiClient;
use crate::services::{AuthService, ReportService, ScanService};
use crate::session::{RouteGuard, SessionManager};
use crate::storage::{Preferences, Store};

/// Everything a front end needs, wired to one store context and one
/// session. Nothing here is global; build one per context.
#[derive(Clone)]
pub struct App {
    pub session: SessionManager,
    pub guard: RouteGuard,
    pub api: ApiClient,
    pub auth: AuthService,
    pub scans: ScanService,
    pub reports: ReportService,
    pub prefs: Preferences,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_store(config, Store::file(config.storage_path()))
    }

    pub fn with_store(config: &Config, store: Store) -> Result<Self> {
        let api = ApiClient::from_config(config, store.clone())?;
        let session = SessionManager::new(store.clone());
        let prefs = Preferences::new(store);

        Ok(Self {
            guard: RouteGuard::new(session.clone()),
            auth: AuthService::new(api.clone(), session.clone()),
            scans: ScanService::new(api.clone(), prefs.clone()),
            reports: ReportService::new(api.clone()),
            session,
            api,
            prefs,
        })
    }

    pub fn open_context(&self, config: &Config) -> Result<Self> {
        Self::with_store(config, self.session.store().open_context())
    }
}
