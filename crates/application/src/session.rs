//! The process-scoped session state aggregate.
//!
//! Globals, environments, the active environment, the cookie store and the
//! engine settings live behind one lock. Every mutation is a named operation
//! that completes under that lock.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use courier_domain::{
    CookieJar, CookieStore, EngineSettings, EnvironmentVariableSet, GlobalVariableSet,
    VariableMap,
};
use tracing::debug;

use crate::error::{ApplicationError, ApplicationResult};
use crate::variable_resolver::merge_variables;

#[derive(Debug, Default)]
struct SessionData {
    globals: GlobalVariableSet,
    environments: Vec<EnvironmentVariableSet>,
    active_environment_id: Option<String>,
    cookies: CookieStore,
    settings: EngineSettings,
}

impl SessionData {
    fn active(&self) -> Option<&EnvironmentVariableSet> {
        let id = self.active_environment_id.as_deref()?;
        self.environments.iter().find(|env| env.id == id)
    }
}

/// Shared state read by every send and written only through its operations.
#[derive(Debug, Default)]
pub struct SessionState {
    inner: RwLock<SessionData>,
}

impl SessionState {
    /// Creates an empty session with the given settings.
    #[must_use]
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            inner: RwLock::new(SessionData {
                settings,
                ..SessionData::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionData> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionData> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the global variables.
    pub fn set_globals(&self, globals: GlobalVariableSet) {
        self.write().globals = globals;
    }

    /// Returns the global variables.
    #[must_use]
    pub fn globals(&self) -> GlobalVariableSet {
        self.read().globals.clone()
    }

    /// Adds an environment; it becomes active if none is.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::DuplicateEnvironment`] if the id is taken.
    pub fn add_environment(&self, environment: EnvironmentVariableSet) -> ApplicationResult<()> {
        let mut data = self.write();
        if data.environments.iter().any(|env| env.id == environment.id) {
            return Err(ApplicationError::DuplicateEnvironment(environment.id));
        }
        if data.active().is_none() {
            data.active_environment_id = Some(environment.id.clone());
        }
        data.environments.push(environment);
        Ok(())
    }

    /// Replaces the environment with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::EnvironmentNotFound`] for an unknown id.
    pub fn update_environment(&self, environment: EnvironmentVariableSet) -> ApplicationResult<()> {
        let mut data = self.write();
        let slot = data
            .environments
            .iter_mut()
            .find(|env| env.id == environment.id)
            .ok_or_else(|| ApplicationError::EnvironmentNotFound(environment.id.clone()))?;
        *slot = environment;
        Ok(())
    }

    /// Removes an environment. If it was active, the first remaining one becomes active.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::EnvironmentNotFound`] for an unknown id.
    pub fn remove_environment(&self, id: &str) -> ApplicationResult<EnvironmentVariableSet> {
        let mut data = self.write();
        let index = data
            .environments
            .iter()
            .position(|env| env.id == id)
            .ok_or_else(|| ApplicationError::EnvironmentNotFound(id.to_string()))?;
        let removed = data.environments.remove(index);
        if data.active_environment_id.as_deref() == Some(id) {
            data.active_environment_id = data.environments.first().map(|env| env.id.clone());
        }
        Ok(removed)
    }

    /// Activates an environment by id or name, or deactivates with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::EnvironmentNotFound`] if nothing matches.
    pub fn set_active_environment(&self, id_or_name: Option<&str>) -> ApplicationResult<()> {
        let mut data = self.write();
        let Some(wanted) = id_or_name else {
            data.active_environment_id = None;
            return Ok(());
        };
        let id = data
            .environments
            .iter()
            .find(|env| env.id == wanted)
            .or_else(|| data.environments.iter().find(|env| env.name == wanted))
            .map(|env| env.id.clone())
            .ok_or_else(|| ApplicationError::EnvironmentNotFound(wanted.to_string()))?;
        data.active_environment_id = Some(id);
        Ok(())
    }

    /// Returns the active environment.
    #[must_use]
    pub fn active_environment(&self) -> Option<EnvironmentVariableSet> {
        self.read().active().cloned()
    }

    /// Returns every environment in insertion order.
    #[must_use]
    pub fn environments(&self) -> Vec<EnvironmentVariableSet> {
        self.read().environments.clone()
    }

    /// Globals overlaid with the active environment.
    #[must_use]
    pub fn merged_variables(&self) -> VariableMap {
        let data = self.read();
        merge_variables(&data.globals, data.active())
    }

    /// Builds the `Cookie` header value for a host; empty if there is nothing to send.
    #[must_use]
    pub fn cookie_header_for(&self, host: &str) -> String {
        self.read().cookies.cookie_header(host)
    }

    /// Merges cookies received from `host`.
    pub fn upsert_cookies(&self, host: &str, cookies: CookieJar) -> usize {
        let merged = self.write().cookies.merge(host, cookies);
        if merged > 0 {
            debug!(host, merged, "Cookie store updated");
        }
        merged
    }

    /// Returns a copy of the cookie store.
    #[must_use]
    pub fn cookies(&self) -> CookieStore {
        self.read().cookies.clone()
    }

    /// Empties the cookie store.
    pub fn clear_cookies(&self) {
        self.write().cookies.clear();
    }

    /// Returns the engine settings.
    #[must_use]
    pub fn settings(&self) -> EngineSettings {
        self.read().settings.clone()
    }

    /// Replaces the engine settings.
    pub fn update_settings(&self, settings: EngineSettings) {
        self.write().settings = settings;
    }
}
