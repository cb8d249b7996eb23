//! The environment store service.

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use httpulse_domain::environment::{
    DEFAULT_ENVIRONMENT_NAME, Environment, EnvironmentVariable, dev_environment, prod_environment,
};
use httpulse_domain::request::HttpRequest;

use super::events::EnvironmentEvent;
use super::in_flight::{InFlight, StoreAction};
use crate::error::{ApplicationError, ApplicationResult};
use crate::ports::{Clock, EnvironmentRepository};
use crate::variable_resolver::{
    ResolutionResult, ValidationReport, VariableResolver, extract_variable_names,
};

/// Description given to variables written by a response handler.
pub const HANDLER_VARIABLE_DESCRIPTION: &str = "set by response handler";

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct StoreState {
    /// Sorted by name, then id.
    environments: Vec<Environment>,
}

impl StoreState {
    fn get(&self, id: &str) -> Option<&Environment> {
        self.environments.iter().find(|env| env.id == id)
    }

    fn active(&self) -> Option<&Environment> {
        self.environments.iter().find(|env| env.is_active)
    }

    fn name_taken(&self, name: &str, except_id: Option<&str>) -> bool {
        self.environments
            .iter()
            .any(|env| env.name == name && Some(env.id.as_str()) != except_id)
    }

    fn upsert(&mut self, environment: Environment) {
        match self.environments.iter_mut().find(|env| env.id == environment.id) {
            Some(existing) => *existing = environment,
            None => self.environments.push(environment),
        }
        sort_by_name(&mut self.environments);
    }

    fn remove(&mut self, id: &str) -> Option<Environment> {
        let index = self.environments.iter().position(|env| env.id == id)?;
        Some(self.environments.remove(index))
    }
}

fn sort_by_name(environments: &mut [Environment]) {
    environments.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}

fn not_found(id: &str) -> ApplicationError {
    ApplicationError::NotFound(format!("environment {id}"))
}

/// Service owning every environment and the active-environment selection.
///
/// Mutations are async: each one persists through the repository first and
/// only then updates the in-memory view, under a single write lock. A write
/// gate serialises mutations, so readers never observe a half-applied change
/// such as two active environments during a switch.
///
/// Lookups and substitution read the in-memory view and are synchronous.
/// Call [`EnvironmentStore::initialize`] once before use to load persisted
/// environments.
pub struct EnvironmentStore<R, C> {
    repository: R,
    clock: C,
    state: RwLock<StoreState>,
    write_gate: Mutex<()>,
    in_flight: InFlight,
    events: broadcast::Sender<EnvironmentEvent>,
}

impl<R: EnvironmentRepository, C: Clock> EnvironmentStore<R, C> {
    /// Creates an empty store over the given repository.
    pub fn new(repository: R, clock: C) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            repository,
            clock,
            state: RwLock::new(StoreState::default()),
            write_gate: Mutex::new(()),
            in_flight: InFlight::default(),
            events,
        }
    }

    /// Subscribes to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EnvironmentEvent> {
        self.events.subscribe()
    }

    /// Returns true while an operation of this kind is running.
    #[must_use]
    pub fn is_busy(&self, action: StoreAction) -> bool {
        self.in_flight.is_running(action)
    }

    /// Loads every persisted environment and returns them sorted by name.
    ///
    /// If more than one persisted environment is active, the first by name
    /// stays active and the others are cleared and written back.
    ///
    /// # Errors
    ///
    /// Returns `Busy` if a load is already running, or `Storage` if the
    /// repository fails.
    pub async fn initialize(&self) -> ApplicationResult<Vec<Environment>> {
        let _in_flight = self.in_flight.begin(StoreAction::Fetch)?;
        let _gate = self.write_gate.lock().await;

        let mut environments = self.repository.list().await?;
        sort_by_name(&mut environments);

        let mut repaired = Vec::new();
        let mut seen_active = false;
        for env in &mut environments {
            if env.is_active && seen_active {
                env.is_active = false;
                repaired.push(env.clone());
            }
            seen_active |= env.is_active;
        }
        if !repaired.is_empty() {
            info!(count = repaired.len(), "clearing extra active environments");
            self.repository.save_all(&repaired).await?;
        }

        let count = environments.len();
        self.state.write().environments.clone_from(&environments);

        debug!(count, "environments loaded");
        self.emit(EnvironmentEvent::Loaded { count });
        Ok(environments)
    }

    /// Returns every environment sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<Environment> {
        self.state.read().environments.clone()
    }

    /// Returns the environments whose enabled flag is set.
    #[must_use]
    pub fn enabled_environments(&self) -> Vec<Environment> {
        self.state
            .read()
            .environments
            .iter()
            .filter(|env| env.enabled)
            .cloned()
            .collect()
    }

    /// Looks up an environment by id.
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<Environment> {
        self.state.read().get(id).cloned()
    }

    /// Looks up an environment by exact name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Environment> {
        self.state
            .read()
            .environments
            .iter()
            .find(|env| env.name == name)
            .cloned()
    }

    /// Returns the active environment, if any.
    #[must_use]
    pub fn active_environment(&self) -> Option<Environment> {
        self.state.read().active().cloned()
    }

    /// Persists a new environment.
    ///
    /// The environment is stored inactive; use [`Self::set_active`] to
    /// select it. Both timestamps are set to the current time.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name or variable key, `Conflict` if
    /// the name or id is already used, `Busy` if another create is running.
    pub async fn create(&self, environment: Environment) -> ApplicationResult<Environment> {
        let _in_flight = self.in_flight.begin(StoreAction::Add)?;
        let _gate = self.write_gate.lock().await;
        self.create_locked(environment).await
    }

    /// Replaces a stored environment.
    ///
    /// The stored active flag and creation time are kept; `updated_at` is
    /// set to the current time.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no environment has this id, `Conflict` if the
    /// new name belongs to another environment.
    pub async fn update(&self, mut environment: Environment) -> ApplicationResult<Environment> {
        let _in_flight = self.in_flight.begin(StoreAction::Update)?;
        let _gate = self.write_gate.lock().await;

        environment.validate()?;
        let stored = self.require(&environment.id)?;
        self.ensure_name_free(&environment.name, Some(&environment.id))?;

        environment.is_active = stored.is_active;
        environment.created_at = stored.created_at;
        self.persist(environment).await
    }

    /// Renames an environment.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Validation` for a blank name, or `Conflict` if
    /// another environment already has the name.
    pub async fn rename(
        &self,
        id: &str,
        name: impl Into<String>,
    ) -> ApplicationResult<Environment> {
        let _in_flight = self.in_flight.begin(StoreAction::Update)?;
        let _gate = self.write_gate.lock().await;

        let mut environment = self.require(id)?;
        environment.name = name.into();
        environment.validate()?;
        self.ensure_name_free(&environment.name, Some(id))?;
        self.persist(environment).await
    }

    /// Deletes an environment. Removing the active one leaves none active.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no environment has this id.
    pub async fn remove(&self, id: &str) -> ApplicationResult<()> {
        self.remove_many(&[id.to_string()]).await
    }

    /// Deletes several environments.
    ///
    /// Every id is checked before anything is deleted.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for the first unknown id, in which case nothing is
    /// deleted.
    pub async fn remove_many(&self, ids: &[String]) -> ApplicationResult<()> {
        let _in_flight = self.in_flight.begin(StoreAction::Remove)?;
        let _gate = self.write_gate.lock().await;

        let mut unique: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            self.require(id)?;
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }
        if unique.is_empty() {
            return Ok(());
        }

        if let Err(error) = self.repository.delete_many(&unique).await {
            let active_id = self.state.read().active().map(|env| env.id.clone());
            let removed = self.reconcile(&unique).await;
            if !removed.is_empty() {
                warn!(ids = ?removed, %error, "delete failed after removing some environments");
                let removed_active = active_id.is_some_and(|id| removed.contains(&id));
                self.emit(EnvironmentEvent::Removed { ids: removed });
                if removed_active {
                    self.emit(EnvironmentEvent::ActiveChanged { id: None });
                }
            }
            return Err(error.into());
        }

        let removed_active = {
            let mut state = self.state.write();
            unique
                .iter()
                .filter_map(|id| state.remove(id))
                .fold(false, |acc, env| acc || env.is_active)
        };

        debug!(ids = ?unique, "environments removed");
        self.emit(EnvironmentEvent::Removed { ids: unique });
        if removed_active {
            self.emit(EnvironmentEvent::ActiveChanged { id: None });
        }
        Ok(())
    }

    /// Makes the environment with `id` the only active one.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no environment has this id. On any error the
    /// previous selection is left in place.
    pub async fn set_active(&self, id: &str) -> ApplicationResult<Environment> {
        let _in_flight = self.in_flight.begin(StoreAction::Switch)?;
        let _gate = self.write_gate.lock().await;
        self.set_active_locked(id).await
    }

    /// Deactivates every environment.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the repository fails.
    pub async fn clear_active(&self) -> ApplicationResult<()> {
        let _in_flight = self.in_flight.begin(StoreAction::Switch)?;
        let _gate = self.write_gate.lock().await;

        let changed: Vec<Environment> = self
            .state
            .read()
            .environments
            .iter()
            .filter(|env| env.is_active)
            .map(|env| Environment {
                is_active: false,
                ..env.clone()
            })
            .collect();

        self.apply_activation(changed, None).await
    }

    /// Inserts a variable or replaces the one with the same key.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the environment does not exist, `Validation` for
    /// a blank key.
    pub async fn add_or_update_variable(
        &self,
        environment_id: &str,
        variable: EnvironmentVariable,
    ) -> ApplicationResult<Environment> {
        let _gate = self.write_gate.lock().await;
        self.upsert_variable_locked(environment_id, variable).await
    }

    /// Inserts a variable, refusing to overwrite an existing key.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the key already exists, otherwise as
    /// [`Self::add_or_update_variable`].
    pub async fn insert_variable(
        &self,
        environment_id: &str,
        variable: EnvironmentVariable,
    ) -> ApplicationResult<Environment> {
        let _gate = self.write_gate.lock().await;

        variable.validate()?;
        let mut environment = self.require(environment_id)?;
        environment.insert_variable(variable)?;
        self.persist(environment).await
    }

    /// Removes a variable by key. An absent key is not an error and writes
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the environment does not exist.
    pub async fn remove_variable(
        &self,
        environment_id: &str,
        key: &str,
    ) -> ApplicationResult<Environment> {
        let _gate = self.write_gate.lock().await;

        let mut environment = self.require(environment_id)?;
        if environment.remove_variable(key).is_none() {
            return Ok(environment);
        }
        self.persist(environment).await
    }

    /// Creates the "dev" and "prod" presets and activates "dev".
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if either name is already taken.
    pub async fn create_default_environments(&self) -> ApplicationResult<Vec<Environment>> {
        let _in_flight = self.in_flight.begin(StoreAction::Add)?;
        let _gate = self.write_gate.lock().await;

        let dev = self.create_locked(dev_environment()).await?;
        let prod = self.create_locked(prod_environment()).await?;
        let dev = self.set_active_locked(&dev.id).await?;
        Ok(vec![dev, prod])
    }

    /// Stores a value extracted by a response handler.
    ///
    /// The value goes into the active environment. With none active, the
    /// first environment by name is activated; with no environments at all, a
    /// "default" one is created and activated.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank key, or `Storage` on repository
    /// failure.
    pub async fn store_handler_value(
        &self,
        key: &str,
        value: &str,
    ) -> ApplicationResult<Environment> {
        let variable =
            EnvironmentVariable::new(key, value).with_description(HANDLER_VARIABLE_DESCRIPTION);
        variable.validate()?;

        let _gate = self.write_gate.lock().await;

        let active_id = self.state.read().active().map(|env| env.id.clone());
        let target_id = match active_id {
            Some(id) => id,
            None => {
                let first_id = self.state.read().environments.first().map(|env| env.id.clone());
                let id = match first_id {
                    Some(id) => id,
                    None => {
                        self.create_locked(Environment::new(DEFAULT_ENVIRONMENT_NAME))
                            .await?
                            .id
                    }
                };
                info!(%id, "no active environment, activating one for handler value");
                self.set_active_locked(&id).await?;
                id
            }
        };

        self.upsert_variable_locked(&target_id, variable).await
    }

    /// Returns the value of `key` in the active environment.
    #[must_use]
    pub fn resolve(&self, key: &str) -> Option<String> {
        self.state
            .read()
            .active()
            .and_then(|env| env.resolve(key))
            .map(str::to_string)
    }

    /// Replaces every resolvable placeholder in `text`.
    ///
    /// Placeholders without a value are left verbatim.
    #[must_use]
    pub fn substitute(&self, text: &str) -> String {
        let state = self.state.read();
        VariableResolver::new(state.active()).substitute(text)
    }

    /// Like [`Self::substitute`], also reporting which names resolved.
    #[must_use]
    pub fn resolve_text(&self, text: &str) -> ResolutionResult {
        let state = self.state.read();
        VariableResolver::new(state.active()).resolve(text)
    }

    /// Applies [`Self::substitute`] to every string inside a JSON value.
    #[must_use]
    pub fn substitute_deep(&self, value: &Value) -> Value {
        let state = self.state.read();
        VariableResolver::new(state.active()).resolve_value_deep(value)
    }

    /// Returns the distinct placeholder names in `text`, in order of first use.
    #[must_use]
    pub fn extract_placeholders(text: &str) -> Vec<String> {
        extract_variable_names(text)
    }

    /// Checks that every placeholder in `text` resolves.
    ///
    /// With no active environment every placeholder is reported unresolved.
    #[must_use]
    pub fn validate(&self, text: &str) -> ValidationReport {
        let state = self.state.read();
        VariableResolver::new(state.active()).validate(text)
    }

    /// Returns a copy of `request` with placeholders substituted in every
    /// text field.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the request does not survive conversion to and
    /// from JSON.
    pub fn resolve_request(&self, request: &HttpRequest) -> ApplicationResult<HttpRequest> {
        let value = serde_json::to_value(request)
            .map_err(|e| ApplicationError::Internal(format!("request to JSON: {e}")))?;
        let resolved = self.substitute_deep(&value);
        serde_json::from_value(resolved)
            .map_err(|e| ApplicationError::Internal(format!("request from JSON: {e}")))
    }

    fn emit(&self, event: EnvironmentEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn require(&self, id: &str) -> ApplicationResult<Environment> {
        self.state.read().get(id).cloned().ok_or_else(|| not_found(id))
    }

    fn ensure_name_free(&self, name: &str, except_id: Option<&str>) -> ApplicationResult<()> {
        if self.state.read().name_taken(name, except_id) {
            return Err(ApplicationError::Conflict(format!(
                "environment name '{name}' is already used"
            )));
        }
        Ok(())
    }

    async fn create_locked(&self, mut environment: Environment) -> ApplicationResult<Environment> {
        environment.validate()?;
        if self.state.read().get(&environment.id).is_some() {
            return Err(ApplicationError::Conflict(format!(
                "environment id '{}' already exists",
                environment.id
            )));
        }
        self.ensure_name_free(&environment.name, None)?;

        let now = self.clock.now();
        environment.is_active = false;
        environment.created_at = now;
        environment.updated_at = now;

        self.repository.save(&environment).await?;
        self.state.write().upsert(environment.clone());

        debug!(id = %environment.id, name = %environment.name, "environment created");
        self.emit(EnvironmentEvent::Created {
            id: environment.id.clone(),
        });
        Ok(environment)
    }

    async fn persist(&self, mut environment: Environment) -> ApplicationResult<Environment> {
        environment.updated_at = self.clock.now();

        self.repository.save(&environment).await?;
        self.state.write().upsert(environment.clone());

        debug!(
            id = %environment.id,
            variables = environment.variable_count(),
            "environment updated"
        );
        self.emit(EnvironmentEvent::Updated {
            id: environment.id.clone(),
        });
        Ok(environment)
    }

    async fn upsert_variable_locked(
        &self,
        environment_id: &str,
        variable: EnvironmentVariable,
    ) -> ApplicationResult<Environment> {
        variable.validate()?;
        let mut environment = self.require(environment_id)?;
        environment.upsert_variable(variable);
        self.persist(environment).await
    }

    async fn set_active_locked(&self, id: &str) -> ApplicationResult<Environment> {
        let mut changed: Vec<Environment> = {
            let state = self.state.read();
            if state.get(id).is_none() {
                return Err(not_found(id));
            }
            state
                .environments
                .iter()
                .filter(|env| env.is_active != (env.id == id))
                .map(|env| Environment {
                    is_active: env.id == id,
                    ..env.clone()
                })
                .collect()
        };
        // Deactivations first: a partial write leaves at most one active.
        changed.sort_by_key(|env| env.is_active);

        self.apply_activation(changed, Some(id)).await?;
        self.require(id)
    }

    /// Persists the flipped flags, then swaps them into memory in one step.
    async fn apply_activation(
        &self,
        changed: Vec<Environment>,
        active_id: Option<&str>,
    ) -> ApplicationResult<()> {
        if changed.is_empty() {
            return Ok(());
        }

        if let Err(error) = self.repository.save_all(&changed).await {
            let before = self.state.read().active().map(|env| env.id.clone());
            let ids: Vec<String> = changed.iter().map(|env| env.id.clone()).collect();
            self.reconcile(&ids).await;
            let after = self.state.read().active().map(|env| env.id.clone());
            if before != after {
                warn!(active = ?after, %error, "activation partly written");
                self.emit(EnvironmentEvent::ActiveChanged { id: after });
            }
            return Err(error.into());
        }
        {
            let mut state = self.state.write();
            for env in changed {
                state.upsert(env);
            }
        }

        debug!(active = ?active_id, "active environment changed");
        self.emit(EnvironmentEvent::ActiveChanged {
            id: active_id.map(str::to_string),
        });
        Ok(())
    }

    /// Re-reads `ids` after a failed multi-record write so memory matches
    /// what the repository holds. Returns the ids found to be deleted.
    async fn reconcile(&self, ids: &[String]) -> Vec<String> {
        let mut persisted = Vec::with_capacity(ids.len());
        for id in ids {
            match self.repository.get(id).await {
                Ok(found) => persisted.push((id.clone(), found)),
                Err(error) => warn!(%id, %error, "cannot re-read environment"),
            }
        }

        let mut removed = Vec::new();
        let mut state = self.state.write();
        for (id, found) in persisted {
            match found {
                Some(environment) => state.upsert(environment),
                None => {
                    if state.remove(&id).is_some() {
                        removed.push(id);
                    }
                }
            }
        }
        drop(state);
        removed
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::significant_drop_tightening
)]
mod tests {
    use super::*;
    use crate::ports::EnvironmentError;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use httpulse_domain::DomainError;
    use httpulse_domain::auth::AuthConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct SaveGate {
        entered: Notify,
        release: Notify,
    }

    #[derive(Default)]
    struct MockRepository {
        environments: StdMutex<HashMap<String, Environment>>,
        writes: AtomicUsize,
        fail_writes: AtomicBool,
        failing_id: StdMutex<Option<String>>,
        gate: Option<Arc<SaveGate>>,
    }

    impl MockRepository {
        fn with(environments: Vec<Environment>) -> Self {
            let repo = Self::default();
            {
                let mut map = repo.environments.lock().unwrap();
                for env in environments {
                    map.insert(env.id.clone(), env);
                }
            }
            repo
        }

        fn gated(gate: Arc<SaveGate>) -> Self {
            Self::default().with_gate(gate)
        }

        fn with_gate(mut self, gate: Arc<SaveGate>) -> Self {
            self.gate = Some(gate);
            self
        }

        /// Makes every write touching `id` fail.
        fn fail_on(&self, id: &str) {
            *self.failing_id.lock().unwrap() = Some(id.to_string());
        }

        fn stored_ids(&self) -> Vec<String> {
            let mut ids: Vec<String> = self.environments.lock().unwrap().keys().cloned().collect();
            ids.sort();
            ids
        }

        async fn wait_for_gate(&self) {
            if let Some(gate) = &self.gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }

        fn stored(&self, id: &str) -> Option<Environment> {
            self.environments.lock().unwrap().get(id).cloned()
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn check_writable(&self, id: &str) -> Result<(), EnvironmentError> {
            let failing = self.failing_id.lock().unwrap().as_deref() == Some(id);
            if failing || self.fail_writes.load(Ordering::SeqCst) {
                return Err(EnvironmentError::Io(std::io::Error::other("disk full")));
            }
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl EnvironmentRepository for MockRepository {
        async fn get(&self, id: &str) -> Result<Option<Environment>, EnvironmentError> {
            Ok(self.stored(id))
        }

        async fn list(&self) -> Result<Vec<Environment>, EnvironmentError> {
            Ok(self.environments.lock().unwrap().values().cloned().collect())
        }

        async fn save(&self, environment: &Environment) -> Result<(), EnvironmentError> {
            self.wait_for_gate().await;
            self.check_writable(&environment.id)?;
            self.environments
                .lock()
                .unwrap()
                .insert(environment.id.clone(), environment.clone());
            Ok(())
        }

        /// Writes one record at a time, so a failure leaves earlier ones
        /// written.
        async fn save_all(&self, environments: &[Environment]) -> Result<(), EnvironmentError> {
            self.wait_for_gate().await;
            for env in environments {
                self.check_writable(&env.id)?;
                self.environments
                    .lock()
                    .unwrap()
                    .insert(env.id.clone(), env.clone());
            }
            Ok(())
        }

        async fn delete(&self, id: &str) -> Result<(), EnvironmentError> {
            self.check_writable(id)?;
            self.environments
                .lock()
                .unwrap()
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| EnvironmentError::NotFound(id.to_string()))
        }
    }

    /// Ticks one second per call.
    #[derive(Default)]
    struct StepClock {
        ticks: AtomicI64,
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            DateTime::from_timestamp(1_700_000_000 + tick, 0).expect("valid timestamp")
        }
    }

    type TestStore = EnvironmentStore<MockRepository, StepClock>;

    fn store() -> TestStore {
        EnvironmentStore::new(MockRepository::default(), StepClock::default())
    }

    fn active_count(store: &TestStore) -> usize {
        store.list().iter().filter(|env| env.is_active).count()
    }

    async fn create(store: &TestStore, name: &str) -> Environment {
        store.create(Environment::new(name)).await.expect("create")
    }

    #[tokio::test]
    async fn test_substitute_against_active_environment() {
        let store = store();
        let dev = store
            .create(Environment::new("dev").with_variable("baseUrl", "http://localhost:3000"))
            .await
            .unwrap();

        store.set_active(&dev.id).await.unwrap();

        assert_eq!(
            store.substitute("{{baseUrl}}/users"),
            "http://localhost:3000/users"
        );
        assert_eq!(store.resolve("baseUrl").as_deref(), Some("http://localhost:3000"));
    }

    #[tokio::test]
    async fn test_create_validates_and_persists_inactive() {
        let store = store();
        let mut env = Environment::new("dev");
        env.is_active = true;

        let created = store.create(env).await.unwrap();

        assert!(!created.is_active);
        assert_eq!(created.created_at, created.updated_at);
        assert_eq!(store.repository.stored(&created.id), Some(created.clone()));
        assert_eq!(store.active_environment(), None);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let store = store();
        let result = store.create(Environment::new("  ")).await;
        assert!(matches!(
            result,
            Err(ApplicationError::Validation(DomainError::InvalidEnvironmentName(_)))
        ));
        assert!(store.list().is_empty());
        assert_eq!(store.repository.writes(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name() {
        let store = store();
        create(&store, "dev").await;
        let result = store.create(Environment::new("dev")).await;
        assert!(matches!(result, Err(ApplicationError::Conflict(_))));
        assert_eq!(store.list().len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_name() {
        let store = store();
        for name in ["staging", "Prod", "dev"] {
            create(&store, name).await;
        }
        let names: Vec<String> = store.list().into_iter().map(|env| env.name).collect();
        assert_eq!(names, vec!["Prod", "dev", "staging"]);
    }

    #[tokio::test]
    async fn test_lookups_return_none_when_absent() {
        let store = store();
        let dev = create(&store, "dev").await;

        assert_eq!(store.get_by_id(&dev.id), Some(dev.clone()));
        assert_eq!(store.get_by_name("dev"), Some(dev));
        assert_eq!(store.get_by_id("missing"), None);
        assert_eq!(store.get_by_name("DEV"), None);
    }

    #[tokio::test]
    async fn test_enabled_environments() {
        let store = store();
        create(&store, "a").await;
        let mut disabled = Environment::new("b");
        disabled.enabled = false;
        store.create(disabled).await.unwrap();

        let names: Vec<String> = store
            .enabled_environments()
            .into_iter()
            .map(|env| env.name)
            .collect();
        assert_eq!(names, vec!["a"]);
    }

    #[tokio::test]
    async fn test_update_refreshes_active_view() {
        let store = store();
        let dev = create(&store, "dev").await;
        store.set_active(&dev.id).await.unwrap();

        let mut edited = dev.clone().with_variable("token", "abc");
        edited.is_active = false;
        let updated = store.update(edited).await.unwrap();

        assert!(updated.is_active);
        assert_eq!(updated.created_at, dev.created_at);
        assert!(updated.updated_at > dev.updated_at);
        assert_eq!(store.resolve("token").as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_update_missing_environment() {
        let store = store();
        let result = store.update(Environment::new("ghost")).await;
        assert!(matches!(result, Err(ApplicationError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rename() {
        let store = store();
        let dev = create(&store, "dev").await;
        create(&store, "prod").await;

        let renamed = store.rename(&dev.id, "local").await.unwrap();
        assert_eq!(renamed.name, "local");
        assert_eq!(store.get_by_name("local").map(|env| env.id), Some(dev.id.clone()));

        assert!(matches!(
            store.rename(&dev.id, "prod").await,
            Err(ApplicationError::Conflict(_))
        ));
        assert!(matches!(
            store.rename(&dev.id, "").await,
            Err(ApplicationError::Validation(_))
        ));
        assert!(matches!(
            store.rename("missing", "x").await,
            Err(ApplicationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_switch_active_environment() {
        let store = store();
        let env_a = create(&store, "envA").await;
        let env_b = create(&store, "envB").await;
        store.set_active(&env_a.id).await.unwrap();

        store.set_active(&env_b.id).await.unwrap();

        assert!(!store.get_by_id(&env_a.id).unwrap().is_active);
        assert!(store.get_by_id(&env_b.id).unwrap().is_active);
        assert_eq!(store.active_environment().map(|env| env.id), Some(env_b.id.clone()));
        assert!(!store.repository.stored(&env_a.id).unwrap().is_active);
        assert!(store.repository.stored(&env_b.id).unwrap().is_active);
    }

    #[tokio::test]
    async fn test_set_active_unknown_id_keeps_selection() {
        let store = store();
        let dev = create(&store, "dev").await;
        store.set_active(&dev.id).await.unwrap();

        let result = store.set_active("missing").await;

        assert!(matches!(result, Err(ApplicationError::NotFound(_))));
        assert_eq!(store.active_environment().map(|env| env.id), Some(dev.id));
    }

    #[tokio::test]
    async fn test_failed_switch_leaves_state_untouched() {
        let store = store();
        let a = create(&store, "a").await;
        let b = create(&store, "b").await;
        store.set_active(&a.id).await.unwrap();

        store.repository.fail_writes.store(true, Ordering::SeqCst);
        let result = store.set_active(&b.id).await;

        assert!(matches!(result, Err(ApplicationError::Storage(_))));
        assert_eq!(store.active_environment().map(|env| env.id), Some(a.id));
        assert_eq!(active_count(&store), 1);
    }

    #[tokio::test]
    async fn test_clear_active() {
        let store = store();
        let dev = create(&store, "dev").await;
        store.set_active(&dev.id).await.unwrap();

        store.clear_active().await.unwrap();

        assert_eq!(store.active_environment(), None);
        assert_eq!(active_count(&store), 0);
        assert!(!store.repository.stored(&dev.id).unwrap().is_active);
        assert_eq!(store.resolve("anything"), None);
    }

    #[tokio::test]
    async fn test_remove_active_does_not_promote_another() {
        let store = store();
        let a = create(&store, "a").await;
        create(&store, "b").await;
        store.set_active(&a.id).await.unwrap();

        store.remove(&a.id).await.unwrap();

        assert_eq!(store.active_environment(), None);
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.repository.stored(&a.id), None);
    }

    #[tokio::test]
    async fn test_remove_unknown_id() {
        let store = store();
        let result = store.remove("missing").await;
        assert!(matches!(result, Err(ApplicationError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_many_checks_every_id_first() {
        let store = store();
        let a = create(&store, "a").await;
        let b = create(&store, "b").await;

        let result = store
            .remove_many(&[a.id.clone(), "missing".to_string()])
            .await;
        assert!(matches!(result, Err(ApplicationError::NotFound(_))));
        assert_eq!(store.list().len(), 2);

        store
            .remove_many(&[a.id.clone(), b.id.clone(), a.id.clone()])
            .await
            .unwrap();
        assert!(store.list().is_empty());
    }

    #[tokio::test]
    async fn test_single_active_invariant_across_operations() {
        let store = store();
        let a = create(&store, "a").await;
        let b = create(&store, "b").await;
        let c = create(&store, "c").await;

        store.set_active(&a.id).await.unwrap();
        assert_eq!(active_count(&store), 1);
        store.set_active(&b.id).await.unwrap();
        assert_eq!(active_count(&store), 1);
        store.set_active(&b.id).await.unwrap();
        assert_eq!(active_count(&store), 1);
        store.remove(&b.id).await.unwrap();
        assert_eq!(active_count(&store), 0);
        store.set_active(&c.id).await.unwrap();
        assert_eq!(active_count(&store), 1);
        store.clear_active().await.unwrap();
        assert_eq!(active_count(&store), 0);
        store.set_active(&a.id).await.unwrap();

        let persisted_active = store
            .repository
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|env| env.is_active)
            .count();
        assert_eq!(persisted_active, 1);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = store();
        let dev = create(&store, "dev").await;

        store
            .add_or_update_variable(&dev.id, EnvironmentVariable::new("a", "1"))
            .await
            .unwrap();
        let env = store
            .add_or_update_variable(&dev.id, EnvironmentVariable::new("a", "1"))
            .await
            .unwrap();

        assert_eq!(env.variables, vec![EnvironmentVariable::new("a", "1")]);
        assert_eq!(store.get_by_id(&dev.id).unwrap().variables.len(), 1);
    }

    #[tokio::test]
    async fn test_add_variable_to_missing_environment() {
        let store = store();
        let result = store
            .add_or_update_variable("missing", EnvironmentVariable::new("a", "1"))
            .await;
        assert!(matches!(result, Err(ApplicationError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_variable_rejects_blank_key() {
        let store = store();
        let dev = create(&store, "dev").await;
        let result = store
            .add_or_update_variable(&dev.id, EnvironmentVariable::new(" ", "1"))
            .await;
        assert!(matches!(result, Err(ApplicationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_insert_variable_conflict() {
        let store = store();
        let dev = create(&store, "dev").await;
        store
            .insert_variable(&dev.id, EnvironmentVariable::new("a", "1"))
            .await
            .unwrap();

        let result = store
            .insert_variable(&dev.id, EnvironmentVariable::new("a", "2"))
            .await;

        assert!(matches!(result, Err(ApplicationError::Conflict(_))));
        assert_eq!(store.get_by_id(&dev.id).unwrap().resolve("a"), Some("1"));
    }

    #[tokio::test]
    async fn test_remove_missing_variable_is_noop() {
        let store = store();
        let dev = store
            .create(Environment::new("dev").with_variable("a", "1"))
            .await
            .unwrap();
        let writes = store.repository.writes();

        let env = store.remove_variable(&dev.id, "missingKey").await.unwrap();

        assert_eq!(env.variables, dev.variables);
        assert_eq!(store.repository.writes(), writes);
    }

    #[tokio::test]
    async fn test_remove_variable() {
        let store = store();
        let dev = store
            .create(Environment::new("dev").with_variable("a", "1").with_variable("b", "2"))
            .await
            .unwrap();

        let env = store.remove_variable(&dev.id, "a").await.unwrap();

        assert_eq!(env.variable_keys(), vec!["b"]);
        assert_eq!(store.repository.stored(&dev.id).unwrap().variable_keys(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_unresolved_placeholders_stay_visible() {
        let store = store();
        assert_eq!(store.substitute("{{a}} and {{ b }}"), "{{a}} and {{ b }}");

        let dev = store
            .create(Environment::new("dev").with_variable("a", "1"))
            .await
            .unwrap();
        store.set_active(&dev.id).await.unwrap();

        assert_eq!(store.substitute("{{a}} and {{ b }}"), "1 and {{ b }}");
        let result = store.resolve_text("{{a}} and {{ b }}");
        assert_eq!(result.unresolved, vec!["b"]);
    }

    #[tokio::test]
    async fn test_substitute_deep() {
        let store = store();
        let dev = store
            .create(Environment::new("dev").with_variable("host", "h"))
            .await
            .unwrap();
        store.set_active(&dev.id).await.unwrap();

        let value = json!({"url": "{{host}}/a", "n": 1, "list": ["{{host}}", false]});

        assert_eq!(
            store.substitute_deep(&value),
            json!({"url": "h/a", "n": 1, "list": ["h", false]})
        );
    }

    #[tokio::test]
    async fn test_validate_and_extract() {
        let store = store();
        let text = "{{a}}/{{b}}/{{a}}";

        assert_eq!(TestStore::extract_placeholders(text), vec!["a", "b"]);

        let report = store.validate(text);
        assert!(!report.valid);
        assert_eq!(report.unresolved, vec!["a", "b"]);

        let dev = store
            .create(Environment::new("dev").with_variable("a", "").with_variable("b", "2"))
            .await
            .unwrap();
        store.set_active(&dev.id).await.unwrap();

        let report = store.validate(text);
        assert!(report.valid);
        assert!(report.unresolved.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_request() {
        let store = store();
        let dev = store
            .create(
                Environment::new("dev")
                    .with_variable("baseUrl", "http://localhost:3000")
                    .with_variable("token", "abc"),
            )
            .await
            .unwrap();
        store.set_active(&dev.id).await.unwrap();

        let request = HttpRequest::get("{{baseUrl}}/users")
            .with_header("Authorization", "Bearer {{token}}")
            .with_query("q", "{{missing}}")
            .with_auth(AuthConfig::bearer("{{token}}"));

        let resolved = store.resolve_request(&request).unwrap();

        assert_eq!(resolved.uri, "http://localhost:3000/users");
        assert_eq!(resolved.headers.all()[0].value, "Bearer abc");
        assert_eq!(resolved.query.all()[0].value, "{{missing}}");
        assert_eq!(resolved.auth, vec![AuthConfig::bearer("abc")]);
        assert_eq!(resolved.method, request.method);
    }

    #[tokio::test]
    async fn test_initialize_loads_sorted_and_repairs_actives() {
        let mut b = Environment::new("b");
        b.is_active = true;
        let mut a = Environment::new("a");
        a.is_active = true;
        let c = Environment::new("c");
        let store = EnvironmentStore::new(
            MockRepository::with(vec![b.clone(), a.clone(), c]),
            StepClock::default(),
        );

        let loaded = store.initialize().await.unwrap();

        let names: Vec<&str> = loaded.iter().map(|env| env.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(store.active_environment().map(|env| env.id), Some(a.id));
        assert_eq!(active_count(&store), 1);
        assert!(!store.repository.stored(&b.id).unwrap().is_active);
    }

    #[tokio::test]
    async fn test_create_default_environments() {
        let store = store();

        let created = store.create_default_environments().await.unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(
            store.active_environment().map(|env| env.name),
            Some("dev".to_string())
        );
        assert_eq!(store.resolve("baseUrl").as_deref(), Some("http://localhost:3000"));
        assert!(matches!(
            store.create_default_environments().await,
            Err(ApplicationError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_store_handler_value_creates_default_environment() {
        let store = store();

        let env = store.store_handler_value("token", "xyz").await.unwrap();

        assert_eq!(env.name, DEFAULT_ENVIRONMENT_NAME);
        assert!(env.is_active);
        assert_eq!(
            env.get_variable("token"),
            Some(
                &EnvironmentVariable::new("token", "xyz")
                    .with_description(HANDLER_VARIABLE_DESCRIPTION)
            )
        );
        assert_eq!(store.resolve("token").as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_store_handler_value_activates_first_by_name() {
        let store = store();
        create(&store, "zeta").await;
        let alpha = create(&store, "alpha").await;

        let env = store.store_handler_value("id", "7").await.unwrap();

        assert_eq!(env.id, alpha.id);
        assert_eq!(store.active_environment().map(|e| e.id), Some(alpha.id));
    }

    #[tokio::test]
    async fn test_store_handler_value_uses_active() {
        let store = store();
        create(&store, "alpha").await;
        let beta = create(&store, "beta").await;
        store.set_active(&beta.id).await.unwrap();

        let env = store.store_handler_value("id", "7").await.unwrap();

        assert_eq!(env.id, beta.id);
        assert_eq!(store.resolve("id").as_deref(), Some("7"));
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let store = store();
        let mut events = store.subscribe();

        let dev = create(&store, "dev").await;
        store.set_active(&dev.id).await.unwrap();
        store
            .add_or_update_variable(&dev.id, EnvironmentVariable::new("a", "1"))
            .await
            .unwrap();
        store.remove(&dev.id).await.unwrap();

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert_eq!(
            received,
            vec![
                EnvironmentEvent::Created { id: dev.id.clone() },
                EnvironmentEvent::ActiveChanged {
                    id: Some(dev.id.clone())
                },
                EnvironmentEvent::Updated { id: dev.id.clone() },
                EnvironmentEvent::Removed {
                    ids: vec![dev.id.clone()]
                },
                EnvironmentEvent::ActiveChanged { id: None },
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_create_is_rejected() {
        let gate = Arc::new(SaveGate::default());
        let store = Arc::new(EnvironmentStore::new(
            MockRepository::gated(Arc::clone(&gate)),
            StepClock::default(),
        ));

        let first = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.create(Environment::new("a")).await }
        });
        gate.entered.notified().await;

        assert!(store.is_busy(StoreAction::Add));
        let second = store.create(Environment::new("b")).await;
        assert!(matches!(second, Err(ApplicationError::Busy("add"))));

        gate.release.notify_one();
        first.await.expect("join").expect("create");
        assert!(!store.is_busy(StoreAction::Add));
        assert_eq!(store.list().len(), 1);
    }

    #[tokio::test]
    async fn test_readers_see_one_active_during_switch() {
        let mut a = Environment::new("a");
        a.is_active = true;
        let b = Environment::new("b");
        let gate = Arc::new(SaveGate::default());
        let repository =
            MockRepository::with(vec![a.clone(), b.clone()]).with_gate(Arc::clone(&gate));
        let store = Arc::new(EnvironmentStore::new(repository, StepClock::default()));
        store.initialize().await.unwrap();

        let switch = tokio::spawn({
            let store = Arc::clone(&store);
            let id = b.id.clone();
            async move { store.set_active(&id).await }
        });
        gate.entered.notified().await;

        assert!(store.is_busy(StoreAction::Switch));
        assert_eq!(active_count(&store), 1);
        assert_eq!(store.active_environment().map(|env| env.id), Some(a.id.clone()));

        gate.release.notify_one();
        switch.await.expect("join").expect("switch");

        assert_eq!(active_count(&store), 1);
        assert_eq!(store.active_environment().map(|env| env.id), Some(b.id.clone()));
    }

    #[tokio::test]
    async fn test_failed_remove_many_drops_what_was_deleted() {
        let store = store();
        let a = create(&store, "a").await;
        let b = create(&store, "b").await;
        store.set_active(&a.id).await.unwrap();
        store.repository.fail_on(&b.id);
        let mut events = store.subscribe();

        let result = store.remove_many(&[a.id.clone(), b.id.clone()]).await;

        assert!(matches!(result, Err(ApplicationError::Storage(_))));
        assert_eq!(store.repository.stored_ids(), vec![b.id.clone()]);
        let ids: Vec<String> = store.list().into_iter().map(|env| env.id).collect();
        assert_eq!(ids, vec![b.id.clone()]);
        assert_eq!(store.active_environment(), None);
        assert_eq!(
            events.try_recv().unwrap(),
            EnvironmentEvent::Removed { ids: vec![a.id.clone()] }
        );
        assert_eq!(events.try_recv().unwrap(), EnvironmentEvent::ActiveChanged { id: None });
    }

    #[tokio::test]
    async fn test_failed_switch_matches_persisted_flags() {
        let store = store();
        let a = create(&store, "a").await;
        let b = create(&store, "b").await;
        store.set_active(&a.id).await.unwrap();
        store.repository.fail_on(&b.id);

        let result = store.set_active(&b.id).await;

        assert!(matches!(result, Err(ApplicationError::Storage(_))));
        assert_eq!(store.repository.stored(&a.id).map(|env| env.is_active), Some(false));
        assert_eq!(store.repository.stored(&b.id).map(|env| env.is_active), Some(false));
        assert_eq!(store.active_environment(), None);
        assert_eq!(active_count(&store), 0);
    }
}
