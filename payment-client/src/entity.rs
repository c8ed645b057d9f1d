//! Generic entity layer.
//!
//! [`EntityResource`] gives any REST collection a uniform
//! create/update/remove/get-by-id/get-all surface with shared loading and
//! error state, optional callbacks, and optional notifications.
//!
//! | Operation | Method | Path | Success notification |
//! |-----------|--------|------|----------------------|
//! | `create` | POST | `{endpoint}` | `Created successfully!` |
//! | `update` | PUT | `{endpoint}/{id}` | `Updated successfully!` |
//! | `remove` | DELETE | `{endpoint}/{id}` | `Deleted successfully!` |
//! | `get_by_id` | GET | `{endpoint}/{id}` | none |
//! | `get_all` | GET | `{endpoint}` | none |
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use payment_client::{
//!     client::ApiClient,
//!     config::ClientConfig,
//!     entity::{EntityOptions, EntityResource},
//!     models::Transaction,
//!     notify::TracingNotifier,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new(&ClientConfig::default())?;
//! let payments: EntityResource<Transaction> = EntityResource::new(
//!     client,
//!     "/api/payments",
//!     Arc::new(TracingNotifier),
//!     EntityOptions::default(),
//! );
//!
//! let all = payments.get_all().await?;
//! assert!(!payments.is_loading());
//! # Ok(())
//! # }
//! ```

use std::{fmt, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::{
    client::{ApiClient, RequestFailure, resource_path},
    error::{ApiError, Result},
    notify::{Notification, Notifier},
    transport::{HttpTransport, Transport},
};

/// Loading and error state shared by the operations of one resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadState {
    /// `true` while an operation is in flight.
    pub is_loading: bool,
    /// Error of the most recent failed operation, cleared when the next one
    /// starts.
    pub error: Option<ApiError>,
}

/// Observable [`LoadState`] cell.
///
/// Clones observe and modify the same state.
#[derive(Debug, Clone)]
pub struct StateHandle {
    tx: Arc<watch::Sender<LoadState>>,
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHandle {
    /// Creates an idle state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LoadState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Marks an operation as started and clears the previous error.
    ///
    /// Loading ends when the returned guard drops, on every exit path.
    pub fn begin(&self) -> LoadingGuard<'_> {
        self.tx.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });
        LoadingGuard { state: self }
    }

    /// Records a failure.
    pub fn set_error(&self, error: ApiError) {
        self.tx.send_modify(|state| state.error = Some(error));
    }

    /// Clears the recorded failure.
    pub fn clear_error(&self) {
        self.tx.send_if_modified(|state| state.error.take().is_some());
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> LoadState {
        self.tx.borrow().clone()
    }

    /// Returns `true` while an operation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.tx.borrow().is_loading
    }

    /// Returns the current error, if any.
    #[must_use]
    pub fn error(&self) -> Option<ApiError> {
        self.tx.borrow().error.clone()
    }

    /// Subscribes to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.tx.subscribe()
    }
}

/// Clears the loading flag on drop.
#[derive(Debug)]
#[must_use = "loading ends as soon as the guard is dropped"]
pub struct LoadingGuard<'a> {
    state: &'a StateHandle,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.tx.send_if_modified(|state| std::mem::replace(&mut state.is_loading, false));
    }
}

/// Payload passed to the success callback.
#[derive(Debug)]
pub enum EntityEvent<'a, T> {
    /// Entity returned by `create`.
    Created(&'a T),
    /// Entity returned by `update`.
    Updated(&'a T),
    /// Id passed to `remove`.
    Removed(&'a str),
    /// Entity returned by `get_by_id`.
    Fetched(&'a T),
    /// Entities returned by `get_all`.
    Listed(&'a [T]),
}

/// Success callback.
pub type SuccessCallback<T> = Arc<dyn Fn(EntityEvent<'_, T>) + Send + Sync>;

/// Error callback.
pub type ErrorCallback = Arc<dyn Fn(&ApiError) + Send + Sync>;

/// Per-resource options. Every field defaults independently.
pub struct EntityOptions<T> {
    /// Called after every successful operation.
    pub on_success: Option<SuccessCallback<T>>,
    /// Called after every failed operation.
    pub on_error: Option<ErrorCallback>,
    /// Emit notifications (default: `true`).
    pub show_toast: bool,
}

impl<T> Default for EntityOptions<T> {
    fn default() -> Self {
        Self { on_success: None, on_error: None, show_toast: true }
    }
}

impl<T> Clone for EntityOptions<T> {
    fn clone(&self) -> Self {
        Self {
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            show_toast: self.show_toast,
        }
    }
}

impl<T> fmt::Debug for EntityOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityOptions")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("show_toast", &self.show_toast)
            .finish()
    }
}

impl<T> EntityOptions<T> {
    /// Sets the success callback.
    #[must_use]
    pub fn on_success(mut self, callback: impl Fn(EntityEvent<'_, T>) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Sets the error callback.
    #[must_use]
    pub fn on_error(mut self, callback: impl Fn(&ApiError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Enables or disables notifications.
    #[must_use]
    pub const fn show_toast(mut self, show_toast: bool) -> Self {
        self.show_toast = show_toast;
        self
    }
}

/// The five entity operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOperation {
    /// `POST {endpoint}`
    Create,
    /// `PUT {endpoint}/{id}`
    Update,
    /// `DELETE {endpoint}/{id}`
    Remove,
    /// `GET {endpoint}/{id}`
    GetById,
    /// `GET {endpoint}`
    GetAll,
}

impl EntityOperation {
    /// Message used when the backend gives none.
    #[must_use]
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::Create => "Failed to create",
            Self::Update => "Failed to update",
            Self::Remove => "Failed to delete",
            Self::GetById | Self::GetAll => "Failed to fetch",
        }
    }

    /// Notification text for a success, if the operation has one.
    #[must_use]
    pub const fn success_message(self) -> Option<&'static str> {
        match self {
            Self::Create => Some("Created successfully!"),
            Self::Update => Some("Updated successfully!"),
            Self::Remove => Some("Deleted successfully!"),
            Self::GetById | Self::GetAll => None,
        }
    }
}

/// Uniform CRUD access to one endpoint.
pub struct EntityResource<T, X = HttpTransport> {
    client: ApiClient<X>,
    endpoint: String,
    notifier: Arc<dyn Notifier>,
    options: EntityOptions<T>,
    state: StateHandle,
}

impl<T, X: fmt::Debug> fmt::Debug for EntityResource<T, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityResource")
            .field("client", &self.client)
            .field("endpoint", &self.endpoint)
            .field("options", &self.options)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T, X> Clone for EntityResource<T, X> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            notifier: Arc::clone(&self.notifier),
            options: self.options.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T, X> EntityResource<T, X>
where
    T: DeserializeOwned,
    X: Transport,
{
    /// Creates a resource for `endpoint`, e.g. `/api/payments`.
    pub fn new(
        client: ApiClient<X>,
        endpoint: impl Into<String>,
        notifier: Arc<dyn Notifier>,
        options: EntityOptions<T>,
    ) -> Self {
        let endpoint = endpoint.into();
        let endpoint = endpoint.trim_end_matches('/').to_owned();
        Self { client, endpoint, notifier, options, state: StateHandle::new() }
    }

    /// Returns the collection path.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the shared state cell.
    #[must_use]
    pub const fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Returns `true` while an operation is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Returns the error of the last failed operation.
    #[must_use]
    pub fn error(&self) -> Option<ApiError> {
        self.state.error()
    }

    /// Creates an entity.
    ///
    /// # Errors
    ///
    /// Returns the normalized [`ApiError`]; it is also stored as the
    /// current error.
    #[instrument(skip(self, data), fields(endpoint = %self.endpoint))]
    pub async fn create<B: Serialize + ?Sized>(&self, data: &B) -> Result<T> {
        let operation = EntityOperation::Create;
        let created = self.run(operation, self.client.post(&self.endpoint, data)).await?;
        self.succeed(operation, EntityEvent::Created(&created));
        Ok(created)
    }

    /// Replaces the entity `id`.
    ///
    /// # Errors
    ///
    /// Returns the normalized [`ApiError`]; it is also stored as the
    /// current error.
    #[instrument(skip(self, data), fields(endpoint = %self.endpoint))]
    pub async fn update<B: Serialize + ?Sized>(&self, id: &str, data: &B) -> Result<T> {
        let operation = EntityOperation::Update;
        let path = self.item_path(operation, id)?;
        let updated = self.run(operation, self.client.put(&path, data)).await?;
        self.succeed(operation, EntityEvent::Updated(&updated));
        Ok(updated)
    }

    /// Deletes the entity `id`. Any response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns the normalized [`ApiError`]; it is also stored as the
    /// current error.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn remove(&self, id: &str) -> Result<()> {
        let operation = EntityOperation::Remove;
        let path = self.item_path(operation, id)?;
        let _: Option<Value> = self.run(operation, self.client.delete(&path)).await?;
        self.succeed(operation, EntityEvent::Removed(id));
        Ok(())
    }

    /// Fetches the entity `id`.
    ///
    /// A 404 is stored as the current error and passed to the error
    /// callback, but never notified.
    ///
    /// # Errors
    ///
    /// Returns the normalized [`ApiError`].
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn get_by_id(&self, id: &str) -> Result<T> {
        let operation = EntityOperation::GetById;
        let path = self.item_path(operation, id)?;
        let entity = self.run(operation, self.client.get(&path)).await?;
        self.succeed(operation, EntityEvent::Fetched(&entity));
        Ok(entity)
    }

    /// Fetches the whole collection.
    ///
    /// # Errors
    ///
    /// Returns the normalized [`ApiError`].
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn get_all(&self) -> Result<Vec<T>> {
        let operation = EntityOperation::GetAll;
        let entities: Option<Vec<T>> = self.run(operation, self.client.get(&self.endpoint)).await?;
        let entities = entities.unwrap_or_default();
        self.succeed(operation, EntityEvent::Listed(&entities));
        Ok(entities)
    }

    fn item_path(&self, operation: EntityOperation, id: &str) -> Result<String> {
        resource_path(&self.endpoint, id).map_err(|message| {
            let _loading = self.state.begin();
            self.fail(operation, ApiError::validation("id", message))
        })
    }

    async fn run<R>(
        &self,
        operation: EntityOperation,
        call: impl Future<Output = std::result::Result<R, RequestFailure>>,
    ) -> Result<R> {
        let _loading = self.state.begin();
        match call.await {
            Ok(value) => Ok(value),
            Err(failure) => {
                let message =
                    failure.data_str("message").unwrap_or(operation.fallback_message()).to_owned();
                Err(self.fail(operation, failure.into_api_error(message)))
            }
        }
    }

    fn succeed(&self, operation: EntityOperation, event: EntityEvent<'_, T>) {
        debug!(?operation, endpoint = %self.endpoint, "Entity operation succeeded");
        if let Some(on_success) = &self.options.on_success {
            on_success(event);
        }
        if self.options.show_toast
            && let Some(message) = operation.success_message()
        {
            self.notifier.notify(Notification::success(message));
        }
    }

    fn fail(&self, operation: EntityOperation, error: ApiError) -> ApiError {
        self.state.set_error(error.clone());
        if let Some(on_error) = &self.options.on_error {
            on_error(&error);
        }
        let suppressed = operation == EntityOperation::GetById && error.is_not_found();
        if self.options.show_toast && !suppressed {
            self.notifier.notify(Notification::error(error.message.clone()));
        }
        error
    }
}
