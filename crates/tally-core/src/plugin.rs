//! Plugin system for modular service registration and route configuration
//!
//! Each feature crate ships a plugin that registers its services into a shared,
//! type-indexed registry and contributes an axum router plus an OpenAPI
//! fragment. The [`PluginManager`] runs registration in order, then merges the
//! routes under `/api` and the schemas into one document.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use axum::Router;
use thiserror::Error;
use tracing::debug;
use utoipa::openapi::{ComponentsBuilder, OpenApi};

// Re-export for plugin implementations
pub use axum;
pub use utoipa;

/// Errors that can occur during plugin operations
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin registration failed for '{plugin_name}': {error}")]
    PluginRegistrationFailed { plugin_name: String, error: String },

    #[error("Service '{service_type}' is required but not registered")]
    ServiceNotFound { service_type: String },

    #[error("OpenAPI schema merge failed: {0}")]
    OpenApiMergeFailed(String),
}

/// Boxed future returned by [`TallyPlugin::register_services`].
pub type RegistrationFuture<'a> = Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>>;

/// Core plugin trait that defines the plugin interface
pub trait TallyPlugin: Send + Sync {
    /// Unique identifier for this plugin
    fn name(&self) -> &'static str;

    /// Register services that this plugin provides.
    ///
    /// Dependencies registered by earlier plugins are available through
    /// `context.require_service::<T>()`.
    fn register_services<'a>(&'a self, context: &'a ServiceRegistrationContext)
        -> RegistrationFuture<'a>;

    /// HTTP routes for this plugin, `None` when it serves none.
    fn configure_routes(&self, _context: &PluginContext) -> Option<PluginRoutes> {
        None
    }

    /// OpenAPI fragment describing this plugin's endpoints.
    fn openapi_schema(&self) -> Option<OpenApi> {
        None
    }
}

/// Route configuration returned by plugins
pub struct PluginRoutes {
    pub router: Router,
}

impl PluginRoutes {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

/// Type-safe service registry for dependency injection
#[derive(Default)]
pub struct ServiceRegistry {
    services: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Send + Sync + 'static + ?Sized>(&self, service: Arc<T>) {
        debug!("Registering service: {}", std::any::type_name::<T>());
        self.services
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(TypeId::of::<T>(), Box::new(service));
    }

    pub fn get<T: Send + Sync + 'static + ?Sized>(&self) -> Option<Arc<T>> {
        self.services
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&TypeId::of::<T>())
            .and_then(|any| any.downcast_ref::<Arc<T>>())
            .cloned()
    }

    /// Like [`get`](Self::get) but reports which service is missing.
    pub fn require<T: Send + Sync + 'static + ?Sized>(&self) -> Result<Arc<T>, PluginError> {
        self.get::<T>().ok_or_else(|| PluginError::ServiceNotFound {
            service_type: std::any::type_name::<T>().to_string(),
        })
    }
}

/// Read-only context handed to plugins when routes are built
pub struct PluginContext {
    service_registry: Arc<ServiceRegistry>,
}

impl PluginContext {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self {
            service_registry: registry,
        }
    }

    pub fn get_service<T: Send + Sync + 'static + ?Sized>(&self) -> Option<Arc<T>> {
        self.service_registry.get::<T>()
    }

    pub fn require_service<T: Send + Sync + 'static + ?Sized>(
        &self,
    ) -> Result<Arc<T>, PluginError> {
        self.service_registry.require::<T>()
    }
}

/// Context for service registration that allows writes to the registry
#[derive(Default)]
pub struct ServiceRegistrationContext {
    service_registry: Arc<ServiceRegistry>,
}

impl ServiceRegistrationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_service<T: Send + Sync + 'static + ?Sized>(&self, service: Arc<T>) {
        self.service_registry.register(service);
    }

    pub fn get_service<T: Send + Sync + 'static + ?Sized>(&self) -> Option<Arc<T>> {
        self.service_registry.get::<T>()
    }

    pub fn require_service<T: Send + Sync + 'static + ?Sized>(
        &self,
    ) -> Result<Arc<T>, PluginError> {
        self.service_registry.require::<T>()
    }

    pub fn create_plugin_context(&self) -> PluginContext {
        PluginContext::new(self.service_registry.clone())
    }
}

/// Handles plugin registration, initialization and application building
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Box<dyn TallyPlugin>>,
    context: ServiceRegistrationContext,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. Order matters: dependencies first.
    pub fn register_plugin(&mut self, plugin: Box<dyn TallyPlugin>) {
        debug!("Registering plugin: {}", plugin.name());
        self.plugins.push(plugin);
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Initialize all plugins in registration order
    pub async fn initialize_plugins(&mut self) -> Result<(), PluginError> {
        debug!("Initializing {} plugins", self.plugins.len());

        for plugin in &self.plugins {
            plugin.register_services(&self.context).await.map_err(|e| {
                PluginError::PluginRegistrationFailed {
                    plugin_name: plugin.name().to_string(),
                    error: e.to_string(),
                }
            })?;
            debug!("Initialized plugin: {}", plugin.name());
        }

        Ok(())
    }

    /// Merge every plugin router under `/api`.
    pub fn build_application(&self) -> Router {
        let plugin_context = self.context.create_plugin_context();
        let mut api_router = Router::new();

        for plugin in &self.plugins {
            if let Some(plugin_routes) = plugin.configure_routes(&plugin_context) {
                debug!("Adding routes for plugin: {}", plugin.name());
                api_router = api_router.merge(plugin_routes.router);
            }
        }

        Router::new().nest("/api", api_router)
    }

    /// Unified OpenAPI document built from every plugin fragment.
    pub fn get_unified_openapi(&self) -> Result<OpenApi, PluginError> {
        use utoipa::openapi::{InfoBuilder, OpenApiBuilder, ServerBuilder};

        let mut combined = OpenApiBuilder::new()
            .info(
                InfoBuilder::new()
                    .title("Tally")
                    .description(Some("Marketing event analytics and conversion funnels"))
                    .version(env!("CARGO_PKG_VERSION"))
                    .build(),
            )
            .servers(Some(vec![ServerBuilder::new()
                .url("/api")
                .description(Some("Base path for all API endpoints"))
                .build()]))
            .build();

        for plugin in &self.plugins {
            if let Some(fragment) = plugin.openapi_schema() {
                debug!("Merging OpenAPI schema for plugin: {}", plugin.name());
                combined = merge_openapi_schemas(combined, fragment)?;
            }
        }

        Ok(combined)
    }

    /// Access to the registration context, used to seed core services
    /// (such as the database connection) before plugins initialize.
    pub fn service_context(&self) -> &ServiceRegistrationContext {
        &self.context
    }
}

fn merge_openapi_schemas(mut base: OpenApi, fragment: OpenApi) -> Result<OpenApi, PluginError> {
    for (path, item) in fragment.paths.paths {
        if base.paths.paths.contains_key(&path) {
            return Err(PluginError::OpenApiMergeFailed(format!(
                "path '{}' is declared by more than one plugin",
                path
            )));
        }
        base.paths.paths.insert(path, item);
    }

    if let Some(components) = fragment.components {
        let base_components = base
            .components
            .get_or_insert_with(|| ComponentsBuilder::new().build());
        base_components.schemas.extend(components.schemas);
        base_components.responses.extend(components.responses);
    }

    if let Some(tags) = fragment.tags {
        base.tags.get_or_insert_with(Vec::new).extend(tags);
    }

    Ok(base)
}
