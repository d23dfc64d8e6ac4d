use crate::config::AppConfig;
use crate::error::AppError;
use crate::model::User;
use crate::routes::RouteTable;
use crate::user_api;
use resource_framework::{
    CollectionActor, Defaults, Method, Operation, Projection, Request, ResourceFactory, Response,
    Store, StoreClient,
};
use std::sync::Arc;
use tracing::{error, info};

/// Runtime of the demo API: the store actor plus the routed handlers.
///
/// # Architecture
///
/// - **Store actor**: one [`CollectionActor`] task owns every collection
/// - **Handlers**: built once from a shared [`ResourceFactory`], then frozen
/// - **Routes**: a [`RouteTable`] dispatching `(method, path)` to handlers
///
/// # Example
///
/// ```ignore
/// let system = ApiSystem::new(&AppConfig::default())?;
/// system.seed(&fixtures::users()).await?;
/// let response = system.dispatch(Method::Get, "/users.json", Request::new()).await;
/// system.shutdown().await?;
/// ```
pub struct ApiSystem {
    /// Direct access to the store, for seeding and inspection.
    pub store: StoreClient,
    routes: RouteTable,
    handle: tokio::task::JoinHandle<()>,
}

impl ApiSystem {
    /// Spawns the store actor and builds every handler.
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        config.validate()?;

        let (mut actor, store) = CollectionActor::new(config.store.buffer_size);
        for (entity, options) in &config.store.collections {
            actor = actor.with_collection(entity, options.clone());
        }
        let handle = tokio::spawn(actor.run());

        let defaults = Defaults::new(config.pipeline.clone())?;
        let factory = ResourceFactory::new(Arc::new(store.clone()), Arc::new(defaults));

        let mut routes = RouteTable::new();
        for handler in user_api::handlers(&factory)? {
            routes.mount(handler);
        }
        info!(routes = routes.len(), "API system ready");

        Ok(Self {
            store,
            routes,
            handle,
        })
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub async fn dispatch(&self, method: Method, path: &str, request: Request) -> Response {
        self.routes.dispatch(method, path, request).await
    }

    /// Inserts `users` directly into the store, bypassing the hooks.
    pub async fn seed(&self, users: &[User]) -> Result<usize, AppError> {
        for user in users {
            self.store
                .execute(
                    user_api::ENTITY,
                    Operation::Insert {
                        document: user.to_document()?,
                        projection: Projection::default(),
                    },
                )
                .await?;
        }
        info!(count = users.len(), "Seeded users");
        Ok(users.len())
    }

    /// Removes every user.
    pub async fn reset(&self) -> Result<usize, AppError> {
        Ok(self.store.clear(user_api::ENTITY).await?)
    }

    /// Gracefully shuts down the system.
    ///
    /// Every handler holds a store client, so the routes are dropped along with
    /// our own client; the actor then sees its channel close and exits.
    pub async fn shutdown(self) -> Result<(), AppError> {
        info!("Shutting down system...");

        drop(self.routes);
        drop(self.store);

        match self.handle.await {
            Ok(()) => {
                info!("System shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Store actor failed during shutdown");
                Err(e.into())
            }
        }
    }
}
