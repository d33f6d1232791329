use std::sync::Arc;

use axum::routing::post;
use axum::{Extension, Router};

use crate::api::rest::handlers;
use crate::config::FunctionNames;
use crate::contract::error::ServiceError;
use crate::domain::service::Service;

/// One `POST /<function name>` route per user function.
pub fn register_routes(
    router: Router,
    service: Arc<Service>,
    names: FunctionNames,
) -> Result<Router, ServiceError> {
    names
        .validate()
        .map_err(|msg| ServiceError::SYSTEM.with_cause(msg))?;

    let router = router
        .route(&format!("/{}", names.get_user), post(handlers::get_user))
        .route(&format!("/{}", names.add_user), post(handlers::add_user))
        .route(&format!("/{}", names.delete_user), post(handlers::delete_user))
        .route(&format!("/{}", names.update_user), post(handlers::update_user))
        .route(
            &format!("/{}", names.validate_user),
            post(handlers::validate_user),
        )
        .layer(Extension(service))
        .layer(Extension(Arc::new(names)));
    Ok(router)
}
