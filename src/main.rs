//! Demo: seeds the `User` collection and walks every route once, including the
//! failure paths.

use resource_framework::tracing::setup_tracing;
use resource_framework::{Method, Request, Response};
use resource_recipe::config::load_config_or_default;
use resource_recipe::error::AppError;
use resource_recipe::lifecycle::ApiSystem;
use resource_recipe::model::fixtures;
use resource_recipe::user_api::hooks::{CALLER_HEADER, ROLE_HEADER};
use serde_json::json;
use tracing::{info, warn, Instrument};

fn log_response(label: &str, response: &Response) {
    if response.status < 400 {
        info!(status = response.status, body = %response.body, "{label}");
    } else {
        warn!(status = response.status, body = %response.body, "{label}");
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    setup_tracing();

    let config = load_config_or_default(None)?;
    info!(page_size = config.pipeline.page_size, "Starting resource recipe");

    let system = ApiSystem::new(&config)?;
    for route in system.routes().describe() {
        info!(%route, "Route");
    }
    system.seed(&fixtures::users()).await?;

    let span = tracing::info_span!("reads");
    async {
        let page = system
            .dispatch(Method::Get, "/users.json", Request::new())
            .await;
        log_response("First page", &page);

        let count = system
            .dispatch(
                Method::Get,
                "/users/count",
                Request::new().with_query("role", "Subscriber"),
            )
            .await;
        log_response("Subscribers", &count);
    }
    .instrument(span)
    .await;

    let span = tracing::info_span!("writes");
    let created = async {
        let created = system
            .dispatch(
                Method::Post,
                "/users",
                Request::new().with_body(json!({
                    "name": "Hedy",
                    "email": "  Hedy@Example.com ",
                    "password": "frequency-hopping",
                    "role": "Admin",
                })),
            )
            .await;
        log_response("Created", &created);
        created
    }
    .instrument(span)
    .await;

    let Some(id) = created.body.get("_id").and_then(|v| v.as_str()) else {
        warn!("Create returned no id; skipping member routes");
        return system.shutdown().await;
    };
    let member = format!("/users/{id}");

    let span = tracing::info_span!("member", %id);
    async {
        let shown = system.dispatch(Method::Get, &member, Request::new()).await;
        log_response("Shown", &shown);

        let anonymous = system
            .dispatch(
                Method::Put,
                &member,
                Request::new().with_body(json!({"name": "Hedy Lamarr"})),
            )
            .await;
        log_response("Anonymous update", &anonymous);

        let renamed = system
            .dispatch(
                Method::Put,
                &member,
                Request::new()
                    .with_header(CALLER_HEADER, id)
                    .with_body(json!({"name": "Hedy Lamarr", "role": "Admin"})),
            )
            .await;
        log_response("Owner update", &renamed);

        let removed = system
            .dispatch(
                Method::Delete,
                &member,
                Request::new()
                    .with_header(CALLER_HEADER, "someone-else")
                    .with_header(ROLE_HEADER, "Admin"),
            )
            .await;
        log_response("Admin delete", &removed);
    }
    .instrument(span)
    .await;

    let missing = system
        .dispatch(Method::Delete, "/users", Request::new())
        .await;
    log_response("Unknown route", &missing);

    system.shutdown().await?;
    info!("Application completed successfully");
    Ok(())
}
