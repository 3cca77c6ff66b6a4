use crate::client::PokeClient;
use crate::config::Config;
use crate::error::AppError;
use crate::loaders::{
    self, AbilitiesTab, CatalogPage, DemoPage, EvolutionTab, ModularPage, PokemonDetail,
    StatsTab, TypeCard,
};
use axum::{
    Form, Json, Router, debug_handler,
    body::Body,
    extract::{Path, Query, Request, State},
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use futures::{StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

pub struct AppState {
    pub client: PokeClient,
    pub config: Config,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/pokemon", get(catalog_handler))
        .route("/pokemon/{name}", get(detail_handler))
        .route("/streaming/{name}", get(streaming_handler))
        .route("/modular/{name}", get(modular_index_handler))
        .route("/modular/{name}/stats", get(modular_stats_handler))
        .route("/modular/{name}/abilities", get(modular_abilities_handler))
        .route("/modular/{name}/evolution", get(modular_evolution_handler))
        .route("/types", get(types_handler))
        .route("/demo", get(demo_handler))
        .route(
            "/testing-actions",
            get(waiting_handler)
                .post(greet_handler)
                .layer(middleware::from_fn(log_method)),
        )
        .with_state(Arc::new(state))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<String>,
}

#[debug_handler]
async fn catalog_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CatalogPage>, AppError> {
    // unparseable page numbers fall back to the first page
    let page = query
        .page
        .and_then(|p| p.trim().parse::<u32>().ok())
        .unwrap_or(1);
    let catalog = loaders::catalog_page(&app_state.client, &app_state.config, page).await?;
    Ok(Json(catalog))
}

#[debug_handler]
async fn detail_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<PokemonDetail>, AppError> {
    let detail = loaders::pokemon_detail(&app_state.client, &name).await?;
    Ok(Json(detail))
}

#[derive(Serialize)]
struct DescriptionLine {
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Newline-delimited JSON: the ready part of the page first, the deferred
/// description once it resolves.
#[debug_handler]
async fn streaming_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let detail = loaders::streaming_detail(&app_state.client, &app_state.config, &name).await?;
    let head = serde_json::to_string(&detail.head)
        .map_err(|e| AppError::Internal(format!("Failed to encode page: {}", e)))?;

    let description = detail.description;
    let first = stream::once(future::ready(Ok::<_, Infallible>(format!("{}\n", head))));
    let rest = stream::once(async move {
        let line = match description.wait().await {
            Ok(description) => DescriptionLine {
                description,
                error: None,
            },
            Err(e) => {
                tracing::warn!("Streamed description failed: {}", e);
                DescriptionLine {
                    description: None,
                    error: Some(e.to_string()),
                }
            }
        };
        let encoded = serde_json::to_string(&line).unwrap_or_else(|_| "{}".to_string());
        Ok::<_, Infallible>(format!("{}\n", encoded))
    });

    let body = Body::from_stream(first.chain(rest));
    Ok(([(header::CONTENT_TYPE, "application/x-ndjson")], body).into_response())
}

async fn modular_index_handler(Path(name): Path<String>) -> Redirect {
    Redirect::to(&format!("/modular/{}/stats", name))
}

#[debug_handler]
async fn modular_stats_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ModularPage<StatsTab>>, AppError> {
    let client = &app_state.client;
    let (pokemon, tab) = tokio::try_join!(
        loaders::modular_overview(client, &name),
        loaders::modular_stats(client, &name)
    )?;
    Ok(Json(ModularPage { pokemon, tab }))
}

#[debug_handler]
async fn modular_abilities_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ModularPage<AbilitiesTab>>, AppError> {
    let client = &app_state.client;
    let (pokemon, tab) = tokio::try_join!(
        loaders::modular_overview(client, &name),
        loaders::modular_abilities(client, &name)
    )?;
    Ok(Json(ModularPage { pokemon, tab }))
}

#[debug_handler]
async fn modular_evolution_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ModularPage<EvolutionTab>>, AppError> {
    let client = &app_state.client;
    let (pokemon, tab) = tokio::try_join!(
        loaders::modular_overview(client, &name),
        loaders::modular_evolution(client, &name)
    )?;
    Ok(Json(ModularPage { pokemon, tab }))
}

#[debug_handler]
async fn types_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<TypeCard>>, AppError> {
    let types = loaders::all_types(&app_state.client).await?;
    Ok(Json(types))
}

#[debug_handler]
async fn demo_handler(State(app_state): State<Arc<AppState>>) -> Result<Json<DemoPage>, AppError> {
    let page = loaders::demo(&app_state.client).await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
struct VisitorForm {
    #[serde(rename = "visitorsName", default)]
    visitors_name: String,
}

#[derive(Debug, Serialize)]
struct Greeting {
    message: String,
}

async fn waiting_handler() -> Json<Greeting> {
    Json(Greeting {
        message: "Waiting...".to_string(),
    })
}

async fn greet_handler(Form(form): Form<VisitorForm>) -> Json<Greeting> {
    Json(Greeting {
        message: format!("Hello, {}", form.visitors_name),
    })
}

async fn log_method(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    tracing::info!("entering middleware with {}", method);
    let response = next.run(request).await;
    tracing::info!("exiting middleware with {}", method);
    response
}
