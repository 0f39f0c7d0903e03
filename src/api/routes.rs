use axum::{
    routing::{get, post},
    Router,
    extract::{rejection::JsonRejection, Json, Path, State},
    response::IntoResponse,
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use chrono::Utc;

use crate::error::{Result, AppError};
use crate::api::models::{
    ConfigResponse, ConfigUpdateRequest, ConfigUpdateResponse, ConfigView, HealthResponse,
    ModelsResponse, RecommendData, RecommendRequest,
};
use crate::api::response;
use crate::products::resolve_all;
use crate::queries::generate_gift_queries;
use crate::settings::{model_catalog, Provider, ProductSource, SettingsUpdate};
use crate::AppState;

pub const MIN_DESCRIPTION_CHARS: usize = 5;
pub const MAX_DESCRIPTION_CHARS: usize = 500;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/recommend", post(recommend_handler))
        .route("/api/health", get(health_handler))
        .route("/api/config", get(get_config_handler).post(update_config_handler))
        .route("/api/models/:provider", get(models_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

fn unreadable_body(rejection: JsonRejection) -> AppError {
    AppError::validation("Invalid request body", rejection.body_text())
}

/// Trims the description and checks its length in characters.
pub fn validate_description(description: Option<&str>) -> Result<String> {
    let description = description.map(str::trim).unwrap_or_default();

    if description.is_empty() {
        return Err(AppError::validation(
            "Description is required",
            "Please provide a description of the person you want to find gifts for.",
        ));
    }

    let chars = description.chars().count();
    if chars < MIN_DESCRIPTION_CHARS {
        return Err(AppError::validation(
            "Description too short",
            format!(
                "Please provide a more detailed description (at least {} characters).",
                MIN_DESCRIPTION_CHARS
            ),
        ));
    }
    if chars > MAX_DESCRIPTION_CHARS {
        return Err(AppError::validation(
            "Description too long",
            format!("Please keep your description under {} characters.", MAX_DESCRIPTION_CHARS),
        ));
    }

    Ok(description.to_string())
}

async fn recommend_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload.map_err(unreadable_body)?;
    let description = validate_description(req.description.as_deref())?;

    let start_time = std::time::Instant::now();
    tracing::info!(description = %description, "New gift recommendation request");

    // One snapshot per request; concurrent settings changes apply to the next request.
    let settings = state.settings.get();

    tracing::info!("Step 1/2: generating gift ideas with AI");
    let outcome = generate_gift_queries(state.completions.as_ref(), &settings, &description).await;
    let used_fallback_queries = outcome.is_fallback();
    let queries = outcome.into_queries();

    tracing::info!("Step 2/2: finding products using \"{}\"", settings.product_source);
    let resolver = state.resolvers.for_source(settings.product_source);
    let gifts = resolve_all(resolver, &queries).await;

    tracing::info!(
        gifts = gifts.len(),
        fallback = used_fallback_queries,
        "Request completed in {:?}",
        start_time.elapsed()
    );

    Ok(response::success(
        "Gift recommendations generated successfully",
        RecommendData {
            description,
            total_results: gifts.len(),
            used_fallback_queries,
            gifts,
        },
    ))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let product_source = state.settings.get().product_source;
    Json(HealthResponse {
        success: true,
        message: "Gift recommendation API is healthy".to_string(),
        timestamp: Utc::now(),
        product_source,
        google_shopping_configured: state.config.google_shopping_configured(),
        unsplash_configured: state.config.unsplash_configured(),
        legacy_mock_mode: product_source == ProductSource::Mock,
    })
}

async fn get_config_handler(State(state): State<AppState>) -> Json<ConfigResponse> {
    let settings = state.settings.get();
    Json(ConfigResponse {
        success: true,
        config: ConfigView::from(&settings),
        available_models: model_catalog(),
    })
}

async fn update_config_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ConfigUpdateRequest>, JsonRejection>,
) -> Result<Json<ConfigUpdateResponse>> {
    let Json(req) = payload.map_err(unreadable_body)?;

    let provider = req
        .provider
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::validation("Provider is required", "Provider is required"))?;
    let api_key = req
        .api_key
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| AppError::validation("API key is required", "API key is required"))?;

    let model = match req.model.filter(|m| !m.is_empty()) {
        Some(model) => model,
        None => provider.parse::<Provider>()?.main_model().to_string(),
    };
    let product_source = req
        .product_source
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| ProductSource::MultiStore.to_string());

    let updated = state.settings.update(SettingsUpdate {
        provider: Some(provider),
        api_key: Some(api_key),
        model: Some(model),
        product_source: Some(product_source),
    })?;

    tracing::info!(
        provider = %updated.provider,
        model = %updated.model,
        product_source = %updated.product_source,
        "Configuration updated"
    );

    Ok(Json(ConfigUpdateResponse {
        success: true,
        message: "Configuration updated successfully".to_string(),
        config: ConfigView::from(&updated),
    }))
}

async fn models_handler(Path(provider): Path<String>) -> Result<Json<ModelsResponse>> {
    let provider = provider.parse::<Provider>()?;
    Ok(Json(ModelsResponse {
        success: true,
        provider,
        models: provider.models(),
    }))
}
