//! Magnet Gateway — JSON API for onboarding, content generation, and
//! simulated leads.
//!
//! Session handling lives in the fronting proxy; the authenticated user id
//! arrives in the `x-user-id` header (optional `x-user-email` alongside it).

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use magnet_core::{
    generate_content_ideas, generate_leads, CreatorProfile, GatewayConfig, IdeaBridge,
    PrimaryGoal, Storage,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct AppState {
    storage: Storage,
    bridge: Option<IdeaBridge>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnboardingRequest {
    niche: String,
    target_audience: String,
    offer: String,
    primary_goal: String,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env();
    let storage = Storage::new(config.db_path.clone()).expect("open magnet database");

    let bridge = config.openrouter_api_key.clone().map(|key| {
        let bridge = IdeaBridge::new(key);
        match &config.idea_model {
            Some(model) => bridge.with_model(model),
            None => bridge,
        }
    });
    if bridge.is_none() {
        tracing::warn!("OPENROUTER_API_KEY not set; content ideas use fallback templates");
    }

    let state = Arc::new(AppState { storage, bridge });

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/v1/onboarding", post(save_onboarding).get(get_onboarding))
        .route("/api/v1/content/generate", post(generate_content))
        .route("/api/v1/content", get(list_content))
        .route("/api/v1/leads", get(list_leads))
        .route("/api/v1/dashboard/stats", get(dashboard_stats))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("bind gateway address");
    tracing::info!(
        "magnet gateway v{} listening on {}",
        magnet_core::version(),
        config.bind_addr
    );

    axum::serve(listener, app).await.expect("serve gateway");
}

async fn health() -> &'static str {
    "OK"
}

type ApiError = (StatusCode, Json<Value>);

fn unauthorized() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Unauthorized" })),
    )
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn internal_error(e: impl std::fmt::Display) -> ApiError {
    tracing::error!("request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
}

fn require_user(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(unauthorized)
}

fn header_email(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-user-email")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// POST /api/v1/onboarding: save the profile. Strict validation here:
/// unknown goals are a 400, unlike the simulator's lenient parse.
async fn save_onboarding(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<OnboardingRequest>,
) -> Result<Json<Value>, ApiError> {
    let user_id = require_user(&headers)?;

    let niche = body.niche.trim();
    let audience = body.target_audience.trim();
    let offer = body.offer.trim();
    let goal = body.primary_goal.trim();
    if niche.is_empty() || audience.is_empty() || offer.is_empty() {
        return Err(bad_request("Invalid input"));
    }
    if goal != "leads" && goal != "calls" {
        return Err(bad_request("Invalid input"));
    }

    let user = state
        .storage
        .save_profile(
            &user_id,
            header_email(&headers).as_deref(),
            niche,
            audience,
            offer,
            goal,
        )
        .map_err(internal_error)?;

    Ok(Json(json!({ "user": user })))
}

/// GET /api/v1/onboarding: return the profile. First contact from an
/// authenticated user creates their row, with profile fields still unset.
async fn get_onboarding(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user_id = require_user(&headers)?;
    let user = state
        .storage
        .ensure_user(&user_id, header_email(&headers).as_deref())
        .map_err(internal_error)?;
    Ok(Json(json!({ "user": user })))
}

/// POST /api/v1/content/generate: generate and persist content ideas, then
/// fabricate simulated leads for them.
async fn generate_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user_id = require_user(&headers)?;

    let user = state
        .storage
        .get_user(&user_id)
        .map_err(internal_error)?
        .filter(|u| u.is_onboarded())
        .ok_or_else(|| bad_request("Please complete onboarding first"))?;

    let profile = CreatorProfile {
        niche: user.niche.clone().unwrap_or_default(),
        target_audience: user.target_audience.clone().unwrap_or_default(),
        offer: user.offer.clone().unwrap_or_default(),
        primary_goal: PrimaryGoal::parse(user.primary_goal.as_deref().unwrap_or_default()),
    };

    let drafts = generate_content_ideas(state.bridge.as_ref(), &profile).await;

    let mut ideas = Vec::with_capacity(drafts.len());
    for draft in &drafts {
        let idea = state
            .storage
            .create_content_idea(&user_id, &draft.hook, &draft.key_teaching, &draft.cta)
            .map_err(internal_error)?;
        ideas.push(idea);
    }

    let idea_ids: Vec<String> = ideas.iter().map(|i| i.id.clone()).collect();
    let mut rng = rand::thread_rng();
    let leads = generate_leads(
        &state.storage,
        &mut rng,
        &user_id,
        &idea_ids,
        profile.primary_goal,
    )
    .map_err(internal_error)?;

    let message = format!(
        "Generated {} content ideas and {} simulated leads",
        ideas.len(),
        leads.len()
    );
    Ok(Json(json!({
        "ideas": ideas,
        "leads": leads,
        "message": message,
    })))
}

/// GET /api/v1/content: list persisted ideas, newest first.
async fn list_content(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user_id = require_user(&headers)?;
    let ideas = state
        .storage
        .list_content_ideas(&user_id)
        .map_err(internal_error)?;
    Ok(Json(json!({ "ideas": ideas })))
}

/// GET /api/v1/leads: leads newest first, each with its content idea and
/// timestamp-ordered conversation.
async fn list_leads(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user_id = require_user(&headers)?;
    let leads = state.storage.list_leads(&user_id).map_err(internal_error)?;

    let mut payload = Vec::with_capacity(leads.len());
    for lead in leads {
        let conversations = state
            .storage
            .list_conversations(&lead.id)
            .map_err(internal_error)?;
        let content_idea = state
            .storage
            .get_content_idea(&lead.content_idea_id)
            .map_err(internal_error)?;

        let mut value = serde_json::to_value(&lead).map_err(internal_error)?;
        if let Value::Object(map) = &mut value {
            map.insert(
                "contentIdea".to_string(),
                serde_json::to_value(&content_idea).map_err(internal_error)?,
            );
            map.insert(
                "conversations".to_string(),
                serde_json::to_value(&conversations).map_err(internal_error)?,
            );
        }
        payload.push(value);
    }

    Ok(Json(json!({ "leads": payload })))
}

/// GET /api/v1/dashboard/stats: idea/conversation/qualified counters.
async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user_id = require_user(&headers)?;
    let counts = state
        .storage
        .dashboard_counts(&user_id)
        .map_err(internal_error)?;
    Ok(Json(json!(counts)))
}
