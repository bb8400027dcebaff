use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

use super::{
    admin::AdminRequest, ask, pix::PixServiceRequest, purchases::PurchaseRequest,
    raffles::RaffleRequest, users::UserRequest, ServiceError,
};
use crate::models::{
    pix::{CheckoutRequest, VerifyRequest},
    purchases::PurchaseIntent,
    raffles::{NewWinner, Raffle},
    users::Identity,
};
use crate::pix::PixError;

const CALLER: &str = "Http";

type ApiResponse = (StatusCode, Json<Value>);

#[derive(Clone)]
pub struct AppState {
    pub raffle_channel: mpsc::Sender<RaffleRequest>,
    pub pix_channel: mpsc::Sender<PixServiceRequest>,
    pub purchase_channel: mpsc::Sender<PurchaseRequest>,
    pub user_channel: mpsc::Sender<UserRequest>,
    pub admin_channel: mpsc::Sender<AdminRequest>,
}

#[derive(Deserialize)]
struct RaffleQuery {
    active: Option<bool>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

pub fn error_status(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
        ServiceError::Pix(
            PixError::InvalidAmount(_)
            | PixError::Malformed(_)
            | PixError::ChecksumMismatch { .. },
        ) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond<T: Serialize>(success: StatusCode, result: Result<T, ServiceError>) -> ApiResponse {
    match result {
        Ok(body) => (success, Json(json!(body))),
        Err(e) => {
            let status = error_status(&e);
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                log::error!("Request failed: {}", e);
                return (status, Json(json!({"description": "Internal server error."})));
            }
            (status, Json(json!({"description": e.to_string()})))
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
}

async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ServiceError> {
    let token = bearer_token(headers).ok_or(ServiceError::Unauthorized)?;

    ask(CALLER, &state.admin_channel, |response| {
        AdminRequest::Authorize { token, response }
    })
    .await
}

async fn list_raffles(
    State(state): State<AppState>,
    Query(query): Query<RaffleQuery>,
) -> ApiResponse {
    let active_only = query.active.unwrap_or(true);
    let result = ask(CALLER, &state.raffle_channel, |response| {
        RaffleRequest::ListRaffles {
            active_only,
            response,
        }
    })
    .await;

    respond(StatusCode::OK, result)
}

async fn get_raffle(State(state): State<AppState>, Path(id): Path<String>) -> ApiResponse {
    let result = super::raffles::request_raffle(CALLER, &state.raffle_channel, &id).await;

    respond(StatusCode::OK, result)
}

async fn checkout(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> ApiResponse {
    let result = ask(CALLER, &state.pix_channel, |response| {
        PixServiceRequest::Charge {
            request: req,
            response,
        }
    })
    .await;

    respond(StatusCode::CREATED, result)
}

async fn verify_payload(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResponse {
    let result = ask(CALLER, &state.pix_channel, |response| {
        PixServiceRequest::Verify {
            qr_copy_paste: req.qr_copy_paste,
            response,
        }
    })
    .await;

    respond(StatusCode::OK, result)
}

async fn complete_purchase(
    State(state): State<AppState>,
    Json(intent): Json<PurchaseIntent>,
) -> ApiResponse {
    let result = ask(CALLER, &state.purchase_channel, |response| {
        PurchaseRequest::CompletePurchase { intent, response }
    })
    .await;

    respond(StatusCode::CREATED, result)
}

async fn create_user(State(state): State<AppState>, Json(identity): Json<Identity>) -> ApiResponse {
    let result = ask(CALLER, &state.user_channel, |response| {
        UserRequest::CreateUser { identity, response }
    })
    .await;

    respond(StatusCode::CREATED, result)
}

async fn get_user(State(state): State<AppState>, Path(phone): Path<String>) -> ApiResponse {
    let result = ask(CALLER, &state.user_channel, |response| UserRequest::GetUser {
        phone: phone.clone(),
        response,
    })
    .await
    .and_then(|user| user.ok_or_else(|| ServiceError::NotFound(format!("user {}", phone))));

    respond(StatusCode::OK, result)
}

async fn user_purchases(State(state): State<AppState>, Path(phone): Path<String>) -> ApiResponse {
    let result = ask(CALLER, &state.purchase_channel, |response| {
        PurchaseRequest::UserPurchases { phone, response }
    })
    .await;

    respond(StatusCode::OK, result)
}

async fn list_winners(State(state): State<AppState>) -> ApiResponse {
    let result = ask(CALLER, &state.raffle_channel, |response| {
        RaffleRequest::ListWinners { response }
    })
    .await;

    respond(StatusCode::OK, result)
}

async fn admin_login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> ApiResponse {
    let result = ask(CALLER, &state.admin_channel, |response| AdminRequest::Login {
        email: req.email,
        password: req.password,
        response,
    })
    .await
    .map(|token| json!({ "token": token }));

    respond(StatusCode::OK, result)
}

async fn admin_logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    let result = match bearer_token(&headers) {
        Some(token) => {
            ask(CALLER, &state.admin_channel, |response| AdminRequest::Logout {
                token,
                response,
            })
            .await
        }
        None => Err(ServiceError::Unauthorized),
    };

    respond(StatusCode::OK, result.map(|_| json!({})))
}

async fn save_raffle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(raffle): Json<Raffle>,
) -> ApiResponse {
    if let Err(e) = authorize(&state, &headers).await {
        return respond::<()>(StatusCode::OK, Err(e));
    }

    let result = ask(CALLER, &state.raffle_channel, |response| {
        RaffleRequest::SaveRaffle { raffle, response }
    })
    .await;

    respond(StatusCode::OK, result)
}

async fn delete_raffle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResponse {
    if let Err(e) = authorize(&state, &headers).await {
        return respond::<()>(StatusCode::OK, Err(e));
    }

    let result = ask(CALLER, &state.raffle_channel, |response| {
        RaffleRequest::DeleteRaffle { id, response }
    })
    .await;

    respond(StatusCode::OK, result.map(|_| json!({})))
}

async fn save_winner(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(winner): Json<NewWinner>,
) -> ApiResponse {
    if let Err(e) = authorize(&state, &headers).await {
        return respond::<()>(StatusCode::OK, Err(e));
    }

    let result = ask(CALLER, &state.raffle_channel, |response| {
        RaffleRequest::SaveWinner { winner, response }
    })
    .await;

    respond(StatusCode::CREATED, result)
}

async fn list_purchases(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    if let Err(e) = authorize(&state, &headers).await {
        return respond::<()>(StatusCode::OK, Err(e));
    }

    let result = ask(CALLER, &state.purchase_channel, |response| {
        PurchaseRequest::ListPurchases { response }
    })
    .await;

    respond(StatusCode::OK, result)
}

async fn numbers_sold(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    if let Err(e) = authorize(&state, &headers).await {
        return respond::<()>(StatusCode::OK, Err(e));
    }

    let result = ask(CALLER, &state.purchase_channel, |response| {
        PurchaseRequest::NumbersSold { response }
    })
    .await;

    respond(StatusCode::OK, result)
}

async fn stats(State(state): State<AppState>, headers: HeaderMap) -> ApiResponse {
    if let Err(e) = authorize(&state, &headers).await {
        return respond::<()>(StatusCode::OK, Err(e));
    }

    let result = ask(CALLER, &state.purchase_channel, |response| {
        PurchaseRequest::Stats { response }
    })
    .await;

    respond(StatusCode::OK, result)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/raffles", get(list_raffles))
        .route("/raffles/{id}", get(get_raffle))
        .route("/checkout", post(checkout))
        .route("/pix/verify", post(verify_payload))
        .route("/purchases", post(complete_purchase))
        .route("/users", post(create_user))
        .route("/users/{phone}", get(get_user))
        .route("/users/{phone}/purchases", get(user_purchases))
        .route("/winners", get(list_winners))
        .route("/admin/login", post(admin_login))
        .route("/admin/logout", post(admin_logout))
        .route("/admin/raffles", put(save_raffle))
        .route("/admin/raffles/{id}", delete(delete_raffle))
        .route("/admin/winners", post(save_winner))
        .route("/admin/purchases", get(list_purchases))
        .route("/admin/numbers", get(numbers_sold))
        .route("/admin/stats", get(stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(listen: &str, state: AppState) -> Result<(), anyhow::Error> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
