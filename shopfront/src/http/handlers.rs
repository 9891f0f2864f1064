use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::SignedCookieJar;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::GlobalKeyExtractor,
    GovernorLayer,
};
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use crate::model::{NewUser, Order};
use crate::session::{Role, Session};
use crate::store::StoreError;

use super::error::ApiError;
use super::forms::{AppJson, CheckoutForm, LoginForm, RegisterForm};
use super::responses::{
    CheckoutResponse, HealthResponse, LoginResponse, MessageResponse, OrderSummary, UserSummary,
};
use super::session::{removal_cookie, session_cookie, session_token, CurrentSession};
use super::state::AppState;

const REGISTER_FAILED: &str = "An error occurred during registration";
const LOGIN_FAILED: &str = "An error occurred during login. Please try again.";

pub fn router(state: AppState) -> Router {
    #[allow(clippy::expect_used)]
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(50)
            .burst_size(100)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .expect("static governor config is valid"),
    );
    let landing = ServeDir::new(&state.public_dir);

    Router::new()
        .route("/health", get(health))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/checkout", post(checkout))
        .route("/user-bookings", get(user_bookings))
        .route("/api/admin/users", get(admin_users))
        .route("/api/admin/orders", get(admin_orders))
        .fallback_service(landing)
        .layer(GovernorLayer::new(governor_conf))
        .layer(
            tower_http::request_id::SetRequestIdLayer::new(
                axum::http::header::HeaderName::from_static("x-request-id"),
                tower_http::request_id::MakeRequestUuid,
            ),
        )
        .layer(tower_http::request_id::PropagateRequestIdLayer::new(
            axum::http::header::HeaderName::from_static("x-request-id"),
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn register(
    State(state): State<AppState>,
    AppJson(form): AppJson<RegisterForm>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let registration = form.validate()?;
    let taken = || ApiError::BadRequest(String::from("Email is already registered"));

    // Cheap early exit; the insert below is what actually guarantees uniqueness.
    let existing = state
        .store
        .find_user_by_email(&registration.email)
        .await
        .map_err(|err| ApiError::internal(REGISTER_FAILED, err))?;
    if existing.is_some() {
        debug!("registration rejected: email already registered");
        return Err(taken());
    }

    let password_hash = state
        .hasher
        .hash(registration.password)
        .await
        .map_err(|err| ApiError::internal(REGISTER_FAILED, err))?;

    let user = state
        .store
        .insert_user(NewUser {
            fullname: registration.fullname,
            email: registration.email,
            password_hash,
            number: registration.number,
            gender: registration.gender,
        })
        .await
        .map_err(|err| match err {
            StoreError::DuplicateEmail(_) => {
                debug!("registration lost a race for its email");
                taken()
            }
            other => ApiError::internal(REGISTER_FAILED, other),
        })?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registration successful",
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    AppJson(form): AppJson<LoginForm>,
) -> Result<(SignedCookieJar, Json<LoginResponse>), ApiError> {
    let (email, password) = form.validate()?;

    let is_admin = state
        .admins
        .is_authorized(&state.hasher, &email, &password)
        .await
        .map_err(|err| ApiError::internal(LOGIN_FAILED, err))?;
    if is_admin {
        let jar = start_session(&state, jar, Session::admin(email)).await?;
        info!("admin logged in");
        return Ok((
            jar,
            Json(LoginResponse {
                message: "Admin login successful",
                role: Role::Admin,
                redirect: Some(state.admin_redirect.clone()),
            }),
        ));
    }

    let user = state
        .store
        .find_user_by_email(&email)
        .await
        .map_err(|err| ApiError::internal(LOGIN_FAILED, err))?;

    // Unknown emails still pay for one verification so both failures look alike.
    let verified = match &user {
        Some(user) => {
            state
                .hasher
                .verify(password, user.password_hash.clone())
                .await
        }
        None => state.hasher.verify_dummy(password).await,
    }
    .map_err(|err| ApiError::internal(LOGIN_FAILED, err))?;

    let user = match user {
        Some(user) if verified => user,
        _ => {
            warn!("login rejected: invalid credentials");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let jar = start_session(&state, jar, Session::customer(user.id, user.email)).await?;
    info!(user_id = %user.id, "user logged in");
    Ok((
        jar,
        Json(LoginResponse {
            message: "User login successful",
            role: Role::Customer,
            redirect: None,
        }),
    ))
}

async fn start_session(
    state: &AppState,
    jar: SignedCookieJar,
    session: Session,
) -> Result<SignedCookieJar, ApiError> {
    let ttl = state.sessions.ttl();
    let token = state
        .sessions
        .create(session)
        .await
        .map_err(|err| ApiError::internal(LOGIN_FAILED, err))?;
    Ok(jar.add(session_cookie(&state.cookies, token, ttl)))
}

async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<(SignedCookieJar, Json<MessageResponse>), ApiError> {
    if let Some(token) = session_token(&jar, &state.cookies) {
        state
            .sessions
            .destroy(&token)
            .await
            .map_err(|err| ApiError::internal("Failed to log out", err))?;
        debug!("session destroyed");
    }

    Ok((
        jar.remove(removal_cookie(&state.cookies)),
        Json(MessageResponse {
            message: "Logout successful",
        }),
    ))
}

async fn checkout(
    State(state): State<AppState>,
    AppJson(form): AppJson<CheckoutForm>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let new_order = form.validate()?;

    let order = state
        .store
        .insert_order(new_order)
        .await
        .map_err(|err| ApiError::internal("Failed to place order", err))?;

    info!(
        order_id = %order.id,
        products = order.products.len(),
        total_price = order.total_price,
        "order placed"
    );
    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            message: "Order placed successfully",
            order,
        }),
    ))
}

async fn user_bookings(
    State(state): State<AppState>,
    current: CurrentSession,
) -> Result<Json<Vec<Order>>, ApiError> {
    let session = current.require().inspect_err(|_| {
        warn!("bookings requested without a session");
    })?;

    let orders = state
        .store
        .find_orders_by_email(&session.email)
        .await
        .map_err(|err| ApiError::internal("Failed to retrieve bookings", err))?;
    debug!(
        user_id = ?session.user_id,
        role = ?session.role,
        orders = orders.len(),
        "bookings requested"
    );
    Ok(Json(orders))
}

async fn admin_users(State(state): State<AppState>) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = state
        .store
        .list_users()
        .await
        .map_err(|err| ApiError::internal("Failed to retrieve users.", err))?;
    debug!(users = users.len(), "admin user listing requested");
    Ok(Json(users.into_iter().map(UserSummary::from).collect()))
}

async fn admin_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderSummary>>, ApiError> {
    let orders = state
        .store
        .list_orders()
        .await
        .map_err(|err| ApiError::internal("Failed to retrieve orders.", err))?;
    debug!(orders = orders.len(), "admin order listing requested");
    Ok(Json(orders.into_iter().map(OrderSummary::from).collect()))
}
