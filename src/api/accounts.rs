use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};

use super::extract::{Json, Path};
use super::{AppState, Credential};
use crate::accounts::{Account, AccountRef, AccountStore, AccountUpdate, Login, PublicAccount, Registration};
use crate::decks::{Deck, DeckStore};
use crate::error::{Result, ServiceError};
use crate::subscriptions::SubscriptionRegistry;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/token", get(check_token))
        .route("/auth/logout", post(logout))
        .route(
            "/account",
            get(current_account).patch(update_account).delete(delete_account),
        )
        .route("/users/{username}", get(public_profile))
        .route("/users/{username}/decks", get(owned_decks))
        .route("/users/{username}/subscribed", get(subscribed_decks))
}

async fn register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Result<(StatusCode, Json<Account>)> {
    let ttl = state.token_ttl();
    let account = state
        .run(move |conn| AccountStore::new(conn).with_token_ttl(ttl).register(registration))
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

async fn login(State(state): State<AppState>, Json(login): Json<Login>) -> Result<Json<Account>> {
    let ttl = state.token_ttl();
    state
        .run(move |conn| {
            AccountStore::new(conn)
                .with_token_ttl(ttl)
                .login(&login.username, &login.password)
        })
        .await
        .map(Json)
}

async fn check_token(State(state): State<AppState>, credential: Credential) -> Result<Json<Account>> {
    state
        .run(move |conn| credential.require(conn))
        .await
        .map(Json)
}

async fn logout(State(state): State<AppState>, credential: Credential) -> Result<StatusCode> {
    state
        .run(move |conn| {
            let token = credential.token()?.ok_or(ServiceError::InvalidCredential)?;
            AccountStore::new(conn).logout(token)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn current_account(State(state): State<AppState>, credential: Credential) -> Result<Json<Account>> {
    state
        .run(move |conn| credential.require(conn))
        .await
        .map(Json)
}

async fn update_account(
    State(state): State<AppState>,
    credential: Credential,
    Json(update): Json<AccountUpdate>,
) -> Result<Json<Account>> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            AccountStore::new(conn).update(account.id, update)
        })
        .await
        .map(Json)
}

async fn delete_account(State(state): State<AppState>, credential: Credential) -> Result<StatusCode> {
    state
        .run(move |conn| {
            let account = credential.require(conn)?;
            AccountStore::new(conn).delete(account.id)
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn public_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<PublicAccount>> {
    state
        .run(move |conn| AccountStore::new(conn).public_profile(&username))
        .await
        .map(Json)
}

async fn owned_decks(
    State(state): State<AppState>,
    credential: Credential,
    Path(username): Path<String>,
) -> Result<Json<Vec<Deck>>> {
    state
        .run(move |conn| {
            let requester = credential.optional(conn)?;
            DeckStore::new(conn).owned_by(&AccountRef::Username(username), requester)
        })
        .await
        .map(Json)
}

async fn subscribed_decks(
    State(state): State<AppState>,
    credential: Credential,
    Path(username): Path<String>,
) -> Result<Json<Vec<Deck>>> {
    state
        .run(move |conn| {
            let requester = credential.optional(conn)?;
            SubscriptionRegistry::new(conn).subscribed_decks(&AccountRef::Username(username), requester)
        })
        .await
        .map(Json)
}
