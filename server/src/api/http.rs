use axum::{
    extract::{rejection::JsonRejection, Path, Query, State as AxumState},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use casino_lobby_engine::{Error, LayoutRequest, RenderContext};
use casino_lobby_types::{GameType, Placement, Platform, RatingInput, UserEvent};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use crate::{Lobby, ReviewSubmission, DEFAULT_SEARCH_LIMIT};
use casino_lobby_types::game::DEFAULT_GAME_LIMIT;

#[derive(Serialize)]
struct HealthzResponse {
    ok: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LobbyParams {
    platform: Option<String>,
    user_id: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct SlugLobbyParams {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct GameListParams {
    #[serde(rename = "type")]
    game_type: Option<String>,
    limit: Option<usize>,
    page: Option<usize>,
}

#[derive(Deserialize)]
pub(super) struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(rename = "type")]
    game_type: Option<String>,
    limit: Option<usize>,
}

#[derive(Deserialize)]
pub(super) struct PromotionParams {
    placement: Option<String>,
}

/// Maps an error to the status a client should see.
fn error_response(err: Error) -> Response {
    let status = match &err {
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::Invalid(_) => StatusCode::BAD_REQUEST,
        Error::Conflict(_) => StatusCode::CONFLICT,
        Error::SourceUnavailable(_) | Error::Timeout(_) => {
            tracing::warn!(error = %err, "upstream failure");
            StatusCode::BAD_GATEWAY
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

fn respond<T: Serialize>(result: Result<T, Error>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(err) => error_response(err),
    }
}

/// Unwraps a JSON body. Bodies that parse but do not fit the target type
/// (missing fields, out-of-range numbers) are invalid input; other rejections
/// keep their own status.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::JsonDataError(err)) => {
            Err(error_response(Error::Invalid(err.body_text())))
        }
        Err(JsonRejection::JsonSyntaxError(err)) => {
            Err(error_response(Error::Invalid(err.body_text())))
        }
        Err(rejection) => Err(rejection.into_response()),
    }
}

/// Parses an optional wire-named enum from a query parameter.
fn parse_param<T: FromStr>(value: Option<&str>) -> Result<Option<T>, Error>
where
    T::Err: std::fmt::Display,
{
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|err: T::Err| Error::Invalid(err.to_string())),
        None => Ok(None),
    }
}

fn render_context(user_id: Option<String>) -> RenderContext {
    match user_id {
        Some(user_id) if !user_id.trim().is_empty() => RenderContext::for_user(user_id),
        _ => RenderContext::anonymous(),
    }
}

pub(super) async fn healthz() -> Response {
    Json(HealthzResponse { ok: true }).into_response()
}

pub(super) async fn config(AxumState(lobby): AxumState<Arc<Lobby>>) -> Response {
    Json(lobby.config.clone()).into_response()
}

pub(super) async fn http_metrics(
    headers: HeaderMap,
    AxumState(lobby): AxumState<Arc<Lobby>>,
) -> Response {
    if let Some(status) = metrics_auth_error(&headers) {
        return status.into_response();
    }
    Json(lobby.http_metrics_snapshot()).into_response()
}

fn metrics_auth_error(headers: &HeaderMap) -> Option<StatusCode> {
    let token = std::env::var("METRICS_AUTH_TOKEN").unwrap_or_default();
    if token.is_empty() {
        return None;
    }
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);
    let header_token = headers
        .get("x-metrics-token")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    if bearer.as_deref() == Some(token.as_str()) || header_token.as_deref() == Some(token.as_str())
    {
        None
    } else {
        Some(StatusCode::UNAUTHORIZED)
    }
}

pub(super) async fn default_lobby(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    Query(params): Query<LobbyParams>,
) -> Response {
    let platform = match parse_param::<Platform>(params.platform.as_deref()) {
        Ok(platform) => platform.unwrap_or(Platform::Web),
        Err(err) => return error_response(err),
    };
    let start = Instant::now();
    let result = lobby
        .lobby(
            &LayoutRequest::Platform(platform),
            &render_context(params.user_id),
        )
        .await;
    lobby.http_metrics().record_lobby(start.elapsed());
    respond(result)
}

pub(super) async fn lobby_by_slug(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    Path(slug): Path<String>,
    Query(params): Query<SlugLobbyParams>,
) -> Response {
    let start = Instant::now();
    let result = lobby
        .lobby(&LayoutRequest::Slug(slug), &render_context(params.user_id))
        .await;
    lobby.http_metrics().record_lobby(start.elapsed());
    respond(result)
}

pub(super) async fn list_games(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    Query(params): Query<GameListParams>,
) -> Response {
    let game_type = match parse_param::<GameType>(params.game_type.as_deref()) {
        Ok(game_type) => game_type,
        Err(err) => return error_response(err),
    };
    let start = Instant::now();
    let result = lobby
        .list_games(
            game_type,
            params.limit.unwrap_or(DEFAULT_GAME_LIMIT),
            params.page.unwrap_or(1),
        )
        .await;
    lobby.http_metrics().record_catalog(start.elapsed());
    respond(result)
}

pub(super) async fn search_games(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let game_type = match parse_param::<GameType>(params.game_type.as_deref()) {
        Ok(game_type) => game_type,
        Err(err) => return error_response(err),
    };
    let start = Instant::now();
    let result = lobby
        .search_games(
            &params.q,
            game_type,
            params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
        )
        .await;
    lobby.http_metrics().record_catalog(start.elapsed());
    respond(result)
}

pub(super) async fn get_game(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    Path(slug): Path<String>,
) -> Response {
    let start = Instant::now();
    let result = lobby.game(&slug).await;
    lobby.http_metrics().record_catalog(start.elapsed());
    respond(result)
}

pub(super) async fn list_promotions(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    Query(params): Query<PromotionParams>,
) -> Response {
    let placement = match parse_param::<Placement>(params.placement.as_deref()) {
        Ok(placement) => placement,
        Err(err) => return error_response(err),
    };
    let start = Instant::now();
    let result = lobby.promotions(placement).await;
    lobby.http_metrics().record_catalog(start.elapsed());
    respond(result)
}

pub(super) async fn get_promotion(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    Path(slug): Path<String>,
) -> Response {
    let start = Instant::now();
    let result = lobby.promotion(&slug).await;
    lobby.http_metrics().record_catalog(start.elapsed());
    respond(result)
}

pub(super) async fn list_reviews(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    Path(slug): Path<String>,
) -> Response {
    let start = Instant::now();
    let result = lobby.reviews(&slug).await;
    lobby.http_metrics().record_reviews(start.elapsed());
    respond(result)
}

pub(super) async fn get_user_review(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    Path((slug, user_id)): Path<(String, String)>,
) -> Response {
    let start = Instant::now();
    let result = lobby.user_review(&slug, &user_id).await;
    lobby.http_metrics().record_reviews(start.elapsed());
    respond(result)
}

pub(super) async fn submit_review(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    Path(slug): Path<String>,
    body: Result<Json<ReviewSubmission>, JsonRejection>,
) -> Response {
    let submission = match json_body(body) {
        Ok(submission) => submission,
        Err(response) => return response,
    };
    let start = Instant::now();
    let result = lobby.submit_review(&slug, submission).await;
    lobby.http_metrics().record_reviews(start.elapsed());
    match result {
        Ok(review) => (StatusCode::CREATED, Json(review)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(super) async fn track_event(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    body: Result<Json<UserEvent>, JsonRejection>,
) -> Response {
    let event = match json_body(body) {
        Ok(event) => event,
        Err(response) => return response,
    };
    let start = Instant::now();
    let result = lobby.track_event(&event).await;
    lobby.http_metrics().record_feedback(start.elapsed());
    match result {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) => error_response(err),
    }
}

pub(super) async fn submit_rating(
    AxumState(lobby): AxumState<Arc<Lobby>>,
    body: Result<Json<RatingInput>, JsonRejection>,
) -> Response {
    let rating = match json_body(body) {
        Ok(rating) => rating,
        Err(response) => return response,
    };
    let start = Instant::now();
    let result = lobby.submit_rating(&rating).await;
    lobby.http_metrics().record_feedback(start.elapsed());
    match result {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(err) => error_response(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param::<GameType>(Some("live")).unwrap(),
            Some(GameType::Live)
        );
        assert_eq!(parse_param::<GameType>(Some(" ")).unwrap(), None);
        assert_eq!(parse_param::<GameType>(None).unwrap(), None);
        assert_eq!(
            parse_param::<GameType>(Some("bingo")).unwrap_err(),
            Error::Invalid("unknown game type: bingo".to_string())
        );
    }

    #[test]
    fn test_blank_user_is_anonymous() {
        assert_eq!(render_context(Some("  ".to_string())), RenderContext::anonymous());
        assert_eq!(
            render_context(Some("u1".to_string())),
            RenderContext::for_user("u1")
        );
        assert_eq!(render_context(None), RenderContext::anonymous());
    }

    #[test]
    fn test_error_statuses() {
        let cases = [
            (Error::not_found("game", "x"), StatusCode::NOT_FOUND),
            (Error::Invalid("bad".to_string()), StatusCode::BAD_REQUEST),
            (Error::Conflict("dup".to_string()), StatusCode::CONFLICT),
            (Error::unavailable("down"), StatusCode::BAD_GATEWAY),
            (
                Error::Timeout(std::time::Duration::from_secs(1)),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(err).status(), status);
        }
    }
}
