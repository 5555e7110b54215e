use axum::{
    extract::{Query, State as AxumState},
    http::StatusCode as AxumStatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use casino_lobby_engine::{
    CatalogSource, Error, LayoutRequest, PromotionSource, RecommendationSource, RenderContext,
    ReviewSource, Sources,
};
use casino_lobby_server::{
    cms::CmsClient, recommendation::RecommendationClient, upstream, Lobby, ServerConfig,
};
use casino_lobby_types::{
    GameQuery, GameType, Platform, ReviewInput, SectionContent, SuggestionSource, UserEvent,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, Duration};

type Params = Vec<(String, String)>;

/// Every query string and body the stub services received.
#[derive(Clone, Default)]
struct Recorded {
    queries: Arc<Mutex<Vec<(String, Params)>>>,
    bodies: Arc<Mutex<Vec<(String, Value)>>>,
}

impl Recorded {
    fn query(&self, path: &str, params: &Params) {
        self.queries
            .lock()
            .unwrap()
            .push((path.to_string(), params.clone()));
    }

    fn queries_for(&self, path: &str) -> Vec<Params> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .filter(|(recorded, _)| recorded == path)
            .map(|(_, params)| params.clone())
            .collect()
    }

    fn bodies_for(&self, path: &str) -> Vec<Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .filter(|(recorded, _)| recorded == path)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

fn values<'a>(params: &'a Params, key: &str) -> Vec<&'a str> {
    params
        .iter()
        .filter(|(candidate, _)| candidate == key)
        .map(|(_, value)| value.as_str())
        .collect()
}

fn cms_game(id: &str, score: f64) -> Value {
    json!({
        "id": id,
        "slug": format!("slug-{id}"),
        "title": format!("Game {id}"),
        "type": "slot",
        "tags": [{"id": "t", "tag": "classic"}],
        "popularityScore": score,
        "badges": null,
        "status": "enabled",
        "thumbnail": {"url": format!("/media/{id}.png")}
    })
}

fn games() -> Vec<Value> {
    vec![
        cms_game("g1", 90.0),
        cms_game("g2", 80.0),
        cms_game("g3", 70.0),
        cms_game("g4", 60.0),
    ]
}

fn paginated(docs: Vec<Value>) -> Response {
    let total = docs.len();
    Json(json!({"docs": docs, "totalDocs": total, "page": 1, "hasNextPage": false})).into_response()
}

async fn cms_games(
    AxumState(recorded): AxumState<Recorded>,
    Query(params): Query<Params>,
) -> Response {
    recorded.query("/api/games", &params);
    let slugs_in = values(&params, "where[slug][in]");
    let slug_equals = values(&params, "where[slug][equals]");
    let docs = games()
        .into_iter()
        .filter(|game| {
            let slug = game["slug"].as_str().unwrap_or_default();
            (slugs_in.is_empty() || slugs_in.contains(&slug))
                && (slug_equals.is_empty() || slug_equals.contains(&slug))
        })
        .collect();
    paginated(docs)
}

async fn cms_layouts(
    AxumState(recorded): AxumState<Recorded>,
    Query(params): Query<Params>,
) -> Response {
    recorded.query("/api/lobby-layouts", &params);
    if values(&params, "where[isDefault][equals]").contains(&"true") {
        return paginated(Vec::new());
    }
    paginated(vec![json!({
        "id": "l1",
        "slug": "web-home",
        "name": "Home",
        "platform": "web",
        "isDefault": false,
        "sections": [
            {
                "id": "b1",
                "blockType": "suggested-games-section",
                "placement": "home",
                "limit": 3
            },
            {
                "id": "b2",
                "blockType": "game-grid-section",
                "filterType": "manual",
                "manualGames": [cms_game("g4", 60.0), "g2"],
                "displayStyle": "single-row"
            },
            {
                "id": "b3",
                "blockType": "carousel-section"
            }
        ]
    })])
}

async fn cms_promotions(
    AxumState(recorded): AxumState<Recorded>,
    Query(params): Query<Params>,
) -> Response {
    recorded.query("/api/promotions", &params);
    AxumStatusCode::SERVICE_UNAVAILABLE.into_response()
}

async fn cms_reviews(
    AxumState(recorded): AxumState<Recorded>,
    Query(params): Query<Params>,
) -> Response {
    recorded.query("/api/game-reviews", &params);
    let existing = values(&params, "where[userId][equals]").contains(&"taken");
    if existing {
        return paginated(vec![json!({
            "id": "r1",
            "userId": "taken",
            "game": "g1",
            "rating": 3,
            "status": "published"
        })]);
    }
    paginated(Vec::new())
}

async fn cms_create_review(
    AxumState(recorded): AxumState<Recorded>,
    Json(body): Json<Value>,
) -> Response {
    recorded
        .bodies
        .lock()
        .unwrap()
        .push(("/api/game-reviews".to_string(), body.clone()));
    let mut doc = body;
    doc["id"] = json!("r-new");
    doc["status"] = json!("published");
    (
        AxumStatusCode::CREATED,
        Json(json!({"doc": doc, "message": "Game Review successfully created."})),
    )
        .into_response()
}

async fn recommendations(
    AxumState(recorded): AxumState<Recorded>,
    Query(params): Query<Params>,
) -> Response {
    recorded.query("/v1/recommendations", &params);
    Json(json!({"recommendations": ["slug-g3", "slug-gone", "slug-g1"]})).into_response()
}

async fn events(AxumState(recorded): AxumState<Recorded>, Json(body): Json<Value>) -> Response {
    recorded
        .bodies
        .lock()
        .unwrap()
        .push(("/v1/events".to_string(), body));
    AxumStatusCode::NO_CONTENT.into_response()
}

fn cms_router(recorded: Recorded) -> Router {
    Router::new()
        .route("/api/games", get(cms_games))
        .route("/api/lobby-layouts", get(cms_layouts))
        .route("/api/promotions", get(cms_promotions))
        .route(
            "/api/game-reviews",
            get(cms_reviews).post(cms_create_review),
        )
        .with_state(recorded)
}

fn recommendation_router(recorded: Recorded) -> Router {
    Router::new()
        .route("/v1/recommendations", get(recommendations))
        .route("/v1/events", axum::routing::post(events))
        .with_state(recorded)
}

async fn serve_router(router: Router) -> (String, tokio::task::JoinHandle<()>) {
    let addr = SocketAddr::from(([127, 0, 0, 1], 0));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    let actual_addr = listener.local_addr().unwrap();
    let base_url = format!("http://{actual_addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .await
            .unwrap();
    });

    sleep(Duration::from_millis(50)).await;
    (base_url, handle)
}

fn cms_client(base_url: &str) -> Arc<CmsClient> {
    Arc::new(CmsClient::new(base_url, Duration::from_secs(2)).unwrap())
}

#[tokio::test]
async fn test_catalog_query_uses_payload_filters() {
    let recorded = Recorded::default();
    let (base_url, handle) = serve_router(cms_router(recorded.clone())).await;
    let cms = cms_client(&base_url);

    let games = cms
        .query(&GameQuery::by_type(GameType::Slot, 2))
        .await
        .unwrap();
    assert_eq!(games.len(), 4);
    assert_eq!(games[0].tags, vec!["classic".to_string()]);
    assert!(games[0].extra.contains_key("thumbnail"));

    let params = &recorded.queries_for("/api/games")[0];
    assert_eq!(values(params, "where[status][equals]"), vec!["enabled"]);
    assert_eq!(values(params, "where[type][equals]"), vec!["slot"]);
    assert_eq!(values(params, "sort"), vec!["-popularityScore"]);
    assert_eq!(values(params, "limit"), vec!["2"]);

    let found = cms
        .by_slugs(&["slug-g2".to_string(), "slug-g3".to_string()])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);

    let missing = CatalogSource::by_slug(cms.as_ref(), "slug-none").await.unwrap();
    assert!(missing.is_none());

    handle.abort();
}

#[tokio::test]
async fn test_remote_lobby_resolution() {
    let cms_recorded = Recorded::default();
    let rec_recorded = Recorded::default();
    let (cms_url, cms_handle) = serve_router(cms_router(cms_recorded.clone())).await;
    let (rec_url, rec_handle) = serve_router(recommendation_router(rec_recorded.clone())).await;

    let cms = cms_client(&cms_url);
    let sources = Sources {
        catalog: cms.clone(),
        promotions: cms.clone(),
        layouts: cms.clone(),
        recommendations: Arc::new(
            RecommendationClient::new(&rec_url, Duration::from_secs(2)).unwrap(),
        ),
    };
    let lobby = Lobby::new(ServerConfig::unlimited(), sources, cms);

    let layout = lobby
        .lobby(
            &LayoutRequest::Platform(Platform::Web),
            &RenderContext::for_user("u1"),
        )
        .await
        .unwrap();
    assert_eq!(layout.slug, "web-home");

    // The default lookup came back empty, so the plain platform lookup ran.
    let layout_queries = cms_recorded.queries_for("/api/lobby-layouts");
    assert_eq!(layout_queries.len(), 2);
    assert_eq!(values(&layout_queries[1], "depth"), vec!["2"]);

    match &layout.sections[0].content {
        SectionContent::SuggestedGames { games, source, .. } => {
            assert_eq!(*source, SuggestionSource::Personalized);
            let ids: Vec<&str> = games.iter().map(|game| game.id.as_str()).collect();
            assert_eq!(ids, vec!["g3", "g1"]);
        }
        other => panic!("unexpected content: {other:?}"),
    }
    let rec_params = &rec_recorded.queries_for("/v1/recommendations")[0];
    assert_eq!(values(rec_params, "userId"), vec!["u1"]);
    assert_eq!(values(rec_params, "placement"), vec!["home"]);
    assert_eq!(values(rec_params, "limit"), vec!["3"]);

    match &layout.sections[1].content {
        SectionContent::GameGrid { display, .. } => {
            let ids: Vec<&str> = display.games().iter().map(|game| game.id.as_str()).collect();
            assert_eq!(ids, vec!["g4", "g2"]);
        }
        other => panic!("unexpected content: {other:?}"),
    }

    // Promotions are down: only the carousel is dropped.
    assert_eq!(layout.sections.len(), 2);
    assert_eq!(layout.omitted.len(), 1);
    assert_eq!(layout.omitted[0].position, 2);

    cms_handle.abort();
    rec_handle.abort();
}

#[tokio::test]
async fn test_unreachable_recommendations_fall_back_to_popular() {
    let (cms_url, cms_handle) = serve_router(cms_router(Recorded::default())).await;
    let cms = cms_client(&cms_url);
    // Reserve a port, then free it so connections are refused.
    let closed = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let sources = Sources {
        catalog: cms.clone(),
        promotions: cms.clone(),
        layouts: cms.clone(),
        recommendations: Arc::new(
            RecommendationClient::new(&format!("http://{closed}"), Duration::from_millis(500))
                .unwrap(),
        ),
    };
    let lobby = Lobby::new(ServerConfig::unlimited(), sources, cms);

    let layout = lobby
        .lobby(
            &LayoutRequest::Slug("web-home".to_string()),
            &RenderContext::for_user("u1"),
        )
        .await
        .unwrap();
    match &layout.sections[0].content {
        SectionContent::SuggestedGames { games, source, .. } => {
            assert_eq!(*source, SuggestionSource::Popular);
            let ids: Vec<&str> = games.iter().map(|game| game.id.as_str()).collect();
            assert_eq!(ids, vec!["g1", "g2", "g3"]);
        }
        other => panic!("unexpected content: {other:?}"),
    }

    cms_handle.abort();
}

#[tokio::test]
async fn test_review_submission() {
    let recorded = Recorded::default();
    let (base_url, handle) = serve_router(cms_router(recorded.clone())).await;
    let cms = cms_client(&base_url);

    let review = cms
        .submit(&ReviewInput {
            user_id: "fresh".to_string(),
            game: "g1".to_string(),
            rating: 5,
            review_text: Some("great".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(review.id, "r-new");
    assert_eq!(review.game_id(), "g1");
    assert_eq!(recorded.bodies_for("/api/game-reviews").len(), 1);

    let err = cms
        .submit(&ReviewInput {
            user_id: "taken".to_string(),
            game: "g1".to_string(),
            rating: 2,
            review_text: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(recorded.bodies_for("/api/game-reviews").len(), 1);

    handle.abort();
}

#[tokio::test]
async fn test_events_are_posted() {
    let recorded = Recorded::default();
    let (base_url, handle) = serve_router(recommendation_router(recorded.clone())).await;
    let client = RecommendationClient::new(&base_url, Duration::from_secs(2)).unwrap();

    let event: UserEvent = serde_json::from_value(json!({
        "userId": "u1",
        "gameSlug": "slug-g1",
        "eventType": "game_time",
        "durationSeconds": 90
    }))
    .unwrap();
    client.track_event(&event).await.unwrap();

    let bodies = recorded.bodies_for("/v1/events");
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["eventType"], "game_time");
    assert_eq!(bodies[0]["durationSeconds"], 90);

    handle.abort();
}

#[tokio::test]
async fn test_server_errors_are_source_failures() {
    let (base_url, handle) = serve_router(cms_router(Recorded::default())).await;
    let cms = cms_client(&base_url);
    let err = cms.live(None).await.unwrap_err();
    assert!(err.is_unavailable(), "unexpected error: {err:?}");
    handle.abort();
}

#[test]
fn test_rejects_invalid_base_urls() {
    let err = CmsClient::new("ftp://cms.local", Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, upstream::Error::InvalidScheme(_)));
    assert!(CmsClient::new("not a url", Duration::from_secs(1)).is_err());
}
