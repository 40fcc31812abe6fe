//! Shared helpers for the end-to-end tests: an app wired with stub
//! collaborators and scratch databases, plus request plumbing.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tastelog_server::llm::{CompletionOptions, LlmError, LlmProvider};
use tastelog_server::recommend::RecommendService;
use tastelog_server::server::{make_app, ServerConfig, Session};
use tastelog_server::streaming::{
    ArtistRef, PlayEvent, SearchHit, SearchKind, StreamingError, TimeRange, TopArtist, TopTrack,
};
use tastelog_server::{SqliteLibraryStore, SqliteRecommendStore, StreamingApi};
use tempfile::TempDir;
use tower::ServiceExt;

/// Streaming stub with a small fixed listening history; search finds
/// everything except queries containing "Unfindable".
pub struct StubStreaming;

#[async_trait]
impl StreamingApi for StubStreaming {
    async fn top_artists(
        &self,
        _access_token: &str,
        _range: TimeRange,
        _limit: usize,
    ) -> Result<Vec<TopArtist>, StreamingError> {
        Ok(vec![TopArtist {
            id: "a1".to_string(),
            name: "Alice Coltrane".to_string(),
            genres: vec!["spiritual jazz".to_string()],
        }])
    }

    async fn top_tracks(
        &self,
        _access_token: &str,
        _range: TimeRange,
        _limit: usize,
    ) -> Result<Vec<TopTrack>, StreamingError> {
        Ok(vec![TopTrack {
            id: "t1".to_string(),
            name: "Journey in Satchidananda".to_string(),
            artists: vec![ArtistRef {
                name: "Alice Coltrane".to_string(),
            }],
        }])
    }

    async fn recently_played(&self, _access_token: &str) -> Result<Vec<PlayEvent>, StreamingError> {
        Ok(vec![])
    }

    async fn search(
        &self,
        _access_token: &str,
        query: &str,
        kind: SearchKind,
        _limit: usize,
    ) -> Result<Vec<SearchHit>, StreamingError> {
        if query.contains("Unfindable") {
            return Ok(vec![]);
        }
        Ok(vec![SearchHit {
            id: format!("id:{}:{}", kind.as_param(), query.trim()),
            name: query.trim().to_string(),
            image_url: Some("https://img/1".to_string()),
            canonical_url: Some(format!("https://catalog/{}", query.trim())),
        }])
    }
}

/// Provider that pops a scripted outcome per call.
pub struct ScriptedLlm {
    outcomes: Mutex<Vec<Result<String, LlmError>>>,
}

impl ScriptedLlm {
    pub fn new(outcomes: Vec<Result<String, LlmError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(
        &self,
        _messages: &[tastelog_server::llm::Message],
        _options: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            return Err(LlmError::InvalidResponse("script exhausted".to_string()));
        }
        outcomes.remove(0)
    }
}

/// A model reply with two findable items and one that misses the catalog.
pub fn good_reply() -> String {
    serde_json::json!({
        "taste_summary": "Deep in spiritual jazz.",
        "recommendations": [
            {
                "type": "track",
                "title": "The Creator Has a Master Plan",
                "artist": "Pharoah Sanders",
                "year": 1969,
                "why": "Sits right next to your Alice Coltrane plays.",
                "discovery_angle": "deep_cut",
                "mood_tags": ["transcendent"]
            },
            {
                "type": "album",
                "title": "Karma",
                "artist": "Pharoah Sanders",
                "year": "1969",
                "why": "The long-form version of what you already love.",
                "discovery_angle": "artist_evolution",
                "mood_tags": []
            },
            {
                "type": "artist",
                "title": "Unfindable Artist",
                "artist": "",
                "why": "Adjacent scene.",
                "discovery_angle": "cross_genre"
            }
        ]
    })
    .to_string()
}

pub struct TestApp {
    pub app: Router,
    _db_dir: TempDir,
}

impl TestApp {
    /// Builds the real router over scratch databases, with the given model
    /// script. `llm_outcomes: None` simulates an unconfigured backend.
    pub fn spawn(llm_outcomes: Option<Vec<Result<String, LlmError>>>) -> Self {
        let db_dir = TempDir::new().unwrap();
        let library = Arc::new(SqliteLibraryStore::new(db_dir.path().join("library.db")).unwrap());
        let store =
            Arc::new(SqliteRecommendStore::new(db_dir.path().join("recommend.db")).unwrap());
        let llm: Option<Arc<dyn LlmProvider>> = llm_outcomes
            .map(|outcomes| Arc::new(ScriptedLlm::new(outcomes)) as Arc<dyn LlmProvider>);

        let recommend = Arc::new(RecommendService::new(
            Arc::new(StubStreaming),
            library,
            llm,
            store,
            Duration::from_secs(60),
        ));
        TestApp {
            app: make_app(ServerConfig::default(), recommend),
            _db_dir: db_dir,
        }
    }

    /// Sends a request authenticated as `user_id`.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        user_id: i64,
        body: Option<serde_json::Value>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .extension(Session {
                user_id,
                access_token: format!("token-{}", user_id),
            });
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn expect_json(response: Response, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    json_body(response).await
}
