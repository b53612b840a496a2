//! routes/search.rs: catalog search proxy used to pick a `song_uri`.
use std::sync::Arc;

use axum::{extract::{Extension, Query}, routing::get, Json, Router};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppErr, AppResult},
    utils::token::TokenCache,
};

const PAGE_SIZE: &str = "50";

pub struct SearchGateway {
    http:    Client,
    api_url: String,
    tokens:  TokenCache,
}

impl SearchGateway {
    pub fn new(http: Client, api_url: String, tokens: TokenCache) -> Self {
        Self { http, api_url, tokens }
    }
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub uri:    String,
    pub title:  String,
    pub artist: String,
    pub album:  String,
    pub image:  Option<String>,
}

/* ---- upstream response, only the parts we read ---- */
#[derive(Deserialize)]
struct SearchResp { tracks: Page }
#[derive(Deserialize)]
struct Page { #[serde(default)] items: Vec<Track> }
#[derive(Deserialize)]
struct Track {
    uri: String,
    name: String,
    #[serde(default)] artists: Vec<Named>,
    album: Option<Album>,
}
#[derive(Deserialize)]
struct Named { name: String }
#[derive(Deserialize)]
struct Album { name: String, #[serde(default)] images: Vec<Image> }
#[derive(Deserialize)]
struct Image { url: String }

pub fn router() -> Router {
    Router::new().route("/search", get(search))
}

async fn search(
    Extension(gw): Extension<Arc<SearchGateway>>,
    Query(p): Query<SearchQuery>,
) -> AppResult<Json<Value>> {
    let text = p.q.trim();
    if text.is_empty() {
        return Ok(Json(json!({ "data": [] })));
    }

    let token = gw.tokens.access_token().await?;
    let url = format!("{}/search", gw.api_url.trim_end_matches('/'));
    let resp = gw
        .http
        .get(&url)
        .bearer_auth(token)
        .query(&[("q", text), ("type", "track"), ("limit", PAGE_SIZE)])
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(AppErr::Upstream { status, body });
    }

    let found: SearchResp = resp.json().await?;
    Ok(Json(json!({ "data": describe(found) })))
}

fn describe(resp: SearchResp) -> Vec<TrackDescriptor> {
    resp.tracks
        .items
        .into_iter()
        .map(|t| {
            let artist = t.artists.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ");
            // images come largest first
            let (album, image) = match t.album {
                Some(a) => (a.name, a.images.into_iter().last().map(|i| i.url)),
                None    => (String::new(), None),
            };
            TrackDescriptor { uri: t.uri, title: t.name, artist, album, image }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use sqlx::sqlite::SqlitePoolOptions;
    use tower::ServiceExt;

    #[test]
    fn maps_upstream_tracks() {
        let raw = json!({
            "tracks": { "items": [
                {
                    "uri": "spotify:track:1",
                    "name": "Song A",
                    "artists": [{ "name": "X" }, { "name": "Y" }],
                    "album": { "name": "LP", "images": [
                        { "url": "big", "width": 640 },
                        { "url": "mid", "width": 300 },
                        { "url": "small", "width": 64 }
                    ]}
                },
                { "uri": "spotify:track:2", "name": "Song B" }
            ]}
        });
        let tracks = describe(serde_json::from_value(raw).unwrap());
        assert_eq!(tracks, vec![
            TrackDescriptor {
                uri: "spotify:track:1".into(), title: "Song A".into(),
                artist: "X, Y".into(), album: "LP".into(), image: Some("small".into()),
            },
            TrackDescriptor {
                uri: "spotify:track:2".into(), title: "Song B".into(),
                artist: String::new(), album: String::new(), image: None,
            },
        ]);
    }

    async fn app() -> Router {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::utils::token::init_db(&pool).await.unwrap();
        let http = Client::new();
        let tokens = TokenCache::new(pool, http.clone(), "http://127.0.0.1:9/token".into(), None);
        let gw = Arc::new(SearchGateway::new(http, "http://127.0.0.1:9".into(), tokens));
        router().layer(Extension(gw))
    }

    #[tokio::test]
    async fn blank_query_short_circuits() {
        let resp = app()
            .await
            .oneshot(Request::get("/search?q=%20%20").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v, json!({ "data": [] }));
    }

    #[tokio::test]
    async fn missing_credentials_is_503() {
        let resp = app()
            .await
            .oneshot(Request::get("/search?q=abba").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
