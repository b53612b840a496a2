use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

pub mod search;
pub mod ws;

pub fn router() -> Router {
    Router::new()
        .nest("/api", search::router())
        .merge(ws::router())
}

/* ---- front-end pages: `/` is index.html, `/room` the room page ---- */
pub fn pages(dir: &Path) -> Router {
    Router::new()
        .route_service("/room", ServeFile::new(dir.join("room.html")))
        .fallback_service(ServeDir::new(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    async fn get(uri: &str) -> (StatusCode, String) {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("static");
        let resp = pages(&dir)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn shipped_pages_are_served() {
        let (status, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("roomForm"));

        let (status, body) = get("/room?name=party&mode=join").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/main.js"));

        let (status, body) = get("/main.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("/socket"));
    }

    #[tokio::test]
    async fn unknown_page_is_404() {
        assert_eq!(get("/nope.html").await.0, StatusCode::NOT_FOUND);
    }
}
