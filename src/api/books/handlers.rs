use crate::api::models::*;
use crate::lookup::{LookupEvent, ProxyResponse};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use tracing::warn;

/// `GET /books?bookid=N`
pub async fn get_books_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let event = LookupEvent::from_query(params);
    let response = state.lookup.handle(&event).await;
    into_http_response(response)
}

/// `POST /invoke` with a proxy event body; replies with the proxy response.
pub async fn invoke_handler(
    State(state): State<AppState>,
    payload: Result<Json<LookupEvent>, JsonRejection>,
) -> Result<Json<ProxyResponse>, AppError> {
    let Json(event) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(Json(state.lookup.handle(&event).await))
}

/// Maps a proxy response onto a plain HTTP response.
fn into_http_response(proxy: ProxyResponse) -> Response {
    let status =
        StatusCode::from_u16(proxy.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut headers = HeaderMap::new();
    for (name, value) in proxy.headers.iter().flatten() {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "Dropping invalid response header"),
        }
    }
    headers
        .entry(header::CONTENT_TYPE)
        .or_insert(HeaderValue::from_static("application/json"));

    (status, headers, proxy.body).into_response()
}

#[cfg(test)]
mod tests {
    use crate::api::{app, AppState};
    use crate::config::HandlerVariant;
    use crate::lookup::BookLookup;
    use crate::storage::codec::decode_plain_item;
    use crate::storage::MemoryStore;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(variant: HandlerVariant) -> Router {
        let books = [
            json!({"bookid": 1, "title": "Dune", "price": 19.99}),
            json!({"bookid": 2, "title": "Emma", "tags": ["classic"]}),
        ]
        .into_iter()
        .map(|item| decode_plain_item(item).unwrap());
        let store = MemoryStore::with_records("Books", "bookid", books).unwrap();

        app(AppState {
            lookup: Arc::new(BookLookup::new(Arc::new(store), variant)),
        })
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, header::HeaderMap, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn invoke(event: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/invoke")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(event.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn get_book_by_id() {
        let (status, headers, body) = send(router(HandlerVariant::Strict), get("/books?bookid=1")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert_eq!(body, json!({"bookid": 1, "title": "Dune", "price": 19.99}));
    }

    #[tokio::test]
    async fn unknown_book_is_404() {
        let (status, _, body) = send(router(HandlerVariant::Strict), get("/books?bookid=42")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Book not found"}));
    }

    #[tokio::test]
    async fn strict_without_id_is_400() {
        let (status, _, body) = send(router(HandlerVariant::Strict), get("/books")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing query string parameter 'bookid'"}));
    }

    #[tokio::test]
    async fn listing_without_id_returns_all_with_cors() {
        let (status, headers, body) = send(router(HandlerVariant::Listing), get("/books")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            body,
            json!([
                {"bookid": 1, "title": "Dune", "price": 19.99},
                {"bookid": 2, "title": "Emma", "tags": ["classic"]}
            ])
        );
    }

    #[tokio::test]
    async fn non_numeric_id_is_500() {
        let (status, _, body) = send(router(HandlerVariant::Listing), get("/books?bookid=abc")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Unable to read item");
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn invoke_returns_proxy_response() {
        let (status, _, body) = send(
            router(HandlerVariant::Strict),
            invoke(json!({"queryStringParameters": {"bookid": "2"}})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["statusCode"], 200);
        assert!(body.get("headers").is_none());
        let inner: Value = serde_json::from_str(body["body"].as_str().unwrap()).unwrap();
        assert_eq!(inner, json!({"bookid": 2, "title": "Emma", "tags": ["classic"]}));
    }

    #[tokio::test]
    async fn invoke_without_parameters() {
        let (_, _, body) = send(router(HandlerVariant::Strict), invoke(json!({}))).await;
        assert_eq!(body["statusCode"], 400);

        let (_, _, body) = send(
            router(HandlerVariant::Listing),
            invoke(json!({"queryStringParameters": null})),
        )
        .await;
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["headers"]["Access-Control-Allow-Origin"], "*");
        assert_eq!(body["headers"]["Content-Type"], "application/json");
    }

    #[tokio::test]
    async fn malformed_invoke_body_is_rejected() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/invoke")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("not json"))
            .unwrap();

        let (status, _, body) = send(router(HandlerVariant::Strict), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn health_reports_store() {
        let (status, _, body) = send(router(HandlerVariant::Listing), get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["backend"], "memory");
        assert_eq!(body["table"], "Books");
        assert_eq!(body["variant"], "listing");
    }
}
