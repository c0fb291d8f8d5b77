use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use crate::models::{Item, ItemsResponse};
use serde::Serialize;

fn json_response<T: Serialize>(body: &T, mut headers: HeaderMap) -> Response {
    let json = match serde_json::to_string(body) {
        Ok(json) => json,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    (StatusCode::OK, headers, json).into_response()
}

/// `{ "items": [...] }` with the match count in `X-Total-Count`
pub fn items_with_total_count(items: Vec<Item>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("X-Total-Count", HeaderValue::from(items.len()));

    json_response(&ItemsResponse { items }, headers)
}

pub fn item(item: &Item) -> Response {
    json_response(item, HeaderMap::new())
}
