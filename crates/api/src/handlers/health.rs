use crate::response::ApiResponse;
use serde_json::{Value, json};

pub async fn health() -> ApiResponse<Value> {
    ApiResponse::success(json!({ "status": "ok" }))
}
