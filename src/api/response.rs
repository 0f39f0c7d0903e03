use serde::Serialize;
use axum::Json;
use axum::http::StatusCode;

/// Success envelope: `{ success: true, message, data }`. Failures are rendered
/// by `AppError`'s `IntoResponse` impl.
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

pub fn success<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            message: message.to_string(),
            data,
        }),
    )
}
