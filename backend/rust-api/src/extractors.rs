use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// JSON body extractor whose rejections use the API's `{message, status}` shape
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = format!("Invalid submission body: {}", rejection);
                tracing::warn!("{}", message);
                let error_response = json!({
                    "message": message,
                    "status": 400
                });
                Err((StatusCode::BAD_REQUEST, Json(error_response)).into_response())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        code: String,
    }

    #[tokio::test]
    async fn malformed_json_is_rejected_with_json_error() {
        let request = Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let rejection = match AppJson::<Payload>::from_request(request, &()).await {
            Ok(_) => panic!("malformed body must be rejected"),
            Err(response) => response,
        };

        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_content_type_is_a_bad_request() {
        let request = Request::builder()
            .method("POST")
            .body(Body::from(r#"{"code":"x"}"#))
            .unwrap();

        let rejection = match AppJson::<Payload>::from_request(request, &()).await {
            Ok(_) => panic!("body without content type must be rejected"),
            Err(response) => response,
        };

        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
    }
}
