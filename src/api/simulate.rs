use std::collections::HashMap;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::Method,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;

use crate::{
    api::{
        error::ApiError,
        response::{self, ApiResponse},
        AppState,
    },
    simulation::{stage_upload, SimulationParams, UploadedFile},
};

const FILE_FIELD: &str = "file";

/// Upload error code for a file input submitted with nothing selected
pub const NO_FILE_SELECTED: u16 = 4;

/// Multipart body split into the uploaded file and plain text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == FILE_FIELD {
                let file_name = field.file_name().map(str::to_string);
                let declared_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(upload_error)?;

                // a part without a filename is not a file upload
                let Some(file_name) = file_name else {
                    continue;
                };
                if file_name.is_empty() && bytes.is_empty() {
                    return Err(ApiError::UploadError {
                        code: NO_FILE_SELECTED,
                        detail: "no file selected".to_string(),
                    });
                }
                if form.file.is_none() {
                    form.file = Some(UploadedFile {
                        file_name,
                        declared_type,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field.text().await.map_err(upload_error)?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }
}

fn upload_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::UploadError {
        code: e.status().as_u16(),
        detail: e.body_text(),
    }
}

/// `POST {endpoint_path}` - run the simulation on an uploaded load profile
///
/// Accepts `multipart/form-data` with a `file` part and the optional fields
/// `start_date`, `end_date`, `inverter_power`, `battery_capacity`,
/// `efficiency_loss` and `battery_reserve`. Responds with the simulator's
/// result file, base64-encoded.
pub async fn run_simulation(
    State(state): State<AppState>,
    method: Method,
    request: Request,
) -> Result<ApiResponse<String>, ApiError> {
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    // a body that is not multipart carries no file
    let multipart = Multipart::from_request(request, &state)
        .await
        .map_err(|_| ApiError::MissingFile)?;
    let form = UploadForm::read(multipart).await?;
    let upload = form.file.ok_or(ApiError::MissingFile)?;

    let detected = upload.detected_type();
    tracing::info!(
        file_name = %upload.file_name,
        declared_type = ?upload.declared_type,
        detected_type = detected,
        bytes = upload.bytes.len(),
        "Simulation upload received"
    );
    if !upload.is_accepted_type() {
        return Err(ApiError::InvalidFileType { detected });
    }

    let sim = state.runner.config();
    let staged = stage_upload(&sim.uploads_path(), &upload, Utc::now().timestamp()).await?;

    let params = SimulationParams::from_form(&form.fields);
    tracing::debug!(?params, "Simulation parameters");

    let outcome = state
        .runner
        .run(&staged.relative_to(&sim.uploads_dir), &params)
        .await;

    if sim.remove_staged_after_run {
        if let Err(e) = tokio::fs::remove_file(&staged.path).await {
            tracing::warn!(
                path = %staged.path.display(),
                error = %e,
                "Failed to remove staged upload"
            );
        }
    }

    let result = outcome?;
    Ok(response::success(STANDARD.encode(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::{to_bytes, Body},
        http::{header, StatusCode},
        response::IntoResponse,
    };

    fn state() -> AppState {
        AppState::new(&Config::default())
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(method: Method, content_type: &str, body: &'static str) -> Request {
        Request::builder()
            .method(method)
            .uri("/simulate")
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    }

    fn multipart(body: &'static str) -> Request {
        request(Method::POST, "multipart/form-data; boundary=XYZ", body)
    }

    async fn call(req: Request) -> axum::response::Response {
        let method = req.method().clone();
        run_simulation(State(state()), method, req).await.into_response()
    }

    #[tokio::test]
    async fn test_get_is_rejected() {
        let response = call(request(Method::GET, "text/plain", "")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"success": false, "error": "Only POST method is allowed"})
        );
    }

    #[tokio::test]
    async fn test_non_multipart_body_has_no_file() {
        let response = call(request(Method::POST, "application/json", "{}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_empty_file_input_is_an_upload_error() {
        let body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"\"\r\n\
            Content-Type: application/octet-stream\r\n\r\n\
            \r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"inverter_power\"\r\n\r\n\
            250\r\n\
            --XYZ--\r\n";
        let response = call(multipart(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({
                "success": false,
                "error": "File upload failed with error code 4"
            })
        );
    }

    #[tokio::test]
    async fn test_file_part_without_filename_is_not_an_upload() {
        let body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"file\"\r\n\r\n\
            a,b\r\n\
            --XYZ--\r\n";
        let response = call(multipart(body)).await;
        assert_eq!(json_body(response).await["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_truncated_multipart_is_an_upload_error() {
        let body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"load.csv\"\r\n\r\n\
            a,b\r\n1,2";
        let response = call(multipart(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = json_body(response).await["error"].as_str().unwrap().to_string();
        assert!(error.starts_with("File upload failed with error code"), "{error}");
    }

    #[tokio::test]
    async fn test_binary_upload_is_rejected() {
        let body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"load.csv\"\r\n\
            Content-Type: text/csv\r\n\r\n\
            \u{0}\u{1}\u{2}binary\r\n\
            --XYZ--\r\n";
        let response = call(multipart(body)).await;
        assert_eq!(
            json_body(response).await["error"],
            "Invalid file type. Only CSV files are allowed."
        );
    }
}
