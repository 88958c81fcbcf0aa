//! Event form handlers.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use super::super::templates;
use super::super::AppState;
use crate::error::{ErrorCategory, PipelineError};
use crate::models::ReceiptUpload;

/// Render the empty form.
pub async fn event_form() -> Html<String> {
    Html(templates::event_form("", "", None))
}

/// Fields collected from the multipart submission.
#[derive(Default)]
struct EventSubmission {
    name: String,
    date: String,
    files: Vec<ReceiptUpload>,
}

async fn read_submission(mut multipart: Multipart) -> Result<EventSubmission, String> {
    let mut submission = EventSubmission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Error: Could not read the upload: {}", e))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "event_name" => {
                submission.name = field.text().await.map_err(|e| e.to_string())?;
            }
            "event_date" => {
                submission.date = field.text().await.map_err(|e| e.to_string())?;
            }
            "files" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Error: Could not read {}: {}", filename, e))?;
                // An empty picker still submits one nameless, empty part
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                submission
                    .files
                    .push(ReceiptUpload::new(filename, bytes.to_vec()));
            }
            other => tracing::debug!("Ignoring unknown form field: {}", other),
        }
    }

    Ok(submission)
}

fn status_for(err: &PipelineError) -> StatusCode {
    match err.category() {
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCategory::TransientIo | ErrorCategory::ExternalService => StatusCode::BAD_GATEWAY,
    }
}

/// Handle a form submission: validate, store, and render the summary.
pub async fn create_event(State(state): State<AppState>, multipart: Multipart) -> Response {
    let submission = match read_submission(multipart).await {
        Ok(s) => s,
        Err(message) => {
            let page = templates::event_form("", "", Some(&templates::intake_error(&message)));
            return (StatusCode::BAD_REQUEST, Html(page)).into_response();
        }
    };

    let EventSubmission { name, date, files } = submission;
    match state.intake.submit(&name, &date, files).await {
        Ok(report) => {
            let summary = templates::intake_summary(&report);
            Html(templates::event_form("", "", Some(&summary))).into_response()
        }
        Err(err) => {
            if !matches!(err, PipelineError::Validation(_)) {
                tracing::error!("Event intake failed: {}", err);
            }
            let summary = templates::intake_error(&err.to_string());
            let page = templates::event_form(&name, &date, Some(&summary));
            (status_for(&err), Html(page)).into_response()
        }
    }
}
