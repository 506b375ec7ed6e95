//! Personality endpoint handler
//!
//! Handles POST /personality.

use crate::error::AppResult;
use crate::handlers::AppState;
use crate::personality::Prediction;
use axum::{Json, extract::State};
use chrono::NaiveDate;
use serde::Deserialize;

/// Personality request; `birthdate` is `YYYY-MM-DD`
#[derive(Debug, Clone, Deserialize)]
pub struct PersonalityRequest {
    pub birthdate: NaiveDate,
}

/// POST /personality
///
/// Returns 200 with the model text, or 200 with an
/// `Error generating prediction: ...` text when the completion call fails.
/// A birthdate after today is a 400.
pub async fn handler(
    State(state): State<AppState>,
    Json(request): Json<PersonalityRequest>,
) -> AppResult<Json<Prediction>> {
    let today = chrono::Local::now().date_naive();
    let prediction = state
        .personality()
        .generate(request.birthdate, today)
        .await?;
    Ok(Json(prediction))
}
