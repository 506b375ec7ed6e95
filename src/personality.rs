//! Personality generator
//!
//! Turns a birthdate into a short, positive personality blurb via one
//! completion call. Call failures are rendered as text, not returned as
//! errors; only an impossible birthdate is rejected.

use crate::error::{AppError, AppResult};
use crate::llm::{ChatMessage, CompletionClient};
use crate::metrics::{Flow, Metrics, PersonalityOutcome};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::sync::Arc;

/// System instruction sent with every personality request
pub const PERSONALITY_SYSTEM_PROMPT: &str =
    "You are an insightful personality analyst who writes warm, concise profiles.";

/// Prefix of the text shown when the completion call fails
pub const PREDICTION_ERROR_PREFIX: &str = "Error generating prediction:";

/// Age in whole years on `today`
///
/// Returns `None` when `birthdate` is after `today`.
pub fn compute_age(birthdate: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birthdate > today {
        return None;
    }
    let mut age = today.year() - birthdate.year();
    if (today.month(), today.day()) < (birthdate.month(), birthdate.day()) {
        age -= 1;
    }
    u32::try_from(age).ok()
}

/// User-side prompt for a given birthdate and age
pub fn build_personality_prompt(birthdate: NaiveDate, age: u32) -> String {
    format!(
        "Someone was born on {} and is {} years old. \
         Provide a concise, positive personality analysis for them covering:\n\
         1. Key personality traits\n\
         2. Strengths and potential challenges\n\
         3. Career inclinations\n\
         4. Relationship tendencies\n\n\
         Keep the tone encouraging and the whole analysis under 250 words.",
        birthdate.format("%B %-d, %Y"),
        age
    )
}

/// Displayable result of a personality request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub age: u32,
    /// Model text, or an `Error generating prediction: ...` message
    pub prediction: String,
    /// False when `prediction` holds the error message
    #[serde(skip)]
    pub generated: bool,
}

pub struct PersonalityGenerator {
    client: Arc<dyn CompletionClient>,
    metrics: Arc<Metrics>,
}

impl PersonalityGenerator {
    pub fn new(client: Arc<dyn CompletionClient>, metrics: Arc<Metrics>) -> Self {
        Self { client, metrics }
    }

    /// Generate a personality blurb for `birthdate` as of `today`
    ///
    /// # Errors
    /// Only [`AppError::Validation`] for a birthdate in the future. A failed
    /// completion call yields `Ok` with the error text in `prediction`.
    pub async fn generate(&self, birthdate: NaiveDate, today: NaiveDate) -> AppResult<Prediction> {
        let age = compute_age(birthdate, today).ok_or_else(|| {
            AppError::Validation(format!(
                "birthdate {} is after today ({})",
                birthdate, today
            ))
        })?;

        let messages = [
            ChatMessage::system(PERSONALITY_SYSTEM_PROMPT),
            ChatMessage::user(build_personality_prompt(birthdate, age)),
        ];

        let prediction = match self.client.complete(&messages).await {
            Ok(text) => {
                tracing::info!(age, response_length = text.len(), "Generated personality prediction");
                Prediction {
                    age,
                    prediction: text,
                    generated: true,
                }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    error_kind = e.kind(),
                    age,
                    "Personality completion call failed"
                );
                if let Err(me) = self.metrics.record_llm_failure(Flow::Personality, &e) {
                    tracing::warn!(error = %me, "Failed to record LLM failure metric");
                }
                Prediction {
                    age,
                    prediction: format!("{} {}", PREDICTION_ERROR_PREFIX, e),
                    generated: false,
                }
            }
        };

        let outcome = if prediction.generated {
            PersonalityOutcome::Generated
        } else {
            PersonalityOutcome::Failed
        };
        if let Err(e) = self.metrics.record_personality(outcome) {
            tracing::warn!(error = %e, "Failed to record personality metric");
        }

        Ok(prediction)
    }
}
