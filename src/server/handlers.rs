//! Request handlers

use super::form::BookingForm;
use super::state::AppState;
use axum::{extract::State, http::StatusCode, response::Html, Form};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Shown when the model fails on a validated submission
pub const PREDICTION_FAILED: &str = "An error occurred while making the prediction";

pub async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Validate the submitted booking and render the prediction or the reason it was refused
pub async fn predict_result(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Html<String> {
    let form = match BookingForm::parse(&fields) {
        Ok(form) => form,
        Err(e) => {
            debug!(reason = %e, "Rejected booking form");
            return Html(render_error(&e.to_string()));
        }
    };

    let row = state.layout.row(&form);
    match state.model.predict_row(&row) {
        Ok(prediction) => {
            debug!(prediction, lead_time = form.lead_time, "Served prediction");
            Html(render_prediction(prediction, &form))
        }
        Err(e) => {
            error!(error = %e, "Prediction failed");
            Html(render_error(PREDICTION_FAILED))
        }
    }
}

pub async fn not_found() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(page("Not found", "<p>Page not found. <a href=\"/\">Back to the form</a></p>")),
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"UTF-8\"><title>{}</title></head>\n<body>\n<main>\n<h1>{}</h1>\n{}\n</main>\n</body>\n</html>\n",
        title, title, body
    )
}

fn render_prediction(prediction: i64, form: &BookingForm) -> String {
    let body = format!(
        "<p class=\"prediction\">Prediction: {}</p>\n<ul>\n<li>Lead time: {}</li>\n<li>Arrival month: {}</li>\n<li>Arrival date: {}</li>\n</ul>\n<a href=\"/\">Predict another booking</a>",
        prediction, form.lead_time, form.arrival_month, form.arrival_date
    );
    page("Prediction Result", &body)
}

fn render_error(message: &str) -> String {
    let body = format!(
        "<p class=\"error\">{}</p>\n<a href=\"/\">Back to the form</a>",
        message
    );
    page("Prediction Result", &body)
}
