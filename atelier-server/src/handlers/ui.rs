use atelier_core::{GenerationForm, GenerationRequest};
use axum::extract::rejection::FormRejection;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::Html;

use crate::error::AppError;
use crate::state::AppState;
use crate::views;

pub async fn index() -> Html<String> {
    Html(views::form_page(&GenerationForm::default(), None))
}

/// Handles a form submission. Errors re-render the form with the submitted
/// values and a banner instead of producing a JSON body.
pub async fn generate(
    State(state): State<AppState>,
    form: Result<Form<GenerationForm>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected form submission");
            return (
                rejection.status(),
                Html(views::form_page(
                    &GenerationForm::default(),
                    Some(&rejection.body_text()),
                )),
            );
        }
    };
    let result = match GenerationRequest::try_from(form.clone()) {
        Ok(request) => state.generate(request).await,
        Err(e) => Err(AppError::from(e)),
    };

    match result {
        Ok(outcome) => {
            let output_dir = state.output_dir().display().to_string();
            (
                StatusCode::OK,
                Html(views::results_page(&form, &outcome, &output_dir)),
            )
        }
        Err(e) => (
            e.status(),
            Html(views::form_page(&form, Some(&e.user_message()))),
        ),
    }
}
