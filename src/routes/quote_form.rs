use std::sync::{atomic::Ordering, Arc};

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    models::quotes::Quote,
    pages,
    submission::{Claim, Step, SubmissionFlow, SubmissionListener, SubmitError},
    AppState,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStep {
    #[default]
    Name,
    Quote,
    Done,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormAction {
    #[default]
    Continue,
    Back,
    Share,
    View,
}

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    step: FormStep,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    quote: String,
    #[serde(default)]
    action: FormAction,
    draft: Option<Uuid>,
}

impl SubmissionListener for AppState {
    fn quote_added(&self, quote: &Quote) {
        tracing::info!(id = %quote.id, "quote added to the wall");
    }

    fn successful_submit(&self) {
        tracing::debug!("submitter moved on to the wall");
    }
}

fn render(state: &AppState, flow: &SubmissionFlow, error: Option<&str>) -> Html<String> {
    Html(pages::form_page(
        flow,
        error,
        state.quote_count.load(Ordering::SeqCst),
        &state.config.theme,
        state.config.floating.rotation_interval.as_secs(),
    ))
}

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    render(&state, &SubmissionFlow::new(state.config.limits), None)
}

#[tracing::instrument(skip_all, fields(step = ?form.step, action = ?form.action))]
pub async fn submit(State(state): State<Arc<AppState>>, Form(form): Form<SubmitForm>) -> Response {
    let limits = state.config.limits;

    let step = match form.step {
        FormStep::Name => Step::CollectingName,
        FormStep::Quote => Step::CollectingQuote,
        FormStep::Done => Step::Succeeded,
    };
    let mut flow = SubmissionFlow::resume(limits, step, &form.full_name, &form.quote);
    if let Some(draft_id) = form.draft {
        flow = flow.with_draft_id(draft_id);
    }

    let action = form.action;
    match action {
        FormAction::View => {
            flow.view_wall(state.as_ref());
            Redirect::to("/wall").into_response()
        }
        FormAction::Back => {
            flow.back();
            render(&state, &flow, None).into_response()
        }
        FormAction::Continue if flow.step() == Step::CollectingName => match flow.advance() {
            Ok(()) => render(&state, &flow, None).into_response(),
            Err(e) => (StatusCode::UNPROCESSABLE_ENTITY, render(&state, &flow, Some(&e.to_string())))
                .into_response(),
        },
        FormAction::Continue | FormAction::Share => share(&state, flow, form).await,
    }
}

async fn share(state: &AppState, flow: SubmissionFlow, form: SubmitForm) -> Response {
    let claimed = form.draft.filter(|_| flow.step() == Step::CollectingQuote);

    let mut flow = match claimed {
        Some(draft_id) => match state.drafts.claim(draft_id).await {
            Claim::Fresh => flow,
            Claim::InFlight => {
                tracing::debug!(%draft_id, "draft is already being shared");
                SubmissionFlow::resume(
                    state.config.limits,
                    Step::Submitting,
                    &form.full_name,
                    &form.quote,
                )
                .with_draft_id(draft_id)
            }
            Claim::Shared => {
                tracing::debug!(%draft_id, "draft was already shared");
                let flow = SubmissionFlow::resume(state.config.limits, Step::Succeeded, "", "");
                return render(state, &flow, None).into_response();
            }
        },
        None => flow,
    };

    let result = flow.submit(state.backend.as_ref(), state).await;

    if let Some(draft_id) = claimed.filter(|_| !matches!(result, Err(SubmitError::InFlight))) {
        state.drafts.release(draft_id, result.is_ok()).await;
    }

    match result {
        Ok(_) => render(state, &flow, None).into_response(),
        Err(SubmitError::Validation(e)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            render(state, &flow, Some(&e.to_string())),
        )
            .into_response(),
        Err(SubmitError::Backend(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            render(state, &flow, flow.error()),
        )
            .into_response(),
        Err(SubmitError::InFlight | SubmitError::AlreadyShared) => {
            (StatusCode::CONFLICT, render(state, &flow, None)).into_response()
        }
    }
}
