//! Consultation wizard route handlers.
//!
//! The step shown is the `?step=` query parameter; answers are kept in the
//! session. Step forms post back over HTMX and the response swaps in the
//! next step while pushing its URL.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::Value;
use tower_sessions::Session;
use tracing::instrument;
use wellspring_core::onboarding::{FieldKind, FieldSpec, Step, StepForm, step_spec};

use crate::config::AnalyticsConfig;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::CspNonce;
use crate::services::onboarding::{QueryStepIndicator, Wizard, close_wizard, open_wizard};
use crate::state::AppState;

/// Step whose page shows the collected answers.
const REVIEW_STEP: u8 = 12;

// =============================================================================
// View Types
// =============================================================================

/// One option of a choice or select field.
#[derive(Clone)]
pub struct OptionView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// One input of the step form.
#[derive(Clone)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    /// Template switch: `choice`, `select`, `textarea`, `checkbox` or `input`.
    pub widget: &'static str,
    /// HTML input type for `input` widgets.
    pub input_type: &'static str,
    pub required: bool,
    pub value: String,
    pub options: Vec<OptionView>,
    /// Path the answer is saved under as soon as it changes.
    pub path: String,
}

impl FieldView {
    fn new(field: &'static FieldSpec, path: String, value: String) -> Self {
        let (widget, input_type) = match field.kind {
            FieldKind::Choice => ("choice", ""),
            FieldKind::Select => ("select", ""),
            FieldKind::TextArea => ("textarea", ""),
            FieldKind::Checkbox => ("checkbox", "checkbox"),
            FieldKind::Date => ("input", "date"),
            FieldKind::Text => ("input", "text"),
            FieldKind::Email => ("input", "email"),
            FieldKind::Password => ("input", "password"),
            FieldKind::Tel => ("input", "tel"),
        };

        Self {
            name: field.name,
            label: field.label,
            widget,
            input_type,
            required: field.required,
            options: field
                .options
                .iter()
                .map(|option| OptionView {
                    value: option.value,
                    label: option.label,
                    selected: option.value == value,
                })
                .collect(),
            value,
            path,
        }
    }
}

/// Everything the step partial renders.
#[derive(Clone)]
pub struct StepView {
    pub number: u8,
    pub total: u8,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub fields: Vec<FieldView>,
    pub is_first: bool,
    pub is_terminal: bool,
    pub previous: u8,
    pub continue_enabled: bool,
    pub continue_label: &'static str,
    /// Pretty-printed answers on the review step.
    pub summary: Option<String>,
}

impl StepView {
    fn new(wizard: &Wizard, step: Step, form: &StepForm) -> Self {
        let spec = step_spec(step);
        let fields = spec
            .fields
            .iter()
            .map(|field| {
                FieldView::new(
                    field,
                    spec.path(field),
                    form.get(field.name).cloned().unwrap_or_default(),
                )
            })
            .collect();

        Self {
            number: step.get(),
            total: Step::COUNT,
            title: spec.title,
            subtitle: spec.subtitle,
            fields,
            is_first: step.is_first(),
            is_terminal: step.is_terminal(),
            previous: step.previous().get(),
            continue_enabled: wizard.continue_enabled(step, form),
            continue_label: continue_label(step),
            summary: (step.get() == REVIEW_STEP).then(|| wizard.load().to_pretty_json()),
        }
    }

    /// Percentage of the wizard completed, for the progress bar.
    #[must_use]
    pub fn progress(&self) -> u32 {
        u32::from(self.number) * 100 / u32::from(self.total)
    }
}

fn continue_label(step: Step) -> &'static str {
    if step.is_terminal() {
        "Return home"
    } else if step.next().is_terminal() {
        "Submit"
    } else {
        "Continue"
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Consultation page template.
#[derive(Template, WebTemplate)]
#[template(path = "consultation/show.html")]
pub struct ConsultationTemplate {
    pub step: StepView,
    pub error: Option<String>,
    pub analytics: AnalyticsConfig,
    pub nonce: String,
}

/// Step fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/consultation_step.html")]
pub struct StepTemplate {
    pub step: StepView,
    pub error: Option<String>,
}

// =============================================================================
// Request Types
// =============================================================================

/// Step query parameter.
#[derive(Debug, Deserialize)]
pub struct StepQuery {
    pub step: Option<String>,
}

/// Single answer saved ahead of its step's Continue.
#[derive(Debug, Deserialize)]
pub struct AnswerForm {
    pub path: String,
    pub value: String,
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Response after the wizard moved to `step`.
///
/// HTMX requests get the new step swapped in with its URL pushed; plain form
/// posts are redirected.
fn moved_to(wizard: &Wizard, step: Step, htmx: bool) -> Response {
    let location = QueryStepIndicator::location(step);
    if !htmx {
        return Redirect::to(&location).into_response();
    }

    (
        AppendHeaders([("HX-Push-Url", location)]),
        StepTemplate {
            step: StepView::new(wizard, step, &wizard.prefill(step)),
            error: None,
        },
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the consultation at the step in the URL.
///
/// A request without `?step=` is redirected to the first step.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<StepQuery>,
    nonce: CspNonce,
) -> Result<Response> {
    let mut wizard = open_wizard(&session, query.step).await?;
    let step = wizard.initialize();
    let form = wizard.prefill(step);
    let view = StepView::new(&wizard, step, &form);

    if let Some(target) = close_wizard(wizard, &session).await? {
        return Ok(Redirect::to(&QueryStepIndicator::location(target)).into_response());
    }

    Ok(ConsultationTemplate {
        step: view,
        error: None,
        analytics: state.config().analytics.clone(),
        nonce: nonce.0,
    }
    .into_response())
}

/// Continue from step `n`: validate, save its answers, then advance.
///
/// A rejected step is re-rendered with the submitted values and the error.
#[instrument(skip(session, headers, form))]
pub async fn commit(
    session: Session,
    Path(n): Path<i64>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response> {
    let step = Step::clamp(n);
    let form: StepForm = form.into_iter().collect();

    if step.is_terminal() {
        return Ok(if is_htmx(&headers) {
            AppendHeaders([("HX-Redirect", "/")]).into_response()
        } else {
            Redirect::to("/").into_response()
        });
    }

    let mut wizard = open_wizard(&session, Some(step.to_string())).await?;

    match wizard.commit(step, &form) {
        Ok(next) => {
            let response = moved_to(&wizard, next, is_htmx(&headers));
            close_wizard(wizard, &session).await?;
            Ok(response)
        }
        Err(error) => {
            let view = StepView::new(&wizard, step, &form);
            close_wizard(wizard, &session).await?;
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                StepTemplate {
                    step: view,
                    error: Some(error.to_string()),
                },
            )
                .into_response())
        }
    }
}

/// Navigate back to step `n`.
#[instrument(skip(session, headers))]
pub async fn back(session: Session, Path(n): Path<i64>, headers: HeaderMap) -> Result<Response> {
    let mut wizard = open_wizard(&session, None).await?;
    let step = wizard.back(n);
    let response = moved_to(&wizard, step, is_htmx(&headers));
    close_wizard(wizard, &session).await?;
    Ok(response)
}

/// Save one answer immediately (choice cards save on click).
#[instrument(skip(session, form), fields(path = %form.path))]
pub async fn answer(session: Session, Form(form): Form<AnswerForm>) -> Result<Response> {
    let mut wizard = open_wizard(&session, None).await?;
    wizard
        .persist(&form.path, Value::String(form.value))
        .map_err(|e| AppError::Validation(e.to_string()))?;
    close_wizard(wizard, &session).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;
    use wellspring_core::onboarding::ANSWERS_KEY;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn htmx_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("hx-request", "true".parse().unwrap());
        headers
    }

    #[test]
    fn test_continue_labels() {
        assert_eq!(continue_label(Step::FIRST), "Continue");
        assert_eq!(continue_label(Step::new(13).unwrap()), "Submit");
        assert_eq!(continue_label(Step::LAST), "Return home");
    }

    #[tokio::test]
    async fn test_step_view_for_goal_step() {
        let wizard = open_wizard(&session(), None).await.unwrap();
        let step = Step::new(2).unwrap();
        let view = StepView::new(&wizard, step, &wizard.prefill(step));

        assert_eq!(view.fields.len(), 1);
        let goal = &view.fields[0];
        assert_eq!(goal.widget, "choice");
        assert_eq!(goal.options.len(), 3);
        assert!(goal.options.iter().all(|o| !o.selected));
        assert!(!view.continue_enabled);
        assert!(view.summary.is_none());
    }

    #[tokio::test]
    async fn test_review_step_shows_answers() {
        let session = session();
        let mut wizard = open_wizard(&session, None).await.unwrap();
        wizard
            .persist("goal", Value::String("curb-appetite".to_string()))
            .unwrap();

        let step = Step::new(REVIEW_STEP).unwrap();
        let view = StepView::new(&wizard, step, &wizard.prefill(step));
        assert!(view.summary.unwrap().contains("curb-appetite"));
        assert!(view.continue_enabled);
    }

    #[tokio::test]
    async fn test_commit_advances_and_pushes_url() {
        let session = session();
        let form = HashMap::from([("gender".to_string(), "Female".to_string())]);

        let response = commit(session.clone(), Path(3), htmx_headers(), Form(form))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("HX-Push-Url").unwrap(),
            "/consultation?step=4"
        );
        let wizard = open_wizard(&session, None).await.unwrap();
        assert_eq!(wizard.load().get_str("gender"), Some("Female"));
    }

    #[tokio::test]
    async fn test_commit_rejects_missing_fields() {
        let session = session();

        let response = commit(session.clone(), Path(9), HeaderMap::new(), Form(HashMap::new()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let stored: Option<String> = session.get(ANSWERS_KEY).await.unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn test_plain_post_redirects() {
        let response = commit(session(), Path(1), HeaderMap::new(), Form(HashMap::new()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/consultation?step=2"
        );
    }

    #[tokio::test]
    async fn test_back_clamps() {
        let response = back(session(), Path(-3), HeaderMap::new()).await.unwrap();
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/consultation?step=1"
        );
    }

    #[tokio::test]
    async fn test_answer_rejects_transient_field() {
        let result = answer(
            session(),
            Form(AnswerForm {
                path: "account.password".to_string(),
                value: "hunter22".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
