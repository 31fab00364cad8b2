//! Read-only HTTP view of the rolling aggregate.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::Html,
    routing::get,
    Extension, Router,
};
use hashmood_sentiment::report::REPORT_ROUNDING_UNIT;
use hashmood_sentiment::{round_to_unit, AggregateSnapshot, RollingAggregate};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::middleware::{request_id, RequestId};

pub const INDEX_TEMPLATE: &str = "index.html";

#[derive(Clone)]
pub struct ViewState {
    pub aggregate: Arc<RollingAggregate>,
    pub template: Arc<str>,
    pub hashtag: Arc<str>,
}

/// Read `index.html` from the templates directory.
///
/// # Errors
///
/// Fails if the file is missing or unreadable.
pub fn load_template(templates_dir: &Path) -> anyhow::Result<String> {
    let path = templates_dir.join(INDEX_TEMPLATE);
    std::fs::read_to_string(&path)
        .with_context(|| format!("reading view template {}", path.display()))
}

/// Fill the `{{hashtag}}`, `{{average}}`, `{{count}}` and `{{total}}`
/// placeholders.
#[must_use]
pub fn render(template: &str, hashtag: &str, snapshot: &AggregateSnapshot) -> String {
    let average = round_to_unit(snapshot.average, REPORT_ROUNDING_UNIT);
    let total = round_to_unit(snapshot.total, REPORT_ROUNDING_UNIT);
    template
        .replace("{{hashtag}}", &escape_html(hashtag))
        .replace("{{average}}", &format!("{average:.5}"))
        .replace("{{count}}", &snapshot.count.to_string())
        .replace("{{total}}", &format!("{total:.5}"))
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn build_router(state: ViewState, templates_dir: &Path) -> Router {
    Router::new()
        .route(
            "/",
            get(index).layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store"),
            )),
        )
        .nest_service("/templates", ServeDir::new(templates_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn index(
    State(state): State<ViewState>,
    Extension(req_id): Extension<RequestId>,
) -> Html<String> {
    let snapshot = state.aggregate.snapshot();
    tracing::debug!(
        request_id = %req_id.0,
        count = snapshot.count,
        "view: rendering index"
    );
    Html(render(&state.template, &state.hashtag, &snapshot))
}
