use axum::{extract::State, response::Html};
use axum_extra::extract::cookie::CookieJar;
use tracing::error;

use crate::{
    web::{
        AppState, auth,
        templates::{
            APP_TITLE, PAGE_BASE_STYLES, render_flash, render_footer, render_login_page,
        },
        upload_ui::{
            UPLOAD_WIDGET_SCRIPT, UPLOAD_WIDGET_STYLES, UploadWidgetConfig, render_upload_widget,
        },
    },
    workflow::WorkflowSnapshot,
};

pub async fn landing_page(State(state): State<AppState>, jar: CookieJar) -> Html<String> {
    let Some(session) = auth::existing_session(&state, &jar).await else {
        return Html(render_login_page(None));
    };
    let session = session.lock().await;
    let message = session.gate().message();

    let page = match session.workflow() {
        Some(workflow) => render_uploader_page(
            message,
            &workflow.snapshot(),
            state.config().workflow.copy_status_ttl.num_milliseconds(),
        ),
        None => render_login_page(message),
    };

    Html(page)
}

fn render_uploader_page(
    message: Option<&str>,
    snapshot: &WorkflowSnapshot,
    copy_ttl_ms: i64,
) -> String {
    let flash = message.map(render_flash).unwrap_or_default();
    let footer = render_footer();
    let note = if snapshot.max_images == 1 {
        "One image at a time.".to_string()
    } else {
        format!("Up to {} images at a time.", snapshot.max_images)
    };
    let widget = render_upload_widget(
        &UploadWidgetConfig::new("uploader", "image-input", snapshot.max_images)
            .with_note(&note)
            .with_copy_ttl_ms(copy_ttl_ms),
    );
    let initial_state = initial_state_json(snapshot);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
{styles}
{widget_styles}
        .logout-form {{ margin-top: 1.5rem; }}
    </style>
</head>
<body>
    <main>
        <section class="panel">
            <h1>Generate Image URL</h1>
            {widget}
            {flash}
            <form class="logout-form" method="post" action="/logout">
                <button type="submit" class="secondary">Logout</button>
            </form>
        </section>
        {footer}
    </main>
    <script type="application/json" id="initial-state">{initial_state}</script>
{script}
</body>
</html>"#,
        title = APP_TITLE,
        styles = PAGE_BASE_STYLES,
        widget_styles = UPLOAD_WIDGET_STYLES,
        widget = widget,
        flash = flash,
        footer = footer,
        initial_state = initial_state,
        script = UPLOAD_WIDGET_SCRIPT,
    )
}

/// Snapshot embedded in the page; `</` is escaped so it cannot close the tag.
fn initial_state_json(snapshot: &WorkflowSnapshot) -> String {
    match serde_json::to_string(snapshot) {
        Ok(json) => json.replace("</", "<\\/"),
        Err(err) => {
            error!(?err, "failed to serialize workflow snapshot");
            "null".to_string()
        }
    }
}
