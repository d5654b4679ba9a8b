use chrono::{Datelike, Utc};

use crate::gate::LOGIN_SUCCESS_MESSAGE;

pub const APP_TITLE: &str = "Image URL Gate";

/// Styles shared by the login card and the uploader card.
pub const PAGE_BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Helvetica Neue", Arial, sans-serif; display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #f1f5f9; color: #0f172a; padding: 1.5rem; box-sizing: border-box; gap: 1.5rem; }
        main { width: 100%; max-width: 560px; display: flex; flex-direction: column; align-items: center; gap: 1.5rem; }
        .panel { background: #ffffff; padding: 2.5rem 2.25rem; border-radius: 18px; box-shadow: 0 20px 60px rgba(15, 23, 42, 0.08); width: 100%; border: 1px solid #e2e8f0; box-sizing: border-box; }
        h1 { margin: 0 0 1.5rem; font-size: 1.8rem; text-align: center; }
        input[type="password"], input[type="text"] { width: 100%; padding: 0.85rem; border-radius: 10px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; font-size: 1rem; box-sizing: border-box; }
        input:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.15); }
        button { width: 100%; padding: 0.95rem; border: none; border-radius: 10px; background: #2563eb; color: #ffffff; font-weight: 600; font-size: 1.05rem; cursor: pointer; transition: background 0.15s ease; }
        button:hover { background: #1d4ed8; }
        button:disabled { opacity: 0.6; cursor: not-allowed; }
        button.secondary { background: #e2e8f0; color: #0f172a; }
        button.secondary:hover { background: #cbd5e1; }
        .flash { margin-top: 1.25rem; padding: 0.85rem 1.1rem; border-radius: 10px; font-weight: 600; border: 1px solid transparent; text-align: center; }
        .flash.success { background: #ecfdf3; border-color: #bbf7d0; color: #166534; }
        .flash.error { background: #fef2f2; border-color: #fecaca; color: #b91c1c; }
        .app-footer { margin-top: 2.5rem; text-align: center; font-size: 0.85rem; color: #64748b; }
"#;

pub fn render_login_page(message: Option<&str>) -> String {
    let flash = message.map(render_flash).unwrap_or_default();
    let footer = render_footer();

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
        form {{ display: flex; flex-direction: column; gap: 1.25rem; }}
    </style>
</head>
<body>
    <main>
        <section class="panel">
            <h1>Please Login</h1>
            <form method="post" action="/login">
                <input id="password" type="password" name="password" placeholder="Enter your password" autofocus>
                <button type="submit">Login</button>
            </form>
            {flash}
        </section>
        {footer}
    </main>
</body>
</html>"#,
        title = APP_TITLE,
        styles = PAGE_BASE_STYLES,
        flash = flash,
        footer = footer,
    )
}

/// Gate status line; only the success message is styled as success.
pub fn render_flash(message: &str) -> String {
    let class = if message == LOGIN_SUCCESS_MESSAGE {
        "success"
    } else {
        "error"
    };
    format!(
        r#"<div class="flash {class}" role="status">{message}</div>"#,
        class = class,
        message = escape_html(message),
    )
}

pub fn render_footer() -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© {year} {title}</footer>"#,
        year = current_year,
        title = APP_TITLE,
    )
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
