//! HTML shell.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;

use crate::state::AppState;
use crate::{BUNDLE_ROUTE, RELOAD_ROUTE};

/// Handle `GET /`.
pub(crate) async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index_html(
        &state.app_name,
        BUNDLE_ROUTE,
        state.live_reload,
    ))
}

/// Render the page that loads the client bundle.
///
/// With `live_reload` set, the page also opens an `EventSource` on the reload
/// endpoint and reloads itself on every `reload` message.
#[must_use]
pub fn render_index_html(app_name: &str, script_path: &str, live_reload: bool) -> String {
    let name = escape_html(app_name);
    let script_path = escape_html(script_path);

    let mut html = format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{name}</title>
    <style>
      body {{ background: #0b1020; color: #e2e8f0; font-family: system-ui, sans-serif; }}
      #overlay {{ position: fixed; inset: 24px auto auto 24px; font-size: 14px; letter-spacing: 0.06em; text-transform: uppercase; }}
    </style>
  </head>
  <body>
    <div id="overlay">{name}</div>
    <script type="module" src="{script_path}"></script>
"#
    );

    if live_reload {
        let _ = write!(
            html,
            r#"    <script>
      (() => {{
        const source = new EventSource("{RELOAD_ROUTE}");
        source.onmessage = (event) => {{
          if (event.data === "reload") location.reload();
        }};
      }})();
    </script>
"#
        );
    }

    html.push_str("  </body>\n</html>\n");
    html
}

/// Escape text for use in element content and double-quoted attributes.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
