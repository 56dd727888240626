//! Server-rendered pages for the gated UI.
//!
//! Markup is bare. The auth forms are plain HTML forms posting urlencoded bodies to the
//! auth endpoints, which answer with a 303. The playground needs a script because a file
//! has to be read into a data URI before it can be sent.

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
};
use serde::Deserialize;

use crate::{
    AppState,
    registry::AgentDefinition,
    routes::admin::{AGENTS_PATH, DASHBOARD_PATH, PLAYGROUND_PATH, TOOLS_PATH},
};

/// Query parameters understood by the login and signup pages.
#[derive(Deserialize, Default)]
pub struct AuthPageParams {
    /// Page to return to after login, set by the access gate.
    pub redirect: Option<String>,
    /// Message from a failed form submission.
    pub error: Option<String>,
}

/// Reads the chosen file as a data URI, posts it to the analysis endpoint and renders the
/// outcome. A 401 means the session expired: reloading lets the access gate take over.
const PLAYGROUND_SCRIPT: &str = r#"
const form = document.getElementById('analyze-form');
const result = document.getElementById('analyze-result');
form.addEventListener('submit', async (event) => {
  event.preventDefault();
  const file = form.elements.photo.files[0];
  if (!file) {
    result.textContent = 'Choose an image first.';
    return;
  }
  result.textContent = 'Analyzing...';
  const photo_data_uri = await new Promise((resolve, reject) => {
    const reader = new FileReader();
    reader.onload = () => resolve(reader.result);
    reader.onerror = () => reject(reader.error);
    reader.readAsDataURL(file);
  });
  const response = await fetch('/api/analyze', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ photo_data_uri }),
  });
  if (response.status === 401) {
    window.location.reload();
    return;
  }
  const body = await response.json();
  if (!body.success) {
    result.textContent = body.error;
  } else if (body.data.length === 0) {
    result.textContent = 'No objects identified.';
  } else {
    result.textContent = 'Identified: ' + body.data.join(', ');
  }
});
"#;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn document(title: &str, header: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title} | Agent Console</title></head>\
         <body>{header}<main><h1>{title}</h1>{body}</main></body></html>",
        title = escape(title),
    ))
}

/// Panel page: navigation plus a sign-out button.
fn layout(title: &str, body: &str) -> Html<String> {
    let nav = format!(
        "<nav><a href=\"{DASHBOARD_PATH}\">Dashboard</a> <a href=\"{AGENTS_PATH}\">Agents</a> \
         <a href=\"{TOOLS_PATH}\">Tools</a> <a href=\"{PLAYGROUND_PATH}\">Playground</a> \
         <form method=\"post\" action=\"/api/auth/logout\"><button type=\"submit\">Sign out</button></form></nav>"
    );
    document(title, &nav, body)
}

fn auth_form(action: &str, submit: &str, params: &AuthPageParams) -> String {
    let alert = params
        .error
        .as_deref()
        .map(|e| format!("<p role=\"alert\">{}</p>", escape(e)))
        .unwrap_or_default();
    let hidden = params
        .redirect
        .as_deref()
        .map(|r| format!("<input type=\"hidden\" name=\"redirect\" value=\"{}\">", escape(r)))
        .unwrap_or_default();
    format!(
        "{alert}<form method=\"post\" action=\"{action}\">\
         <label>Email <input type=\"email\" name=\"email\" required></label>\
         <label>Password <input type=\"password\" name=\"password\" minlength=\"6\" required></label>\
         {hidden}<button type=\"submit\">{submit}</button></form>"
    )
}

/// home
///
/// `GET /`: an authenticated visitor is sent on to the landing page.
pub async fn home(State(state): State<AppState>) -> Redirect {
    Redirect::to(state.access.landing_path())
}

/// login_page
///
/// Keeps the gate's `redirect` parameter as a hidden field so the login endpoint can send
/// the user back where they started.
pub async fn login_page(
    State(state): State<AppState>,
    Query(params): Query<AuthPageParams>,
) -> Html<String> {
    let body = format!(
        "{}<p>No account? <a href=\"{}\">Sign up</a></p>",
        auth_form("/api/auth/login", "Log in", &params),
        escape(state.access.signup_path())
    );
    document("Log in", "", &body)
}

/// signup_page
pub async fn signup_page(
    State(state): State<AppState>,
    Query(params): Query<AuthPageParams>,
) -> Html<String> {
    // New accounts always go to the landing page.
    let params = AuthPageParams {
        redirect: None,
        ..params
    };
    let body = format!(
        "{}<p>Already registered? <a href=\"{}\">Log in</a></p>",
        auth_form("/api/auth/signup", "Create account", &params),
        escape(state.access.login_path())
    );
    document("Sign up", "", &body)
}

/// dashboard_page
pub async fn dashboard_page(State(state): State<AppState>) -> Html<String> {
    let summary = state.registry.summary();
    let body = format!(
        "<section><p>Registered agents: <strong>{}</strong></p>\
         <p>Available tools: <strong>{}</strong></p></section>",
        summary.agent_count, summary.tool_count
    );
    layout("Admin Dashboard", &body)
}

fn agent_row(agent: &AgentDefinition) -> String {
    let tools = if agent.associated_tools.is_empty() {
        "None".to_string()
    } else {
        agent
            .associated_tools
            .iter()
            .map(|tool| {
                format!(
                    "<span title=\"{}\">{}</span>",
                    escape(&tool.description),
                    escape(&tool.name)
                )
            })
            .collect::<Vec<_>>()
            .join(" ")
    };
    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
        escape(&agent.name),
        escape(&agent.description),
        tools
    )
}

/// agents_page
///
/// Agent table with the tools each agent uses.
pub async fn agents_page(State(state): State<AppState>) -> Html<String> {
    let agents = state.registry.agents();
    let body = if agents.is_empty() {
        "<p>No Agents Defined</p>".to_string()
    } else {
        let rows: String = agents.iter().map(agent_row).collect();
        format!(
            "<table><thead><tr><th>Name</th><th>Description</th><th>Associated Tools</th></tr></thead>\
             <tbody>{rows}</tbody></table>"
        )
    };
    layout("Agent Management", &body)
}

/// tools_page
pub async fn tools_page(State(state): State<AppState>) -> Html<String> {
    let tools = state.registry.tools();
    let body = if tools.is_empty() {
        "<p>No Tools Defined</p>".to_string()
    } else {
        let rows: String = tools
            .iter()
            .map(|tool| {
                format!(
                    "<tr><td>{}</td><td>{}</td></tr>",
                    escape(&tool.name),
                    escape(&tool.description)
                )
            })
            .collect();
        format!(
            "<table><thead><tr><th>Name</th><th>Description</th></tr></thead><tbody>{rows}</tbody></table>"
        )
    };
    layout("Tool Management", &body)
}

/// playground_page
///
/// Image upload form. Submission is handled by `PLAYGROUND_SCRIPT`.
pub async fn playground_page() -> Html<String> {
    let body = format!(
        "<form id=\"analyze-form\">\
         <input type=\"file\" name=\"photo\" accept=\"image/png, image/jpeg, image/webp, image/gif\" required>\
         <button type=\"submit\">Identify objects</button></form>\
         <p id=\"analyze-result\" aria-live=\"polite\"></p>\
         <script>{PLAYGROUND_SCRIPT}</script>"
    );
    layout("AI Playground", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;");
    }

    #[test]
    fn login_form_keeps_redirect() {
        let params = AuthPageParams {
            redirect: Some("/admin/tools?a=1&b=2".to_string()),
            error: None,
        };
        let form = auth_form("/api/auth/login", "Log in", &params);
        assert!(form.contains("value=\"/admin/tools?a=1&amp;b=2\""));
        assert!(!form.contains("role=\"alert\""));
    }

    #[test]
    fn auth_form_posts_urlencoded_fields() {
        let params = AuthPageParams {
            redirect: None,
            error: Some("<bad>".to_string()),
        };
        let form = auth_form("/api/auth/signup", "Create account", &params);
        assert!(form.contains("<form method=\"post\" action=\"/api/auth/signup\">"));
        assert!(form.contains("name=\"email\""));
        assert!(form.contains("name=\"password\""));
        assert!(form.contains("<p role=\"alert\">&lt;bad&gt;</p>"));
        assert!(!form.contains("enctype"));
    }
}
