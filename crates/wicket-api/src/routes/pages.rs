//! Minimal HTML shells mounted when no exported UI is configured. They give
//! the gate real handlers to protect and let the flow be exercised from a
//! browser.

use axum::{extract::Extension, http::Uri, response::Html};
use wicket_core::SessionClaims;

const LOGIN_SHELL: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Admin sign in</title></head>
<body>
<form id="login">
  <input name="identifier" autocomplete="username" placeholder="Identifier">
  <input name="password" type="password" autocomplete="current-password" placeholder="Password">
  <button type="submit">Sign in</button>
  <p id="status" role="alert"></p>
</form>
<script>
document.getElementById("login").addEventListener("submit", async (event) => {
  event.preventDefault();
  const form = new FormData(event.target);
  const response = await fetch("/api/auth/login", {
    method: "POST",
    headers: { "content-type": "application/json" },
    body: JSON.stringify({
      identifier: form.get("identifier"),
      password: form.get("password"),
      clientInfo: { userAgent: navigator.userAgent, screen: `${screen.width}x${screen.height}` },
    }),
  });
  if (response.ok) {
    window.location.assign("/admin/dashboard");
  } else {
    const body = await response.json().catch(() => ({}));
    document.getElementById("status").textContent = body.message || "Sign in failed";
  }
});
</script>
</body>
</html>
"#;

pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_SHELL)
}

pub async fn admin_page(Extension(claims): Extension<SessionClaims>, uri: Uri) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Admin</title></head>
<body>
<p>Signed in as {name} ({identifier})</p>
<p>{path}</p>
<button onclick="fetch('/api/auth/logout', {{ method: 'POST' }}).then(() => window.location.assign('/admin/login'))">Sign out</button>
</body>
</html>
"#,
        name = escape_html(&claims.name),
        identifier = escape_html(&claims.sub),
        path = escape_html(uri.path()),
    ))
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

#[cfg(test)]
mod tests {
    use super::escape_html;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Ada" & 'co'</b>"#),
            "&lt;b&gt;&quot;Ada&quot; &amp; &#39;co&#39;&lt;/b&gt;"
        );
    }
}
