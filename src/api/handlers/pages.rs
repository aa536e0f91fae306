//! Minimal HTML for the browser flow (login, account creation, search).

pub(super) const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub(super) const LOGIN_UNAVAILABLE: &str = "Login is temporarily unavailable, try again later";

pub(super) fn login(error: Option<&str>) -> String {
    let error = error
        .map(|message| format!(r#"<p class="error">{}</p>"#, escape_html(message)))
        .unwrap_or_default();
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Login</title></head>
<body>
  <h1>Login</h1>
  {error}
  <form action="/login" method="post">
    <input type="email" name="email" placeholder="Email" required>
    <input type="password" name="password" placeholder="Password" required>
    <button type="submit">Login</button>
  </form>
</body>
</html>
"#
    )
}

pub(super) fn create_user() -> &'static str {
    r#"<form action="/create-user" method="post">
  <input type="email" name="email" placeholder="Email" required>
  <input type="password" name="password" placeholder="Password" required>
  <button type="submit">Create User</button>
</form>
"#
}

pub(super) fn search(user: &str) -> String {
    let user = escape_html(user);
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Bank search</title></head>
<body>
  <p>Signed in as {user} &middot; <a href="/logout">Logout</a></p>
  <form id="search">
    <input name="BANK_ID" placeholder="BANK_ID">
    <input name="BANK_NAME" placeholder="BANK_NAME">
    <input name="BANK_STATU" placeholder="BANK_STATU">
    <input name="REGION_ID" placeholder="REGION_ID">
    <input name="INN" placeholder="INN">
    <input name="offset" type="number" min="0" value="0">
    <input name="limit" type="number" min="1" value="10">
    <button type="submit">Search</button>
  </form>
  <pre id="results"></pre>
  <script>
    document.getElementById("search").addEventListener("submit", async (event) => {{
      event.preventDefault();
      const params = new URLSearchParams(new FormData(event.target));
      const response = await fetch("/api/search?" + params.toString());
      document.getElementById("results").textContent =
        JSON.stringify(await response.json(), null, 2);
    }});
  </script>
</body>
</html>
"#
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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
