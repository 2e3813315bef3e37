//! Browser playground for trying operations by hand

use axum::response::Html;

const PLAYGROUND_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>authgate playground</title>
<style>
  body { font-family: system-ui, sans-serif; margin: 2rem; max-width: 56rem; }
  label { display: block; margin-top: 1rem; font-weight: 600; }
  input, textarea { width: 100%; font-family: ui-monospace, monospace; }
  textarea { height: 10rem; }
  pre { background: #f4f4f4; padding: 1rem; white-space: pre-wrap; }
</style>
</head>
<body>
<h1>authgate playground</h1>
<label for="token">Bearer token</label>
<input id="token" placeholder="paste the token from Login or Register">
<label for="operation">operationName</label>
<input id="operation" value="Login">
<label for="variables">variables</label>
<textarea id="variables">{"email": "", "password": ""}</textarea>
<p><button id="send">Send</button></p>
<pre id="result"></pre>
<script>
document.getElementById("send").addEventListener("click", async () => {
  const headers = { "Content-Type": "application/json" };
  const token = document.getElementById("token").value.trim();
  if (token) headers["Authorization"] = "Bearer " + token;
  let variables;
  try {
    variables = JSON.parse(document.getElementById("variables").value || "{}");
  } catch (e) {
    document.getElementById("result").textContent = "variables: " + e;
    return;
  }
  const body = JSON.stringify({
    operationName: document.getElementById("operation").value,
    variables,
  });
  const response = await fetch("/query", { method: "POST", headers, body });
  const text = await response.text();
  document.getElementById("result").textContent = response.status + "\n" + text;
});
</script>
</body>
</html>
"#;

pub async fn playground_page() -> Html<&'static str> {
    Html(PLAYGROUND_HTML)
}
