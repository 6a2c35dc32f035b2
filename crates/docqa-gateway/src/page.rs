//! The single HTML page served at `/`.

use docqa_knowledge::Answer;
use html_escape::{encode_double_quoted_attribute, encode_text};

const HEAD: &str = r#"<!doctype html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>docqa</title>
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css" rel="stylesheet">
    <style>
        body { background: #f8fafc; }
        .container { max-width: 800px; margin-top: 40px; }
        .context-block { background: #f1f3f6; border-radius: 8px; padding: 16px; margin-top: 12px; white-space: pre-wrap; }
        .answer-block { background: #e7fbe7; border-radius: 8px; padding: 16px; margin-top: 12px; font-size: 1.1rem; white-space: pre-wrap; }
        .error-block { background: #fdecea; border-radius: 8px; padding: 16px; margin-top: 12px; }
        .score { color: #888; font-size: 0.85em; }
    </style>
</head>
<body>
<div class="container">
<div class="card shadow-sm"><div class="card-body">
<h2 class="mb-4">docqa</h2>
"#;

const FOOT: &str = r#"</div></div>
<div class="text-center text-muted mt-4">Retrieval-augmented answers over a single document</div>
</div>
</body>
</html>
"#;

/// Render the question form, plus the answer and its context chunks when present.
pub fn render(query: &str, answer: Option<&Answer>, error: Option<&str>) -> String {
    let mut html = String::from(HEAD);

    html.push_str(&format!(
        r#"<form method="post" class="mb-3"><div class="input-group input-group-lg">
<input name="query" class="form-control" placeholder="Ask a question..." value="{}" autofocus required>
<button class="btn btn-primary" type="submit">Ask</button>
</div></form>
"#,
        encode_double_quoted_attribute(query)
    ));

    if let Some(error) = error {
        html.push_str(&format!(
            "<div class=\"error-block\"><strong>Error:</strong> {}</div>\n",
            encode_text(error)
        ));
    }

    if let Some(answer) = answer {
        if let Some(text) = &answer.answer {
            html.push_str(&format!(
                "<div class=\"answer-block\"><strong>Answer:</strong><br>{}</div>\n",
                encode_text(text)
            ));
        }
        if !answer.chunks.is_empty() {
            html.push_str("<div class=\"mt-3\"><strong>Context Chunks:</strong></div>\n");
            for chunk in &answer.chunks {
                html.push_str(&format!(
                    "<div class=\"context-block mb-3\"><strong>{}</strong> <span class=\"score\">{:.3}</span><br>{}</div>\n",
                    encode_text(&chunk.record.heading),
                    chunk.score,
                    encode_text(&chunk.record.content)
                ));
            }
        }
    }

    html.push_str(FOOT);
    html
}
