use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::Html;

use super::ApiResult;
use crate::app_state::AppState;

/// `GET /`: every stored metric in one table, counters first.
pub async fn summary(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let counters: BTreeMap<_, _> = state.store().get_all_counters().await?.into_iter().collect();
    let gauges: BTreeMap<_, _> = state.store().get_all_gauges().await?.into_iter().collect();

    let mut rows = String::new();
    for (name, v) in &counters {
        rows.push_str(&row(name, &v.to_string()));
    }
    for (name, v) in &gauges {
        rows.push_str(&row(name, &v.to_string()));
    }

    Ok(Html(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
         <title>metrics</title>\n</head>\n\
         <body>\n<table>\n<tr><th>name</th><th>value</th></tr>\n{rows}</table>\n</body>\n</html>\n"
    )))
}

fn row(name: &str, value: &str) -> String {
    format!("<tr><td>{}</td><td>{}</td></tr>\n", escape(name), escape(value))
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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
