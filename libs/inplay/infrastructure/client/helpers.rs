//! Response checks shared by the feed, bookmaker, proxy and Telegram clients

use reqwest::Response;
use serde::de::DeserializeOwned;

use super::HttpError;

/// Error bodies are often full HTML pages (proxy or CDN errors)
const MAX_BODY_CHARS: usize = 512;

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Pass a 2xx response through; anything else becomes `HttpError::Api`
/// carrying the status and a bounded slice of the body
pub async fn require_success(response: Response, context: &str) -> Result<Response, HttpError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .map(|b| snippet(&b))
        .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
    Err(HttpError::Api {
        status: status.as_u16(),
        context: context.to_string(),
        body,
    })
}

/// Decode a JSON body. The error names the target type and quotes the start
/// of the body so malformed upstream payloads can be diagnosed from logs.
pub async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, HttpError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        HttpError::DeserializeFailed(format!(
            "{} as {}: {}",
            e,
            std::any::type_name::<T>(),
            snippet(&body)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_bounds_long_bodies() {
        let long = "x".repeat(2000);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), MAX_BODY_CHARS + 1);
        assert!(cut.ends_with('…'));

        assert_eq!(snippet("  short  "), "short");
    }
}
