//! Posting to the messaging API and interpreting its answer.
//!
//! The API answers with `{"status": int, "data": {"detail"?: ..., "errMsg"?: str}}`:
//! - `status == 200`: everything was delivered
//! - a non-empty `data.detail`: some recipients failed and may be retried
//! - otherwise `data.errMsg` explains a failure that retrying will not fix
//!
//! The HTTP status line is not consulted; only the JSON body decides.

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::DispatchFailure;

/// Reads the `detail` part of a partial-failure response into
/// `(representative error, recipients to retry)`. `None` if the shape is wrong.
pub type DetailParser<'a> = &'a (dyn Fn(&Value) -> Option<(String, Vec<String>)> + Send + Sync);

/// Interpretation of a single API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Delivered,
    Retry {
        error: String,
        recipients: Vec<String>,
    },
    Failed(DispatchFailure),
}

impl ParseOutcome {
    /// `(error message, retry list)`: `(None, Some([]))` on success,
    /// `(Some(msg), None)` on hard failure.
    pub fn into_parts(self) -> (Option<String>, Option<Vec<String>>) {
        match self {
            ParseOutcome::Delivered => (None, Some(Vec::new())),
            ParseOutcome::Retry { error, recipients } => (Some(error), Some(recipients)),
            ParseOutcome::Failed(failure) => (Some(failure.to_string()), None),
        }
    }
}

/// POST `payload` as JSON to `url` and interpret the response.
///
/// Never fails: transport and decoding problems come back as
/// [`ParseOutcome::Failed`]. The request timeout is the client's.
pub async fn post_and_parse<T>(
    http: &Client,
    url: &Url,
    payload: &T,
    detail_parser: Option<DetailParser<'_>>,
) -> ParseOutcome
where
    T: Serialize + ?Sized,
{
    let body = match serde_json::to_vec(payload) {
        Ok(body) => body,
        Err(e) => return ParseOutcome::Failed(DispatchFailure::Encode(e.to_string())),
    };

    let response = match http
        .post(url.clone())
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Messaging API request failed");
            return ParseOutcome::Failed(DispatchFailure::Connect(e.to_string()));
        }
    };

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return ParseOutcome::Failed(DispatchFailure::Decode(e.to_string())),
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => interpret(&value, detail_parser),
        Err(e) => ParseOutcome::Failed(DispatchFailure::Decode(e.to_string())),
    }
}

/// Interpret an already decoded response body.
pub fn interpret(response: &Value, detail_parser: Option<DetailParser<'_>>) -> ParseOutcome {
    let Some(status) = response.get("status") else {
        return malformed("missing status");
    };
    if status.as_f64() == Some(200.0) {
        return ParseOutcome::Delivered;
    }

    let Some(data) = response.get("data").filter(|d| d.is_object()) else {
        return malformed("missing data object");
    };

    if let Some(detail) = data.get("detail").filter(|d| is_present(d)) {
        let Some(parser) = detail_parser else {
            return malformed("unexpected failure detail");
        };
        return match parser(detail) {
            Some((error, recipients)) => ParseOutcome::Retry { error, recipients },
            None => malformed("unreadable failure detail"),
        };
    }

    match data.get("errMsg").and_then(Value::as_str) {
        Some(message) => ParseOutcome::Failed(DispatchFailure::Rejected(message.to_string())),
        None => malformed("missing errMsg"),
    }
}

/// Detail parser for broadcast sends: `[[user, errmsg], ...]`.
///
/// Every listed user is retried; the first message stands for all of them.
pub fn batch_detail(detail: &Value) -> Option<(String, Vec<String>)> {
    let entries = detail.as_array()?;
    let error = entries.first()?.get(1).map(value_text)?;
    let recipients = entries
        .iter()
        .map(|entry| entry.get(0).map(value_text))
        .collect::<Option<Vec<_>>>()?;
    Some((error, recipients))
}

/// String form of a JSON scalar, without quotes for strings.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Empty strings, lists and objects count as "no detail".
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn malformed(reason: &str) -> ParseOutcome {
    ParseOutcome::Failed(DispatchFailure::Malformed(reason.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_success() {
        let outcome = interpret(&json!({"status": 200}), None);
        assert_eq!(outcome, ParseOutcome::Delivered);
        assert_eq!(outcome.into_parts(), (None, Some(vec![])));
    }

    #[test]
    fn test_server_error_message() {
        let outcome = interpret(&json!({"status": 400, "data": {"errMsg": "bad"}}), None);
        assert_eq!(outcome.into_parts(), (Some("bad".to_string()), None));
    }

    #[test]
    fn test_partial_failure_with_batch_parser() {
        let response = json!({
            "status": 500,
            "data": {"detail": [["u1", "fail"], ["u2", "fail"]]}
        });
        let outcome = interpret(&response, Some(&batch_detail));
        assert_eq!(
            outcome.into_parts(),
            (
                Some("fail".to_string()),
                Some(vec!["u1".to_string(), "u2".to_string()])
            )
        );
    }

    #[test]
    fn test_empty_detail_falls_back_to_errmsg() {
        let response = json!({"status": 500, "data": {"detail": [], "errMsg": "quota"}});
        let outcome = interpret(&response, Some(&batch_detail));
        assert_eq!(
            outcome,
            ParseOutcome::Failed(DispatchFailure::Rejected("quota".to_string()))
        );
    }

    #[test]
    fn test_detail_without_parser_is_malformed() {
        let response = json!({"status": 500, "data": {"detail": [["u1", "fail"]]}});
        assert!(matches!(
            interpret(&response, None),
            ParseOutcome::Failed(DispatchFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_unreadable_detail_is_malformed() {
        let response = json!({"status": 500, "data": {"detail": "oops"}});
        assert!(matches!(
            interpret(&response, Some(&batch_detail)),
            ParseOutcome::Failed(DispatchFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_other_shapes_are_malformed() {
        for response in [
            json!({}),
            json!([1, 2]),
            json!({"status": 400}),
            json!({"status": 400, "data": []}),
            json!({"status": 400, "data": {}}),
            json!({"status": 400, "data": {"errMsg": 3}}),
        ] {
            let (error, retry) = interpret(&response, Some(&batch_detail)).into_parts();
            assert!(error.unwrap().starts_with("Response parsing failed"));
            assert!(retry.is_none());
        }
    }

    #[test]
    fn test_batch_detail_numeric_ids() {
        let detail = json!([[2000012345_u64, "not in corp"]]);
        assert_eq!(
            batch_detail(&detail),
            Some(("not in corp".to_string(), vec!["2000012345".to_string()]))
        );
    }

    #[test]
    fn test_batch_detail_rejects_flat_list() {
        assert_eq!(batch_detail(&json!(["u1"])), None);
        assert_eq!(batch_detail(&json!([])), None);
    }
}
