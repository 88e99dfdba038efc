use serde::Serialize;
use serde_json::Value;

pub type DealId = i64;

/// Body for `POST /deals`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewDeal {
    pub title: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_id: Option<i64>,
}

/// Coerces a loosely typed deal value into a number.
///
/// Numbers pass through, strings are parsed after trimming (single
/// underscores between digits are allowed, as in `1_000`), booleans map to 1
/// and 0. Anything else, including non-finite results, becomes 0.
pub fn coerce_deal_value(raw: &Value) -> f64 {
    let parsed = match raw {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => parse_number(text.trim()),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };

    parsed.filter(|value| value.is_finite()).unwrap_or(0.0)
}

fn parse_number(text: &str) -> Option<f64> {
    if !text.contains('_') {
        return text.parse().ok();
    }

    let bytes = text.as_bytes();
    let grouped = bytes.iter().enumerate().all(|(index, byte)| {
        *byte != b'_'
            || (index > 0
                && bytes[index - 1].is_ascii_digit()
                && bytes.get(index + 1).is_some_and(u8::is_ascii_digit))
    });
    if !grouped {
        return None;
    }
    text.replace('_', "").parse().ok()
}

/// Web link to a deal for the given company host.
pub fn deal_url(domain: &str, deal_id: DealId) -> String {
    let host = domain.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}/deal/{deal_id}")
    } else {
        format!("https://{host}/deal/{deal_id}")
    }
}
