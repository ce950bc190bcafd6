use serde::Deserialize;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    #[serde(rename = "type")]
    pub job_type: String,
    /// Any JSON value; absent means `{}`.
    #[serde(default = "empty_object")]
    pub payload: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_defaults_to_an_empty_object() {
        let req: SubmitJobRequest = serde_json::from_value(json!({"type": "email"})).unwrap();
        assert_eq!(req.job_type, "email");
        assert_eq!(req.payload, json!({}));
    }

    #[test]
    fn type_is_required() {
        assert!(serde_json::from_value::<SubmitJobRequest>(json!({"payload": {}})).is_err());
    }
}
