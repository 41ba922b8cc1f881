use super::Snapshot;
use crate::CalcResult;

/// Serialize a snapshot as pretty-printed JSON
pub fn to_json(snapshot: &Snapshot) -> CalcResult<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

pub fn from_json(json: &str) -> CalcResult<Snapshot> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CalcError;

    #[test]
    fn malformed_json_is_a_serialization_error() {
        assert!(matches!(
            from_json("{\"state\": 3}"),
            Err(CalcError::Serialization(_))
        ));
    }

    #[test]
    fn missing_optional_parts_default() {
        let snapshot = crate::Engine::new().snapshot();
        let json = serde_json::json!({ "state": snapshot.state }).to_string();
        let parsed = from_json(&json).unwrap();
        assert!(parsed.modules.is_empty());
        assert!(parsed.bindings.is_empty());
        assert_eq!(parsed.state, snapshot.state);
    }
}
