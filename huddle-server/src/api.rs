//! Wire types of the agent-facing API.
//!
//! Field names are part of the protocol; deployed game clients depend on
//! them exactly as written here.
use huddle_core::error::HuddleError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Body of `POST /get_action`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    /// Opaque identifier of the polling agent (one per browser tab).
    pub agent_id: String,

    /// Named observation components. The server extracts them in the
    /// order of its configured observation keys.
    pub observation: HashMap<String, f64>,

    /// Whether the episode ended with this observation.
    pub done: bool,

    /// Whether the episode ended in a win.
    pub win: bool,

    /// Sent by some client revisions; accepted and ignored.
    #[serde(default)]
    pub time_since_game_start: Option<f64>,
}

/// Body of the `POST /get_action` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    /// The chosen action as named boolean flags; every configured flag is
    /// present.
    pub action: BTreeMap<String, bool>,

    /// Tells the agent to stop playing and poll `check_unpause`.
    pub pause: bool,
}

/// Body of the `GET /check_unpause` response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UnpauseResponse {
    /// Whether the agent may resume playing.
    pub unpause: bool,
}

/// Body of the `POST /train` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    /// Always `"training_completed"`.
    pub status: String,
}

impl TrainResponse {
    /// The response for a completed training pass.
    pub fn completed() -> Self {
        Self {
            status: "training_completed".to_string(),
        }
    }
}

/// Error body returned with 4xx/5xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable description of the failure.
    pub error: String,
}

/// Extracts the observation vector in the order of the configured keys.
pub fn observation_vector(
    keys: &[String],
    observation: &HashMap<String, f64>,
) -> Result<Vec<f32>, HuddleError> {
    let mut obs = Vec::with_capacity(keys.len());
    for (ix, key) in keys.iter().enumerate() {
        let v = observation
            .get(key)
            .copied()
            .ok_or_else(|| HuddleError::MissingObservation(key.clone()))?;
        if !v.is_finite() {
            return Err(HuddleError::ObservationNotFinite(ix));
        }
        obs.push(v as f32);
    }
    Ok(obs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_request_field_names() {
        let body = r#"{
            "agent_id": "tab-1",
            "observation": {"progress": 0.1, "angle": 0.5},
            "done": false,
            "win": false,
            "time_since_game_start": 12.5
        }"#;
        let req: ActionRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.agent_id, "tab-1");
        assert_eq!(req.observation["progress"], 0.1);
        assert!(!req.done);
        assert_eq!(req.time_since_game_start, Some(12.5));

        // The timing field is optional.
        let body = r#"{"agent_id": "a", "observation": {}, "done": true, "win": true}"#;
        assert!(serde_json::from_str::<ActionRequest>(body).is_ok());
    }

    #[test]
    fn test_response_field_names() {
        let mut action = BTreeMap::new();
        action.insert("up".to_string(), true);
        action.insert("left".to_string(), false);
        let json = serde_json::to_value(&ActionResponse {
            action,
            pause: true,
        })
        .unwrap();
        assert_eq!(json["action"]["up"], true);
        assert_eq!(json["pause"], true);

        let json = serde_json::to_value(&UnpauseResponse { unpause: false }).unwrap();
        assert_eq!(json["unpause"], false);

        let json = serde_json::to_value(&TrainResponse::completed()).unwrap();
        assert_eq!(json["status"], "training_completed");
    }

    #[test]
    fn test_observation_vector_order_and_errors() {
        let keys = vec!["progress".to_string(), "angle".to_string()];
        let mut observation = HashMap::new();
        observation.insert("angle".to_string(), 0.5);
        observation.insert("progress".to_string(), 0.1);

        // Extraction follows the configured key order, not the map order.
        let obs = observation_vector(&keys, &observation).unwrap();
        assert_eq!(obs, vec![0.1, 0.5]);

        observation.remove("angle");
        match observation_vector(&keys, &observation) {
            Err(HuddleError::MissingObservation(key)) => assert_eq!(key, "angle"),
            other => panic!("unexpected: {:?}", other),
        }

        observation.insert("angle".to_string(), f64::NAN);
        match observation_vector(&keys, &observation) {
            Err(HuddleError::ObservationNotFinite(1)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }
}
