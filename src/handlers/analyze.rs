//! Analyze handlers

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::logic::sampler::synthetic_source_ip;
use crate::models::{DecisionRecord, FlowContext, TrafficContext};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub record: DecisionRecord,
    pub is_threat: bool,
    pub is_verified: bool,
    /// False when the report insert failed; the decision is still returned
    pub persisted: bool,
}

/// Legacy dashboard feed shape
#[derive(Debug, Serialize)]
pub struct LiveTraffic {
    pub timestamp: String,
    pub source_ip: String,
    pub protocol: String,
    pub threat_type: String,
    pub is_threat: bool,
    pub ai_confidence: f64,
    pub is_verified: bool,
    pub verification_details: String,
}

/// Request body as stored in raw_input; never rejected
fn raw_input_from_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return json!({});
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

/// Analyze one self-sampled flow and log the decision
///
/// Client `features` are accepted but ignored. Bodies up to the upload
/// cap are accepted.
pub async fn analyze(State(state): State<AppState>, body: Bytes) -> Json<AnalyzeResponse> {
    let raw_input = raw_input_from_body(&body);
    if raw_input.get("features").is_some_and(|f| !f.is_null()) {
        tracing::debug!("Client-supplied features ignored, flow is self-sampled");
    }

    let decision = state.engine.analyze_sampled();
    let context = TrafficContext::live(FlowContext::from_decision(&decision, Some(synthetic_source_ip())));
    let record = DecisionRecord::from_decision(&decision, context, raw_input);

    let persisted = match record.insert(&state.pool).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Failed to persist report {}: {}", record.event_id, e);
            false
        }
    };

    if decision.is_threat() {
        tracing::info!(
            "{} [{}] p={:.2} -> {}",
            decision.label(),
            decision.observation.protocol,
            decision.attack_probability(),
            decision.status
        );
    }

    Json(AnalyzeResponse {
        record,
        is_threat: decision.is_threat(),
        is_verified: decision.verification.passed,
        persisted,
    })
}

/// One live classification, not persisted
pub async fn live_traffic(State(state): State<AppState>) -> Json<LiveTraffic> {
    let decision = state.engine.analyze_sampled();
    let flow = FlowContext::from_decision(&decision, Some(synthetic_source_ip()));

    Json(LiveTraffic {
        timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
        source_ip: flow.source_ip.unwrap_or_default(),
        protocol: flow.protocol.to_string(),
        threat_type: decision.label().to_string(),
        is_threat: flow.is_threat,
        ai_confidence: flow.ai_confidence,
        is_verified: flow.is_verified,
        verification_details: flow.verification_details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_input_never_fails() {
        assert_eq!(raw_input_from_body(b""), json!({}));
        assert_eq!(raw_input_from_body(b"  \n"), json!({}));
        assert_eq!(raw_input_from_body(br#"{"features":[1,2]}"#), json!({"features": [1, 2]}));
        assert_eq!(raw_input_from_body(b"not json"), json!("not json"));
    }
}
