//! Report model - append-only decision log

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::logic::{Decision, DecisionStatus, Protocol};

/// Fixed-width UTC format so TEXT comparison orders chronologically
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 1000;

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// TRAFFIC CONTEXT
// ============================================================================

/// Flow fields shared by every context shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    pub protocol: Protocol,
    pub byte_count: u64,
    pub duration_seconds: u64,
    pub attack_probability: f64,
    pub ai_confidence: f64,
    pub is_threat: bool,
    pub is_verified: bool,
    pub verification_details: String,
}

impl FlowContext {
    pub fn from_decision(decision: &Decision, source_ip: Option<String>) -> Self {
        Self {
            source_ip,
            protocol: decision.observation.protocol.clone(),
            byte_count: decision.observation.byte_count,
            duration_seconds: decision.observation.duration_seconds,
            attack_probability: decision.attack_probability(),
            ai_confidence: round2(decision.attack_probability()),
            is_threat: decision.is_threat(),
            is_verified: decision.verification.passed,
            verification_details: decision.verification.details.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum KnownContext {
    /// Self-sampled flow from `/analyze`
    Live(FlowContext),
    /// Row replayed from an uploaded dataset
    Dataset {
        dataset_id: Uuid,
        row_index: usize,
        features_from_row: bool,
        flow: FlowContext,
    },
}

/// Stored context; rows that match no known shape stay opaque
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrafficContext {
    Known(KnownContext),
    Opaque(serde_json::Value),
}

impl TrafficContext {
    pub fn live(flow: FlowContext) -> Self {
        TrafficContext::Known(KnownContext::Live(flow))
    }

    pub fn dataset(dataset_id: Uuid, row_index: usize, features_from_row: bool, flow: FlowContext) -> Self {
        TrafficContext::Known(KnownContext::Dataset {
            dataset_id,
            row_index,
            features_from_row,
            flow,
        })
    }

    pub fn flow(&self) -> Option<&FlowContext> {
        match self {
            TrafficContext::Known(KnownContext::Live(flow))
            | TrafficContext::Known(KnownContext::Dataset { flow, .. }) => Some(flow),
            TrafficContext::Opaque(_) => None,
        }
    }
}

// ============================================================================
// RECORD
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub label: String,
    pub confidence: f64,
    pub decision_status: DecisionStatus,
    pub action: String,
    pub decision_reason: Option<String>,
    pub traffic_context: TrafficContext,
    pub raw_input: serde_json::Value,
}

/// Raw database row
#[derive(Debug, FromRow)]
struct ReportRow {
    event_id: String,
    created_at: String,
    label: String,
    confidence: f64,
    decision_status: String,
    action: String,
    decision_reason: Option<String>,
    traffic_context: Option<String>,
    raw_input: Option<String>,
}

impl TryFrom<ReportRow> for DecisionRecord {
    type Error = sqlx::Error;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        let decode = |msg: String| sqlx::Error::Decode(msg.into());

        let event_id = Uuid::parse_str(&row.event_id)
            .map_err(|e| decode(format!("event_id {}: {}", row.event_id, e)))?;
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| decode(format!("created_at {}: {}", row.created_at, e)))?
            .with_timezone(&Utc);
        let decision_status = DecisionStatus::parse(&row.decision_status)
            .ok_or_else(|| decode(format!("unknown decision_status {}", row.decision_status)))?;

        let traffic_context = match row.traffic_context.as_deref() {
            Some(text) => serde_json::from_str(text)
                .unwrap_or_else(|_| TrafficContext::Opaque(serde_json::Value::String(text.to_string()))),
            None => TrafficContext::Opaque(serde_json::Value::Null),
        };
        let raw_input = row
            .raw_input
            .as_deref()
            .map(|text| serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string())))
            .unwrap_or(serde_json::Value::Null);

        Ok(DecisionRecord {
            event_id,
            created_at,
            label: row.label,
            confidence: row.confidence,
            decision_status,
            action: row.action,
            decision_reason: row.decision_reason,
            traffic_context,
            raw_input,
        })
    }
}

// ============================================================================
// FILTER & SUMMARY
// ============================================================================

/// Report query filter; bounds are inclusive
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_time_range"))]
pub struct ReportFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<i64>,
    #[validate(range(min = 0))]
    pub offset: Option<i64>,
}

fn validate_time_range(filter: &ReportFilter) -> Result<(), ValidationError> {
    match (filter.from, filter.to) {
        (Some(from), Some(to)) if from > to => {
            let mut err = ValidationError::new("time_range");
            err.message = Some("'from' must not be after 'to'".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

impl ReportFilter {
    pub fn range(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self {
            from,
            to,
            ..Default::default()
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE 1 = 1");
        if let Some(from) = &self.from {
            qb.push(" AND created_at >= ").push_bind(format_timestamp(from));
        }
        if let Some(to) = &self.to {
            qb.push(" AND created_at <= ").push_bind(format_timestamp(to));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: i64,
    pub normal: i64,
    pub verified_threat: i64,
    pub suspicious: i64,
    pub non_normal: i64,
}

impl ReportSummary {
    /// Tally in memory, for results not read back from the store
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a DecisionStatus>) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            summary.total += 1;
            match status {
                DecisionStatus::Normal => summary.normal += 1,
                DecisionStatus::VerifiedThreat => summary.verified_threat += 1,
                DecisionStatus::SuspiciousUnverified => summary.suspicious += 1,
            }
        }
        summary.non_normal = summary.verified_threat + summary.suspicious;
        summary
    }
}

// ============================================================================
// QUERIES
// ============================================================================

const SELECT_COLUMNS: &str = "SELECT event_id, created_at, label, confidence, decision_status, action, \
     decision_reason, traffic_context, raw_input FROM reports";

impl DecisionRecord {
    /// Build a new record for a decision
    pub fn from_decision(decision: &Decision, traffic_context: TrafficContext, raw_input: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            created_at: Utc::now().trunc_subsecs(6),
            label: decision.label().to_string(),
            confidence: decision.attack_probability(),
            decision_status: decision.status,
            action: decision.action.to_string(),
            decision_reason: Some(decision.verification.details.clone()),
            traffic_context,
            raw_input,
        }
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        let context_json = serde_json::to_string(&self.traffic_context)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let raw_json = serde_json::to_string(&self.raw_input)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        sqlx::query(
            r#"
            INSERT INTO reports (event_id, created_at, label, confidence, decision_status, action, decision_reason, traffic_context, raw_input)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(self.event_id.to_string())
        .bind(format_timestamp(&self.created_at))
        .bind(&self.label)
        .bind(self.confidence)
        .bind(self.decision_status.as_str())
        .bind(&self.action)
        .bind(&self.decision_reason)
        .bind(context_json)
        .bind(raw_json)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        qb.push(" WHERE event_id = ").push_bind(id.to_string());

        qb.build_query_as::<ReportRow>()
            .fetch_optional(pool)
            .await?
            .map(DecisionRecord::try_from)
            .transpose()
    }

    /// One page, newest first
    pub async fn list(pool: &SqlitePool, filter: &ReportFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY created_at DESC, event_id DESC LIMIT ")
            .push_bind(filter.limit())
            .push(" OFFSET ")
            .push_bind(filter.offset());

        let rows = qb.build_query_as::<ReportRow>().fetch_all(pool).await?;
        rows.into_iter().map(DecisionRecord::try_from).collect()
    }

    /// Every matching record, oldest first
    pub async fn list_all(pool: &SqlitePool, filter: &ReportFilter) -> Result<Vec<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY created_at ASC, event_id ASC");

        let rows = qb.build_query_as::<ReportRow>().fetch_all(pool).await?;
        rows.into_iter().map(DecisionRecord::try_from).collect()
    }

    pub async fn summary(pool: &SqlitePool, filter: &ReportFilter) -> Result<ReportSummary, sqlx::Error> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS total, ");
        qb.push("COALESCE(SUM(CASE WHEN decision_status = ")
            .push_bind(DecisionStatus::Normal.as_str())
            .push(" THEN 1 ELSE 0 END), 0) AS normal, ");
        qb.push("COALESCE(SUM(CASE WHEN decision_status = ")
            .push_bind(DecisionStatus::VerifiedThreat.as_str())
            .push(" THEN 1 ELSE 0 END), 0) AS verified_threat, ");
        qb.push("COALESCE(SUM(CASE WHEN decision_status = ")
            .push_bind(DecisionStatus::SuspiciousUnverified.as_str())
            .push(" THEN 1 ELSE 0 END), 0) AS suspicious FROM reports");
        filter.push_where(&mut qb);

        let row = qb.build().fetch_one(pool).await?;
        let total: i64 = row.get("total");
        let normal: i64 = row.get("normal");
        let verified_threat: i64 = row.get("verified_threat");
        let suspicious: i64 = row.get("suspicious");

        Ok(ReportSummary {
            total,
            normal,
            verified_threat,
            suspicious,
            non_normal: total - normal,
        })
    }
}

// ============================================================================
// EXPORT
// ============================================================================

pub const CSV_HEADER: [&str; 9] = [
    "event_id",
    "created_at",
    "label",
    "confidence",
    "decision_status",
    "action",
    "decision_reason",
    "traffic_context",
    "raw_input",
];

/// Render records as CSV; nested fields are JSON text
pub fn to_csv(records: &[DecisionRecord]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for r in records {
        let context = serde_json::to_string(&r.traffic_context).unwrap_or_default();
        let raw = serde_json::to_string(&r.raw_input).unwrap_or_default();
        writer.write_record([
            r.event_id.to_string(),
            format_timestamp(&r.created_at),
            r.label.clone(),
            r.confidence.to_string(),
            r.decision_status.as_str().to_string(),
            r.action.clone(),
            r.decision_reason.clone().unwrap_or_default(),
            context,
            raw,
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
