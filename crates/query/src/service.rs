//! Query and verification logic, independent of the HTTP layer.

use crate::ApiError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use facto_core::EventStore;
use facto_types::{verify_event, Event, Hash, MerkleTree, ProofStep, StoredEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default page size for listings.
const DEFAULT_LIMIT: usize = 100;

/// Maximum page size for listings.
const MAX_LIMIT: usize = 1000;

/// Query parameters for the agent/time listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    /// Producer to list events for.
    pub agent_id: String,

    /// RFC3339 window start; defaults to 24 hours before `end`.
    pub start: Option<String>,

    /// RFC3339 window end; defaults to now.
    pub end: Option<String>,

    /// Page size, 1..=1000.
    pub limit: Option<usize>,

    /// Opaque pagination cursor from a previous page.
    pub cursor: Option<String>,
}

/// One page of events plus the cursor for the next page.
#[derive(Debug, Clone, Serialize)]
pub struct EventPage {
    pub events: Vec<StoredEvent>,
    pub next_cursor: Option<String>,
}

/// Per-check outcome of a single-event verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyChecks {
    pub hash_valid: bool,
    pub signature_valid: bool,
    /// Unknown for a lone event: the prior event is not in scope.
    pub chain_valid: Option<bool>,
}

/// Response body for single-event verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub checks: VerifyChecks,
}

/// Aggregate flags for a whole-session verification.
#[derive(Debug, Clone, Serialize)]
pub struct ChainChecks {
    pub all_hashes_valid: bool,
    pub all_signatures_valid: bool,
    pub chain_integrity_valid: bool,
}

/// One structured verification failure.
#[derive(Debug, Clone, Serialize)]
pub struct ChainIssue {
    pub facto_id: String,
    pub error: String,
}

/// Response body for whole-session verification.
#[derive(Debug, Clone, Serialize)]
pub struct ChainReport {
    pub valid: bool,
    pub session_id: String,
    pub event_count: usize,
    pub checks: ChainChecks,
    /// SHA-256 over the concatenated hex event hashes, in walk order. A
    /// convenience digest, not part of the signing contract.
    pub session_hash: String,
    pub errors: Vec<ChainIssue>,
}

/// Inclusion proof for one event of an evidence package.
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceProof {
    pub facto_id: String,
    pub event_hash: String,
    pub leaf_index: usize,
    pub proof: Vec<ProofStep>,
}

/// Exported bundle of session events, Merkle proofs, and a recipe for
/// offline re-verification.
#[derive(Debug, Clone, Serialize)]
pub struct EvidencePackage {
    pub package_id: String,
    pub session_id: String,
    pub generated_at: String,
    pub merkle_root: String,
    pub event_count: usize,
    pub events: Vec<StoredEvent>,
    pub proofs: Vec<EvidenceProof>,
    pub verification_recipe: String,
}

/// The stateless read plane over an event store.
pub struct QueryService {
    store: Arc<dyn EventStore>,
}

impl QueryService {
    /// Create a service over any store implementation.
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// List events for an agent inside a time window, paginated.
    ///
    /// The window expands into per-day partition keys queried in order;
    /// results concatenate until the page limit.
    pub async fn list_events(&self, params: ListParams) -> Result<EventPage, ApiError> {
        if params.agent_id.is_empty() {
            return Err(ApiError::BadRequest("agent_id is required".to_string()));
        }
        let limit = parse_limit(params.limit)?;
        let cursor = decode_cursor(params.cursor.as_deref())?;

        let end = match &params.end {
            Some(raw) => parse_rfc3339(raw)?,
            None => Utc::now(),
        };
        let start = match &params.start {
            Some(raw) => parse_rfc3339(raw)?,
            None => end - ChronoDuration::hours(24),
        };
        if start > end {
            return Err(ApiError::BadRequest("start is after end".to_string()));
        }

        let start_ns = nanos_of(&start)?;
        let end_ns = nanos_of(&end)?;

        let mut page = Vec::with_capacity(limit.min(64));
        let mut skipping = cursor;
        let mut day = start.date_naive();
        let last_day = end.date_naive();

        'days: while day <= last_day {
            let events = self
                .store
                .events_by_agent_day(&params.agent_id, &day.format("%Y-%m-%d").to_string(), start_ns, end_ns)
                .await?;

            for event in events {
                if let Some(after) = &skipping {
                    // Resume after the cursor event in scan order.
                    if event.event.facto_id.as_str() == after {
                        skipping = None;
                    }
                    continue;
                }
                page.push(event);
                if page.len() >= limit {
                    break 'days;
                }
            }
            day = next_day(day)?;
        }

        Ok(paginate(page, limit))
    }

    /// Point lookup by facto id.
    pub async fn get_event(&self, facto_id: &str) -> Result<StoredEvent, ApiError> {
        self.store
            .event_by_facto_id(facto_id)
            .await?
            .ok_or(ApiError::NotFound)
    }

    /// All events of a session, ascending by completion time, paginated.
    pub async fn session_events(
        &self,
        session_id: &str,
        limit: Option<usize>,
        cursor: Option<String>,
    ) -> Result<EventPage, ApiError> {
        let limit = parse_limit(limit)?;
        let cursor = decode_cursor(cursor.as_deref())?;

        let events = self.ordered_session(session_id).await?;

        let mut page = Vec::with_capacity(limit.min(64));
        let mut skipping = cursor;
        for event in events {
            if let Some(after) = &skipping {
                if event.event.facto_id.as_str() == after {
                    skipping = None;
                }
                continue;
            }
            page.push(event);
            if page.len() >= limit {
                break;
            }
        }

        Ok(paginate(page, limit))
    }

    /// Verify one event in isolation. Chain validity is unknowable here.
    pub fn verify_single(event: &Event) -> VerifyResponse {
        let outcome = verify_event(event);
        VerifyResponse {
            valid: outcome.is_valid(),
            checks: VerifyChecks {
                hash_valid: outcome.hash_valid,
                signature_valid: outcome.signature_valid,
                chain_valid: None,
            },
        }
    }

    /// Walk a whole session: re-derive every hash, check every signature,
    /// and verify the prev-hash chain from the zero hash forward.
    pub async fn verify_chain(&self, session_id: &str) -> Result<ChainReport, ApiError> {
        let events = self.ordered_session(session_id).await?;

        let mut checks = ChainChecks {
            all_hashes_valid: true,
            all_signatures_valid: true,
            chain_integrity_valid: true,
        };
        let mut errors = Vec::new();
        let mut expected_prev = Hash::ZERO.to_hex();
        let mut hash_concat = String::with_capacity(events.len() * 64);

        for stored in &events {
            let event = &stored.event;
            let facto_id = event.facto_id.as_str();
            let outcome = verify_event(event);

            if !outcome.hash_valid {
                checks.all_hashes_valid = false;
                errors.push(ChainIssue {
                    facto_id: facto_id.to_string(),
                    error: "event_hash does not match canonical form".to_string(),
                });
            }
            if !outcome.signature_valid {
                checks.all_signatures_valid = false;
                errors.push(ChainIssue {
                    facto_id: facto_id.to_string(),
                    error: "signature verification failed".to_string(),
                });
            }
            if event.proof.prev_hash != expected_prev {
                checks.chain_integrity_valid = false;
                errors.push(ChainIssue {
                    facto_id: facto_id.to_string(),
                    error: format!(
                        "chain broken: expected prev_hash {}, found {}",
                        expected_prev, event.proof.prev_hash
                    ),
                });
            }
            // The walk continues from this event's own hash either way.
            expected_prev = event.proof.event_hash.clone();
            hash_concat.push_str(&event.proof.event_hash);
        }

        Ok(ChainReport {
            valid: checks.all_hashes_valid
                && checks.all_signatures_valid
                && checks.chain_integrity_valid,
            session_id: session_id.to_string(),
            event_count: events.len(),
            checks,
            session_hash: Hash::sha256(hash_concat.as_bytes()).to_hex(),
            errors,
        })
    }

    /// Export an evidence package: session events, the Merkle tree over
    /// their hashes, per-event inclusion proofs, and a verification recipe.
    pub async fn evidence_package(&self, session_id: &str) -> Result<EvidencePackage, ApiError> {
        let events = self.ordered_session(session_id).await?;

        let leaves: Result<Vec<Hash>, ApiError> = events
            .iter()
            .map(|e| {
                Hash::from_hex(&e.event.proof.event_hash).map_err(|err| {
                    ApiError::Store(facto_core::StoreError::Decode(format!(
                        "stored event_hash for {} is not valid hex: {}",
                        e.event.facto_id, err
                    )))
                })
            })
            .collect();
        let leaves = leaves?;
        let tree = MerkleTree::build(&leaves);

        let proofs = events
            .iter()
            .enumerate()
            .map(|(i, stored)| EvidenceProof {
                facto_id: stored.event.facto_id.as_str().to_string(),
                event_hash: stored.event.proof.event_hash.clone(),
                leaf_index: i,
                proof: tree.proof(i).unwrap_or_default(),
            })
            .collect();

        let generated_at = Utc::now().to_rfc3339();
        let package_id = package_id(session_id, &generated_at);

        Ok(EvidencePackage {
            package_id,
            session_id: session_id.to_string(),
            generated_at,
            merkle_root: tree.root().to_hex(),
            event_count: events.len(),
            events,
            proofs,
            verification_recipe: VERIFICATION_RECIPE.to_string(),
        })
    }

    /// Fetch a session's events in canonical walk order, 404 when empty.
    async fn ordered_session(&self, session_id: &str) -> Result<Vec<StoredEvent>, ApiError> {
        let mut events = self.store.events_by_session(session_id).await?;
        if events.is_empty() {
            return Err(ApiError::NotFound);
        }
        order_session_events(&mut events);
        Ok(events)
    }
}

/// Canonical session walk order: `completed_at` ascending, ties broken by
/// lexicographic facto id so the walk is deterministic.
pub(crate) fn order_session_events(events: &mut [StoredEvent]) {
    events.sort_by(|a, b| {
        a.event
            .completed_at
            .cmp(&b.event.completed_at)
            .then_with(|| a.event.facto_id.cmp(&b.event.facto_id))
    });
}

fn parse_limit(limit: Option<usize>) -> Result<usize, ApiError> {
    match limit {
        None => Ok(DEFAULT_LIMIT),
        Some(n) if (1..=MAX_LIMIT).contains(&n) => Ok(n),
        Some(n) => Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {n}"
        ))),
    }
}

fn decode_cursor(cursor: Option<&str>) -> Result<Option<String>, ApiError> {
    match cursor {
        None => Ok(None),
        Some("") => Ok(None),
        Some(raw) => {
            let bytes = BASE64
                .decode(raw)
                .map_err(|_| ApiError::BadRequest("invalid cursor".to_string()))?;
            let facto_id = String::from_utf8(bytes)
                .map_err(|_| ApiError::BadRequest("invalid cursor".to_string()))?;
            Ok(Some(facto_id))
        }
    }
}

fn encode_cursor(facto_id: &str) -> String {
    BASE64.encode(facto_id.as_bytes())
}

fn paginate(events: Vec<StoredEvent>, limit: usize) -> EventPage {
    let next_cursor = if events.len() >= limit {
        events
            .last()
            .map(|e| encode_cursor(e.event.facto_id.as_str()))
    } else {
        None
    };
    EventPage {
        events,
        next_cursor,
    }
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::BadRequest(format!("invalid RFC3339 timestamp: {raw}")))
}

fn nanos_of(dt: &DateTime<Utc>) -> Result<i64, ApiError> {
    dt.timestamp_nanos_opt()
        .ok_or_else(|| ApiError::BadRequest("timestamp out of range".to_string()))
}

fn next_day(day: NaiveDate) -> Result<NaiveDate, ApiError> {
    day.succ_opt()
        .ok_or_else(|| ApiError::BadRequest("date out of range".to_string()))
}

fn package_id(session_id: &str, now_string: &str) -> String {
    let digest = Hash::sha256(format!("{session_id}{now_string}").as_bytes()).to_hex();
    format!("ev-{}", &digest[..16])
}

/// Plain-language instructions included with every evidence package.
const VERIFICATION_RECIPE: &str = "\
To verify this evidence package offline:
1. For each event, rebuild the canonical JSON form: the keys action_type, \
agent_id, completed_at, execution_meta, facto_id, input_data, output_data, \
parent_facto_id, prev_hash, session_id, started_at, status, sorted \
lexicographically at every nesting level, serialized without whitespace. \
Inside execution_meta keep only model_id (omit when null), sdk_version, \
seed, temperature (omit when null) and tool_calls.
2. Check that SHA3-256(canonical) equals the event's event_hash, and that \
the Ed25519 signature over the canonical bytes verifies against public_key.
3. Check the session chain: ordered by completed_at, the first event's \
prev_hash is 64 zeros and every later prev_hash equals the previous \
event's event_hash.
4. For each event, fold its Merkle proof: starting from the raw bytes of \
event_hash, repeatedly compute SHA-256(sibling || current) when the \
sibling position is 'left' or SHA-256(current || sibling) when 'right'. \
The result must equal merkle_root.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_bounds() {
        assert_eq!(parse_limit(None).unwrap(), 100);
        assert_eq!(parse_limit(Some(1)).unwrap(), 1);
        assert_eq!(parse_limit(Some(1000)).unwrap(), 1000);
        assert!(parse_limit(Some(0)).is_err());
        assert!(parse_limit(Some(1001)).is_err());
    }

    #[test]
    fn test_cursor_roundtrip() {
        let encoded = encode_cursor("ft-abc");
        assert_eq!(decode_cursor(Some(&encoded)).unwrap().unwrap(), "ft-abc");
        assert!(decode_cursor(Some("!!!")).is_err());
        assert!(decode_cursor(None).unwrap().is_none());
    }

    #[test]
    fn test_package_id_shape() {
        let id = package_id("session-x", "2024-01-01T00:00:00Z");
        assert!(id.starts_with("ev-"));
        assert_eq!(id.len(), 3 + 16);
    }
}
