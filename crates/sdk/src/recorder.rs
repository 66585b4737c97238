//! Event assembly, signing, and chain advancement.

use facto_types::{
    canonical_bytes, AgentId, Event, ExecutionMeta, FactoId, Hash, KeyPair, Proof, SessionId,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Per-session hash-chain state.
///
/// Owned by a single recorder; never shared across sessions.
#[derive(Debug, Clone)]
pub struct SessionChain {
    session_id: SessionId,
    prev_hash: Hash,
}

impl SessionChain {
    /// Start a fresh session with a zeroed chain pointer.
    pub fn new() -> Self {
        Self {
            session_id: SessionId::generate(),
            prev_hash: Hash::ZERO,
        }
    }

    /// The session this chain belongs to.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Current chain pointer: zeros before the first event, then the hash
    /// of the most recently signed event.
    pub fn prev_hash(&self) -> &Hash {
        &self.prev_hash
    }

    fn advance(&mut self, event_hash: Hash) {
        self.prev_hash = event_hash;
    }
}

impl Default for SessionChain {
    fn default() -> Self {
        Self::new()
    }
}

/// The unsigned parts of an event, supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    /// Free-form action label.
    pub action_type: String,

    /// `"success"`, `"error"`, or another label.
    pub status: String,

    /// Arbitrary JSON captured before the action.
    pub input_data: serde_json::Value,

    /// Arbitrary JSON captured after the action.
    pub output_data: serde_json::Value,

    /// Parent event, when this action nests under another.
    pub parent_facto_id: Option<FactoId>,

    /// Execution metadata.
    pub execution_meta: Option<ExecutionMeta>,

    /// Action start, nanoseconds since epoch. Defaults to now.
    pub started_at: Option<i64>,

    /// Action completion, nanoseconds since epoch. Defaults to now.
    pub completed_at: Option<i64>,
}

/// Builds and signs events for one agent, one session at a time.
pub struct EventRecorder {
    keypair: KeyPair,
    agent_id: AgentId,
    chain: SessionChain,
}

impl EventRecorder {
    /// Create a recorder with a fresh session.
    pub fn new(keypair: KeyPair, agent_id: AgentId) -> Self {
        Self {
            keypair,
            agent_id,
            chain: SessionChain::new(),
        }
    }

    /// The current session id.
    pub fn session_id(&self) -> &SessionId {
        self.chain.session_id()
    }

    /// The current chain state.
    pub fn chain(&self) -> &SessionChain {
        &self.chain
    }

    /// Begin a new session: the chain pointer resets to zeros and a fresh
    /// session id is issued.
    pub fn begin_session(&mut self) -> SessionId {
        self.chain = SessionChain::new();
        self.chain.session_id().clone()
    }

    /// Assemble, hash, and sign one event, advancing the session chain.
    ///
    /// The chain advances on every successful sign, independent of whether
    /// the caller manages to publish the event afterwards.
    pub fn record(&mut self, draft: EventDraft) -> Event {
        let now = now_nanos();
        let mut event = Event {
            facto_id: FactoId::generate(),
            agent_id: self.agent_id.clone(),
            session_id: self.chain.session_id().clone(),
            parent_facto_id: draft.parent_facto_id,
            action_type: draft.action_type,
            status: draft.status,
            input_data: draft.input_data,
            output_data: draft.output_data,
            execution_meta: draft.execution_meta,
            proof: Proof {
                signature: String::new(),
                public_key: self.keypair.public_key().to_base64(),
                prev_hash: self.chain.prev_hash().to_hex(),
                event_hash: String::new(),
            },
            started_at: draft.started_at.unwrap_or(now),
            completed_at: draft.completed_at.unwrap_or(now),
        };

        let canonical = canonical_bytes(&event);
        let event_hash = Hash::sha3_256(&canonical);
        event.proof.event_hash = event_hash.to_hex();
        event.proof.signature = self.keypair.sign(&canonical).to_base64();

        self.chain.advance(event_hash);
        event
    }
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
