//! Domain model of a single simulation run.
//!
//! Data flows one way through these types: clients issue requests, the
//! scheduler turns requests into decisions, and the orchestrator turns
//! decisions into events by testing them against slot capacity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest scheduling priority (VIP traffic).
pub const HIGHEST_PRIORITY: u8 = 1;

/// Lowest scheduling priority (free traffic).
pub const LOWEST_PRIORITY: u8 = 3;

/// Identifier of a generated client, unique within one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(u32);

impl ClientId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a generated request, assigned in generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u32);

impl RequestId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique identity of one simulation run.
///
/// Namespaces the allocator counter so concurrent runs never share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationId(Uuid);

impl SimulationId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Service class of a client.
///
/// The class fixes both the fairness weight and the scheduling priority of
/// every request the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientClass {
    Vip,
    Paid,
    Free,
}

impl ClientClass {
    /// Fairness weight attached to clients of this class.
    pub fn weight(self) -> f64 {
        match self {
            ClientClass::Vip => 1.5,
            ClientClass::Paid => 1.0,
            ClientClass::Free => 0.7,
        }
    }

    /// Scheduling priority, 1 being the highest.
    pub fn priority(self) -> u8 {
        match self {
            ClientClass::Vip => HIGHEST_PRIORITY,
            ClientClass::Paid => 2,
            ClientClass::Free => LOWEST_PRIORITY,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClientClass::Vip => "vip",
            ClientClass::Paid => "paid",
            ClientClass::Free => "free",
        }
    }
}

impl fmt::Display for ClientClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A competing client. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub class: ClientClass,
    pub weight: f64,
}

impl Client {
    /// Creates a client whose weight is derived from its class.
    pub fn new(id: ClientId, class: ClientClass) -> Self {
        Self {
            id,
            class,
            weight: class.weight(),
        }
    }
}

/// A single slot request issued by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub client_id: ClientId,
    /// 1 = highest, 3 = lowest
    pub priority: u8,
    pub arrival_tick: u64,
}

/// First appearance of a client in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientArrival {
    pub client_id: ClientId,
    pub class: ClientClass,
    pub first_tick: u64,
}

/// The scheduler's choice for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub tick: u64,
    pub request: Request,
    pub score: f64,
}

/// Outcome of testing a decision against remaining capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allocated,
    Rejected,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Allocated => write!(f, "allocated"),
            Action::Rejected => write!(f, "rejected"),
        }
    }
}

/// One entry of the result timeline, one per decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub tick: u64,
    pub request_id: RequestId,
    pub client_id: ClientId,
    pub priority: u8,
    pub score: f64,
    pub action: Action,
}

impl Event {
    /// Builds the event recorded for `decision`.
    pub fn from_decision(decision: &Decision, action: Action) -> Self {
        Self {
            tick: decision.tick,
            request_id: decision.request.id,
            client_id: decision.request.client_id,
            priority: decision.request.priority,
            score: decision.score,
            action,
        }
    }
}

/// Identity and parameters of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub id: SimulationId,
    pub policy: String,
    pub slots: u64,
    pub total_requests: usize,
    pub seed: u64,
    pub created_at: DateTime<Utc>,
}

/// Complete output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub simulation: Simulation,
    pub arrival_order: Vec<ClientArrival>,
    pub events: Vec<Event>,
}

impl SimulationResult {
    /// Number of events that were granted a slot.
    pub fn allocated_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| event.action == Action::Allocated)
            .count()
    }

    /// Number of events that were turned away.
    pub fn rejected_count(&self) -> usize {
        self.events.len() - self.allocated_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_weights_and_priorities() {
        assert_eq!(ClientClass::Vip.weight(), 1.5);
        assert_eq!(ClientClass::Paid.weight(), 1.0);
        assert_eq!(ClientClass::Free.weight(), 0.7);

        assert_eq!(ClientClass::Vip.priority(), 1);
        assert_eq!(ClientClass::Paid.priority(), 2);
        assert_eq!(ClientClass::Free.priority(), 3);
    }

    #[test]
    fn test_client_weight_follows_class() {
        let client = Client::new(ClientId::new(7), ClientClass::Vip);
        assert_eq!(client.weight, 1.5);
    }

    #[test]
    fn test_event_serializes_with_lowercase_action() {
        let decision = Decision {
            tick: 4,
            request: Request {
                id: RequestId::new(2),
                client_id: ClientId::new(1),
                priority: 3,
                arrival_tick: 4,
            },
            score: 30.0,
        };
        let event = Event::from_decision(&decision, Action::Rejected);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "rejected");
        assert_eq!(json["request_id"], 2);
        assert_eq!(json["client_id"], 1);
        assert_eq!(json["tick"], 4);
    }

    #[test]
    fn test_simulation_id_is_unique() {
        assert_ne!(SimulationId::generate(), SimulationId::generate());
    }
}
