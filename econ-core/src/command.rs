//! Messages between the host and the engine.
//!
//! Both directions are JSON objects tagged by `type`:
//!
//! ```json
//! {"type": "SET_POLICY", "policy": "income_tax", "value": 0.3}
//! {"type": "RESOLVE_CHOICE", "eventId": 4, "choiceId": "bailout"}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CommandError;
use crate::events::EventNotice;
use crate::metrics::{Insight, ScoreReport};
use crate::policy::PolicyValue;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    SetPolicy {
        policy: String,
        value: PolicyValue,
    },
    SetSpeed {
        speed: f64,
    },
    Pause,
    Resume,
    Reset {
        #[serde(default)]
        scenario: Option<String>,
        #[serde(default)]
        seed: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    ResolveChoice {
        event_id: u64,
        choice_id: String,
    },
    #[serde(rename_all = "camelCase")]
    ForceShock {
        event_type: String,
    },
    GetSnapshot,
    /// Any `type` the engine does not understand. Ignored.
    #[serde(other)]
    Unknown,
}

impl Command {
    pub fn from_json(json: &str) -> Result<Self, CommandError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notification {
    State(Box<Snapshot>),
    Event(EventNotice),
    Insight(Insight),
    ScenarioComplete(ScoreReport),
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::State(_) => "STATE",
            Notification::Event(_) => "EVENT",
            Notification::Insight(_) => "INSIGHT",
            Notification::ScenarioComplete(_) => "SCENARIO_COMPLETE",
        }
    }
}
