use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("unknown policy lever `{0}`")]
    UnknownLever(String),
    #[error("policy lever `{lever}` rejected non-finite value {value}")]
    NonFinite { lever: String, value: f64 },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("malformed command value: {0}")]
    Host(String),
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("malformed scenario: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("scenario `{id}` must have at least one agent")]
    Empty { id: String },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed event catalog: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("event `{event}` declares duplicate choice id `{choice}`")]
    DuplicateChoice { event: String, choice: String },
    #[error("event `{event}` uses the reserved choice id `{choice}`")]
    ReservedChoice { event: String, choice: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("event {0} is not the pending event")]
    NotPending(u64),
    #[error("event {event} has no choice `{choice}`")]
    UnknownChoice { event: u64, choice: String },
}
