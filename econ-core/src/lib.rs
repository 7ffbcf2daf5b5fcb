use wasm_bindgen::prelude::*;

pub mod agents;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod labor;
pub mod market;
pub mod metrics;
pub mod mortality;
pub mod policy;
pub mod production;
pub mod scenario;
pub mod snapshot;
pub mod types;
pub mod world;

pub use command::{Command, Notification};
pub use config::SimConfig;
pub use engine::{Engine, Halt, Pacer};
pub use error::*;
pub use events::{EventCatalog, EventKind};
pub use metrics::{Grade, Metrics, ScoreReport};
pub use scenario::ScenarioConfig;
pub use snapshot::Snapshot;
pub use types::*;
pub use world::World;

#[cfg(feature = "instrument")]
pub use instrument;

// ============================================================================
// WASM API - Simulation
// ============================================================================

/// Browser-facing wrapper around [`Engine`]. The host calls `frame` from its
/// timer and drains notifications after each call.
#[wasm_bindgen]
pub struct Simulation {
    engine: Engine,
}

#[wasm_bindgen]
impl Simulation {
    #[wasm_bindgen(constructor)]
    pub fn new(scenario: &str, seed: u64) -> Self {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        Self {
            engine: Engine::new(ScenarioConfig::lookup(scenario), seed),
        }
    }

    /// Run the steps due after `elapsed_ms`. Returns how many ran.
    #[wasm_bindgen]
    pub fn frame(&mut self, elapsed_ms: f64) -> u32 {
        self.engine.frame(elapsed_ms)
    }

    /// Advance one tick even while paused.
    #[wasm_bindgen]
    pub fn step(&mut self) {
        self.engine.step();
    }

    /// Apply a command object such as `{type: "PAUSE"}`.
    #[wasm_bindgen]
    pub fn command(&mut self, command: JsValue) {
        match serde_wasm_bindgen::from_value::<Command>(command)
            .map_err(|e| CommandError::Host(e.to_string()))
        {
            Ok(command) => self.engine.handle(command),
            Err(err) => tracing::warn!("ignoring command: {}", err),
        }
    }

    #[wasm_bindgen]
    pub fn command_json(&mut self, json: &str) {
        self.engine.handle_json(json);
    }

    #[wasm_bindgen]
    pub fn snapshot(&self) -> Snapshot {
        self.engine.snapshot()
    }

    /// Notifications raised since the last drain, oldest first.
    #[wasm_bindgen]
    pub fn drain_notifications(&mut self) -> js_sys::Array {
        let out = js_sys::Array::new();
        for note in self.engine.drain_notifications() {
            match serde_wasm_bindgen::to_value(&note) {
                Ok(value) => {
                    out.push(&value);
                }
                Err(err) => tracing::warn!("dropping {} notification: {}", note.kind(), err),
            }
        }
        out
    }

    #[wasm_bindgen]
    pub fn get_tick(&self) -> u64 {
        self.engine.tick()
    }

    #[wasm_bindgen]
    pub fn awaiting_choice(&self) -> bool {
        self.engine.events().pending().is_some()
    }
}

impl Simulation {
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
