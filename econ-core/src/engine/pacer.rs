/// Turns wall-clock time into simulation steps.
///
/// The host calls [`Pacer::due`] once per animation frame with the elapsed
/// milliseconds. Fractional steps carry over between frames; anything beyond
/// the per-frame cap is dropped so a backgrounded tab does not replay
/// minutes of simulation at once.
#[derive(Debug, Clone)]
pub struct Pacer {
    pub speed: f64,
    pub paused: bool,
    steps_per_second: f64,
    max_steps_per_frame: u32,
    accumulator: f64,
}

/// Why the pacer is not advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    Paused,
    AwaitingChoice,
    Complete,
}

pub const MAX_SPEED: f64 = 100.0;

impl Pacer {
    pub fn new(steps_per_second: f64, max_steps_per_frame: u32) -> Self {
        Self {
            speed: 1.0,
            paused: false,
            steps_per_second: steps_per_second.max(0.0),
            max_steps_per_frame,
            accumulator: 0.0,
        }
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = if speed.is_finite() { speed.clamp(0.0, MAX_SPEED) } else { 1.0 };
    }

    pub fn pause(&mut self) {
        self.paused = true;
        self.accumulator = 0.0;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Steps to run this frame. `halt` is the engine's reason to stand still,
    /// if any; a halted pacer also forgets accumulated time.
    pub fn due(&mut self, elapsed_ms: f64, halt: Option<Halt>) -> u32 {
        let halt = halt.or(self.paused.then_some(Halt::Paused));
        if halt.is_some() || !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            if halt.is_some() {
                self.accumulator = 0.0;
            }
            return 0;
        }
        self.accumulator += self.speed * self.steps_per_second * elapsed_ms / 1000.0;
        let whole = self.accumulator.floor();
        self.accumulator -= whole;
        let cap = self.max_steps_per_frame as f64;
        if whole > cap {
            self.accumulator = 0.0;
            return self.max_steps_per_frame;
        }
        whole as u32
    }
}
