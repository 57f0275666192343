use rand::Rng;
use tracing::info;

/// Probabilistic fail-stop switch.
///
/// Every admission check draws once; the first draw below the crash
/// probability flips the gate shut for good, and that message is lost too.
#[derive(Debug, Clone, Default)]
pub struct CrashGate {
    probability: f64,
    armed: bool,
    crashed: bool,
}

impl CrashGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `alpha`, clamped to `[0, 1]`. The probability can be set once;
    /// later calls return false and change nothing.
    pub fn set_probability(&mut self, alpha: f64) -> bool {
        if std::mem::replace(&mut self.armed, true) {
            return false;
        }
        self.probability = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
        true
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn is_crashed(&self) -> bool {
        self.crashed
    }

    /// Returns true if the caller may go on processing.
    pub fn admit<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.crashed {
            return false;
        }
        if self.probability > 0.0 && rng.gen::<f64>() < self.probability {
            self.crashed = true;
            info!("💥 crash triggered (alpha {})", self.probability);
            return false;
        }
        true
    }
}
