//! Learning-rate schedules for the adaptive policy.
//!
//! `Fixed` keeps the configured rate. `Anomaly` watches a sliding window of
//! the recency weight; when a new weight strays more than `epsilon` from the
//! window's mean the boosted rate applies, and it stays in force until a full
//! window passes without another deviation.

use crate::config::{LearningRateMode, SimulatorConfig};

/// Rate used while an anomaly is active.
pub const BOOSTED_RATE: f64 = 0.9;
/// Number of recent weights averaged.
pub const WINDOW: usize = 8;
/// Deviation from the window mean that flags an anomaly.
pub const EPSILON: f64 = 0.075;

#[derive(Debug, Clone, PartialEq)]
pub enum LearningRateSchedule {
    Fixed(f64),
    Anomaly(AnomalyWindow),
}

impl LearningRateSchedule {
    pub fn from_config(config: &SimulatorConfig) -> Self {
        match config.learning_rate_mode {
            LearningRateMode::Fixed => LearningRateSchedule::Fixed(config.learning_rate),
            LearningRateMode::Anomaly => {
                LearningRateSchedule::Anomaly(AnomalyWindow::new(config.learning_rate))
            },
        }
    }

    /// Rate applied to the next weight update.
    pub fn rate(&self) -> f64 {
        match self {
            LearningRateSchedule::Fixed(rate) => *rate,
            LearningRateSchedule::Anomaly(window) => window.rate(),
        }
    }

    /// Feeds the recency weight observed at `tick`.
    pub fn observe(&mut self, tick: u64, w_recency: f64) {
        if let LearningRateSchedule::Anomaly(window) = self {
            window.observe(tick, w_recency);
        }
    }
}

/// Sliding-window anomaly detector over the recency weight.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyWindow {
    base: f64,
    history: [f64; WINDOW],
    filled: usize,
    cursor: usize,
    flagged_at: Option<u64>,
}

impl AnomalyWindow {
    pub fn new(base: f64) -> Self {
        Self {
            base,
            history: [0.0; WINDOW],
            filled: 0,
            cursor: 0,
            flagged_at: None,
        }
    }

    pub fn is_anomalous(&self) -> bool {
        self.flagged_at.is_some()
    }

    pub fn rate(&self) -> f64 {
        if self.is_anomalous() { BOOSTED_RATE } else { self.base }
    }

    pub fn observe(&mut self, tick: u64, w_recency: f64) {
        if self.filled == WINDOW {
            let mean = self.history.iter().sum::<f64>() / WINDOW as f64;
            if (w_recency - mean).abs() > EPSILON {
                if self.flagged_at.is_none() {
                    log::trace!("recency weight {w_recency:.4} left window mean {mean:.4} at tick {tick}");
                }
                self.flagged_at = Some(tick);
            } else if let Some(since) = self.flagged_at
                && tick.saturating_sub(since) >= WINDOW as u64
            {
                self.flagged_at = None;
            }
        }
        self.history[self.cursor] = w_recency;
        self.cursor = (self.cursor + 1) % WINDOW;
        self.filled = (self.filled + 1).min(WINDOW);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_rate_never_changes() {
        let mut schedule = LearningRateSchedule::Fixed(0.3);
        for tick in 0..32 {
            schedule.observe(tick, if tick % 2 == 0 { 0.0 } else { 1.0 });
        }
        assert_eq!(schedule.rate(), 0.3);
    }

    #[test]
    fn no_anomaly_before_window_fills() {
        let mut window = AnomalyWindow::new(0.3);
        for tick in 0..WINDOW as u64 {
            window.observe(tick, tick as f64 / 8.0);
        }
        assert!(!window.is_anomalous());
        assert_eq!(window.rate(), 0.3);
    }

    #[test]
    fn jump_boosts_then_settles() {
        let mut window = AnomalyWindow::new(0.3);
        let mut tick = 0;
        for _ in 0..WINDOW {
            window.observe(tick, 0.5);
            tick += 1;
        }
        window.observe(tick, 0.8);
        assert!(window.is_anomalous());
        assert_eq!(window.rate(), BOOSTED_RATE);

        // Steady again at the new level; the flag clears a window later.
        let flagged = tick;
        while tick < flagged + 3 * WINDOW as u64 {
            tick += 1;
            window.observe(tick, 0.8);
        }
        assert!(!window.is_anomalous());
        assert_eq!(window.rate(), 0.3);
    }

    #[test]
    fn small_drift_is_ignored() {
        let mut window = AnomalyWindow::new(0.3);
        for tick in 0..64 {
            window.observe(tick, 0.5 + (tick % 3) as f64 * 0.01);
        }
        assert!(!window.is_anomalous());
    }

    #[test]
    fn built_from_config() {
        let config = SimulatorConfig::builder(8)
            .learning_rate(0.2)
            .learning_rate_mode(LearningRateMode::Anomaly)
            .try_build()
            .unwrap();
        let schedule = LearningRateSchedule::from_config(&config);
        assert!(matches!(schedule, LearningRateSchedule::Anomaly(_)));
        assert_eq!(schedule.rate(), 0.2);
    }
}
