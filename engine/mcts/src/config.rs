//! Search configuration.
//!
//! Every knob the search driver and the playout policy consult lives
//! here, with the engine's canonical constants as defaults. The struct
//! deserializes from the binary's config file, so all fields carry
//! serde defaults.

use serde::Deserialize;

/// Runtime parameters for [`crate::Engine`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Playouts per genmove.
    pub n_sims: usize,

    /// Visits before a leaf is expanded. Lowered automatically when no
    /// large-pattern dictionary is available.
    pub expand_visits: u32,

    /// RAVE/visit crossover scale in the urgency blend.
    pub rave_equiv: f64,

    /// Log a tree summary every this many simulations.
    pub report_period: usize,

    /// Probability that capture suggestions are consulted in a playout.
    pub prob_heuristic_capture: f32,

    /// Probability that 3x3-pattern suggestions are consulted.
    pub prob_heuristic_pat3: f32,

    /// Probability of rejecting a heuristic suggestion that turns out to
    /// be a self-atari.
    pub prob_self_atari_reject_suggested: f64,

    /// Probability of rejecting a random self-atari move. Lower than the
    /// suggested rate so nakade moves stay possible.
    pub prob_self_atari_reject_random: f64,

    /// Resign when the best move's winrate falls below this.
    pub resign_threshold: f64,

    /// Early stop: winrate needed after 20% of the simulations.
    pub fastplay20_threshold: f64,

    /// Early stop: winrate needed after 5% of the simulations.
    pub fastplay5_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            n_sims: 1400,
            expand_visits: 8,
            rave_equiv: 3500.0,
            report_period: 200,
            prob_heuristic_capture: 0.9,
            prob_heuristic_pat3: 0.95,
            prob_self_atari_reject_suggested: 0.9,
            prob_self_atari_reject_random: 0.5,
            resign_threshold: 0.2,
            fastplay20_threshold: 0.8,
            fastplay5_threshold: 0.95,
        }
    }
}

impl SearchConfig {
    /// Fast settings for tests: few simulations, eager expansion.
    pub fn for_testing() -> Self {
        Self {
            n_sims: 60,
            expand_visits: 2,
            report_period: 10_000,
            ..Self::default()
        }
    }

    pub fn with_simulations(mut self, n: usize) -> Self {
        self.n_sims = n;
        self
    }

    pub fn with_expand_visits(mut self, v: u32) -> Self {
        self.expand_visits = v;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.n_sims, 1400);
        assert_eq!(config.expand_visits, 8);
        assert!((config.rave_equiv - 3500.0).abs() < 1e-9);
        assert!((config.resign_threshold - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_builders() {
        let config = SearchConfig::default()
            .with_simulations(100)
            .with_expand_visits(2);
        assert_eq!(config.n_sims, 100);
        assert_eq!(config.expand_visits, 2);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SearchConfig = toml::from_str("n_sims = 200").unwrap();
        assert_eq!(config.n_sims, 200);
        assert_eq!(config.expand_visits, 8, "unset fields keep defaults");
    }
}
