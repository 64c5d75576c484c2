use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::llm::{EMPHASIS_CLAUSES, INSTRUCTION_VARIANTS};
use crate::models::{Exemplar, LabeledExample, ProgramConfiguration};

/// Kind of perturbation applied to produce a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    ResampleExemplars,
    RephraseInstructions,
    AddEmphasis,
    AdjustTemperature,
}

/// A candidate configuration and how it was derived
#[derive(Debug, Clone)]
pub struct Proposal {
    pub config: ProgramConfiguration,
    pub mutation: Mutation,
}

/// Source of candidate configurations for the optimization loop
pub trait ProposalStrategy: Send {
    fn propose(&mut self, current: &ProgramConfiguration, pool: &[LabeledExample]) -> Proposal;
}

const TEMPERATURE_STEPS: [f64; 4] = [-0.2, -0.1, 0.1, 0.2];

/// Random single-step perturbations, reproducible from a seed
pub struct SeededProposer {
    rng: StdRng,
    max_exemplars: usize,
}

impl SeededProposer {
    pub fn new(seed: u64, max_exemplars: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            max_exemplars,
        }
    }

    fn resample_exemplars(&mut self, config: &mut ProgramConfiguration, pool: &[LabeledExample]) {
        let upper = self.max_exemplars.min(pool.len());
        let count = self.rng.gen_range(1..=upper);
        config.exemplars = pool
            .choose_multiple(&mut self.rng, count)
            .map(Exemplar::from_example)
            .collect();
        config.hyperparameters.max_exemplars = self.max_exemplars;
    }

    fn rephrase_instructions(&mut self, config: &mut ProgramConfiguration) {
        let alternatives: Vec<&str> = INSTRUCTION_VARIANTS
            .iter()
            .copied()
            .filter(|v| !config.instructions.starts_with(v))
            .collect();
        if let Some(choice) = alternatives.choose(&mut self.rng) {
            config.instructions = (*choice).to_string();
        }
    }

    fn add_emphasis(&mut self, config: &mut ProgramConfiguration) {
        let unused: Vec<&str> = EMPHASIS_CLAUSES
            .iter()
            .copied()
            .filter(|c| !config.instructions.contains(c))
            .collect();
        if let Some(clause) = unused.choose(&mut self.rng) {
            config.instructions = format!("{} {}", config.instructions.trim_end(), clause);
        }
    }

    fn adjust_temperature(&mut self, config: &mut ProgramConfiguration) {
        let step = TEMPERATURE_STEPS[self.rng.gen_range(0..TEMPERATURE_STEPS.len())];
        let next = (config.hyperparameters.temperature + step).clamp(0.0, 1.0);
        config.hyperparameters.temperature = (next * 100.0).round() / 100.0;
    }
}

impl ProposalStrategy for SeededProposer {
    fn propose(&mut self, current: &ProgramConfiguration, pool: &[LabeledExample]) -> Proposal {
        let mut mutations = vec![
            Mutation::RephraseInstructions,
            Mutation::AddEmphasis,
            Mutation::AdjustTemperature,
        ];
        if !pool.is_empty() && self.max_exemplars > 0 {
            mutations.insert(0, Mutation::ResampleExemplars);
        }

        let mutation = mutations[self.rng.gen_range(0..mutations.len())];
        let mut config = current.clone();

        match mutation {
            Mutation::ResampleExemplars => self.resample_exemplars(&mut config, pool),
            Mutation::RephraseInstructions => self.rephrase_instructions(&mut config),
            Mutation::AddEmphasis => self.add_emphasis(&mut config),
            Mutation::AdjustTemperature => self.adjust_temperature(&mut config),
        }

        Proposal { config, mutation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractionResult, Transcript};

    fn pool() -> Vec<LabeledExample> {
        (0..5)
            .map(|i| {
                LabeledExample::new(
                    format!("m{}", i),
                    Transcript::new(format!("Person{} will write report {}.", i, i)),
                    ExtractionResult::new("Report.", [format!("Person{}: write report {}", i, i)], Vec::<String>::new()),
                    true,
                )
            })
            .collect()
    }

    #[test]
    fn test_same_seed_same_proposals() {
        let pool = pool();
        let base = ProgramConfiguration::default();
        let mut a = SeededProposer::new(7, 3);
        let mut b = SeededProposer::new(7, 3);

        for _ in 0..10 {
            let pa = a.propose(&base, &pool);
            let pb = b.propose(&base, &pool);
            assert_eq!(pa.mutation, pb.mutation);
            assert_eq!(pa.config, pb.config);
        }
    }

    #[test]
    fn test_proposals_stay_valid() {
        let pool = pool();
        let mut proposer = SeededProposer::new(42, 3);
        let mut current = ProgramConfiguration::default();

        for _ in 0..50 {
            let proposal = proposer.propose(&current, &pool);
            let validation = proposal.config.validate();
            assert!(validation.is_valid, "{:?}", validation.errors);
            assert!(proposal.config.exemplars.len() <= 3);
            current = proposal.config;
        }
    }

    #[test]
    fn test_no_resampling_without_pool() {
        let mut proposer = SeededProposer::new(1, 4);
        let base = ProgramConfiguration::default();

        for _ in 0..30 {
            let proposal = proposer.propose(&base, &[]);
            assert_ne!(proposal.mutation, Mutation::ResampleExemplars);
            assert!(proposal.config.exemplars.is_empty());
        }
    }

    #[test]
    fn test_temperature_stays_in_range() {
        let mut proposer = SeededProposer::new(3, 0);
        let mut config = ProgramConfiguration::default();

        for _ in 0..100 {
            proposer.adjust_temperature(&mut config);
            let t = config.hyperparameters.temperature;
            assert!((0.0..=1.0).contains(&t));
        }
    }
}
