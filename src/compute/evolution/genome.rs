//! Network construction and mutation operators for evolutionary search.
//!
//! All randomness flows through an explicit [`NetworkRng`] handle so runs are
//! reproducible from a seed.

use rand::prelude::*;
use rand_distr::Uniform;

use crate::schema::{Network, NetworkConfig, Reaction, ReactionConfig, Species};

/// Mutation category applied by [`NetworkRng::mutate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    AddReaction,
    RemoveReaction,
    RateConstant,
}

/// Random number generator wrapper for network operations.
pub struct NetworkRng {
    rng: StdRng,
}

impl NetworkRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform value in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Generate a random reaction.
    ///
    /// With `num_reagents == 2` the second reactant and product are drawn from
    /// the alphabet plus "absent", so unary and binary sides are both possible.
    pub fn random_reaction(&mut self, config: &ReactionConfig) -> Reaction {
        let reactant_1 = self.rng.gen_range(0..config.num_species);
        let reactant_2 = self.optional_species(config);
        let product_1 = self.rng.gen_range(0..config.num_species);
        let product_2 = self.optional_species(config);

        Reaction {
            reactant_1,
            reactant_2,
            product_1,
            product_2,
            rate_constant: self
                .rng
                .gen_range(config.min_rate_constant..=config.max_rate_constant),
        }
    }

    fn optional_species(&mut self, config: &ReactionConfig) -> Option<Species> {
        if config.num_reagents < 2 {
            return None;
        }
        let s = self.rng.gen_range(0..=config.num_species);
        (s < config.num_species).then_some(s)
    }

    /// Scale a rate constant by a random percentage, clamped to the configured bounds.
    pub fn mutate_rate_constant(&mut self, reaction: &mut Reaction, config: &ReactionConfig) {
        let max = config.max_percent_rate_change;
        let percent = self.rng.sample(Uniform::new_inclusive(-max, max));
        let mutated = reaction.rate_constant * (1.0 + percent / 100.0);
        reaction.rate_constant = mutated.clamp(config.min_rate_constant, config.max_rate_constant);
    }

    /// Generate a random, unscored network.
    pub fn random_network(&mut self, config: &NetworkConfig) -> Network {
        let count = self
            .rng
            .gen_range(config.min_num_reactions..config.max_num_reactions);
        let reactions = (0..count)
            .map(|_| self.random_reaction(&config.reaction))
            .collect();

        Network::from_reactions(reactions, f64::INFINITY, config.capacity)
    }

    /// Append a random reaction. Returns `false` if the network is at capacity.
    pub fn add_reaction(&mut self, network: &mut Network, config: &NetworkConfig) -> bool {
        if network.len() >= config.capacity {
            return false;
        }
        let reaction = self.random_reaction(&config.reaction);
        network.push_reaction(reaction, config.capacity)
    }

    /// Mutate the rate constant of one random reaction. No-op on an empty network.
    pub fn modify_rate_constant(&mut self, network: &mut Network, config: &ReactionConfig) {
        if network.is_empty() {
            return;
        }
        let index = self.rng.gen_range(0..network.len());
        if let Some(reaction) = network.reaction_mut(index) {
            self.mutate_rate_constant(reaction, config);
        }
    }

    /// Apply exactly one mutation to a network.
    ///
    /// A single draw selects adding a reaction, removing one, or neither. If
    /// neither is selected, or the structural change is impossible, a rate
    /// constant is modified instead.
    pub fn mutate(&mut self, network: &mut Network, config: &NetworkConfig) -> Mutation {
        let draw = self.unit();

        let structural = if draw < config.prob_add_reaction {
            self.add_reaction(network, config)
                .then_some(Mutation::AddReaction)
        } else if draw < config.prob_add_reaction + config.prob_remove_reaction {
            network
                .remove_reaction()
                .then_some(Mutation::RemoveReaction)
        } else {
            None
        };

        structural.unwrap_or_else(|| {
            self.modify_rate_constant(network, &config.reaction);
            Mutation::RateConstant
        })
    }
}
