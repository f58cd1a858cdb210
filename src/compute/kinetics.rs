//! Mass-action kinetics for reaction networks.

use crate::schema::Network;

use super::OdeSystem;

/// A network's reactions viewed as an ODE system over species concentrations.
///
/// Each reaction fires at `k * [R1] * [R2]` (or `k * [R1]` when unary). Every
/// reactant slot loses and every product slot gains that rate, so `A + A`
/// consumes A twice as fast as it fires.
pub struct MassActionSystem<'a> {
    network: &'a Network,
    num_species: usize,
}

impl<'a> MassActionSystem<'a> {
    pub fn new(network: &'a Network, num_species: usize) -> Self {
        Self {
            network,
            num_species,
        }
    }

    /// Firing rate of every reaction at concentrations `y`.
    pub fn reaction_rates(&self, y: &[f64]) -> Vec<f64> {
        self.network
            .reactions()
            .iter()
            .map(|r| r.rate_constant * r.reactants().map(|s| y[s]).product::<f64>())
            .collect()
    }
}

impl OdeSystem for MassActionSystem<'_> {
    fn dimension(&self) -> usize {
        self.num_species
    }

    fn derivatives(&self, _t: f64, y: &[f64], dy: &mut [f64]) {
        dy.fill(0.0);

        for reaction in self.network.reactions() {
            let rate = reaction.rate_constant * reaction.reactants().map(|s| y[s]).product::<f64>();
            for s in reaction.reactants() {
                dy[s] -= rate;
            }
            for s in reaction.products() {
                dy[s] += rate;
            }
        }
    }
}
