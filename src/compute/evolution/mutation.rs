//! Mutation operators on genes.
//!
//! A mutated gene receives exactly one of five operators, picked uniformly.
//! Operators that touch buildings act on a sample of about a tenth of them,
//! drawn without replacement.

use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;
use rand::seq::index;

use crate::schema::{Building, BuildingKind, Gene, Payload, Position};

use super::rng::chance;

/// Half-width of the starting money perturbation.
pub const MONEY_DELTA: f64 = 5.0;
/// Half-width of the travel cost perturbation.
pub const TRAVEL_COST_DELTA: f64 = 0.1;
/// Half-width of the spend/salary perturbation.
pub const VALUE_DELTA: f64 = 5.0;
/// Share of buildings touched by building-level operators.
pub const BUILDING_FRACTION: f64 = 0.1;

const NEIGHBOURS: [(i32, i32); 4] = [(2, 0), (-2, 0), (0, 2), (0, -2)];

/// The five mutation operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    StartingMoney,
    TravelCost,
    Relocate,
    Retype,
    EconomicValue,
}

impl MutationKind {
    pub const ALL: [MutationKind; 5] = [
        MutationKind::StartingMoney,
        MutationKind::TravelCost,
        MutationKind::Relocate,
        MutationKind::Retype,
        MutationKind::EconomicValue,
    ];
}

/// `max(1, round(0.1 n))`, never more than `n`.
pub fn sample_size(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    ((n as f64 * BUILDING_FRACTION).round() as usize).clamp(1, n)
}

fn sample_buildings<R: Rng + ?Sized>(gene: &Gene, rng: &mut R) -> Vec<usize> {
    let n = gene.buildings.len();
    index::sample(rng, n, sample_size(n)).into_vec()
}

/// `starting_money += U[-5, 5]`, clamped at zero.
pub fn perturb_starting_money<R: Rng + ?Sized>(gene: &mut Gene, rng: &mut R) {
    gene.starting_money =
        (gene.starting_money + rng.gen_range(-MONEY_DELTA..=MONEY_DELTA)).max(0.0);
}

/// `travel_cost += U[-0.1, 0.1]`, clamped at zero.
pub fn perturb_travel_cost<R: Rng + ?Sized>(gene: &mut Gene, rng: &mut R) {
    gene.travel_cost =
        (gene.travel_cost + rng.gen_range(-TRAVEL_COST_DELTA..=TRAVEL_COST_DELTA)).max(0.0);
}

/// Move sampled buildings one lattice step to a free neighbouring cell.
/// Buildings boxed in on all sides stay put. Returns how many moved.
pub fn relocate_buildings<R: Rng + ?Sized>(gene: &mut Gene, rng: &mut R) -> usize {
    let mut moved = 0;
    for i in sample_buildings(gene, rng) {
        let from = gene.buildings[i].position();
        let free: Vec<Position> = NEIGHBOURS
            .iter()
            .map(|&(dx, dy)| Position::new(from.x + dx, from.y + dy))
            .filter(|&p| gene.in_lattice(p) && !gene.is_occupied(p, Some(i)))
            .collect();

        if let Some(&to) = free.choose(rng) {
            gene.buildings[i].set_position(to);
            moved += 1;
        }
    }
    moved
}

/// Turn sampled buildings into a random kind. Shops and offices copy their
/// payload from another building of the new kind, or start at zero.
pub fn retype_buildings<R: Rng + ?Sized>(gene: &mut Gene, rng: &mut R) -> usize {
    let sample = sample_buildings(gene, rng);
    for &i in &sample {
        let kind = BuildingKind::PLACEABLE[rng.gen_range(0..BuildingKind::PLACEABLE.len())];
        let donors: Vec<usize> = gene
            .buildings
            .iter()
            .enumerate()
            .filter(|&(j, b)| j != i && b.kind() == kind)
            .map(|(j, _)| j)
            .collect();
        let payload = donors
            .choose(rng)
            .map(|&j| gene.buildings[j].payload())
            .unwrap_or(Payload::None);

        let position = gene.buildings[i].position();
        gene.buildings[i] = Building::with_kind(kind, position, payload);
    }
    sample.len()
}

/// Shift the spend or salary of sampled buildings by `U[-5, 5]`, clamped at
/// zero. Houses in the sample are skipped. Returns how many changed.
pub fn perturb_economic_values<R: Rng + ?Sized>(gene: &mut Gene, rng: &mut R) -> usize {
    let mut changed = 0;
    for i in sample_buildings(gene, rng) {
        let building = &mut gene.buildings[i];
        if let Some(value) = building.economic_value() {
            let shifted = (value + rng.gen_range(-VALUE_DELTA..=VALUE_DELTA)).max(0.0);
            building.set_economic_value(shifted);
            changed += 1;
        }
    }
    changed
}

/// Apply one specific operator.
pub fn apply<R: Rng + ?Sized>(kind: MutationKind, gene: &mut Gene, rng: &mut R) {
    match kind {
        MutationKind::StartingMoney => perturb_starting_money(gene, rng),
        MutationKind::TravelCost => perturb_travel_cost(gene, rng),
        MutationKind::Relocate => {
            relocate_buildings(gene, rng);
        }
        MutationKind::Retype => {
            retype_buildings(gene, rng);
        }
        MutationKind::EconomicValue => {
            perturb_economic_values(gene, rng);
        }
    }
}

/// Apply one uniformly chosen operator.
pub fn mutate<R: Rng + ?Sized>(gene: &mut Gene, rng: &mut R) -> MutationKind {
    let kind = MutationKind::ALL[rng.gen_range(0..MutationKind::ALL.len())];
    apply(kind, gene, rng);
    kind
}

/// Mutate each gene with probability `probability`. Returns how many mutated.
pub fn mutate_population<R: Rng + ?Sized>(
    genes: &mut [Gene],
    probability: f64,
    rng: &mut R,
) -> usize {
    let mut mutated = 0;
    for gene in genes.iter_mut() {
        if chance(rng, probability) {
            let kind = mutate(gene, rng);
            debug!("Applied {kind:?} mutation");
            mutated += 1;
        }
    }
    mutated
}
