//! Recombination of genes and repair of the collisions it creates.
//!
//! Crossover cuts building lists without looking at positions, so a child
//! can inherit two buildings on one cell. [`resolve_conflicts`] walks every
//! displaced building across the lattice until it finds a free cell.

use std::collections::HashSet;

use log::debug;
use rand::Rng;

use crate::compute::max_lattice_coord;
use crate::schema::{Building, CrossoverMethod, Gene, Position};

/// Step ceiling for a single displaced building.
pub const MAX_RESOLUTION_STEPS: usize = 1_000_000;

const DIRECTIONS: [(i32, i32); 4] = [(2, 0), (-2, 0), (0, 2), (0, -2)];

/// Crossover repair errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CrossoverError {
    #[error(
        "Gene holds {buildings} buildings but its {width}x{height} grid has only {capacity} lattice cells"
    )]
    Saturated {
        buildings: usize,
        capacity: usize,
        width: usize,
        height: usize,
    },
    #[error("No free cell found for the building at {position} after {steps} steps")]
    Unresolved { position: Position, steps: usize },
}

/// Draw a cut point in `[0, min(len1, len2))`, or 0 when either is empty.
fn cut_point<R: Rng + ?Sized>(len1: usize, len2: usize, rng: &mut R) -> usize {
    let common = len1.min(len2);
    if common == 0 { 0 } else { rng.gen_range(0..common) }
}

/// Child inheriting `meta`'s grid and economy with the given buildings.
fn child_of(meta: &Gene, buildings: Vec<Building>) -> Gene {
    Gene {
        width: meta.width,
        height: meta.height,
        starting_money: meta.starting_money,
        travel_cost: meta.travel_cost,
        buildings,
    }
}

fn splice(segments: &[&[Building]]) -> Vec<Building> {
    segments.iter().flat_map(|s| s.iter().cloned()).collect()
}

/// `A = P1[..c] + P2[c..]`, `B = P2[..c] + P1[c..]`.
pub fn one_point<R: Rng + ?Sized>(parent1: &Gene, parent2: &Gene, rng: &mut R) -> (Gene, Gene) {
    let (b1, b2) = (&parent1.buildings, &parent2.buildings);
    let c = cut_point(b1.len(), b2.len(), rng);
    (
        child_of(parent1, splice(&[&b1[..c], &b2[c..]])),
        child_of(parent2, splice(&[&b2[..c], &b1[c..]])),
    )
}

/// Swap the middle segment between two cut points.
pub fn two_point<R: Rng + ?Sized>(parent1: &Gene, parent2: &Gene, rng: &mut R) -> (Gene, Gene) {
    let (b1, b2) = (&parent1.buildings, &parent2.buildings);
    let a = cut_point(b1.len(), b2.len(), rng);
    let b = cut_point(b1.len(), b2.len(), rng);
    let (lo, hi) = (a.min(b), a.max(b));
    (
        child_of(parent1, splice(&[&b1[..lo], &b2[lo..hi], &b1[hi..]])),
        child_of(parent2, splice(&[&b2[..lo], &b1[lo..hi], &b2[hi..]])),
    )
}

/// Swap each index of the common prefix with probability one half. Tails
/// beyond the shorter list stay with their own parent.
pub fn uniform<R: Rng + ?Sized>(parent1: &Gene, parent2: &Gene, rng: &mut R) -> (Gene, Gene) {
    let mut a = parent1.buildings.clone();
    let mut b = parent2.buildings.clone();
    for i in 0..a.len().min(b.len()) {
        if rng.gen_bool(0.5) {
            std::mem::swap(&mut a[i], &mut b[i]);
        }
    }
    (child_of(parent1, a), child_of(parent2, b))
}

/// Recombine two parents and repair both children.
pub fn crossover_pair<R: Rng + ?Sized>(
    parent1: &Gene,
    parent2: &Gene,
    method: CrossoverMethod,
    rng: &mut R,
) -> Result<(Gene, Gene), CrossoverError> {
    let (mut a, mut b) = match method {
        CrossoverMethod::OnePoint => one_point(parent1, parent2, rng),
        CrossoverMethod::TwoPoint => two_point(parent1, parent2, rng),
        CrossoverMethod::Uniform => uniform(parent1, parent2, rng),
    };
    resolve_conflicts(&mut a, rng)?;
    resolve_conflicts(&mut b, rng)?;
    Ok((a, b))
}

/// A child gene with the pool indices of the parents it came from.
#[derive(Debug, Clone)]
pub struct Offspring {
    pub gene: Gene,
    pub parents: [usize; 2],
}

/// Breed `count` offspring from a parent pool.
///
/// Each pairing draws two distinct pool members and yields two children;
/// the surplus child of the last pairing is dropped.
pub fn crossover_population<R: Rng + ?Sized>(
    parents: &[Gene],
    method: CrossoverMethod,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Offspring>, CrossoverError> {
    let mut offspring = Vec::with_capacity(count + 1);
    if parents.is_empty() {
        return Ok(offspring);
    }

    while offspring.len() < count {
        let i = rng.gen_range(0..parents.len());
        let mut j = rng.gen_range(0..parents.len());
        while parents.len() > 1 && j == i {
            j = rng.gen_range(0..parents.len());
        }
        let (a, b) = crossover_pair(&parents[i], &parents[j], method, rng)?;
        offspring.push(Offspring {
            gene: a,
            parents: [i, j],
        });
        offspring.push(Offspring {
            gene: b,
            parents: [j, i],
        });
    }

    offspring.truncate(count);
    Ok(offspring)
}

/// Clamp a coordinate to the nearest odd value in `[1, max]`.
#[inline]
fn clamp_odd(value: i32, max: i32) -> i32 {
    let v = value.clamp(1, max);
    if v % 2 == 0 { v - 1 } else { v }
}

/// Move every building that sits off the lattice or on a cell already held
/// by an earlier building. Returns how many buildings moved.
pub fn resolve_conflicts<R: Rng + ?Sized>(
    gene: &mut Gene,
    rng: &mut R,
) -> Result<usize, CrossoverError> {
    if gene.buildings.is_empty() {
        return Ok(0);
    }

    let capacity = gene.lattice_capacity();
    let saturated = CrossoverError::Saturated {
        buildings: gene.buildings.len(),
        capacity,
        width: gene.width,
        height: gene.height,
    };
    if gene.buildings.len() > capacity {
        return Err(saturated);
    }
    let (Some(max_x), Some(max_y)) = (max_lattice_coord(gene.width), max_lattice_coord(gene.height))
    else {
        return Err(saturated);
    };
    let clamp = |p: Position| Position::new(clamp_odd(p.x, max_x), clamp_odd(p.y, max_y));

    let mut taken = HashSet::with_capacity(gene.buildings.len());
    let mut moved = 0;
    for building in &mut gene.buildings {
        let start = building.position();
        let mut position = clamp(start);
        let mut steps = 0;
        while taken.contains(&position) {
            if steps >= MAX_RESOLUTION_STEPS {
                return Err(CrossoverError::Unresolved {
                    position: start,
                    steps,
                });
            }
            let (dx, dy) = DIRECTIONS[rng.gen_range(0..DIRECTIONS.len())];
            position = clamp(Position::new(position.x + dx, position.y + dy));
            steps += 1;
        }

        if position != start {
            debug!("Moved {:?} from {} to {} ({} steps)", building.kind(), start, position, steps);
            building.set_position(position);
            moved += 1;
        }
        taken.insert(position);
    }

    Ok(moved)
}
