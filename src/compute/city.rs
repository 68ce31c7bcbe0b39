//! City grid model and random generation.
//!
//! A city is a `width x height` lattice. Every cell with an even coordinate
//! is road; odd/odd cells inside the border may hold a house, shop or office
//! or stay empty. Cells are stored x-major (`x * height + y`).

use log::{debug, warn};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::schema::{Building, BuildingKind, CityConfig, ConfigError, Position, floor_cents};

use super::evolution::chance;
use super::person::{Person, random_name};

/// True when `position` is a buildable cell of a `width x height` grid.
#[inline]
pub fn in_lattice(width: usize, height: usize, position: Position) -> bool {
    position.is_lattice()
        && position.x >= 1
        && position.y >= 1
        && (position.x as i64) <= width as i64 - 2
        && (position.y as i64) <= height as i64 - 2
}

/// Number of buildable cells of a `width x height` grid.
#[inline]
pub fn lattice_cells(width: usize, height: usize) -> usize {
    (width.saturating_sub(1) / 2) * (height.saturating_sub(1) / 2)
}

/// Largest odd coordinate that still lies inside the border, or `None` when
/// the extent is too small to hold any building.
#[inline]
pub fn max_lattice_coord(extent: usize) -> Option<i32> {
    if extent < 3 {
        return None;
    }
    let last = extent as i32 - 2;
    Some(if last % 2 == 1 { last } else { last - 1 })
}

/// Draw `base ± uniform(variation)`, rounded down to cents.
pub fn value_with_variation<R: Rng + ?Sized>(base: f64, variation: f64, rng: &mut R) -> f64 {
    if variation <= 0.0 {
        return floor_cents(base);
    }
    floor_cents(base + rng.gen_range(-variation..=variation))
}

/// Errors raised while building a city.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CityError {
    #[error("Invalid city configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("City dimensions must be non-zero, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error("{kind:?} at {position} lies off the building lattice of a {width}x{height} city")]
    OffLattice {
        kind: BuildingKind,
        position: Position,
        width: usize,
        height: usize,
    },
    #[error("Two buildings share position {0}")]
    Overlap(Position),
    #[error("{0:?} cannot be placed as a building")]
    NotPlaceable(BuildingKind),
}

/// A city: grid, buildings, residents and the economic constants they live by.
#[derive(Debug, Clone)]
pub struct City {
    width: usize,
    height: usize,
    cells: Vec<Option<Building>>,
    symbols: Vec<char>,
    buildings: Vec<Building>,
    houses: Vec<usize>,
    shops: Vec<usize>,
    offices: Vec<usize>,
    people: Vec<Person>,
    starting_money: f64,
    travel_cost: f64,
    fitness: f64,
}

impl City {
    /// Create a city with roads laid out and every lattice cell empty.
    pub fn empty(width: usize, height: usize) -> Result<Self, CityError> {
        if width == 0 || height == 0 {
            return Err(CityError::InvalidDimensions { width, height });
        }

        let mut cells = Vec::with_capacity(width * height);
        let mut symbols = Vec::with_capacity(width * height);
        for x in 0..width as i32 {
            for y in 0..height as i32 {
                if x % 2 == 0 || y % 2 == 0 {
                    cells.push(Some(Building::road(Position::new(x, y))));
                    symbols.push(BuildingKind::Road.symbol());
                } else {
                    cells.push(None);
                    symbols.push(BuildingKind::Empty.symbol());
                }
            }
        }

        Ok(Self {
            width,
            height,
            cells,
            symbols,
            buildings: Vec::new(),
            houses: Vec::new(),
            shops: Vec::new(),
            offices: Vec::new(),
            people: Vec::new(),
            starting_money: 0.0,
            travel_cost: 0.0,
            fitness: 0.0,
        })
    }

    /// Lay out the given buildings, in order, on an empty city.
    pub fn from_buildings(
        width: usize,
        height: usize,
        buildings: impl IntoIterator<Item = Building>,
    ) -> Result<Self, CityError> {
        let mut city = Self::empty(width, height)?;
        for building in buildings {
            city.place(building)?;
        }
        Ok(city)
    }

    /// Randomly generate a city, biasing buildings toward the center.
    ///
    /// Candidate cells are visited x-major. Each one draws, in order, for a
    /// house, a shop and an office, each draw succeeding with probability
    /// `exp(-bias * d^2 / (2 (w/4)^2 + (h/4)^2))` while that kind's quota is
    /// unmet. Generation stops once every quota is met; quotas can also end
    /// short when the draws run out of cells.
    pub fn generate<R: Rng + ?Sized>(config: &CityConfig, rng: &mut R) -> Result<Self, CityError> {
        config.validate()?;

        let mut city = Self::empty(config.width, config.height)?;
        let (width, height) = (config.width as f64, config.height as f64);
        let center = ((config.width / 2) as f64, (config.height / 2) as f64);
        let spread = 2.0 * (width / 4.0).powi(2) + (height / 4.0).powi(2);

        let mut placed = [0usize; 3];
        let quotas = [config.houses, config.shops, config.offices];

        'cells: for x in (1..config.width.saturating_sub(1)).step_by(2) {
            for y in (1..config.height.saturating_sub(1)).step_by(2) {
                if placed.iter().zip(&quotas).all(|(p, q)| p >= q) {
                    break 'cells;
                }

                let dx = x as f64 - center.0;
                let dy = y as f64 - center.1;
                let distance_sq = dx * dx + dy * dy;
                let probability = (-config.center_bias * distance_sq / spread).exp();

                let position = Position::new(x as i32, y as i32);
                let mut building = None;
                for (slot, kind) in BuildingKind::PLACEABLE.into_iter().enumerate() {
                    if placed[slot] < quotas[slot] && chance(rng, probability) {
                        placed[slot] += 1;
                        building = Some(match kind {
                            BuildingKind::Shop => Building::shop(
                                position,
                                value_with_variation(
                                    config.shop_average_spend,
                                    config.variation,
                                    rng,
                                ),
                                config.variation,
                            ),
                            BuildingKind::Office => Building::office(
                                position,
                                value_with_variation(
                                    config.office_average_salary,
                                    config.variation,
                                    rng,
                                ),
                                config.variation,
                            ),
                            _ => Building::house(position),
                        });
                        break;
                    }
                }

                if let Some(building) = building {
                    debug!("Placed {:?} at {}", building.kind(), position);
                    city.place(building)?;
                }
            }
        }

        if placed.iter().zip(&quotas).any(|(p, q)| p < q) {
            warn!(
                "City generated short of quota: houses {}/{}, shops {}/{}, offices {}/{}",
                placed[0], quotas[0], placed[1], quotas[1], placed[2], quotas[2]
            );
        }

        Ok(city)
    }

    /// Put a house, shop or office on its (empty, buildable) cell.
    pub fn place(&mut self, building: Building) -> Result<(), CityError> {
        let kind = building.kind();
        let position = building.position();

        if !BuildingKind::PLACEABLE.contains(&kind) {
            return Err(CityError::NotPlaceable(kind));
        }
        let cell = self
            .cell_index(position.x, position.y)
            .filter(|_| in_lattice(self.width, self.height, position))
            .ok_or(CityError::OffLattice {
                kind,
                position,
                width: self.width,
                height: self.height,
            })?;
        if self.cells[cell].is_some() {
            return Err(CityError::Overlap(position));
        }

        let index = self.buildings.len();
        match kind {
            BuildingKind::House => self.houses.push(index),
            BuildingKind::Shop => self.shops.push(index),
            BuildingKind::Office => self.offices.push(index),
            BuildingKind::Road | BuildingKind::Empty => {}
        }
        self.symbols[cell] = kind.symbol();
        self.cells[cell] = Some(building.clone());
        self.buildings.push(building);
        Ok(())
    }

    /// Create one resident per house. Offices are handed out round-robin;
    /// residents beyond the office count get a random office.
    pub fn populate<R: Rng + ?Sized>(&mut self, starting_money: f64, travel_cost: f64, rng: &mut R) {
        self.starting_money = starting_money;
        self.travel_cost = travel_cost;
        self.people.clear();
        self.people.reserve(self.houses.len());

        for (i, &house) in self.houses.iter().enumerate() {
            let workplace = match self.offices.get(i) {
                Some(&office) => Some(office),
                None => self.offices.choose(rng).copied(),
            };
            self.people.push(Person::new(
                random_name(rng),
                starting_money,
                travel_cost,
                house,
                self.buildings[house].position(),
                workplace,
            ));
        }
    }

    /// Put every resident back at home with the starting money and clear
    /// the fitness, so the next simulation repeats the first one exactly.
    pub fn reset_residents(&mut self) {
        for person in &mut self.people {
            person.reset(self.starting_money);
        }
        self.fitness = 0.0;
    }

    /// Every resident goes to work, shopping and home, in that order.
    pub fn simulate_day(&mut self) {
        let buildings = &self.buildings;
        let shops = &self.shops;
        for person in &mut self.people {
            person.live_day(buildings, shops);
        }
    }

    /// Simulate several consecutive days.
    pub fn simulate(&mut self, days: usize) {
        for _ in 0..days {
            self.simulate_day();
        }
    }

    // ------------------------------------------------------------------------
    // Read-only views
    // ------------------------------------------------------------------------

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Symbol grid indexed `[x][y]`.
    pub fn grid(&self) -> Vec<Vec<char>> {
        self.symbols
            .chunks(self.height)
            .map(|column| column.to_vec())
            .collect()
    }

    /// Symbol at a cell, `None` when out of range.
    pub fn symbol_at(&self, x: i32, y: i32) -> Option<char> {
        self.cell_index(x, y).map(|idx| self.symbols[idx])
    }

    /// Building (including roads) at a cell. Empty and out of range cells
    /// yield `None`.
    pub fn building_at(&self, x: i32, y: i32) -> Option<&Building> {
        self.cell_index(x, y).and_then(|idx| self.cells[idx].as_ref())
    }

    /// One string per x column, symbols separated by spaces.
    pub fn grid_rows(&self) -> Vec<String> {
        self.symbols
            .chunks(self.height)
            .map(|column| {
                column
                    .iter()
                    .map(char::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    /// Text rendering of the grid.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.width * (self.height * 2 + 1));
        for row in self.grid_rows() {
            out.push_str(&row);
            out.push('\n');
        }
        out
    }

    /// Houses, shops and offices in placement order.
    #[inline]
    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// Indices into [`City::buildings`] of the given kind.
    pub fn indices_of(&self, kind: BuildingKind) -> &[usize] {
        match kind {
            BuildingKind::House => &self.houses,
            BuildingKind::Shop => &self.shops,
            BuildingKind::Office => &self.offices,
            BuildingKind::Road | BuildingKind::Empty => &[],
        }
    }

    /// Buildings of the given kind.
    pub fn buildings_of(&self, kind: BuildingKind) -> impl Iterator<Item = &Building> {
        self.indices_of(kind).iter().map(|&idx| &self.buildings[idx])
    }

    #[inline]
    pub fn people(&self) -> &[Person] {
        &self.people
    }

    #[inline]
    pub fn starting_money(&self) -> f64 {
        self.starting_money
    }

    #[inline]
    pub fn travel_cost(&self) -> f64 {
        self.travel_cost
    }

    #[inline]
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    #[inline]
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    // ------------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------------

    /// Money held by all residents.
    pub fn total_money(&self) -> f64 {
        self.people.iter().map(Person::money).sum()
    }

    pub fn count_active(&self) -> usize {
        self.people.iter().filter(|p| p.is_active()).count()
    }

    pub fn count_inactive(&self) -> usize {
        self.people.len() - self.count_active()
    }

    /// The richest resident. Ties go to the first one.
    pub fn wealthiest_person(&self) -> Option<&Person> {
        self.people.iter().fold(None, |best: Option<&Person>, p| match best {
            Some(b) if b.money() >= p.money() => Some(b),
            _ => Some(p),
        })
    }

    #[inline]
    fn cell_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(x as usize * self.height + y as usize)
    }
}

impl AsRef<City> for City {
    fn as_ref(&self) -> &City {
        self
    }
}

impl AsMut<City> for City {
    fn as_mut(&mut self) -> &mut City {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn scenario_city() -> City {
        let mut city = City::from_buildings(
            5,
            5,
            [
                Building::house(Position::new(1, 1)),
                Building::office(Position::new(1, 3), 100.0, 0.0),
                Building::shop(Position::new(3, 1), 20.0, 0.0),
            ],
        )
        .unwrap();
        city.populate(100.0, 1.0, &mut StdRng::seed_from_u64(1));
        city
    }

    #[test]
    fn test_road_lattice() {
        let city = City::empty(5, 5).unwrap();
        for x in 0..5 {
            for y in 0..5 {
                let expected = if x % 2 == 0 || y % 2 == 0 { '+' } else { ' ' };
                assert_eq!(city.symbol_at(x, y), Some(expected));
            }
        }
        assert_eq!(city.building_at(0, 3).map(Building::kind), Some(BuildingKind::Road));
        assert!(city.building_at(1, 1).is_none());
        assert!(city.building_at(5, 0).is_none());
        assert!(city.symbol_at(-1, 0).is_none());
    }

    #[test]
    fn test_lattice_helpers() {
        assert_eq!(lattice_cells(5, 5), 4);
        assert_eq!(lattice_cells(6, 7), 6);
        assert_eq!(max_lattice_coord(5), Some(3));
        assert_eq!(max_lattice_coord(6), Some(3));
        assert_eq!(max_lattice_coord(2), None);
        assert!(in_lattice(5, 5, Position::new(3, 3)));
        assert!(!in_lattice(5, 5, Position::new(5, 3)));
        assert!(!in_lattice(5, 5, Position::new(2, 3)));
        assert!(!in_lattice(6, 6, Position::new(5, 1)));
    }

    #[test]
    fn test_place_rejects_bad_buildings() {
        let mut city = City::empty(5, 5).unwrap();
        assert!(matches!(
            city.place(Building::house(Position::new(2, 1))),
            Err(CityError::OffLattice { .. })
        ));
        city.place(Building::house(Position::new(1, 1))).unwrap();
        assert_eq!(
            city.place(Building::shop(Position::new(1, 1), 1.0, 0.0)),
            Err(CityError::Overlap(Position::new(1, 1)))
        );
        assert_eq!(
            city.place(Building::road(Position::new(3, 3))),
            Err(CityError::NotPlaceable(BuildingKind::Road))
        );
    }

    #[test]
    fn test_generate_capacity_error() {
        let config = CityConfig {
            width: 5,
            height: 5,
            houses: 3,
            shops: 1,
            offices: 1,
            ..Default::default()
        };
        let result = City::generate(&config, &mut StdRng::seed_from_u64(0));
        assert!(matches!(
            result,
            Err(CityError::Config(ConfigError::Capacity { .. }))
        ));
    }

    #[test]
    fn test_generate_invariants() {
        let config = CityConfig::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..5 {
            let city = City::generate(&config, &mut rng).unwrap();
            assert!(city.indices_of(BuildingKind::House).len() <= config.houses);
            assert!(city.indices_of(BuildingKind::Shop).len() <= config.shops);
            assert!(city.indices_of(BuildingKind::Office).len() <= config.offices);

            let mut seen = std::collections::HashSet::new();
            for building in city.buildings() {
                assert!(in_lattice(city.width(), city.height(), building.position()));
                assert!(seen.insert(building.position()));
                let p = building.position();
                assert_eq!(city.symbol_at(p.x, p.y), Some(building.symbol()));
            }
        }
    }

    #[test]
    fn test_generate_zero_bias_fills_quotas_in_order() {
        // Probability is 1 everywhere, so houses fill first, then shops, then offices.
        let config = CityConfig {
            width: 7,
            height: 7,
            houses: 4,
            shops: 3,
            offices: 2,
            center_bias: 0.0,
            variation: 0.0,
            ..Default::default()
        };
        let city = City::generate(&config, &mut StdRng::seed_from_u64(3)).unwrap();
        let kinds: Vec<_> = city.buildings().iter().map(Building::kind).collect();
        assert_eq!(kinds.len(), 9);
        assert!(kinds[..4].iter().all(|k| *k == BuildingKind::House));
        assert!(kinds[4..7].iter().all(|k| *k == BuildingKind::Shop));
        assert!(kinds[7..].iter().all(|k| *k == BuildingKind::Office));
        assert!(city.buildings_of(BuildingKind::Shop).all(|b| b.spend() == Some(40.0)));
    }

    #[test]
    fn test_value_with_variation_bounds() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let v = value_with_variation(100.0, 5.0, &mut rng);
            assert!((94.99..=105.0).contains(&v));
            assert!((v * 100.0 - (v * 100.0).round()).abs() < 1e-6);
        }
        assert_eq!(value_with_variation(40.0, 0.0, &mut rng), 40.0);
    }

    #[test]
    fn test_populate_office_assignment() {
        let mut city = City::from_buildings(
            9,
            5,
            [
                Building::house(Position::new(1, 1)),
                Building::house(Position::new(3, 1)),
                Building::house(Position::new(5, 1)),
                Building::office(Position::new(1, 3), 50.0, 0.0),
                Building::office(Position::new(3, 3), 50.0, 0.0),
                Building::shop(Position::new(5, 3), 5.0, 0.0),
            ],
        )
        .unwrap();
        city.populate(100.0, 1.0, &mut StdRng::seed_from_u64(5));

        let people = city.people();
        assert_eq!(people.len(), 3);
        assert_eq!(people[0].workplace(), Some(3));
        assert_eq!(people[1].workplace(), Some(4));
        assert!(matches!(people[2].workplace(), Some(3) | Some(4)));
        assert!(people.iter().all(|p| p.money() == 100.0));
    }

    #[test]
    fn test_scenario_one_day() {
        let mut city = scenario_city();
        city.simulate_day();
        assert_eq!(city.total_money(), 172.0);
        assert_eq!(city.count_active(), 1);
        assert_eq!(city.count_inactive(), 0);
        assert_eq!(city.wealthiest_person().map(Person::money), Some(172.0));
    }

    #[test]
    fn test_multi_day_carries_state() {
        let mut city = scenario_city();
        city.simulate(3);
        // Each day nets +72.
        assert_eq!(city.total_money(), 316.0);
    }

    #[test]
    fn test_reset_repeats_simulation() {
        let mut city = scenario_city();
        city.simulate(2);
        city.set_fitness(244.0);
        city.reset_residents();
        assert_eq!(city.total_money(), 100.0);
        assert_eq!(city.fitness(), 0.0);
        city.simulate_day();
        assert_eq!(city.total_money(), 172.0);
    }

    #[test]
    fn test_render() {
        let city = scenario_city();
        let rows = city.grid_rows();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1], "+ H + O +");
        assert_eq!(rows[3], "+ S +   +");
        assert!(city.render().ends_with('\n'));
        assert_eq!(city.grid()[1][3], 'O');
    }
}
