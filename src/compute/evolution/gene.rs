//! Encoding cities into flat genes and decoding them back.

use rand::Rng;

use crate::compute::{City, CityError, in_lattice, lattice_cells};
use crate::schema::{BuildingKind, Gene, Position};

/// Reasons a gene cannot become a city.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeneError {
    #[error("Gene has no office")]
    MissingOffice,
    #[error("Gene has no shop")]
    MissingShop,
    #[error("Gene does not describe a valid city: {0}")]
    City(#[from] CityError),
}

impl Gene {
    /// Capture a city's layout and economy. Residents are left out.
    pub fn encode(city: &City) -> Self {
        Self {
            width: city.width(),
            height: city.height(),
            starting_money: city.starting_money(),
            travel_cost: city.travel_cost(),
            buildings: city.buildings().to_vec(),
        }
    }

    /// Rebuild the city and re-create its residents.
    ///
    /// Buildings are placed in gene order. Fitness starts at zero.
    pub fn decode<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<City, GeneError> {
        if self.count(BuildingKind::Office) == 0 {
            return Err(GeneError::MissingOffice);
        }
        if self.count(BuildingKind::Shop) == 0 {
            return Err(GeneError::MissingShop);
        }

        let mut city = City::from_buildings(self.width, self.height, self.buildings.iter().cloned())?;
        city.populate(self.starting_money, self.travel_cost, rng);
        Ok(city)
    }

    /// Number of buildings of a kind.
    pub fn count(&self, kind: BuildingKind) -> usize {
        self.buildings.iter().filter(|b| b.kind() == kind).count()
    }

    /// Buildable cells of this gene's grid.
    #[inline]
    pub fn lattice_capacity(&self) -> usize {
        lattice_cells(self.width, self.height)
    }

    #[inline]
    pub fn in_lattice(&self, position: Position) -> bool {
        in_lattice(self.width, self.height, position)
    }

    /// True when a building other than `skip` stands on `position`.
    pub fn is_occupied(&self, position: Position, skip: Option<usize>) -> bool {
        self.buildings
            .iter()
            .enumerate()
            .any(|(i, b)| Some(i) != skip && b.position() == position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::GenomeRng;
    use crate::schema::{Building, CityConfig};

    fn small_gene() -> Gene {
        Gene {
            width: 5,
            height: 5,
            starting_money: 100.0,
            travel_cost: 1.0,
            buildings: vec![
                Building::house(Position::new(1, 1)),
                Building::office(Position::new(1, 3), 100.0, 0.0),
                Building::shop(Position::new(3, 1), 20.0, 0.0),
            ],
        }
    }

    #[test]
    fn test_round_trip() {
        let mut rng = GenomeRng::new(11);
        let mut city = City::generate(&CityConfig::default(), &mut rng).unwrap();
        city.populate(100.0, 5.5, &mut rng);

        let gene = Gene::encode(&city);
        let decoded = gene.decode(&mut rng).unwrap();

        assert_eq!(decoded.width(), city.width());
        assert_eq!(decoded.height(), city.height());
        assert_eq!(decoded.starting_money(), 100.0);
        assert_eq!(decoded.travel_cost(), 5.5);
        assert_eq!(decoded.buildings().len(), city.buildings().len());
        for (a, b) in decoded.buildings().iter().zip(city.buildings()) {
            assert_eq!(a.kind(), b.kind());
            assert_eq!(a.position(), b.position());
            assert_eq!(a.payload(), b.payload());
        }
        assert_eq!(decoded.grid(), city.grid());
        assert_eq!(decoded.people().len(), city.indices_of(BuildingKind::House).len());
    }

    #[test]
    fn test_decode_populates_and_simulates() {
        let mut rng = GenomeRng::new(0);
        let mut city = small_gene().decode(&mut rng).unwrap();
        assert_eq!(city.people().len(), 1);
        assert_eq!(city.fitness(), 0.0);
        city.simulate_day();
        assert_eq!(city.total_money(), 172.0);
    }

    #[test]
    fn test_decode_requires_office_and_shop() {
        let mut rng = GenomeRng::new(0);

        let mut gene = small_gene();
        gene.buildings.retain(|b| b.kind() != BuildingKind::Office);
        assert_eq!(gene.decode(&mut rng).unwrap_err(), GeneError::MissingOffice);

        let mut gene = small_gene();
        gene.buildings.retain(|b| b.kind() != BuildingKind::Shop);
        assert_eq!(gene.decode(&mut rng).unwrap_err(), GeneError::MissingShop);
    }

    #[test]
    fn test_decode_rejects_overlap() {
        let mut gene = small_gene();
        gene.buildings.push(Building::house(Position::new(1, 1)));
        assert!(matches!(
            gene.decode(&mut GenomeRng::new(0)),
            Err(GeneError::City(CityError::Overlap(_)))
        ));
    }

    #[test]
    fn test_occupancy_helpers() {
        let gene = small_gene();
        assert_eq!(gene.lattice_capacity(), 4);
        assert!(gene.is_occupied(Position::new(1, 1), None));
        assert!(!gene.is_occupied(Position::new(1, 1), Some(0)));
        assert!(!gene.is_occupied(Position::new(3, 3), None));
        assert!(gene.in_lattice(Position::new(3, 3)));
        assert!(!gene.in_lattice(Position::new(4, 3)));
    }
}
