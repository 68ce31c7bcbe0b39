//! Resident agents and their daily work, shop, home cycle.
//!
//! Every step first checks solvency. A resident that cannot pay for the next
//! leg of its day goes broke: its money is forced to zero and it stays
//! inactive for the rest of the run.

use log::{debug, trace};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::schema::{Building, PersonSnapshot, Position, floor_cents};

const FIRST_NAMES: &[&str] = &[
    "Ada", "Boris", "Clara", "Dimitar", "Elena", "Felix", "Greta", "Hugo", "Irina", "Jonas",
    "Kalina", "Luca", "Maya", "Nikola", "Olga", "Petar", "Quinn", "Rosa", "Stefan", "Tara",
    "Umar", "Vera", "Wen", "Yana", "Zoran",
];

const LAST_NAMES: &[&str] = &[
    "Angelov", "Baker", "Costa", "Dimitrov", "Evans", "Fischer", "Georgiev", "Hall", "Ivanova",
    "Jensen", "Kolev", "Lopez", "Marinov", "Novak", "Okafor", "Petrova", "Reyes", "Stoyanov",
    "Tanaka", "Usman", "Vasquez", "Walker", "Yilmaz", "Zhou",
];

/// Pick a random "First Last" name.
pub fn random_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Anon");
    let last = LAST_NAMES.choose(rng).copied().unwrap_or("Resident");
    format!("{first} {last}")
}

/// A simulated resident with a fixed home and workplace.
///
/// Home and workplace are indices into the owning city's building list.
#[derive(Debug, Clone)]
pub struct Person {
    name: String,
    money: f64,
    travel_cost: f64,
    position: Position,
    home: usize,
    home_position: Position,
    workplace: Option<usize>,
    active: bool,
}

impl Person {
    /// Create a resident standing at home. Negative starting money is
    /// clamped to zero so the solvency invariant holds from the start.
    pub fn new(
        name: String,
        money: f64,
        travel_cost: f64,
        home: usize,
        home_position: Position,
        workplace: Option<usize>,
    ) -> Self {
        Self {
            name,
            money: money.max(0.0),
            travel_cost,
            position: home_position,
            home,
            home_position,
            workplace,
            active: true,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn money(&self) -> f64 {
        self.money
    }

    #[inline]
    pub fn travel_cost(&self) -> f64 {
        self.travel_cost
    }

    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Index of the home building.
    #[inline]
    pub fn home(&self) -> usize {
        self.home
    }

    /// Index of the workplace building.
    #[inline]
    pub fn workplace(&self) -> Option<usize> {
        self.workplace
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Back home, solvent again with the given balance. Name and workplace
    /// are kept.
    pub fn reset(&mut self, money: f64) {
        self.money = money.max(0.0);
        self.position = self.home_position;
        self.active = true;
    }

    /// Run work, shopping and home steps in order.
    pub fn live_day(&mut self, buildings: &[Building], shops: &[usize]) {
        self.go_to_work(buildings);
        self.go_shopping(buildings, shops);
        self.go_home();
    }

    /// Travel from home to the workplace and collect the salary.
    pub fn go_to_work(&mut self, buildings: &[Building]) {
        if !self.check_solvent() {
            return;
        }

        let Some(office) = self.workplace.and_then(|idx| buildings.get(idx)) else {
            trace!("{} has no workplace, staying put", self.name);
            return;
        };

        let distance = self.home_position.manhattan(office.position());
        if !self.pay(self.travel_cost * distance as f64) {
            return;
        }

        self.position = office.position();
        self.money += office.salary().unwrap_or(0.0);
        self.money = floor_cents(self.money);
        trace!(
            "{} worked at {} ({} tiles), money now {:.2}",
            self.name,
            self.position,
            distance,
            self.money
        );
    }

    /// Travel to the nearest shop, then spend there.
    ///
    /// Ties in distance go to the first shop in `shops`. Without any shop
    /// this step does nothing.
    pub fn go_shopping(&mut self, buildings: &[Building], shops: &[usize]) {
        if !self.check_solvent() {
            return;
        }

        let Some(shop) = self.nearest(buildings, shops) else {
            trace!("No shop reachable for {}", self.name);
            return;
        };

        let distance = self.position.manhattan(shop.position());
        if !self.pay(self.travel_cost * distance as f64) {
            return;
        }
        self.position = shop.position();

        if !self.pay(shop.spend().unwrap_or(0.0)) {
            return;
        }
        self.money = floor_cents(self.money);
        trace!(
            "{} shopped at {}, money now {:.2}",
            self.name,
            self.position,
            self.money
        );
    }

    /// Travel back home.
    pub fn go_home(&mut self) {
        if !self.check_solvent() {
            return;
        }

        let distance = self.position.manhattan(self.home_position);
        if !self.pay(self.travel_cost * distance as f64) {
            return;
        }

        self.money = floor_cents(self.money);
        self.position = self.home_position;
    }

    /// Summary for reporting. Needs the owning city's buildings to resolve
    /// the workplace position.
    pub fn snapshot(&self, buildings: &[Building]) -> PersonSnapshot {
        PersonSnapshot {
            name: self.name.clone(),
            money: self.money,
            active: self.active,
            home: self.home_position,
            workplace: self
                .workplace
                .and_then(|idx| buildings.get(idx))
                .map(Building::position),
        }
    }

    fn nearest<'a>(&self, buildings: &'a [Building], candidates: &[usize]) -> Option<&'a Building> {
        let mut best: Option<(&Building, u32)> = None;
        for building in candidates.iter().filter_map(|&idx| buildings.get(idx)) {
            let distance = self.position.manhattan(building.position());
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((building, distance));
            }
        }
        best.map(|(building, _)| building)
    }

    fn check_solvent(&mut self) -> bool {
        if !self.active || self.money <= 0.0 {
            self.go_broke();
            return false;
        }
        true
    }

    /// Deduct `cost` if the resident stays strictly positive afterwards.
    fn pay(&mut self, cost: f64) -> bool {
        if self.money - cost <= 0.0 {
            self.go_broke();
            return false;
        }
        self.money -= cost;
        true
    }

    fn go_broke(&mut self) {
        if self.active {
            debug!("{} went broke", self.name);
        }
        self.money = 0.0;
        self.active = false;
    }
}
