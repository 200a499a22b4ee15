#![deny(warnings)]

//! Core domain models and invariants for Rent Tycoon.
//!
//! This crate defines the serializable house/tenant/player types shared by the
//! simulation, the random factories that create them, and validation helpers
//! that guarantee basic invariants. All randomness flows through an explicit
//! [`rand::Rng`] so callers can run deterministically from a seed.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Inclusive display-id range for houses.
pub const HOUSE_ID_MIN: u16 = 100;
/// Inclusive upper bound of the house display-id range.
pub const HOUSE_ID_MAX: u16 = 999;
/// Inclusive house value range at creation, in whole currency units.
pub const HOUSE_VALUE_MIN: i64 = 10_000;
/// Inclusive upper bound of the house value range.
pub const HOUSE_VALUE_MAX: i64 = 19_999;
/// Maximum tenant damage propensity; damage is uniform over [0, this].
pub const TENANT_DAMAGE_MAX: u8 = 3;
/// Number of houses on the market when a simulation starts.
pub const STARTING_HOUSES: usize = 4;

/// Player cash balance at simulation start.
pub fn starting_money() -> Decimal {
    Decimal::new(50_000, 0)
}

/// Display identifier for a house, in [[`HOUSE_ID_MIN`], [`HOUSE_ID_MAX`]].
///
/// Ids are unique within a running simulation: the factory re-rolls on
/// collision, so an id addresses exactly one house.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HouseId(pub u16);

impl fmt::Display for HouseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixture that can break in a house. At most one item is broken at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrokenItem {
    Geyser,
    Window,
    Toilet,
    SepticTank,
    Gate,
}

impl BrokenItem {
    /// Every breakable fixture, in a fixed order.
    pub const ALL: [BrokenItem; 5] = [
        BrokenItem::Geyser,
        BrokenItem::Window,
        BrokenItem::Toilet,
        BrokenItem::SepticTank,
        BrokenItem::Gate,
    ];

    /// Pick a fixture uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for BrokenItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrokenItem::Geyser => "geyser",
            BrokenItem::Window => "window",
            BrokenItem::Toilet => "toilet",
            BrokenItem::SepticTank => "septic-tank",
            BrokenItem::Gate => "gate",
        };
        f.write_str(name)
    }
}

/// An occupant attached to a house.
///
/// `damage` is the tenant's damage propensity: each damage tick breaks
/// something with probability `damage / 10`. It is fixed when the tenancy is
/// created and never changes while the tenant stays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Damage propensity in [0, [`TENANT_DAMAGE_MAX`]].
    pub damage: u8,
}

impl Tenant {
    /// Create a tenant with uniform random damage propensity.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Tenant {
            damage: rng.gen_range(0..=TENANT_DAMAGE_MAX),
        }
    }
}

/// A rentable property with value, ownership, tenancy, and breakage state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct House {
    /// Unique display id.
    pub id: HouseId,
    /// Currently broken fixture, if any.
    pub broken_item: Option<BrokenItem>,
    /// Market value; set at creation and stable thereafter.
    pub value: Decimal,
    /// Whether the player owns this house.
    pub owner: bool,
    /// Current occupant, if any.
    pub tenant: Option<Tenant>,
}

impl House {
    /// Create a fresh house for the market.
    ///
    /// The id is re-rolled until it avoids every id in `taken`; the value is a
    /// whole amount in [[`HOUSE_VALUE_MIN`], [`HOUSE_VALUE_MAX`]]; the house
    /// starts unbroken and unowned, with a tenant present two times in three.
    pub fn random<R: Rng + ?Sized>(rng: &mut R, taken: &[HouseId]) -> Self {
        let id = loop {
            let candidate = HouseId(rng.gen_range(HOUSE_ID_MIN..=HOUSE_ID_MAX));
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        let value = Decimal::new(rng.gen_range(HOUSE_VALUE_MIN..=HOUSE_VALUE_MAX), 0);
        let tenant = if rng.gen_range(0..3) != 0 {
            Some(Tenant::random(rng))
        } else {
            None
        };
        House {
            id,
            broken_item: None,
            value,
            owner: false,
            tenant,
        }
    }

    /// Whether some fixture is currently broken.
    pub fn is_broken(&self) -> bool {
        self.broken_item.is_some()
    }

    /// Whether the house has no tenant.
    pub fn is_vacant(&self) -> bool {
        self.tenant.is_none()
    }
}

/// Full mutable simulation state: the housing market plus the player's wallet
/// and reputation. A single writer mutates this; readers take clones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Houses currently on the market, owned or not.
    pub houses: Vec<House>,
    /// Player cash balance.
    pub money: Decimal,
    /// Player reputation; scales rent income and is unbounded in both
    /// directions.
    pub rating: i32,
}

impl GameState {
    /// Initial state: [`STARTING_HOUSES`] random houses, starting money,
    /// rating zero.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut houses: Vec<House> = Vec::with_capacity(STARTING_HOUSES);
        for _ in 0..STARTING_HOUSES {
            let taken: Vec<HouseId> = houses.iter().map(|h| h.id).collect();
            houses.push(House::random(rng, &taken));
        }
        debug!(houses = houses.len(), "seeded initial market");
        GameState {
            houses,
            money: starting_money(),
            rating: 0,
        }
    }

    /// Look up a house by id.
    pub fn house(&self, id: HouseId) -> Option<&House> {
        self.houses.iter().find(|h| h.id == id)
    }

    /// Look up a house by id for mutation.
    pub fn house_mut(&mut self, id: HouseId) -> Option<&mut House> {
        self.houses.iter_mut().find(|h| h.id == id)
    }

    /// Ids currently in use, for collision-free house creation.
    pub fn taken_ids(&self) -> Vec<HouseId> {
        self.houses.iter().map(|h| h.id).collect()
    }
}

/// Simulation configuration parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for deterministic RNG.
    pub rng_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig { rng_seed: 42 }
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// House id outside [[`HOUSE_ID_MIN`], [`HOUSE_ID_MAX`]].
    #[error("house id {0} is out of range [100, 999]")]
    IdOutOfRange(u16),
    /// Two houses share an id.
    #[error("duplicate house id {0}")]
    DuplicateId(HouseId),
    /// House value outside the creation range.
    #[error("house value {0} is out of range [10000, 19999]")]
    ValueOutOfRange(Decimal),
    /// Tenant damage above [`TENANT_DAMAGE_MAX`].
    #[error("tenant damage {0} exceeds maximum 3")]
    DamageOutOfRange(u8),
    /// Player balance below zero.
    #[error("negative money balance")]
    NegativeMoney,
}

/// Validate a single house.
pub fn validate_house(house: &House) -> Result<(), ValidationError> {
    if !(HOUSE_ID_MIN..=HOUSE_ID_MAX).contains(&house.id.0) {
        return Err(ValidationError::IdOutOfRange(house.id.0));
    }
    let min = Decimal::new(HOUSE_VALUE_MIN, 0);
    let max = Decimal::new(HOUSE_VALUE_MAX, 0);
    if house.value < min || house.value > max {
        return Err(ValidationError::ValueOutOfRange(house.value));
    }
    if let Some(tenant) = &house.tenant {
        if tenant.damage > TENANT_DAMAGE_MAX {
            return Err(ValidationError::DamageOutOfRange(tenant.damage));
        }
    }
    Ok(())
}

/// Validate the whole state, including id uniqueness across houses.
pub fn validate_state(state: &GameState) -> Result<(), ValidationError> {
    if state.money < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    let mut seen: BTreeSet<HouseId> = BTreeSet::new();
    for house in &state.houses {
        validate_house(house)?;
        if !seen.insert(house.id) {
            return Err(ValidationError::DuplicateId(house.id));
        }
    }
    Ok(())
}
