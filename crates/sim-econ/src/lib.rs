#![deny(warnings)]

//! Economic helpers for Rent Tycoon: rent due per house, the reputation
//! multiplier, and the contractor cost roll.
//!
//! All money math uses [`rust_decimal::Decimal`] with no rounding, so balances
//! are exactly reproducible from a seed. The cost roll is a pure function of
//! an injected RNG so tests can force deterministic values.

use rand::Rng;
use rust_decimal::Decimal;
use sim_core::{GameState, House};

/// Rent multiplier derived from the player's rating: `1 + rating/10`.
///
/// Example:
/// assert_eq!(rating_multiplier(3), Decimal::new(13, 1)); // 1.3
pub fn rating_multiplier(rating: i32) -> Decimal {
    Decimal::ONE + Decimal::new(rating as i64, 1)
}

/// Rent due from a single house for one collection tick.
///
/// Vacant houses pay nothing. A broken house pays base value only (the upset
/// tenant withholds the reputation bonus); an intact tenancy pays
/// `value * (1 + rating/10)`. A deeply negative rating would make the
/// multiplier negative; rent is floored at zero so collection can never cost
/// the player money.
pub fn rent_due(house: &House, rating: i32) -> Decimal {
    match (&house.tenant, house.is_broken()) {
        (None, _) => Decimal::ZERO,
        (Some(_), true) => house.value,
        (Some(_), false) => (house.value * rating_multiplier(rating)).max(Decimal::ZERO),
    }
}

/// Total rent due across the whole market, using the rating as of this call.
pub fn total_rent_due(state: &GameState) -> Decimal {
    state
        .houses
        .iter()
        .map(|house| rent_due(house, state.rating))
        .sum()
}

/// Roll a contractor callout cost: uniform over {100, 200, ..., 1000}.
///
/// Rolled once per fix attempt and discarded if the attempt is rejected.
pub fn roll_repair_cost<R: Rng + ?Sized>(rng: &mut R) -> Decimal {
    Decimal::new(rng.gen_range(0..10) * 100 + 100, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{BrokenItem, HouseId, Tenant};

    fn house(value: i64, tenant: Option<Tenant>, broken: Option<BrokenItem>) -> House {
        House {
            id: HouseId(500),
            broken_item: broken,
            value: Decimal::new(value, 0),
            owner: true,
            tenant,
        }
    }

    #[test]
    fn multiplier_is_exact_decimal() {
        assert_eq!(rating_multiplier(0), Decimal::ONE);
        assert_eq!(rating_multiplier(3), Decimal::new(13, 1));
        assert_eq!(rating_multiplier(-5), Decimal::new(5, 1));
    }

    #[test]
    fn vacant_house_pays_nothing() {
        let h = house(15_000, None, Some(BrokenItem::Gate));
        assert_eq!(rent_due(&h, 10), Decimal::ZERO);
    }

    #[test]
    fn broken_house_pays_base_value() {
        let h = house(15_000, Some(Tenant { damage: 1 }), Some(BrokenItem::Toilet));
        assert_eq!(rent_due(&h, 7), Decimal::new(15_000, 0));
    }

    #[test]
    fn intact_tenancy_pays_multiplied_rent() {
        let h = house(10_000, Some(Tenant { damage: 0 }), None);
        // 10000 * 1.3 = 13000, exactly.
        assert_eq!(rent_due(&h, 3), Decimal::new(13_000, 0));
    }

    #[test]
    fn deeply_negative_rating_floors_rent_at_zero() {
        let h = house(10_000, Some(Tenant { damage: 0 }), None);
        assert_eq!(rent_due(&h, -11), Decimal::ZERO);
        assert_eq!(rent_due(&h, -10), Decimal::ZERO);
        assert_eq!(rent_due(&h, -9), Decimal::new(1_000, 0));
    }

    #[test]
    fn cost_roll_is_deterministic_from_seed() {
        let mut a = ChaCha8Rng::seed_from_u64(11);
        let mut b = ChaCha8Rng::seed_from_u64(11);
        assert_eq!(roll_repair_cost(&mut a), roll_repair_cost(&mut b));
    }

    proptest! {
        #[test]
        fn rent_is_never_negative(value in 10_000i64..=19_999, rating in -100i32..100) {
            let h = house(value, Some(Tenant { damage: 2 }), None);
            prop_assert!(rent_due(&h, rating) >= Decimal::ZERO);
        }

        #[test]
        fn multiplier_monotonic_in_rating(rating in -100i32..100) {
            prop_assert!(rating_multiplier(rating) < rating_multiplier(rating + 1));
        }

        #[test]
        fn cost_roll_is_a_round_hundred_in_range(seed in any::<u64>()) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let cost = roll_repair_cost(&mut rng);
            prop_assert!(cost >= Decimal::new(100, 0));
            prop_assert!(cost <= Decimal::new(1_000, 0));
            prop_assert_eq!(cost % Decimal::new(100, 0), Decimal::ZERO);
        }
    }
}
