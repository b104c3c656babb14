//! Property-based tests for the circuits using proptest

use circuits::{Point, SpawnCircuit, SpawnPublic, Terrain, World, WorldConfig};
use once_cell::sync::Lazy;
use proptest::prelude::*;
use r1cs::{check_satisfied, public_inputs, synthesize_witness};

static WORLD: Lazy<World> = Lazy::new(|| {
    World::new(WorldConfig { space_type_key: "7".into(), ..Default::default() }).unwrap()
});

fn terrain_strategy() -> impl Strategy<Value = Terrain> {
    (4u32..=14, any::<bool>(), any::<bool>()).prop_map(|(log, x_mirror, y_mirror)| Terrain {
        scale: 1 << log,
        x_mirror,
        y_mirror,
    })
}

fn spawn_public(p: Point, radius: u64, terrain: Terrain) -> SpawnPublic {
    SpawnPublic {
        radius,
        terrain,
        commitment: WORLD.commit(&p),
        bucket: WORLD.bucket(&p, &terrain).unwrap(),
    }
}

proptest! {
    // Each case synthesizes a full spawn witness.
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn spawn_witness_matches_off_circuit_values(
        x in -2000i64..2000,
        y in -2000i64..2000,
        terrain in terrain_strategy(),
    ) {
        let p = Point::new(x, y);
        let public = spawn_public(p, 3000, terrain);
        let rec = synthesize_witness(&SpawnCircuit::new(&WORLD, p, public)).unwrap();
        prop_assert!(check_satisfied(&rec).is_ok());
        prop_assert_eq!(public_inputs(&rec).unwrap(), public.to_field_elements());
    }

    #[test]
    fn spawn_is_provable_iff_strictly_inside(
        x in -100i64..100,
        y in -100i64..100,
        radius in 1u64..150,
    ) {
        let p = Point::new(x, y);
        let terrain = WORLD.config().terrain();
        let public = spawn_public(p, radius, terrain);
        let satisfied = synthesize_witness(&SpawnCircuit::new(&WORLD, p, public))
            .map(|rec| check_satisfied(&rec).is_ok())
            .unwrap_or(false);
        prop_assert_eq!(satisfied, p.norm_squared() < u128::from(radius) * u128::from(radius));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn buckets_stay_in_a_small_band(x in -(1i64 << 31)..(1i64 << 31), y in -(1i64 << 31)..(1i64 << 31), terrain in terrain_strategy()) {
        // every octave stays within D/√2, so 4·total/D lies in (-12, 12)
        let bucket = WORLD.bucket(&Point::new(x, y), &terrain).unwrap();
        prop_assert!((4..=28).contains(&bucket), "bucket {}", bucket);
    }

    #[test]
    fn mirroring_makes_buckets_symmetric(x in 0i64..(1 << 20), y in 0i64..(1 << 20), log in 4u32..=14) {
        let both = Terrain { scale: 1 << log, x_mirror: true, y_mirror: true };
        let a = WORLD.bucket(&Point::new(x, y), &both).unwrap();
        prop_assert_eq!(a, WORLD.bucket(&Point::new(-x, y), &both).unwrap());
        prop_assert_eq!(a, WORLD.bucket(&Point::new(x, -y), &both).unwrap());
        prop_assert_eq!(a, WORLD.bucket(&Point::new(-x, -y), &both).unwrap());
    }
}
