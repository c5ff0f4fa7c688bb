use kamping::datatype::{datatype_of, Equivalence, TypeCategory};
use kamping::environment::{Environment, InitMode};

const WIDTH: usize = 7;

#[derive(Copy, Clone, Equivalence)]
struct Sample {
    values: [f32; WIDTH],
    id: u64,
}

#[derive(Copy, Clone, Equivalence)]
struct Pair(i32, f64);

#[derive(Copy, Clone, Equivalence)]
struct Nested {
    pair: Pair,
    flags: [bool; 3],
    coordinates: (i16, i16),
}

#[derive(Copy, Clone, Equivalence)]
#[repr(i32)]
#[allow(dead_code)]
enum Color {
    Red = 1,
    Green = 2,
    Blue = 4,
}

#[test]
fn derived_categories() {
    assert_eq!(Sample::CATEGORY, TypeCategory::Struct);
    assert_eq!(Pair::CATEGORY, TypeCategory::Struct);
    assert_eq!(Nested::CATEGORY, TypeCategory::Struct);
    assert_eq!(Color::CATEGORY, TypeCategory::Integer);
}

/// The only test of this binary that talks to MPI.
#[test]
fn derived_datatypes_cover_every_field() {
    let _env = Environment::new(InitMode::InitFinalizeIfNecessary).unwrap();

    let sample = datatype_of::<Sample>();
    assert_eq!(sample.size().unwrap(), WIDTH * 4 + 8);

    let pair = datatype_of::<Pair>();
    assert_eq!(pair.size().unwrap(), 4 + 8);

    let nested = datatype_of::<Nested>();
    assert_eq!(nested.size().unwrap(), 12 + 3 + 4);

    assert_eq!(datatype_of::<Color>().size().unwrap(), 4);
    assert_eq!(datatype_of::<Color>(), datatype_of::<i32>());

    // the registry hands out the same committed type every time
    assert_eq!(datatype_of::<Sample>().as_raw(), sample.as_raw());
}
