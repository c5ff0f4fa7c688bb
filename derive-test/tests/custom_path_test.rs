use renamed::datatype::{Equivalence, TypeCategory};

/// Compiles only if `#[kamping(crate = ...)]` makes the generated code refer to the renamed
/// dependency.
#[test]
fn derive_custom_path() {
    #[derive(Copy, Clone, Equivalence)]
    #[kamping(crate = "::renamed")]
    struct Particle {
        position: [f64; 3],
        charge: i32,
    }

    #[derive(Copy, Clone, Equivalence)]
    #[kamping(crate = "::renamed")]
    #[repr(u8)]
    #[allow(dead_code)]
    enum Spin {
        Up,
        Down,
    }

    assert_eq!(Particle::CATEGORY, TypeCategory::Struct);
    assert_eq!(Spin::CATEGORY, TypeCategory::Integer);
}
