//! Checked integer conversions between Rust sizes and the `int` counts of the MPI interface

use std::any::type_name;
use std::fmt::Display;

use conv::{ConvUtil, ValueInto};

use crate::error::{Error, Result};

/// Converts `value` to `To`, panicking if it does not fit.
///
/// Use for values whose range is an invariant of the caller (e.g. a buffer length that MPI has
/// already accepted as a count).
pub fn asserting_cast<To, From>(value: From) -> To
where
    From: ValueInto<To> + Display + Copy,
{
    match value.value_as::<To>() {
        Ok(converted) => converted,
        Err(_) => panic!(
            "value {} cannot be represented as {}",
            value,
            type_name::<To>()
        ),
    }
}

/// Converts `value` to `To`, returning [`Error::Range`] if it does not fit.
pub fn throwing_cast<To, From>(value: From) -> Result<To>
where
    From: ValueInto<To> + Display + Copy,
{
    value.value_as::<To>().map_err(|_| Error::Range {
        value: value.to_string(),
        target: type_name::<To>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_range_values_convert() {
        let x: i32 = asserting_cast(42usize);
        assert_eq!(x, 42);
        let y: usize = throwing_cast(7i32).unwrap();
        assert_eq!(y, 7);
    }

    #[test]
    fn out_of_range_value_is_a_range_error() {
        let res: Result<i32> = throwing_cast(u64::MAX);
        match res {
            Err(Error::Range { target, .. }) => assert_eq!(target, "i32"),
            other => panic!("unexpected result {:?}", other),
        }
        let negative: Result<usize> = throwing_cast(-1i32);
        assert!(negative.is_err());
    }

    #[test]
    #[should_panic(expected = "cannot be represented")]
    fn asserting_cast_panics_on_overflow() {
        let _: u8 = asserting_cast(300i32);
    }
}
