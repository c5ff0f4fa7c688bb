//! Assertion levels
//!
//! Internal consistency checks are grouped by cost. The level compiled into the crate is selected
//! with the `assertions-*` cargo features; checks above that level are removed entirely.

/// Cost classes of internal checks, cheapest first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssertionLevel {
    /// Constant time checks on local state.
    Light,
    /// Checks linear in the size of local arguments.
    Normal,
    /// Checks which need a constant amount of communication.
    LightCommunication,
    /// Checks which communicate data proportional to the arguments.
    HeavyCommunication,
    /// Everything.
    Heavy,
}

/// The level this crate was built with.
pub const ASSERTION_LEVEL: AssertionLevel = if cfg!(feature = "assertions-heavy") {
    AssertionLevel::Heavy
} else if cfg!(feature = "assertions-heavy-communication") {
    AssertionLevel::HeavyCommunication
} else if cfg!(feature = "assertions-light-communication") {
    AssertionLevel::LightCommunication
} else if cfg!(feature = "assertions-light") {
    AssertionLevel::Light
} else {
    AssertionLevel::Normal
};

impl AssertionLevel {
    /// Whether checks of this level are compiled in.
    pub const fn is_enabled(self) -> bool {
        self as u8 <= ASSERTION_LEVEL as u8
    }
}

/// Panics with the formatted message if the assertion level is enabled and the condition fails.
///
/// ```
/// kamping::kassert!(kamping::AssertionLevel::Light, 1 + 1 == 2, "arithmetic is broken");
/// ```
#[macro_export]
macro_rules! kassert {
    ($level:expr, $cond:expr $(,)?) => {
        $crate::kassert!($level, $cond, "assertion failed: {}", stringify!($cond))
    };
    ($level:expr, $cond:expr, $($arg:tt)+) => {
        if $crate::AssertionLevel::is_enabled($level) && !$cond {
            panic!($($arg)+);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_cost() {
        assert!(AssertionLevel::Light < AssertionLevel::Normal);
        assert!(AssertionLevel::Normal < AssertionLevel::LightCommunication);
        assert!(AssertionLevel::LightCommunication < AssertionLevel::HeavyCommunication);
        assert!(AssertionLevel::HeavyCommunication < AssertionLevel::Heavy);
    }

    #[test]
    fn light_checks_are_always_enabled() {
        assert!(AssertionLevel::Light.is_enabled());
    }

    #[test]
    #[should_panic(expected = "broken")]
    fn failing_light_assertion_panics() {
        kassert!(AssertionLevel::Light, 1 > 2, "broken");
    }

    #[test]
    fn passing_assertion_is_silent() {
        kassert!(AssertionLevel::Heavy, true);
    }
}
