//! Macros for building and returning [`crate::error::PitrError`] values.

/// Creates a [`crate::error::PitrError`] from an error kind, a description and an optional detail.
#[macro_export]
macro_rules! pitr_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::PitrError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::PitrError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Creates a [`crate::error::PitrError`] and returns it from the current function.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return Err($crate::pitr_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return Err($crate::pitr_error!($kind, $desc, $detail))
    };
}
