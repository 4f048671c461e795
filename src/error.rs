//! Error taxonomy shared by every component of the pipeline.

use core::fmt;

use crate::hal::HalError;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Failure reported by a pipeline operation.
///
/// Errors are plain values: they are returned, never raised, and a failing
/// bring-up stage hands its error straight back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Invalid index, geometry or buffer, detected before touching hardware.
    WrongParam,
    /// An IP block rejected its configuration.
    PeriphFailure,
    /// A command channel transaction failed.
    BusFailure,
    /// The panel controller answered with an unexpected identifier.
    UnknownComponent,
    /// The panel controller rejected its initialisation sequence.
    ComponentFailure,
    /// A bounded wait ran out of iterations.
    Timeout,
    /// The operation is not valid in the current lifecycle state.
    InvalidState,
}

impl Error {
    /// Maps a HAL failure that happened while configuring an IP block.
    pub(crate) fn periph(_: HalError) -> Self {
        Error::PeriphFailure
    }

    /// Maps a HAL failure that happened on the command bus.
    pub(crate) fn bus(_: HalError) -> Self {
        Error::BusFailure
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::WrongParam => "invalid parameter",
            Error::PeriphFailure => "peripheral configuration failed",
            Error::BusFailure => "command bus transaction failed",
            Error::UnknownComponent => "unknown panel controller",
            Error::ComponentFailure => "panel controller initialisation failed",
            Error::Timeout => "timed out",
            Error::InvalidState => "invalid state for operation",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::format;
    use std::string::ToString;

    use super::*;

    #[test]
    fn test_hal_error_mapping() {
        assert_eq!(Error::periph(HalError::Busy), Error::PeriphFailure);
        assert_eq!(Error::periph(HalError::Timeout), Error::PeriphFailure);
        assert_eq!(Error::bus(HalError::Error), Error::BusFailure);
        assert_eq!(Error::bus(HalError::Timeout), Error::BusFailure);
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(Error::WrongParam.to_string(), "invalid parameter");
        assert_eq!(Error::UnknownComponent.to_string(), "unknown panel controller");
        assert_eq!(format!("{}", Error::Timeout), "timed out");
    }

    #[test]
    fn test_debug_names() {
        assert_eq!(format!("{:?}", Error::BusFailure), "BusFailure");
        assert_eq!(format!("{:?}", Error::ComponentFailure), "ComponentFailure");
    }
}
