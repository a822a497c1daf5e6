use std::fmt;
use std::str::FromStr;

use shared::error::{Error, Result};

/// Transmission direction of a media section.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Sendrecv,
    Sendonly,
    Recvonly,
    Inactive,
}

pub(crate) const DIRECTIONS: [&str; 4] = ["inactive", "sendonly", "recvonly", "sendrecv"];

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Direction::Sendrecv => "sendrecv",
            Direction::Sendonly => "sendonly",
            Direction::Recvonly => "recvonly",
            Direction::Inactive => "inactive",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "sendrecv" => Ok(Direction::Sendrecv),
            "sendonly" => Ok(Direction::Sendonly),
            "recvonly" => Ok(Direction::Recvonly),
            "inactive" => Ok(Direction::Inactive),
            _ => Err(Error::ErrSdpInvalidValue(raw.to_owned())),
        }
    }
}
