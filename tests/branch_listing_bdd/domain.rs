//! Domain wrapper types for the branch listing BDD tests.

use std::fmt;
use std::str::FromStr;

/// Number of branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BranchCount(usize);

impl BranchCount {
    pub(crate) const fn value(self) -> usize {
        self.0
    }
}

impl FromStr for BranchCount {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<usize>().map(Self)
    }
}

impl fmt::Display for BranchCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Page size of a listing; always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageSize(usize);

impl PageSize {
    pub(crate) const fn value(self) -> usize {
        self.0
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.parse::<usize>().map_err(|error| error.to_string())?;
        if value == 0 {
            return Err("PageSize must be >= 1".to_owned());
        }

        Ok(Self(value))
    }
}

/// Number of HTTP requests observed or configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequestCount(u64);

impl RequestCount {
    pub(crate) const fn value(self) -> u64 {
        self.0
    }
}

impl FromStr for RequestCount {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

impl fmt::Display for RequestCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
