//! Owner references
//!
//! An owner reference names one consumer of a stored series: the owning
//! component's UUID and the name it uses for the series. The rendered form
//! `<uuid>__<name>` is what the reference ledger stores.

use crate::series::error::SeriesError;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerRef {
    pub owner: Uuid,
    pub name: String,
}

impl OwnerRef {
    pub fn new(owner: Uuid, name: impl Into<String>) -> Self {
        Self {
            owner,
            name: name.into(),
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.owner, SEPARATOR, self.name)
    }
}

impl FromStr for OwnerRef {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) = s
            .split_once(SEPARATOR)
            .ok_or_else(|| SeriesError::InvalidOwnerRef(s.to_string()))?;
        let owner = Uuid::parse_str(owner).map_err(|_| SeriesError::InvalidOwnerRef(s.to_string()))?;
        Ok(Self::new(owner, name))
    }
}
