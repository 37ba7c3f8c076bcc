//! Contract party roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ContractError;

/// One of the three contract parties. String-serialized lowercase, both in
/// profile box values and in the transaction wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Producer,
    Hub,
    Investor,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Producer, Role::Hub, Role::Investor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Hub => "hub",
            Role::Investor => "investor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "producer" => Ok(Role::Producer),
            "hub" => Ok(Role::Hub),
            "investor" => Ok(Role::Investor),
            other => Err(ContractError::UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_lowercase_strings() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
    }

    #[test]
    fn unknown_role_rejected() {
        assert!(matches!(
            "auditor".parse::<Role>(),
            Err(ContractError::UnknownRole(_))
        ));
        assert!("Producer".parse::<Role>().is_err()); // case-sensitive
    }
}
