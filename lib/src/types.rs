use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// An authenticated cloud identity, e.g. `j.doe@example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Account(pub String);

impl Account {
    /// Login user on jump hosts: `@` and `.` become `_`, everything else is kept.
    pub fn jumphost_user(&self) -> String {
        self.0
            .chars()
            .map(|c| if c == '@' || c == '.' { '_' } else { c })
            .collect()
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Zone(pub String);

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Project {
    pub id: String,
    pub name: String,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Project {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn slug(&self) -> String {
        self.name.to_lowercase()
    }
}

/// A compute instance. Identity is `name`, within its project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Instance {
    pub name: String,
    pub zone: Zone,
    pub internal_ip: Ipv4Addr,
    pub external_ip: Option<Ipv4Addr>,
}

impl Instance {
    pub fn new(
        name: impl Into<String>,
        zone: impl Into<String>,
        internal_ip: Ipv4Addr,
        external_ip: Option<Ipv4Addr>,
    ) -> Instance {
        Instance {
            name: name.into(),
            zone: Zone(zone.into()),
            internal_ip,
            external_ip,
        }
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.name.split('-').collect()
    }
}
