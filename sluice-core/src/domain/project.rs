//! Project domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::consumer::Consumer;

/// A project and the groups bound to it
///
/// Loaded once per request and never mutated during an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    /// Textual key used in URLs
    pub key: String,
    pub name: String,
    pub groups: Vec<GroupPermission>,
}

impl Project {
    /// Highest permission granted to the consumer through its groups
    pub fn permission_for(&self, consumer: &Consumer) -> Option<Permission> {
        self.groups
            .iter()
            .filter(|gp| consumer.groups.iter().any(|g| g.id == gp.group.id))
            .map(|gp| gp.permission)
            .max()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
}

/// Binding of a group to a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPermission {
    pub group: Group,
    pub permission: Permission,
}

/// Permission levels, ordered from weakest to strongest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    Read,
    ReadExecute,
    ReadWriteExecute,
}

impl Permission {
    /// Numeric level as stored in the database
    pub fn level(self) -> i32 {
        match self {
            Permission::Read => 4,
            Permission::ReadExecute => 5,
            Permission::ReadWriteExecute => 7,
        }
    }

    pub fn from_level(level: i32) -> Option<Self> {
        match level {
            4 => Some(Permission::Read),
            5 => Some(Permission::ReadExecute),
            7 => Some(Permission::ReadWriteExecute),
            _ => None,
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::Read => write!(f, "read"),
            Permission::ReadExecute => write!(f, "read-execute"),
            Permission::ReadWriteExecute => write!(f, "read-write-execute"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str) -> Group {
        Group {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_permission_for_picks_highest_shared_group() {
        let readers = group("readers");
        let admins = group("admins");
        let project = Project {
            id: Uuid::new_v4(),
            key: "PRJ".to_string(),
            name: "Project".to_string(),
            groups: vec![
                GroupPermission {
                    group: readers.clone(),
                    permission: Permission::Read,
                },
                GroupPermission {
                    group: admins.clone(),
                    permission: Permission::ReadWriteExecute,
                },
            ],
        };

        let consumer = Consumer {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            groups: vec![readers, admins],
        };
        assert_eq!(
            project.permission_for(&consumer),
            Some(Permission::ReadWriteExecute)
        );

        let outsider = Consumer {
            id: Uuid::new_v4(),
            username: "bob".to_string(),
            groups: vec![group("others")],
        };
        assert_eq!(project.permission_for(&outsider), None);
    }

    #[test]
    fn test_permission_levels() {
        for p in [
            Permission::Read,
            Permission::ReadExecute,
            Permission::ReadWriteExecute,
        ] {
            assert_eq!(Permission::from_level(p.level()), Some(p));
        }
        assert_eq!(Permission::from_level(6), None);
        assert!(Permission::Read < Permission::ReadWriteExecute);
    }
}
