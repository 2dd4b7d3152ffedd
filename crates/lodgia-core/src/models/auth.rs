//! Requester identity passed down from the API boundary.

use std::str::FromStr;

/// Role of the authenticated requester. `Superadmin` bypasses the ownership
/// filter when resolving owner entities; `Admin` is scoped to its own
/// `owner_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Superadmin,
    Admin,
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SUPERADMIN" => Ok(UserRole::Superadmin),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("superadmin".parse::<UserRole>(), Ok(UserRole::Superadmin));
        assert_eq!("Admin".parse::<UserRole>(), Ok(UserRole::Admin));
        assert!("guest".parse::<UserRole>().is_err());
    }
}
