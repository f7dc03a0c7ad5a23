use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ApprovalError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct EmployeeId(pub String);

impl EmployeeId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EmployeeId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for EmployeeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Employee,
    Manager,
    Admin,
}

impl std::str::FromStr for Role {
    type Err = ApprovalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "employee" => Ok(Self::Employee),
            "manager" => Ok(Self::Manager),
            "admin" => Ok(Self::Admin),
            other => Err(ApprovalError::Validation(format!(
                "unsupported role `{other}` (expected employee|manager|admin)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub manager: Option<EmployeeId>,
}

impl Employee {
    pub fn validate(&self) -> Result<(), ApprovalError> {
        if self.id.is_blank() {
            return Err(ApprovalError::Validation("employee id must not be blank".to_string()));
        }
        if !self.email.contains('@') {
            return Err(ApprovalError::Validation(format!(
                "employee `{}` has an invalid email `{}`",
                self.id, self.email
            )));
        }
        if self.manager.as_ref() == Some(&self.id) {
            return Err(ApprovalError::Validation(format!(
                "employee `{}` cannot be their own manager",
                self.id
            )));
        }
        Ok(())
    }
}
