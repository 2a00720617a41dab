use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Role {
    Teacher,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
    pub password: String,
}

impl Account {
    pub fn new(login: &str, password: &str) -> Self {
        Self {
            login: login.to_string(),
            password: password.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub login: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid login or password")]
    InvalidCredentials,
}

pub trait Authenticator {
    fn authenticate(&self, role: Role, credentials: &Credentials) -> Result<Identity, AuthError>;
}

/// Checks credentials against the accounts listed in settings.
#[derive(Debug, Clone, Default)]
pub struct CredentialTable {
    teachers: Vec<Account>,
    admins: Vec<Account>,
}

impl CredentialTable {
    pub fn new(teachers: Vec<Account>, admins: Vec<Account>) -> Self {
        Self { teachers, admins }
    }
}

impl Authenticator for CredentialTable {
    fn authenticate(&self, role: Role, credentials: &Credentials) -> Result<Identity, AuthError> {
        let login = credentials.login.trim();
        if login.is_empty() {
            return Err(AuthError::MissingField(match role {
                Role::Teacher => "email",
                Role::Admin => "admin id",
            }));
        }
        if credentials.password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }

        let accounts = match role {
            Role::Teacher => &self.teachers,
            Role::Admin => &self.admins,
        };
        accounts
            .iter()
            .find(|a| a.login.eq_ignore_ascii_case(login) && a.password == credentials.password)
            .map(|a| Identity {
                login: a.login.clone(),
                role,
            })
            .ok_or(AuthError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CredentialTable {
        CredentialTable::new(
            vec![Account::new("smith@school.edu", "s3cret")],
            vec![Account::new("root", "hunter2")],
        )
    }

    fn creds(login: &str, password: &str) -> Credentials {
        Credentials {
            login: login.into(),
            password: password.into(),
        }
    }

    #[test]
    fn test_valid_teacher() {
        let id = table()
            .authenticate(Role::Teacher, &creds(" Smith@School.edu ", "s3cret"))
            .unwrap();
        assert_eq!(id.login, "smith@school.edu");
        assert_eq!(id.role, Role::Teacher);
    }

    #[test]
    fn test_roles_are_separate() {
        assert_eq!(
            table().authenticate(Role::Admin, &creds("smith@school.edu", "s3cret")),
            Err(AuthError::InvalidCredentials)
        );
        assert!(table()
            .authenticate(Role::Admin, &creds("root", "hunter2"))
            .is_ok());
    }

    #[test]
    fn test_wrong_password_fails() {
        assert_eq!(
            table().authenticate(Role::Teacher, &creds("smith@school.edu", "nope")),
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            table().authenticate(Role::Admin, &creds("", "x")),
            Err(AuthError::MissingField("admin id"))
        );
        assert_eq!(
            table().authenticate(Role::Teacher, &creds("a", "")),
            Err(AuthError::MissingField("password"))
        );
    }

    #[test]
    fn test_empty_table_never_succeeds() {
        assert_eq!(
            CredentialTable::default().authenticate(Role::Teacher, &creds("a", "b")),
            Err(AuthError::InvalidCredentials)
        );
    }
}
