//! Form validation. Each check appends a field-level error; a form is
//! acceptable when the list comes back empty. Uniqueness checks go through
//! the injected [`UserDirectory`] so this layer never reaches back into the
//! application for live queries.

use anyhow::Result;

use dienynas_types::api::{CurrentUser, FieldError, LoginForm, RegisterForm};

/// Lookup interface the uniqueness checks run against.
pub trait UserDirectory {
    fn name_taken(&self, name: &str) -> Result<bool>;
    fn email_taken(&self, email: &str) -> Result<bool>;
}

impl UserDirectory for dienynas_db::Database {
    fn name_taken(&self, name: &str) -> Result<bool> {
        Ok(self.user_by_name(name)?.is_some())
    }

    fn email_taken(&self, email: &str) -> Result<bool> {
        Ok(self.user_by_email(email)?.is_some())
    }
}

pub fn validate_register(
    form: &RegisterForm,
    users: &dyn UserDirectory,
) -> Result<Vec<FieldError>> {
    let mut errors = Vec::new();

    require(&mut errors, "name", &form.name);
    require(&mut errors, "email", &form.email);
    require(&mut errors, "password", &form.password);

    if form.confirm_password != form.password {
        errors.push(FieldError::new("confirm_password", "passwords must match"));
    }

    if !form.name.trim().is_empty() && users.name_taken(&form.name)? {
        errors.push(FieldError::new("name", "this name is already taken"));
    }
    if !form.email.trim().is_empty() && users.email_taken(&form.email)? {
        errors.push(FieldError::new(
            "email",
            "this email address is already in use",
        ));
    }

    Ok(errors)
}

pub fn validate_login(form: &LoginForm) -> Vec<FieldError> {
    let mut errors = Vec::new();
    require(&mut errors, "email", &form.email);
    require(&mut errors, "password", &form.password);
    errors
}

/// Account updates only re-check uniqueness for values that actually
/// changed; keeping your own name/email is always allowed.
pub fn validate_account(
    name: &str,
    email: &str,
    current: &CurrentUser,
    users: &dyn UserDirectory,
) -> Result<Vec<FieldError>> {
    let mut errors = Vec::new();

    require(&mut errors, "name", name);
    require(&mut errors, "email", email);

    if !name.trim().is_empty() && name != current.name && users.name_taken(name)? {
        errors.push(FieldError::new("name", "this name is already taken"));
    }
    if !email.trim().is_empty() && email != current.email && users.email_taken(email)? {
        errors.push(FieldError::new(
            "email",
            "this email address is already in use",
        ));
    }

    Ok(errors)
}

pub fn validate_entry(body: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    require(&mut errors, "body", body);
    errors
}

fn require(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, "this field is required"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    struct StubDirectory;

    impl UserDirectory for StubDirectory {
        fn name_taken(&self, name: &str) -> Result<bool> {
            Ok(name == "jonas")
        }

        fn email_taken(&self, email: &str) -> Result<bool> {
            Ok(email == "jonas@example.com")
        }
    }

    fn register_form(name: &str, email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    fn jonas() -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            name: "jonas".into(),
            email: "jonas@example.com".into(),
            avatar: "default.jpg".into(),
        }
    }

    #[test]
    fn register_accepts_unused_name_and_email() {
        let form = register_form("petras", "petras@example.com", "slaptas", "slaptas");
        assert!(validate_register(&form, &StubDirectory).unwrap().is_empty());
    }

    #[test]
    fn register_requires_all_fields() {
        let form = register_form("", "  ", "", "");
        let errors = validate_register(&form, &StubDirectory).unwrap();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, ["name", "email", "password"]);
    }

    #[test]
    fn register_rejects_taken_email_against_its_own_field() {
        let form = register_form("petras", "jonas@example.com", "slaptas", "slaptas");
        let errors = validate_register(&form, &StubDirectory).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "email");
    }

    #[test]
    fn register_rejects_taken_name_against_its_own_field() {
        let form = register_form("jonas", "petras@example.com", "slaptas", "slaptas");
        let errors = validate_register(&form, &StubDirectory).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "name");
    }

    #[test]
    fn register_rejects_mismatched_passwords() {
        let form = register_form("petras", "petras@example.com", "slaptas", "kitoks");
        let errors = validate_register(&form, &StubDirectory).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "confirm_password");
    }

    #[test]
    fn login_requires_email_and_password() {
        let form = LoginForm {
            email: String::new(),
            password: String::new(),
            remember: false,
        };
        let errors = validate_login(&form);
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, ["email", "password"]);
    }

    #[test]
    fn account_update_skips_uniqueness_for_unchanged_values() {
        // jonas keeps his own (taken) name and email.
        let errors =
            validate_account("jonas", "jonas@example.com", &jonas(), &StubDirectory).unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn account_update_rejects_switching_to_a_taken_name() {
        let mut user = jonas();
        user.name = "petras".into();
        user.email = "petras@example.com".into();

        let errors = validate_account("jonas", "petras@example.com", &user, &StubDirectory).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "name");
    }

    #[test]
    fn entry_requires_a_body() {
        assert!(validate_entry("šiandien buvo gera diena").is_empty());
        let errors = validate_entry("   ");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "body");
    }
}
