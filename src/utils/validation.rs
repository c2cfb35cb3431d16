use regex::Regex;
use std::sync::OnceLock;

fn email_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

pub fn validate_email(email: &str) -> bool {
    email_pattern().is_some_and(|re| re.is_match(email))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCheck {
    pub errors: Vec<String>,
}

impl PasswordCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_password(password: &str) -> PasswordCheck {
    let mut errors = Vec::new();

    if password.chars().count() < 8 {
        errors.push("Password must be at least 8 characters long".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number".to_string());
    }

    PasswordCheck { errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("asha@example.com", true)]
    #[case("a@b.c", true)]
    #[case("asha@example", false)]
    #[case("asha example@x.com", false)]
    #[case("@example.com", false)]
    #[case("", false)]
    fn test_validate_email(#[case] email: &str, #[case] valid: bool) {
        assert_eq!(validate_email(email), valid);
    }

    #[test]
    fn test_strong_password() {
        assert!(validate_password("Study2025").is_valid());
    }

    #[test]
    fn test_weak_password_lists_every_problem() {
        let check = validate_password("abc");
        assert!(!check.is_valid());
        assert_eq!(
            check.errors,
            vec![
                "Password must be at least 8 characters long",
                "Password must contain at least one uppercase letter",
                "Password must contain at least one number",
            ]
        );
    }
}
