use std::sync::OnceLock;

use regex::Regex;

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const USERNAME_PATTERN: &str = r"^[\w.@+-]+$";

static EMAIL: OnceLock<Regex> = OnceLock::new();
static USERNAME: OnceLock<Regex> = OnceLock::new();

fn matches(cell: &'static OnceLock<Regex>, pattern: &'static str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern"))
        .is_match(value)
}

pub fn is_email(value: &str) -> bool {
    matches(&EMAIL, EMAIL_PATTERN, value)
}

/// Letters, digits and `@ . + - _`.
pub fn is_username(value: &str) -> bool {
    matches(&USERNAME, USERNAME_PATTERN, value)
}

/// Length in characters, not bytes.
pub fn shorter_than(value: &str, min: usize) -> bool {
    value.trim().chars().count() < min
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_compile() {
        for pattern in [EMAIL_PATTERN, USERNAME_PATTERN] {
            assert!(Regex::new(pattern).is_ok(), "{pattern}");
        }
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("alice@campus.edu"));
        assert!(is_email("first.last+jobs@mail.campus.edu"));
        assert!(!is_email("alice@"));
        assert!(!is_email("campus.edu"));
    }

    #[test]
    fn usernames_reject_spaces() {
        assert!(is_username("alice_01"));
        assert!(!is_username("alice smith"));
    }

    #[test]
    fn length_counts_characters() {
        assert!(!shorter_than("Физика", 3));
        assert!(shorter_than("  ab ", 3));
    }
}
