//! Input rules checked before anything reaches the server.

/// Username rule for registration: letters, digits and underscores, at
/// least three characters. The charset check runs first, so `ab!` is
/// reported as a charset problem rather than a length problem.
pub fn username(name: &str) -> Result<(), &'static str> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Username can only contain letters, numbers, and underscores!");
    }
    if name.len() < 3 {
        return Err("Username must be at least 3 characters long!");
    }
    Ok(())
}

/// Passwords only need length; the server stores what it gets.
pub fn password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 6 {
        return Err("Password must be at least 6 characters long!");
    }
    Ok(())
}

/// Sign-in rule: anything non-empty goes to the server as typed.
/// Accounts that predate the registration rules (or were created
/// straight against the API) must still be able to log in.
pub fn credential(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("Username and Password are required!");
    }
    Ok(())
}

pub fn room_id(room_id: &str) -> Result<(), &'static str> {
    if room_id.trim().is_empty() {
        return Err("Room ID is required!");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_charset_is_checked_before_length() {
        assert_eq!(
            username("a!"),
            Err("Username can only contain letters, numbers, and underscores!")
        );
        assert_eq!(
            username("ab"),
            Err("Username must be at least 3 characters long!")
        );
    }

    #[test]
    fn username_accepts_underscores_and_digits() {
        assert_eq!(username("alice_42"), Ok(()));
        assert_eq!(username("A_1"), Ok(()));
    }

    #[test]
    fn username_rejects_spaces_and_unicode() {
        assert!(username("al ice").is_err());
        assert!(username("ålice").is_err());
        assert!(username("").is_err());
    }

    #[test]
    fn password_needs_six_characters() {
        assert!(password("12345").is_err());
        assert_eq!(password("123456"), Ok(()));
    }

    #[test]
    fn sign_in_takes_credentials_the_registration_rules_would_reject() {
        // Short and dashed names fail the registration format but belong
        // to real accounts; only emptiness blocks a sign-in attempt.
        assert_eq!(credential("ab"), Ok(()));
        assert_eq!(credential("legacy-user"), Ok(()));
        assert_eq!(credential("12345"), Ok(()));
        assert!(credential("").is_err());

        assert!(username("ab").is_err());
        assert!(username("legacy-user").is_err());
        assert!(password("12345").is_err());
    }

    #[test]
    fn room_id_must_not_be_blank() {
        assert!(room_id("").is_err());
        assert!(room_id("   ").is_err());
        assert_eq!(room_id("lobby"), Ok(()));
    }
}
