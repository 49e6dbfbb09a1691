use crate::db::models::NewPerson;
use crate::error::PersistError;

/// Validate raw form text into a row that may be written.
///
/// `name` must be non-empty. `age` is read with leading-integer rules:
/// optional leading whitespace and sign, then at least one digit; anything
/// after the digits is ignored, so `"42 years"` is 42 and `"abc"` is rejected.
pub fn validate_person(name: &str, age: &str) -> Result<NewPerson, PersistError> {
    if name.is_empty() || age.is_empty() {
        return Err(PersistError::Validation(
            "name and age are required".to_string(),
        ));
    }
    let age = parse_leading_int(age)
        .ok_or_else(|| PersistError::Validation("age must be a number".to_string()))?;
    Ok(NewPerson {
        name: name.to_string(),
        age,
    })
}

fn parse_leading_int(text: &str) -> Option<i64> {
    let s = text.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
