use tracing::warn;

/// Normalize a phone number into the 11-digit leading-zero form used for
/// callback-table queries.
///
/// Handles the input shapes the vendor and callers produce:
/// - `9876543210` -> `09876543210`
/// - `09876543210` -> unchanged
/// - `+919876543210` / `919876543210` -> `09876543210`
/// - anything longer keeps the last 10 digits, prefixed with `0`
pub fn format_for_query(phone_number: &str) -> String {
    if phone_number.trim().is_empty() {
        warn!("Phone number is empty, nothing to normalize");
        return String::new();
    }

    let digits: String = phone_number.chars().filter(|c| c.is_ascii_digit()).collect();

    let formatted = match digits.len() {
        10 => format!("0{digits}"),
        11 if digits.starts_with('0') => digits.clone(),
        11 => format!("0{}", &digits[digits.len() - 10..]),
        12 | 13 if digits.starts_with("91") => format!("0{}", &digits[digits.len() - 10..]),
        n if n > 11 => format!("0{}", &digits[digits.len() - 10..]),
        _ => {
            warn!(
                "Unusual phone number length ({}), adding leading 0: '{}'",
                digits.len(),
                digits
            );
            format!("0{digits}")
        }
    };

    if formatted.len() != 11 || !formatted.starts_with('0') {
        warn!(
            "Phone normalization produced '{}' from '{}' (expected 11 digits with leading 0)",
            formatted, phone_number
        );
    }

    formatted
}

/// 10-digit display form: the query form without its leading zero.
pub fn format_for_display(phone_number: &str) -> String {
    let query_form = format_for_query(phone_number);
    if query_form.len() == 11 && query_form.starts_with('0') {
        query_form[1..].to_string()
    } else {
        query_form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_digits_get_leading_zero() {
        assert_eq!(format_for_query("9876543210"), "09876543210");
    }

    #[test]
    fn eleven_digits_with_leading_zero_unchanged() {
        assert_eq!(format_for_query("09876543210"), "09876543210");
    }

    #[test]
    fn eleven_digits_without_leading_zero_keeps_last_ten() {
        assert_eq!(format_for_query("19876543210"), "09876543210");
    }

    #[test]
    fn country_code_is_stripped() {
        assert_eq!(format_for_query("919876543210"), "09876543210");
        assert_eq!(format_for_query("+919876543210"), "09876543210");
    }

    #[test]
    fn thirteen_digits_with_country_code() {
        assert_eq!(format_for_query("9109876543210"), "09876543210");
    }

    #[test]
    fn overlong_numbers_keep_last_ten() {
        assert_eq!(format_for_query("00919876543210"), "09876543210");
    }

    #[test]
    fn non_digit_noise_is_ignored() {
        assert_eq!(format_for_query("(0987) 654-3210"), "09876543210");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(format_for_query(""), "");
        assert_eq!(format_for_query("   "), "");
    }

    #[test]
    fn display_form_drops_leading_zero() {
        assert_eq!(format_for_display("09876543210"), "9876543210");
        assert_eq!(format_for_display("+919876543210"), "9876543210");
    }
}
