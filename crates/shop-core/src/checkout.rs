//! # Checkout Form Validation
//!
//! Turns the raw checkout submission into a validated `CheckoutDetails`
//! struct or a set of field-level error messages. The rest of the system
//! trusts only the validated struct.

use serde::{Deserialize, Serialize};

/// A validation failure on one form field
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Raw checkout submission, as deserialized from the request
#[derive(Debug, Clone, Deserialize)]
pub struct RawCheckoutForm {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_street: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip: String,
}

/// Validated checkout details.
///
/// Phone numbers are normalized to their 10 digits; every other field is
/// trimmed but otherwise kept as submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_street: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip: String,
}

impl CheckoutDetails {
    /// Validate a raw submission. All fields are checked (not fail-fast)
    /// so the form can show every problem at once.
    pub fn parse(raw: &RawCheckoutForm) -> Result<Self, Vec<FieldError>> {
        let mut errors = Vec::new();

        let customer_name = raw.customer_name.trim();
        if customer_name.len() < 2 || customer_name.len() > 100 {
            errors.push(FieldError::new(
                "customer_name",
                "Name must be between 2 and 100 characters",
            ));
        }

        let customer_email = raw.customer_email.trim();
        if !is_valid_email(customer_email) {
            errors.push(FieldError::new(
                "customer_email",
                "Please enter a valid email address",
            ));
        }

        let customer_phone = normalize_phone(&raw.customer_phone);
        if customer_phone.is_none() {
            errors.push(FieldError::new(
                "customer_phone",
                "Please enter a valid 10-digit US phone number (e.g., 555-123-4567)",
            ));
        }

        let shipping_street = raw.shipping_street.trim();
        if shipping_street.len() < 5 || shipping_street.len() > 200 {
            errors.push(FieldError::new(
                "shipping_street",
                "Address must be between 5 and 200 characters",
            ));
        }

        let shipping_city = raw.shipping_city.trim();
        if shipping_city.len() < 2 || shipping_city.len() > 100 {
            errors.push(FieldError::new(
                "shipping_city",
                "City must be between 2 and 100 characters",
            ));
        }

        let shipping_state = raw.shipping_state.trim();
        if shipping_state.len() < 2 || shipping_state.len() > 50 {
            errors.push(FieldError::new(
                "shipping_state",
                "State must be between 2 and 50 characters",
            ));
        }

        let shipping_zip = raw.shipping_zip.trim();
        if !is_valid_zip(shipping_zip) {
            errors.push(FieldError::new(
                "shipping_zip",
                "Please enter a valid ZIP code (e.g., 90210 or 90210-1234)",
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            customer_name: customer_name.to_string(),
            customer_email: customer_email.to_string(),
            customer_phone: customer_phone.unwrap_or_default(),
            shipping_street: shipping_street.to_string(),
            shipping_city: shipping_city.to_string(),
            shipping_state: shipping_state.to_string(),
            shipping_zip: shipping_zip.to_string(),
        })
    }
}

/// Structural email check: one @, non-empty local part and domain,
/// at most 120 characters.
fn is_valid_email(s: &str) -> bool {
    if s.is_empty() || s.len() > 120 {
        return false;
    }
    let mut parts = s.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty() && !domain.is_empty() && domain.contains('.') && !s.contains(' ')
        }
        _ => false,
    }
}

/// Accept US phone numbers in common written forms and normalize to the
/// bare 10 digits. Separators `-`, `.`, space and surrounding parens on
/// the area code are tolerated.
fn normalize_phone(s: &str) -> Option<String> {
    let digits: String = s
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();

    if digits.len() == 10 && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

/// ZIP code: 5 digits, optionally followed by a dash and 4 more
fn is_valid_zip(s: &str) -> bool {
    let (five, rest) = match s.split_once('-') {
        Some((a, b)) => (a, Some(b)),
        None => (s, None),
    };
    let five_ok = five.len() == 5 && five.chars().all(|c| c.is_ascii_digit());
    let rest_ok = match rest {
        None => true,
        Some(plus4) => plus4.len() == 4 && plus4.chars().all(|c| c.is_ascii_digit()),
    };
    five_ok && rest_ok
}
