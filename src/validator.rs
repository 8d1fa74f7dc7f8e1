//! Post-decode payload rules
//!
//! Pure functions, no I/O. Decoders report whatever they framed; this is the
//! only place a payload becomes a [`Barcode`].

use crate::error::ValidationError;
use crate::models::{Barcode, DecodeHit, Symbology};

/// Modulo-10 check digit over the first twelve digits of an EAN-13
///
/// Weights alternate 3 and 1 starting from the digit next to the check digit.
pub fn ean13_check_digit(digits: &[u8; 12]) -> u8 {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { 3 * d as u32 } else { d as u32 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

fn validate_ean13(payload: &[u8]) -> Result<String, ValidationError> {
    if payload.len() != 13 {
        return Err(ValidationError::Malformed(format!(
            "EAN-13 needs 13 digits, got {}",
            payload.len()
        )));
    }
    if !payload.iter().all(u8::is_ascii_digit) {
        return Err(ValidationError::Malformed(
            "EAN-13 payload contains non-digit characters".to_string(),
        ));
    }

    let mut body = [0u8; 12];
    for (slot, &b) in body.iter_mut().zip(payload) {
        *slot = b - b'0';
    }
    let expected = ean13_check_digit(&body);
    let found = payload[12] - b'0';
    if expected != found {
        return Err(ValidationError::ChecksumMismatch { expected, found });
    }

    // all ASCII digits
    Ok(payload.iter().map(|&b| char::from(b)).collect())
}

fn validate_text(symbology: Symbology, payload: &[u8]) -> Result<String, ValidationError> {
    if payload.is_empty() {
        return Err(ValidationError::Malformed(format!("empty {symbology} payload")));
    }
    String::from_utf8(payload.to_vec())
        .map_err(|e| ValidationError::Malformed(format!("{symbology} payload is not UTF-8: {e}")))
}

/// Check `payload` against the rules of `symbology` and return its text
pub fn validate(symbology: Symbology, payload: &[u8]) -> Result<String, ValidationError> {
    match symbology {
        Symbology::Ean13 => validate_ean13(payload),
        Symbology::Code128 | Symbology::QrCode => validate_text(symbology, payload),
    }
}

/// Promote a raw hit to a [`Barcode`]
pub fn validate_hit(hit: &DecodeHit) -> Result<Barcode, ValidationError> {
    validate(hit.symbology, &hit.payload).map(|value| Barcode::new(hit.symbology, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits12(s: &str) -> [u8; 12] {
        let mut out = [0u8; 12];
        for (slot, b) in out.iter_mut().zip(s.bytes()) {
            *slot = b - b'0';
        }
        out
    }

    #[test]
    fn test_check_digit_known_codes() {
        assert_eq!(ean13_check_digit(&digits12("400638133393")), 1);
        assert_eq!(ean13_check_digit(&digits12("590123412345")), 7);
        assert_eq!(ean13_check_digit(&digits12("000000000000")), 0);
    }

    #[test]
    fn test_valid_ean13() {
        assert_eq!(
            validate(Symbology::Ean13, b"4006381333931"),
            Ok("4006381333931".to_string())
        );
    }

    #[test]
    fn test_corrupted_check_digit() {
        assert_eq!(
            validate(Symbology::Ean13, b"4006381333939"),
            Err(ValidationError::ChecksumMismatch {
                expected: 1,
                found: 9
            })
        );
    }

    #[test]
    fn test_ean13_structure() {
        assert!(matches!(
            validate(Symbology::Ean13, b"400638133393"),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            validate(Symbology::Ean13, b"40063813339A1"),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_checksum_property_over_every_last_digit() {
        for body in ["400638133393", "590123412345", "123456789012", "999999999999"] {
            let expected = ean13_check_digit(&digits12(body));
            for last in 0..10u8 {
                let code = format!("{body}{last}");
                let result = validate(Symbology::Ean13, code.as_bytes());
                assert_eq!(result.is_ok(), last == expected, "{code}");
            }
        }
    }

    #[test]
    fn test_text_symbologies() {
        assert_eq!(
            validate(Symbology::Code128, b"Hello-128"),
            Ok("Hello-128".to_string())
        );
        assert_eq!(
            validate(Symbology::QrCode, "caf\u{e9}".as_bytes()),
            Ok("caf\u{e9}".to_string())
        );
        assert!(matches!(
            validate(Symbology::QrCode, b""),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            validate(Symbology::Code128, &[0xff, 0xfe]),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_validate_hit() {
        let hit = DecodeHit::new(Symbology::Ean13, b"5901234123457".to_vec());
        let barcode = validate_hit(&hit).unwrap();
        assert_eq!(barcode.symbology(), Symbology::Ean13);
        assert_eq!(barcode.value(), "5901234123457");
    }
}
