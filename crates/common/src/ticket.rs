//! Scannable ticket tokens
//!
//! A ticket QR code carries `REG_TICKET:<registration id>`. Staff typing an id
//! by hand supply the bare id, so decoding accepts both forms.

/// Prefix marking a token as a registration ticket
pub const TICKET_PREFIX: &str = "REG_TICKET:";

/// Encode a registration id into the token printed on its ticket
pub fn encode(registration_id: &str) -> String {
    format!("{}{}", TICKET_PREFIX, registration_id)
}

/// Extract the registration id from a scanned or typed token
///
/// Never fails: input without the prefix is taken as a raw id, and ids that
/// match nothing are rejected later at lookup.
pub fn decode(token: &str) -> &str {
    token.strip_prefix(TICKET_PREFIX).unwrap_or(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_format() {
        assert_eq!(encode("R1"), "REG_TICKET:R1");
    }

    #[test]
    fn test_decode_roundtrip() {
        for id in ["R1", "65f1c0e2a9b4", "", "REG_TICKET:nested", "with space"] {
            assert_eq!(decode(&encode(id)), id);
        }
    }

    #[test]
    fn test_decode_bare_id() {
        assert_eq!(decode("R1"), "R1");
        assert_eq!(decode("garbage-token-xyz"), "garbage-token-xyz");
    }

    #[test]
    fn test_decode_strips_prefix_once() {
        assert_eq!(decode("REG_TICKET:REG_TICKET:R1"), "REG_TICKET:R1");
    }

    #[test]
    fn test_decode_is_case_sensitive() {
        assert_eq!(decode("reg_ticket:R1"), "reg_ticket:R1");
    }
}
