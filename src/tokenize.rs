//! Argument tokenizer: delimited decimal/hex text to raw bus bytes.
//!
//! Accepted token shapes:
//!
//! - one character: a decimal digit, `5` -> `0x05`
//! - two characters: a hex pair, `a5` / `A5` -> `0xA5`
//! - `0x`/`0X` followed by a hex pair, `0xFF` -> `0xFF`
//!
//! Any other shape rejects the whole argument string.

use crate::ARG_CAPACITY;
use heapless::Vec;

/// How digits that are not valid for the token shape are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HexPolicy {
    /// Reject the argument string.
    #[default]
    Strict,
    /// Degrade the token to `0x00` and keep going.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TokenError<'t> {
    /// The token does not have an accepted shape or has invalid digits.
    Malformed(&'t str),
    /// More tokens than fit in the argument buffer.
    TooMany,
}

/// Result buffer of the most recent [`ArgTokens::tokenize`] call.
#[derive(Debug, Default)]
pub struct ArgTokens {
    bytes: Vec<u8, ARG_CAPACITY>,
}

impl ArgTokens {
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Splits `text` on any byte of `delimiters` and converts each token.
    ///
    /// Empty tokens are skipped. On success the resolved bytes replace the
    /// previous contents and their count is returned. On error the buffer is
    /// left empty, so a zero count always means "nothing to send".
    pub fn tokenize<'t>(
        &mut self,
        text: &'t str,
        delimiters: &str,
        policy: HexPolicy,
    ) -> Result<usize, TokenError<'t>> {
        self.bytes.clear();

        let tokens = text
            .split(|c: char| delimiters.contains(c))
            .filter(|token| !token.is_empty());

        for token in tokens {
            let Some(byte) = parse_token(token, policy) else {
                self.bytes.clear();
                return Err(TokenError::Malformed(token));
            };
            if self.bytes.push(byte).is_err() {
                self.bytes.clear();
                return Err(TokenError::TooMany);
            }
        }

        Ok(self.bytes.len())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn hex_payload(token: &str) -> Option<&[u8]> {
    token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .map(str::as_bytes)
        .filter(|digits| digits.len() == 2)
}

/// `None` only for a token without an accepted shape, or with bad digits
/// under [`HexPolicy::Strict`].
fn parse_token(token: &str, policy: HexPolicy) -> Option<u8> {
    let pair = |hi, lo| match policy {
        HexPolicy::Strict => parse_hex_pair(hi, lo),
        HexPolicy::Lenient => Some(parse_hex_pair_lossy(hi, lo)),
    };
    if let Some(digits) = hex_payload(token) {
        return pair(digits[0], digits[1]);
    }
    match *token.as_bytes() {
        [digit] if digit.is_ascii_digit() => Some(digit - b'0'),
        [_] if policy == HexPolicy::Lenient => Some(0),
        [hi, lo] => pair(hi, lo),
        _ => None,
    }
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Parses two ASCII hex digits, case-insensitive.
pub fn parse_hex_pair(hi: u8, lo: u8) -> Option<u8> {
    Some(hex_digit(hi)? << 4 | hex_digit(lo)?)
}

/// Like [`parse_hex_pair`] but yields 0 when either digit is invalid.
pub fn parse_hex_pair_lossy(hi: u8, lo: u8) -> u8 {
    parse_hex_pair(hi, lo).unwrap_or(0)
}

/// Upper case hex digits for `value`, high nibble first.
pub fn hex_pair(value: u8) -> [u8; 2] {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    [DIGITS[usize::from(value >> 4)], DIGITS[usize::from(value & 0x0f)]]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str, delimiters: &str) -> Result<std::vec::Vec<u8>, TokenError<'static>> {
        let text: &'static str = std::boxed::Box::leak(text.into());
        let mut args = ArgTokens::new();
        let count = args.tokenize(text, delimiters, HexPolicy::Strict)?;
        assert_eq!(count, args.len());
        Ok(args.as_slice().to_vec())
    }

    #[test]
    fn test_hex_pairs_with_delimiter() {
        assert_eq!(tokens("0A;FF", ";"), Ok(std::vec![0x0a, 0xff]));
    }

    #[test]
    fn test_single_decimal_digit() {
        assert_eq!(tokens("5", ";"), Ok(std::vec![0x05]));
    }

    #[test]
    fn test_prefixed_hex() {
        assert_eq!(tokens("0xFF", ";"), Ok(std::vec![0xff]));
        assert_eq!(tokens("0x1a 0X2B", " "), Ok(std::vec![0x1a, 0x2b]));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(tokens("ab,AB,aB", ","), Ok(std::vec![0xab, 0xab, 0xab]));
    }

    #[test]
    fn test_invalid_digits_strict() {
        assert_eq!(tokens("ZZ", ";"), Err(TokenError::Malformed("ZZ")));
        assert_eq!(tokens("0A;G1", ";"), Err(TokenError::Malformed("G1")));
        assert_eq!(tokens("x", ";"), Err(TokenError::Malformed("x")));
    }

    #[test]
    fn test_invalid_digits_lenient() {
        let mut args = ArgTokens::new();
        assert_eq!(args.tokenize("ZZ", ";", HexPolicy::Lenient), Ok(1));
        assert_eq!(args.as_slice(), &[0x00]);

        assert_eq!(args.tokenize("0A;0xQQ;7", ";", HexPolicy::Lenient), Ok(3));
        assert_eq!(args.as_slice(), &[0x0a, 0x00, 0x07]);

        assert_eq!(args.tokenize("x 0xf 0xfG", " ", HexPolicy::Lenient), Err(TokenError::Malformed("0xf")));
        assert_eq!(args.tokenize("x;0xfG;1f", ";", HexPolicy::Lenient), Ok(3));
        assert_eq!(args.as_slice(), &[0x00, 0x00, 0x1f]);
    }

    #[test]
    fn test_bad_shape_rejected_in_both_policies() {
        let mut args = ArgTokens::new();
        for policy in [HexPolicy::Strict, HexPolicy::Lenient] {
            assert_eq!(args.tokenize("123", ";", policy), Err(TokenError::Malformed("123")));
            assert_eq!(args.tokenize("0x1", ";", policy), Err(TokenError::Malformed("0x1")));
            assert!(args.is_empty());
        }
    }

    #[test]
    fn test_error_clears_previous_result() {
        let mut args = ArgTokens::new();
        assert_eq!(args.tokenize("01 02", " ", HexPolicy::Strict), Ok(2));
        assert!(args.tokenize("01 zzz", " ", HexPolicy::Strict).is_err());
        assert_eq!(args.len(), 0);
    }

    #[test]
    fn test_empty_tokens_skipped() {
        assert_eq!(tokens(";;01;;02;", ";"), Ok(std::vec![1, 2]));
        assert_eq!(tokens("", ";"), Ok(std::vec![]));
    }

    #[test]
    fn test_too_many_tokens() {
        let text: std::string::String = (0..=ARG_CAPACITY).map(|_| "1 ").collect();
        assert_eq!(tokens(&text, " "), Err(TokenError::TooMany));

        let text: std::string::String = (0..ARG_CAPACITY).map(|_| "1 ").collect();
        assert_eq!(tokens(&text, " ").map(|b| b.len()), Ok(ARG_CAPACITY));
    }

    #[test]
    fn test_hex_pair_helpers() {
        assert_eq!(parse_hex_pair(b'7', b'f'), Some(0x7f));
        assert_eq!(parse_hex_pair(b'7', b'g'), None);
        assert_eq!(parse_hex_pair_lossy(b'7', b'g'), 0);
        assert_eq!(parse_hex_pair_lossy(b'F', b'0'), 0xf0);
        assert_eq!(&hex_pair(0x3c), b"3C");
    }
}
