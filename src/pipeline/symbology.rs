//! Symbology dispatch: payload + format → bar/space module pattern.
//!
//! The encoding tables live in `barcoders`. This module owns what the tables
//! do not: choosing the CODE128 character set, computing or verifying GS1
//! check digits so 12- and 13-digit EAN input both work, mapping UPC-A onto
//! EAN-13, and turning library errors into an [`EncodeError`] with a reason
//! a person can act on.

use crate::config::SymbolFormat;
use crate::error::EncodeError;
use barcoders::sym::code128::Code128;
use barcoders::sym::code39::Code39;
use barcoders::sym::ean13::EAN13;
use barcoders::sym::tf::TF;

/// Code 128 start character selecting character set B.
const CODE128_SET_B: char = 'Ɓ';
/// Code 128 start character selecting character set C (digit pairs).
const CODE128_SET_C: char = 'Ć';

const CODE39_EXTRA: &str = "-. $/+%";

/// An encoded symbol ready for rasterisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Human-readable text printed under the bars. For GS1 formats this
    /// includes the check digit.
    pub text: String,
    /// One entry per module: `1` = bar, `0` = space.
    pub modules: Vec<u8>,
}

/// Encode `payload` as `format`.
pub fn encode_symbol(payload: &str, format: SymbolFormat) -> Result<Symbol, EncodeError> {
    if payload.is_empty() {
        return Err(EncodeError::InvalidLength {
            format: format.to_string(),
            expected: "at least 1 character".into(),
            actual: 0,
        });
    }

    match format {
        SymbolFormat::Code128 => code128(payload),
        SymbolFormat::Ean13 => {
            let digits = gs1_digits(payload, format, 12)?;
            let data = digit_string(&digits[..12]);
            let modules = EAN13::new(data.as_str())
                .map_err(|e| library_error(format, e))?
                .encode();
            Ok(Symbol {
                text: digit_string(&digits),
                modules,
            })
        }
        SymbolFormat::Upc => {
            // UPC-A is EAN-13 with an implicit leading zero.
            let digits = gs1_digits(payload, format, 11)?;
            let data = format!("0{}", digit_string(&digits[..11]));
            let modules = EAN13::new(data.as_str())
                .map_err(|e| library_error(format, e))?
                .encode();
            Ok(Symbol {
                text: digit_string(&digits),
                modules,
            })
        }
        SymbolFormat::Code39 => {
            let data = payload.to_ascii_uppercase();
            let bad: String = data
                .chars()
                .filter(|c| !is_code39_char(*c))
                .collect();
            if !bad.is_empty() {
                return Err(EncodeError::InvalidCharacters {
                    format: format.to_string(),
                    chars: bad,
                });
            }
            let modules = Code39::new(data.as_str())
                .map_err(|e| library_error(format, e))?
                .encode();
            Ok(Symbol {
                text: data,
                modules,
            })
        }
        SymbolFormat::Itf14 => {
            let digits = gs1_digits(payload, format, 13)?;
            let data = digit_string(&digits);
            let modules = TF::interleaved(data.as_str())
                .map_err(|e| library_error(format, e))?
                .encode();
            Ok(Symbol {
                text: data,
                modules,
            })
        }
    }
}

fn code128(payload: &str) -> Result<Symbol, EncodeError> {
    let bad: String = payload
        .chars()
        .filter(|c| !(' '..='~').contains(c))
        .collect();
    if !bad.is_empty() {
        return Err(EncodeError::InvalidCharacters {
            format: SymbolFormat::Code128.to_string(),
            chars: bad,
        });
    }

    let all_digits = payload.bytes().all(|b| b.is_ascii_digit());
    let start = if all_digits && payload.len() >= 4 && payload.len().is_multiple_of(2) {
        CODE128_SET_C
    } else {
        CODE128_SET_B
    };
    let data = format!("{start}{payload}");
    let modules = Code128::new(data.as_str())
        .map_err(|e| library_error(SymbolFormat::Code128, e))?
        .encode();
    Ok(Symbol {
        text: payload.to_string(),
        modules,
    })
}

fn is_code39_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_ascii_uppercase() || CODE39_EXTRA.contains(c)
}

fn library_error(format: SymbolFormat, e: barcoders::error::Error) -> EncodeError {
    EncodeError::Symbology {
        format: format.to_string(),
        detail: format!("{:?}", e),
    }
}

/// Parse a GS1 number of `data_len` digits with an optional check digit.
///
/// Returns `data_len + 1` digits: the check digit is appended when missing
/// and verified when present.
pub fn gs1_digits(
    payload: &str,
    format: SymbolFormat,
    data_len: usize,
) -> Result<Vec<u8>, EncodeError> {
    let bad: String = payload.chars().filter(|c| !c.is_ascii_digit()).collect();
    if !bad.is_empty() {
        return Err(EncodeError::InvalidCharacters {
            format: format.to_string(),
            chars: bad,
        });
    }

    let mut digits: Vec<u8> = payload.bytes().map(|b| b - b'0').collect();
    if digits.len() == data_len {
        let check = gs1_check_digit(&digits);
        digits.push(check);
        Ok(digits)
    } else if digits.len() == data_len + 1 {
        let expected = gs1_check_digit(&digits[..data_len]);
        let actual = digits[data_len];
        if expected != actual {
            return Err(EncodeError::Checksum {
                format: format.to_string(),
                expected,
                actual,
            });
        }
        Ok(digits)
    } else {
        Err(EncodeError::InvalidLength {
            format: format.to_string(),
            expected: format!("{} or {} digits", data_len, data_len + 1),
            actual: digits.len(),
        })
    }
}

/// GS1 mod-10 check digit: weights 3,1,3,… from the rightmost data digit.
pub fn gs1_check_digit(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .rev()
        .zip([3, 1].into_iter().cycle())
        .map(|(&d, weight)| u32::from(d) * weight)
        .sum();
    ((10 - sum % 10) % 10) as u8
}

fn digit_string(digits: &[u8]) -> String {
    digits.iter().map(|d| char::from(b'0' + d)).collect()
}
