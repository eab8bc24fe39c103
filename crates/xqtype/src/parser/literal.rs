//! Lexical forms of numeric and string literals.

use crate::runtime::{Error, ErrorCode};

fn syntax(msg: impl Into<String>) -> Error {
    Error::static_err(ErrorCode::XPST0003, msg)
}

/// `IntegerLiteral`: unsigned digits.
pub fn parse_integer(lexical: &str) -> Result<i128, Error> {
    lexical
        .parse::<i128>()
        .map_err(|e| syntax(format!("integer literal {lexical} is out of range: {e}")))
}

/// `DecimalLiteral`: digits with a mandatory `.`, either side may be empty but not both.
pub fn parse_decimal(lexical: &str) -> Result<f64, Error> {
    lexical
        .parse::<f64>()
        .map_err(|e| syntax(format!("invalid decimal literal {lexical}: {e}")))
}

/// `DoubleLiteral`: a mantissa followed by `e`/`E` and a signed exponent.
pub fn parse_double(lexical: &str) -> Result<f64, Error> {
    // "1.e3" is valid here; normalize the empty fraction for the float parser
    let normalized = lexical.replacen(".e", ".0e", 1).replacen(".E", ".0E", 1);
    normalized
        .parse::<f64>()
        .map_err(|e| syntax(format!("invalid double literal {lexical}: {e}")))
}

/// Decode the body of a string literal delimited by `delim`: a doubled delimiter stands for
/// one delimiter, predefined entity references and character references are replaced.
pub fn unescape_string(raw: &str, delim: char) -> Result<String, Error> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            c if c == delim => {
                // the grammar only admits delimiters in pairs
                if chars.next_if(|&(_, n)| n == delim).is_none() {
                    return Err(syntax(format!("unescaped {delim} in string literal")));
                }
                out.push(delim);
            }
            '&' => {
                let rest = &raw[i + 1..];
                let Some(end) = rest.find(';') else {
                    return Err(syntax("unterminated entity reference in string literal"));
                };
                let reference = &rest[..end];
                out.push(decode_reference(reference)?);
                // skip the reference body and the ';'
                for _ in 0..=reference.chars().count() {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

fn decode_reference(reference: &str) -> Result<char, Error> {
    match reference {
        "amp" => Ok('&'),
        "lt" => Ok('<'),
        "gt" => Ok('>'),
        "quot" => Ok('"'),
        "apos" => Ok('\''),
        _ => {
            let code = if let Some(hex) = reference.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()
            } else if let Some(dec) = reference.strip_prefix('#') {
                dec.parse::<u32>().ok()
            } else {
                return Err(syntax(format!("unknown entity reference &{reference};")));
            };
            code.filter(|&c| c != 0)
                .and_then(char::from_u32)
                .ok_or_else(|| syntax(format!("invalid character reference &{reference};")))
        }
    }
}
