//! Constructor functions `xs:T($arg as xs:anyAtomicType?) as xs:T?`.
//!
//! A constructor relabels values that already belong to the target type, converts between
//! numeric and boolean payloads, and otherwise validates the lexical form of the argument.
//! Date and time forms are validated with chrono.

use base64::Engine as _;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use super::common::atomize_optional;
use crate::model::XdmNode;
use crate::runtime::{CallCtx, Error, ErrorCode, StaticContext};
use crate::types::{AtomicTypeId, TypeHierarchy};
use crate::xdm::{AtomicValue, XdmAtomicValue, XdmItem, XdmSequence};

pub(super) fn constructor<N: XdmNode>(
    target: AtomicTypeId,
) -> impl Fn(&CallCtx<N>, &[XdmSequence<N>]) -> Result<XdmSequence<N>, Error> + Send + Sync + 'static {
    move |ctx: &CallCtx<N>, args: &[XdmSequence<N>]| {
        let Some(value) = atomize_optional(&args[0])? else {
            return Ok(vec![]);
        };
        Ok(vec![XdmItem::Atomic(cast(target, value, ctx.static_ctx)?)])
    }
}

/// 2^127 as a double. Truncated values at or beyond it do not fit an `i128`.
const I128_BOUND: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

fn invalid(target: AtomicTypeId, lexical: &str) -> Error {
    Error::dynamic(ErrorCode::FORG0001, format!("invalid lexical form for {target}: {lexical:?}"))
}

/// Convert `value` to `target`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn cast(target: AtomicTypeId, value: AtomicValue, ctx: &StaticContext) -> Result<AtomicValue, Error> {
    let h = TypeHierarchy::global();
    if h.is_subtype_of(value.type_id, target) {
        return Ok(AtomicValue::new(target, value.value));
    }
    let integer_target = h.is_subtype_of(target, AtomicTypeId::Integer);
    let numeric = match &value.value {
        XdmAtomicValue::Integer(i) => Some(*i as f64),
        XdmAtomicValue::Decimal(d) | XdmAtomicValue::Double(d) => Some(*d),
        XdmAtomicValue::Float(f) => Some(f64::from(*f)),
        XdmAtomicValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    if let Some(n) = numeric {
        match target {
            AtomicTypeId::Boolean => return Ok(AtomicValue::boolean(n != 0.0 && !n.is_nan())),
            AtomicTypeId::Double => return Ok(AtomicValue::double(n)),
            AtomicTypeId::Float => {
                return Ok(AtomicValue::new(AtomicTypeId::Float, XdmAtomicValue::Float(n as f32)));
            }
            AtomicTypeId::Decimal if n.is_finite() => return Ok(AtomicValue::decimal(n)),
            _ if integer_target => {
                let i = match value.value {
                    XdmAtomicValue::Integer(i) => i,
                    _ if n.is_finite() && n.trunc().abs() < I128_BOUND => n.trunc() as i128,
                    _ => return Err(invalid(target, &value.to_string())),
                };
                return integer_in_range(target, i).ok_or_else(|| invalid(target, &i.to_string()));
            }
            _ => {}
        }
    }
    cast_lexical(target, &value.to_string(), ctx)
}

/// Validate `lexical` against `target` and build the typed value.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn cast_lexical(target: AtomicTypeId, lexical: &str, ctx: &StaticContext) -> Result<AtomicValue, Error> {
    use AtomicTypeId as T;
    let bad = || invalid(target, lexical);
    let collapsed = collapse_whitespace(lexical);
    let s = collapsed.as_str();
    let string = |v: String| -> Result<AtomicValue, Error> { Ok(AtomicValue::new(target, XdmAtomicValue::String(v))) };
    let lexical_only = |ok: bool| -> Result<AtomicValue, Error> {
        if ok {
            Ok(AtomicValue::new(target, XdmAtomicValue::Lexical(s.to_string())))
        } else {
            Err(bad())
        }
    };
    match target {
        T::String | T::UntypedAtomic => string(lexical.to_string()),
        T::NormalizedString => string(lexical.replace(['\t', '\n', '\r'], " ")),
        T::Token | T::AnyUri => string(collapsed.clone()),
        T::Language if is_language(s) => string(collapsed.clone()),
        T::NmToken if !s.is_empty() && s.chars().all(is_name_char) => string(collapsed.clone()),
        T::Name if is_name(s) => string(collapsed.clone()),
        T::NcName | T::Id | T::IdRef | T::Entity if is_ncname(s) => string(collapsed.clone()),
        T::Language | T::NmToken | T::Name | T::NcName | T::Id | T::IdRef | T::Entity => Err(bad()),
        T::Boolean => match s {
            "true" | "1" => Ok(AtomicValue::boolean(true)),
            "false" | "0" => Ok(AtomicValue::boolean(false)),
            _ => Err(bad()),
        },
        T::Decimal => {
            if !is_decimal_lexical(s) {
                return Err(bad());
            }
            s.parse::<f64>().map(AtomicValue::decimal).map_err(|_| bad())
        }
        T::Double => parse_floating(s).map(AtomicValue::double).ok_or_else(bad),
        T::Float => parse_floating(s)
            .map(|d| AtomicValue::new(T::Float, XdmAtomicValue::Float(d as f32)))
            .ok_or_else(bad),
        T::Duration | T::YearMonthDuration | T::DayTimeDuration => {
            let d = parse_duration(s).ok_or_else(bad)?;
            let allowed = match target {
                T::YearMonthDuration => !d.has_day_time,
                T::DayTimeDuration => !d.has_year_month,
                _ => true,
            };
            if !allowed {
                return Err(bad());
            }
            Ok(AtomicValue::new(target, XdmAtomicValue::Duration { months: d.months, millis: d.millis }))
        }
        T::DateTime => {
            let (body, tz) = split_timezone(s).ok_or_else(bad)?;
            let (date, time) = body.split_once('T').ok_or_else(bad)?;
            let date = parse_date(date).ok_or_else(bad)?;
            let time = parse_time(time).ok_or_else(bad)?;
            let offset = tz.unwrap_or(FixedOffset::east_opt(0).ok_or_else(bad)?);
            let dt = NaiveDateTime::new(date, time).and_local_timezone(offset).single().ok_or_else(bad)?;
            Ok(AtomicValue::new(T::DateTime, XdmAtomicValue::DateTime(dt)))
        }
        T::Date => {
            let (body, tz) = split_timezone(s).ok_or_else(bad)?;
            let date = parse_date(body).ok_or_else(bad)?;
            Ok(AtomicValue::new(T::Date, XdmAtomicValue::Date { date, tz }))
        }
        T::Time => {
            let (body, tz) = split_timezone(s).ok_or_else(bad)?;
            let time = parse_time(body).ok_or_else(bad)?;
            Ok(AtomicValue::new(T::Time, XdmAtomicValue::Time { time, tz }))
        }
        T::GYear | T::GYearMonth | T::GMonthDay | T::GDay | T::GMonth => {
            let (body, _) = split_timezone(s).ok_or_else(bad)?;
            lexical_only(is_gregorian_fragment(target, body))
        }
        T::HexBinary => lexical_only(s.len() % 2 == 0 && s.chars().all(|c| c.is_ascii_hexdigit())),
        T::Base64Binary => lexical_only(is_base64(s)),
        T::QName => {
            let (prefix, local) = match s.split_once(':') {
                Some((p, l)) => (Some(p), l),
                None => (None, s),
            };
            if !is_ncname(local) || prefix.is_some_and(|p| !is_ncname(p)) {
                return Err(bad());
            }
            let ns_uri = match prefix {
                Some(p) => Some(ctx.namespaces.lookup(p).ok_or_else(|| {
                    Error::dynamic(ErrorCode::FORG0001, format!("namespace prefix '{p}' is not bound"))
                })?),
                None => ctx.default_element_namespace.as_deref(),
            };
            Ok(AtomicValue::new(
                T::QName,
                XdmAtomicValue::QName {
                    ns_uri: ns_uri.map(str::to_string),
                    prefix: prefix.map(str::to_string),
                    local: local.to_string(),
                },
            ))
        }
        _ if TypeHierarchy::global().is_subtype_of(target, T::Integer) => {
            if !is_integer_lexical(s) {
                return Err(bad());
            }
            let i = s.parse::<i128>().map_err(|_| bad())?;
            integer_in_range(target, i).ok_or_else(bad)
        }
        T::AnyAtomicType | T::Notation => Err(Error::dynamic(
            ErrorCode::XPTY0004,
            format!("{target} is abstract and cannot be constructed"),
        )),
        _ => Err(bad()),
    }
}

/// Value space bounds of the integer-derived types.
const fn integer_bounds(t: AtomicTypeId) -> (Option<i128>, Option<i128>) {
    use AtomicTypeId as T;
    match t {
        T::NonPositiveInteger => (None, Some(0)),
        T::NegativeInteger => (None, Some(-1)),
        T::Long => (Some(i64::MIN as i128), Some(i64::MAX as i128)),
        T::Int => (Some(i32::MIN as i128), Some(i32::MAX as i128)),
        T::Short => (Some(i16::MIN as i128), Some(i16::MAX as i128)),
        T::Byte => (Some(i8::MIN as i128), Some(i8::MAX as i128)),
        T::NonNegativeInteger => (Some(0), None),
        T::UnsignedLong => (Some(0), Some(u64::MAX as i128)),
        T::UnsignedInt => (Some(0), Some(u32::MAX as i128)),
        T::UnsignedShort => (Some(0), Some(u16::MAX as i128)),
        T::UnsignedByte => (Some(0), Some(u8::MAX as i128)),
        T::PositiveInteger => (Some(1), None),
        _ => (None, None),
    }
}

fn integer_in_range(target: AtomicTypeId, i: i128) -> Option<AtomicValue> {
    let (min, max) = integer_bounds(target);
    let ok = min.is_none_or(|m| i >= m) && max.is_none_or(|m| i <= m);
    ok.then(|| AtomicValue::new(target, XdmAtomicValue::Integer(i)))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':' || (c as u32) >= 0xC0
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || matches!(c, '-' | '.' | '\u{B7}')
}

fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_char)
}

fn is_ncname(s: &str) -> bool {
    is_name(s) && !s.contains(':')
}

fn is_language(s: &str) -> bool {
    let mut parts = s.split('-');
    let first_ok = parts
        .next()
        .is_some_and(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));
    first_ok && parts.all(|p| (1..=8).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix(['+', '-']).unwrap_or(s)
}

fn is_integer_lexical(s: &str) -> bool {
    let digits = strip_sign(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_decimal_lexical(s: &str) -> bool {
    let body = strip_sign(s);
    let (int, frac) = body.split_once('.').unwrap_or((body, ""));
    (!int.is_empty() || !frac.is_empty())
        && int.chars().all(|c| c.is_ascii_digit())
        && frac.chars().all(|c| c.is_ascii_digit())
}

fn parse_floating(s: &str) -> Option<f64> {
    match s {
        "INF" | "+INF" => return Some(f64::INFINITY),
        "-INF" => return Some(f64::NEG_INFINITY),
        "NaN" => return Some(f64::NAN),
        _ => {}
    }
    let (mantissa, exponent) = match s.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (s, None),
    };
    if !is_decimal_lexical(mantissa) || exponent.is_some_and(|e| !is_integer_lexical(e)) {
        return None;
    }
    let normalized = s.replacen(".e", ".0e", 1).replacen(".E", ".0E", 1);
    normalized.parse::<f64>().ok()
}

struct DurationParts {
    months: i32,
    millis: i64,
    has_year_month: bool,
    has_day_time: bool,
}

fn duration_components(s: &str) -> Option<Vec<(&str, char)>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if c.is_ascii_uppercase() {
            let num = &s[start..i];
            if num.is_empty() {
                return None;
            }
            out.push((num, c));
            start = i + 1;
        } else if !(c.is_ascii_digit() || c == '.') {
            return None;
        }
    }
    (start == s.len()).then_some(out)
}

/// `-?PnYnMnDTnHnMn.nS` with at least one component and ordered designators.
#[allow(clippy::cast_possible_truncation)]
fn parse_duration(s: &str) -> Option<DurationParts> {
    let (negative, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s),
    };
    let rest = rest.strip_prefix('P')?;
    let (date, time) = match rest.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };
    let mut months: i64 = 0;
    let mut millis: i64 = 0;
    let mut parts = DurationParts { months: 0, millis: 0, has_year_month: false, has_day_time: false };

    let mut next = 0;
    for (num, designator) in duration_components(date)? {
        let pos = "YMD".find(designator)?;
        if pos < next || num.contains('.') {
            return None;
        }
        next = pos + 1;
        let n: i64 = num.parse().ok()?;
        match designator {
            'Y' => months = months.checked_add(n.checked_mul(12)?)?,
            'M' => months = months.checked_add(n)?,
            _ => millis = millis.checked_add(n.checked_mul(86_400_000)?)?,
        }
        if designator == 'D' {
            parts.has_day_time = true;
        } else {
            parts.has_year_month = true;
        }
    }
    if let Some(time) = time {
        let components = duration_components(time)?;
        if components.is_empty() {
            return None;
        }
        next = 0;
        for (num, designator) in components {
            let pos = "HMS".find(designator)?;
            if pos < next || (designator != 'S' && num.contains('.')) {
                return None;
            }
            next = pos + 1;
            let add = if designator == 'S' {
                if !is_decimal_lexical(num) {
                    return None;
                }
                let secs: f64 = num.parse().ok()?;
                (secs * 1000.0).round() as i64
            } else {
                let n: i64 = num.parse().ok()?;
                n.checked_mul(if designator == 'H' { 3_600_000 } else { 60_000 })?
            };
            millis = millis.checked_add(add)?;
            parts.has_day_time = true;
        }
    }
    if !parts.has_year_month && !parts.has_day_time {
        return None;
    }
    let sign = if negative { -1 } else { 1 };
    parts.months = i32::try_from(months * sign).ok()?;
    parts.millis = millis * sign;
    Some(parts)
}

/// Split a trailing `Z` or `±hh:mm` timezone. `None` when the timezone is malformed.
fn split_timezone(s: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(body) = s.strip_suffix('Z') {
        return Some((body, Some(FixedOffset::east_opt(0)?)));
    }
    let n = s.len();
    if n >= 6 && s.is_ascii() {
        let (body, tz) = s.split_at(n - 6);
        let bytes = tz.as_bytes();
        if matches!(bytes[0], b'+' | b'-') && bytes[3] == b':' {
            let hours = fixed_digits(&tz[1..3])?;
            let minutes = fixed_digits(&tz[4..6])?;
            if hours > 14 || minutes > 59 || (hours == 14 && minutes > 0) {
                return None;
            }
            let secs = i32::try_from(hours * 3600 + minutes * 60).ok()?;
            let offset = if bytes[0] == b'-' { FixedOffset::west_opt(secs)? } else { FixedOffset::east_opt(secs)? };
            return Some((body, Some(offset)));
        }
    }
    Some((s, None))
}

fn fixed_digits(s: &str) -> Option<u32> {
    (!s.is_empty() && s.chars().all(|c| c.is_ascii_digit())).then(|| s.parse().ok()).flatten()
}

/// `-?yyyy` with at least four digits.
fn parse_year(s: &str) -> Option<i32> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.len() < 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    // the year may be negative, so split from the right
    let (rest, day) = s.rsplit_once('-')?;
    let (year, month) = rest.rsplit_once('-')?;
    if month.len() != 2 || day.len() != 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(parse_year(year)?, fixed_digits(month)?, fixed_digits(day)?)
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    if s == "24:00:00" || s.strip_prefix("24:00:00.").is_some_and(|f| f.chars().all(|c| c == '0')) {
        return Some(NaiveTime::MIN);
    }
    let bytes = s.as_bytes();
    if bytes.len() < 8 || bytes[2] != b':' || bytes[5] != b':' {
        return None;
    }
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f").ok()
}

fn is_gregorian_fragment(target: AtomicTypeId, s: &str) -> bool {
    let month_ok = |m: &str| m.len() == 2 && fixed_digits(m).is_some_and(|m| (1..=12).contains(&m));
    let day_ok = |d: &str| d.len() == 2 && fixed_digits(d).is_some_and(|d| (1..=31).contains(&d));
    match target {
        AtomicTypeId::GYear => parse_year(s).is_some(),
        AtomicTypeId::GYearMonth => s
            .rsplit_once('-')
            .is_some_and(|(y, m)| parse_year(y).is_some() && month_ok(m)),
        AtomicTypeId::GMonth => s.strip_prefix("--").is_some_and(month_ok),
        AtomicTypeId::GDay => s.strip_prefix("---").is_some_and(day_ok),
        AtomicTypeId::GMonthDay => {
            let Some((m, d)) = s.strip_prefix("--").and_then(|r| r.split_once('-')) else {
                return false;
            };
            // 2000 is a leap year, so --02-29 is accepted
            month_ok(m)
                && day_ok(d)
                && fixed_digits(m)
                    .zip(fixed_digits(d))
                    .is_some_and(|(m, d)| NaiveDate::from_ymd_opt(2000, m, d).is_some())
        }
        _ => false,
    }
}

fn is_base64(s: &str) -> bool {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(compact).is_ok()
}
