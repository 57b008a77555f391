//! `range` / `precision` directive grammar.
//!
//! Canonical surface syntax (one directive per line, optional indentation,
//! optional trailing `,` and trailing `// comment`):
//!
//! - `range <name> == [<min> <unit>, <max> <unit>]`
//! - `range <name> == [<min>, <max>]` (unitless, e.g. satellite counts)
//! - `precision <name> == <n> decimal_places`
//! - `precision <name> == <x> <unit>`
//!
//! Lines that do not start with one of the two keywords are not directives and
//! are ignored by callers; lines that start with a keyword but do not follow the
//! grammar produce a `SpecDirectiveError`.

use nom::{
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char as pchar, space0, space1},
    combinator::{opt, recognize},
    number::complete::double,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const KEYWORD_RANGE: &str = "range";
pub const KEYWORD_PRECISION: &str = "precision";

/// Unit token that marks a precision expressed as decimal places.
pub const DECIMAL_PLACES: &str = "decimal_places";

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Directive {
    Range(RangeDecl),
    Precision(PrecisionDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeDecl {
    pub name: String,
    pub min: f64,
    pub max: f64,
    /// Shared unit of both bounds, if the declaration names one.
    pub unit: Option<String>,
}

impl RangeDecl {
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecisionDecl {
    pub name: String,
    pub value: f64,
    pub unit: PrecisionUnit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecisionUnit {
    DecimalPlaces,
    Unit(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecDirectiveError {
    #[error("malformed `{keyword}` directive: {message}")]
    Malformed {
        keyword: &'static str,
        message: String,
    },
    #[error("range `{name}` has mismatched units `{min_unit}` and `{max_unit}`")]
    UnitMismatch {
        name: String,
        min_unit: String,
        max_unit: String,
    },
    #[error("range `{name}` is inverted: min {min} > max {max}")]
    InvertedRange { name: String, min: f64, max: f64 },
    #[error("directive `{name}` has a non-finite value")]
    NonFinite { name: String },
}

// ============================================================================
// Entry point
// ============================================================================

/// Parse one specification line.
///
/// Returns `None` when the line is not a directive at all.
pub fn parse_directive(line: &str) -> Option<Result<Directive, SpecDirectiveError>> {
    let trimmed = line.trim();
    if starts_with_keyword(trimmed, KEYWORD_RANGE) {
        Some(parse_range_line(trimmed).map(Directive::Range))
    } else if starts_with_keyword(trimmed, KEYWORD_PRECISION) {
        Some(parse_precision_line(trimmed).map(Directive::Precision))
    } else {
        None
    }
}

fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    line.strip_prefix(keyword)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == ' ' || c == '\t')
}

fn parse_range_line(line: &str) -> Result<RangeDecl, SpecDirectiveError> {
    let (rest, (name, (min, min_unit), (max, max_unit))) =
        range_directive(line).map_err(|e| malformed(KEYWORD_RANGE, e))?;
    expect_trailer(KEYWORD_RANGE, rest)?;

    if !min.is_finite() || !max.is_finite() {
        return Err(SpecDirectiveError::NonFinite {
            name: name.to_string(),
        });
    }

    let unit = match (min_unit, max_unit) {
        (Some(a), Some(b)) if a != b => {
            return Err(SpecDirectiveError::UnitMismatch {
                name: name.to_string(),
                min_unit: a.to_string(),
                max_unit: b.to_string(),
            })
        }
        (Some(a), _) | (None, Some(a)) => Some(a.to_string()),
        (None, None) => None,
    };

    if min > max {
        return Err(SpecDirectiveError::InvertedRange {
            name: name.to_string(),
            min,
            max,
        });
    }

    Ok(RangeDecl {
        name: name.to_string(),
        min,
        max,
        unit,
    })
}

fn parse_precision_line(line: &str) -> Result<PrecisionDecl, SpecDirectiveError> {
    let (rest, (name, value, unit)) =
        precision_directive(line).map_err(|e| malformed(KEYWORD_PRECISION, e))?;
    expect_trailer(KEYWORD_PRECISION, rest)?;

    if !value.is_finite() {
        return Err(SpecDirectiveError::NonFinite {
            name: name.to_string(),
        });
    }

    let unit = if unit == DECIMAL_PLACES {
        PrecisionUnit::DecimalPlaces
    } else {
        PrecisionUnit::Unit(unit.to_string())
    };

    Ok(PrecisionDecl {
        name: name.to_string(),
        value,
        unit,
    })
}

fn malformed(keyword: &'static str, err: nom::Err<nom::error::Error<&str>>) -> SpecDirectiveError {
    let message = match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            format!("unexpected input at `{}`", preview(e.input))
        }
        nom::Err::Incomplete(_) => "incomplete input".to_string(),
    };
    SpecDirectiveError::Malformed { keyword, message }
}

/// After a directive, allow only `,` and/or a line comment.
fn expect_trailer(keyword: &'static str, rest: &str) -> Result<(), SpecDirectiveError> {
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    if rest.is_empty() || rest.starts_with("//") {
        Ok(())
    } else {
        Err(SpecDirectiveError::Malformed {
            keyword,
            message: format!("trailing input `{}`", preview(rest)),
        })
    }
}

fn preview(s: &str) -> &str {
    match s.char_indices().nth(24) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ============================================================================
// Combinators
// ============================================================================

fn ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '/'),
    ))(input)
}

fn eq_eq(input: &str) -> IResult<&str, &str> {
    delimited(space0, tag("=="), space0)(input)
}

/// `<number> [unit]`
fn bound(input: &str) -> IResult<&str, (f64, Option<&str>)> {
    pair(double, opt(preceded(space1, ident)))(input)
}

fn range_directive(input: &str) -> IResult<&str, (&str, (f64, Option<&str>), (f64, Option<&str>))> {
    let (input, _) = tag(KEYWORD_RANGE)(input)?;
    let (input, _) = space1(input)?;
    let (input, name) = ident(input)?;
    let (input, _) = eq_eq(input)?;
    let (input, (_, lo, _, hi, _)) = tuple((
        pchar('['),
        delimited(space0, bound, space0),
        pchar(','),
        delimited(space0, bound, space0),
        pchar(']'),
    ))(input)?;
    Ok((input, (name, lo, hi)))
}

fn precision_directive(input: &str) -> IResult<&str, (&str, f64, &str)> {
    let (input, _) = tag(KEYWORD_PRECISION)(input)?;
    let (input, _) = space1(input)?;
    let (input, name) = ident(input)?;
    let (input, _) = eq_eq(input)?;
    let (input, value) = double(input)?;
    let (input, _) = space1(input)?;
    let (input, unit) = ident(input)?;
    Ok((input, (name, value, unit)))
}
