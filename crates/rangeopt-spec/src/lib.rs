//! Range specifications for `rangeopt`
//!
//! A specification is a small, line-oriented declarative text that states the
//! value ranges a program's inputs will actually take:
//!
//! ```text
//! range latitude == [-16.41 degrees, -16.31 degrees],
//! range speed == [0.0 kmh, 90.0 kmh],
//! precision latitude == 6 decimal_places,
//! // Records analyzed: 48213
//! ```
//!
//! This crate provides:
//! - a directive parser (`directive`) for the `range` / `precision` lines,
//! - a tolerant fact builder (`parser::SpecParser`) that turns a whole
//!   specification into normalized numeric `SpecFacts` plus derived facts,
//! - stable text digests (`digest`) used to identify inputs in reports.
//!
//! Parsing never fails as a whole: malformed directives are logged and skipped,
//! and a specification that yields nothing usable collapses to the conservative
//! default fact set.

pub mod digest;
pub mod directive;
pub mod facts;
pub mod parser;

pub use directive::{parse_directive, Directive, PrecisionDecl, PrecisionUnit, RangeDecl, SpecDirectiveError};
pub use facts::{AreaCategory, FactsOrigin, GeoRegion, SpecFacts, UsageClass};
pub use parser::{parse_spec, SpecParser, SpecParserConfig};
