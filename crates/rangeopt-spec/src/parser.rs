//! Tolerant specification → facts builder.
//!
//! Each fact is extracted independently: a malformed directive is logged and
//! skipped, a missing fact is simply absent. Only when *nothing* usable is found
//! (or the file is missing) do we substitute `SpecFacts::conservative_default`.

use crate::directive::{parse_directive, Directive, PrecisionUnit};
use crate::facts::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds and conversion constants used to derive secondary facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecParserConfig {
    /// Kilometres per degree of latitude.
    pub km_per_degree: f64,
    /// Average cos(latitude) correction applied to longitude widths.
    pub longitude_correction: f64,
    /// A coordinate range narrower than this (degrees) is "small".
    pub small_range_degrees: f64,
    /// Upper bounds (exclusive) of the micro / small / medium area buckets.
    pub area_buckets_km2: [f64; 3],
    /// Upper bounds (inclusive) of the urban / highway usage classes.
    pub speed_buckets_kmh: [f64; 2],
}

impl Default for SpecParserConfig {
    fn default() -> Self {
        Self {
            km_per_degree: 111.32,
            longitude_correction: 0.96,
            small_range_degrees: 1.0,
            area_buckets_km2: [100.0, 10_000.0, 1_000_000.0],
            speed_buckets_kmh: [50.0, 120.0],
        }
    }
}

impl SpecParserConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.km_per_degree > 0.0) || !(self.longitude_correction > 0.0) {
            return Err("degree conversion constants must be positive".to_string());
        }
        if !(self.small_range_degrees > 0.0) {
            return Err("small_range_degrees must be positive".to_string());
        }
        let [a, b, c] = self.area_buckets_km2;
        if !(a < b && b < c) {
            return Err("area_buckets_km2 must be strictly ascending".to_string());
        }
        let [s, h] = self.speed_buckets_kmh;
        if !(s < h) {
            return Err("speed_buckets_kmh must be strictly ascending".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SpecParser {
    config: SpecParserConfig,
    records: Regex,
}

impl Default for SpecParser {
    fn default() -> Self {
        Self::new(SpecParserConfig::default())
    }
}

/// Parse with the default configuration.
pub fn parse_spec(text: Option<&str>) -> SpecFacts {
    SpecParser::default().parse(text)
}

impl SpecParser {
    pub fn new(config: SpecParserConfig) -> Self {
        Self {
            config,
            records: Regex::new(r"(?i)(?:registros analizados|records analyzed)\s*:\s*(\d+)")
                .unwrap(),
        }
    }

    pub fn config(&self) -> &SpecParserConfig {
        &self.config
    }

    /// Read and parse a specification file.
    ///
    /// A missing or unreadable file is not an error: it yields the conservative
    /// default facts.
    pub fn parse_file(&self, path: &Path) -> SpecFacts {
        match std::fs::read_to_string(path) {
            Ok(text) => self.parse(Some(&text)),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "specification unavailable; using conservative defaults"
                );
                SpecFacts::conservative_default()
            }
        }
    }

    pub fn parse(&self, text: Option<&str>) -> SpecFacts {
        let Some(text) = text else {
            tracing::warn!("no specification given; using conservative defaults");
            return SpecFacts::conservative_default();
        };

        let mut facts = SpecFacts::empty();
        let mut primary = 0usize;

        for (idx, line) in text.lines().enumerate() {
            match parse_directive(line) {
                None => {}
                Some(Ok(Directive::Range(range))) => {
                    facts.insert(format!("{}_min", range.name), range.min);
                    facts.insert(format!("{}_max", range.name), range.max);
                    facts.insert(format!("{}_range", range.name), range.width());
                    primary += 1;
                }
                Some(Ok(Directive::Precision(precision))) => {
                    if let PrecisionUnit::Unit(unit) = &precision.unit {
                        tracing::debug!(name = %precision.name, unit = %unit, "precision with explicit unit");
                    }
                    facts.insert(format!("{}_precision", precision.name), precision.value);
                    primary += 1;
                }
                Some(Err(err)) => {
                    tracing::warn!(line = idx + 1, error = %err, "skipping malformed specification directive");
                }
            }
        }

        if let Some(records) = self
            .records
            .captures(text)
            .and_then(|caps| caps[1].parse::<f64>().ok())
        {
            facts.insert(FACT_TRAINING_RECORDS, records);
            primary += 1;
        }

        if primary == 0 {
            tracing::warn!("specification yielded no facts; using conservative defaults");
            return SpecFacts::conservative_default();
        }

        facts.region = detect_region(text);
        self.derive(&mut facts);
        facts
    }

    /// Compute derived facts from primary ones (deterministic, idempotent).
    pub fn derive(&self, facts: &mut SpecFacts) {
        let cfg = &self.config;

        for axis in [LATITUDE, LONGITUDE] {
            if let Some(width) = facts.get(&format!("{axis}_range")) {
                let small = if width.abs() < cfg.small_range_degrees { 1.0 } else { 0.0 };
                facts.insert(format!("{axis}_is_small_range"), small);
            }
        }

        if let (Some(lat), Some(lon)) = (facts.get(FACT_LATITUDE_RANGE), facts.get(FACT_LONGITUDE_RANGE)) {
            let lat_km = lat * cfg.km_per_degree;
            let lon_km = lon * cfg.km_per_degree * cfg.longitude_correction;
            let area = lat_km * lon_km;
            facts.insert(FACT_AREA_KM2, area);
            facts.insert(FACT_AREA_CATEGORY, self.area_category(area).as_index() as f64);
        }

        if let Some(speed_max) = facts.get(FACT_SPEED_MAX) {
            facts.insert(FACT_VEHICLE_TYPE, self.usage_class(speed_max).as_index() as f64);
        }
    }

    pub fn area_category(&self, area_km2: f64) -> AreaCategory {
        let [micro, small, medium] = self.config.area_buckets_km2;
        if area_km2 < micro {
            AreaCategory::Micro
        } else if area_km2 < small {
            AreaCategory::Small
        } else if area_km2 < medium {
            AreaCategory::Medium
        } else {
            AreaCategory::Large
        }
    }

    pub fn usage_class(&self, speed_max_kmh: f64) -> UsageClass {
        let [urban, highway] = self.config.speed_buckets_kmh;
        if speed_max_kmh <= urban {
            UsageClass::Urban
        } else if speed_max_kmh <= highway {
            UsageClass::Highway
        } else {
            UsageClass::HighSpeed
        }
    }
}

fn detect_region(text: &str) -> GeoRegion {
    if text.contains("Perú") || text.contains("Peru") {
        GeoRegion::SouthAmerica
    } else if text.contains("España") || text.contains("Spain") {
        GeoRegion::Europe
    } else {
        GeoRegion::Unknown
    }
}
