use super::{RewriteTemplate, TemplateConfig, MARKER};
use crate::optimization::OptimizationId;
use rangeopt_spec::SpecFacts;
use regex::Regex;

/// Name of the first injected constant; its presence marks the block.
const CENTER_LAT: &str = "GEO_ZONE_LAT_CENTER";

/// Injects `#define`s for the zone center and its per-degree distance scale
/// right after the leading preprocessor block.
pub struct PrecomputeZoneConstants {
    area_ceiling_km2: f64,
    meters_per_degree: f64,
    /// Blank, comment and `#` lines at the top of the file.
    prologue: Regex,
    directive: Regex,
}

impl PrecomputeZoneConstants {
    pub fn new(config: &TemplateConfig) -> Self {
        Self {
            area_ceiling_km2: config.constants_area_ceiling_km2,
            meters_per_degree: config.meters_per_degree,
            prologue: Regex::new(
                r"\A(?:[ \t]*(?:#[^\n]*|//[^\n]*|/\*(?:[^*]|\*+[^*/])*\*+/[ \t]*)?(?:\n|\z))*",
            )
            .unwrap(),
            directive: Regex::new(r"(?m)^[ \t]*#[ \t]*(?:include|define)\b[^\n]*(?:\n|\z)").unwrap(),
        }
    }

    /// End of the last `#include`/`#define` in the file's prologue, or 0.
    /// Directives after the first line of code never move the insertion point.
    fn insertion_point(&self, text: &str) -> usize {
        let Some(prologue) = self.prologue.find(text) else {
            return 0;
        };
        self.directive
            .find_iter(prologue.as_str())
            .last()
            .map_or(0, |m| m.end())
    }

    fn block(&self, lat: f64, lon: f64, area: f64) -> String {
        let lat_rad = lat.to_radians();
        let cos_lat = lat_rad.cos();
        format!(
            "\n// {MARKER} precomputed zone constants\n\
             // zone center ({lat:.6}, {lon:.6}), area {area:.1} km²\n\
             #define {CENTER_LAT}  {lat:.6}\n\
             #define GEO_ZONE_LON_CENTER  {lon:.6}\n\
             #define GEO_ZONE_LAT_RAD     {lat_rad:.6}\n\
             #define GEO_ZONE_COS_LAT     {cos_lat:.6}\n\
             #define GEO_LAT_TO_METERS    {:.1}\n\
             #define GEO_LON_TO_METERS    {:.1}\n\n",
            self.meters_per_degree,
            self.meters_per_degree * cos_lat,
        )
    }
}

impl RewriteTemplate for PrecomputeZoneConstants {
    fn id(&self) -> OptimizationId {
        OptimizationId::PrecomputeConstants
    }

    fn precondition(&self, facts: &SpecFacts) -> bool {
        facts
            .area_km2()
            .is_some_and(|area| area <= self.area_ceiling_km2)
            && facts.center().is_some()
    }

    fn rewrite(&self, text: &str, facts: &SpecFacts, _confidence: f64) -> String {
        if text.contains(CENTER_LAT) {
            return text.to_string();
        }
        let Some((lat, lon)) = facts.center() else {
            return text.to_string();
        };
        let block = self.block(lat, lon, facts.area_km2().unwrap_or(0.0));
        let at = self.insertion_point(text);
        let mut out = String::with_capacity(text.len() + block.len());
        out.push_str(&text[..at]);
        out.push_str(&block);
        out.push_str(text[at..].trim_start_matches('\n'));
        out
    }
}
