use super::{matching_brace, RewriteTemplate, TemplateConfig, MARKER};
use crate::optimization::OptimizationId;
use rangeopt_spec::facts::LATITUDE;
use rangeopt_spec::SpecFacts;
use regex::Regex;

/// Replaces a great-circle distance body with an equirectangular
/// approximation scaled for the zone's latitude. The original body is kept
/// below the new one as a comment.
pub struct PlanarDistance {
    area_ceiling_km2: f64,
    meters_per_degree: f64,
    function_head: Regex,
    great_circle: Vec<Regex>,
}

const PLANAR_MARKER: &str = "planar distance approximation";

impl PlanarDistance {
    pub fn new(config: &TemplateConfig) -> Self {
        Self {
            area_ceiling_km2: config.planar_area_ceiling_km2,
            meters_per_degree: config.meters_per_degree,
            function_head: Regex::new(
                r"\b(double|float)\s+(\w*[Dd]istance\w*)\s*\(([^()]*)\)\s*\{",
            )
            .unwrap(),
            great_circle: [r"\bsin\s*\(", r"\bcos\s*\(", r"\batan2\s*\("]
                .iter()
                .map(|p| Regex::new(p).unwrap())
                .collect(),
        }
    }

    fn is_great_circle(&self, body: &str) -> bool {
        !body.contains(PLANAR_MARKER) && self.great_circle.iter().all(|re| re.is_match(body))
    }

    fn planar_body(&self, indent: &str, ret: &str, params: &[&str], facts: &SpecFacts, original: &str) -> String {
        let center_lat = facts
            .bounds(LATITUDE)
            .map(|(min, max)| (min + max) / 2.0)
            .unwrap_or(0.0);
        let lon_to_meters = self.meters_per_degree * center_lat.to_radians().cos();
        let area = facts.area_km2().unwrap_or(0.0);
        let (lat1, lon1, lat2, lon2) = (params[0], params[1], params[2], params[3]);

        let mut body = String::new();
        body.push_str(&format!("{{\n{indent}// {MARKER} {PLANAR_MARKER} (zone area {area:.1} km²)\n"));
        body.push_str(&format!("{indent}const {ret} LAT_TO_METERS = {:.1};\n", self.meters_per_degree));
        body.push_str(&format!(
            "{indent}const {ret} LON_TO_METERS = {lon_to_meters:.1}; /* at latitude {center_lat:.6} */\n"
        ));
        body.push_str(&format!("{indent}{ret} dlat_m = ({lat2} - {lat1}) * LAT_TO_METERS;\n"));
        body.push_str(&format!("{indent}{ret} dlon_m = ({lon2} - {lon1}) * LON_TO_METERS;\n"));
        body.push_str(&format!("{indent}return sqrt(dlat_m * dlat_m + dlon_m * dlon_m);\n"));
        body.push_str(&format!("{indent}// great-circle original:\n"));
        for line in original.lines().filter(|l| !l.trim().is_empty()) {
            // A trailing backslash would splice the next line into the comment.
            let line = line.trim_end().trim_end_matches('\\');
            body.push_str(&format!("{indent}//{line}\n"));
        }
        body.push('}');
        body
    }
}

/// Last identifier of each comma-separated parameter declaration.
fn parameter_names(params: &str) -> Vec<&str> {
    params
        .split(',')
        .filter_map(|p| {
            p.split('[')
                .next()?
                .rsplit(|c: char| !(c.is_alphanumeric() || c == '_'))
                .find(|s| !s.is_empty())
        })
        .collect()
}

impl RewriteTemplate for PlanarDistance {
    fn id(&self) -> OptimizationId {
        OptimizationId::PlanarDistance
    }

    fn precondition(&self, facts: &SpecFacts) -> bool {
        facts
            .area_km2()
            .is_some_and(|area| area <= self.area_ceiling_km2)
    }

    fn rewrite(&self, text: &str, facts: &SpecFacts, _confidence: f64) -> String {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for caps in self.function_head.captures_iter(text) {
            let Some(head) = caps.get(0) else {
                continue;
            };
            if head.start() < cursor {
                continue;
            }
            let params = parameter_names(&caps[3]);
            if params.len() != 4 {
                continue;
            }
            let open = head.end() - 1;
            let Some(close) = matching_brace(text, open) else {
                continue;
            };
            let body = &text[open + 1..close];
            if !self.is_great_circle(body) {
                continue;
            }
            let indent = body
                .lines()
                .find(|l| !l.trim().is_empty())
                .map(|l| &l[..l.len() - l.trim_start().len()])
                .filter(|i| !i.is_empty())
                .unwrap_or("    ");

            out.push_str(&text[cursor..open]);
            out.push_str(&self.planar_body(indent, &caps[1], &params, facts, body));
            cursor = close + 1;
            tracing::debug!(function = &caps[2], "replaced great-circle distance");
        }
        out.push_str(&text[cursor..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rangeopt_spec::parse_spec;

    const SRC: &str = r#"#include <math.h>

double calculateDistance(generic_latitude lat1, generic_longitude lon1, generic_latitude lat2, generic_longitude lon2) {
    double dlat = (lat2 - lat1) * M_PI / 180.0;
    double dlon = (lon2 - lon1) * M_PI / 180.0;
    double a = sin(dlat / 2) * sin(dlat / 2) + cos(lat1) * cos(lat2) * sin(dlon / 2) * sin(dlon / 2);
    double c = 2 * atan2(sqrt(a), sqrt(1 - a));
    return 6371000.0 * c;
}

int main(void) {
    return (int)calculateDistance(0, 0, 1, 1);
}
"#;

    fn small_zone() -> SpecFacts {
        parse_spec(Some(
            "range latitude == [-16.40 degrees, -16.32 degrees]\n\
             range longitude == [-71.60 degrees, -71.52 degrees]\n",
        ))
    }

    #[test]
    fn parameter_names_are_last_identifiers() {
        assert_eq!(
            parameter_names("const double lat1, double *lon1, float lat2[], generic_longitude lon2"),
            vec!["lat1", "lon1", "lat2", "lon2"]
        );
        assert!(parameter_names("void").len() == 1);
        assert!(parameter_names("").is_empty());
    }

    #[test]
    fn replaces_haversine_and_keeps_original_as_comment() {
        let t = PlanarDistance::new(&TemplateConfig::default());
        let out = t.transform(SRC, &small_zone(), 0.9);
        assert!(out.contains("double dlat_m = (lat2 - lat1) * LAT_TO_METERS;"));
        assert!(out.contains("double dlon_m = (lon2 - lon1) * LON_TO_METERS;"));
        assert!(out.contains("//    double c = 2 * atan2(sqrt(a), sqrt(1 - a));"));
        // No live trigonometry left in the distance body.
        let live: Vec<&str> = out.lines().filter(|l| !l.trim_start().starts_with("//")).collect();
        assert!(!live.iter().any(|l| l.contains("atan2(")));
        // Other functions untouched.
        assert!(out.contains("int main(void) {\n    return (int)calculateDistance(0, 0, 1, 1);\n}"));
    }

    #[test]
    fn longitude_scale_follows_zone_latitude() {
        let t = PlanarDistance::new(&TemplateConfig::default());
        let out = t.transform(SRC, &small_zone(), 0.9);
        let center: f64 = (-16.40 + -16.32) / 2.0;
        let expected = 111_320.0 * center.to_radians().cos();
        assert!(out.contains(&format!("LON_TO_METERS = {expected:.1};")));
    }

    #[test]
    fn wide_zone_is_a_no_op() {
        let t = PlanarDistance::new(&TemplateConfig::default());
        assert_eq!(t.transform(SRC, &SpecFacts::conservative_default(), 0.9), SRC);
    }

    #[test]
    fn idempotent() {
        let t = PlanarDistance::new(&TemplateConfig::default());
        let once = t.transform(SRC, &small_zone(), 0.9);
        assert_eq!(t.transform(&once, &small_zone(), 0.9), once);
    }
}
