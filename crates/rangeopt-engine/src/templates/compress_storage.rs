use super::{optimized_alias, rename_identifier, RewriteTemplate, TemplateConfig, MARKER};
use crate::optimization::OptimizationId;
use rangeopt_spec::facts::{FACT_SATELLITES_MAX, FACT_SPEED_MAX, FACT_SPEED_MIN};
use rangeopt_spec::SpecFacts;
use regex::{Captures, Regex};

/// Narrows speed and satellite-count storage to `unsigned char` when the
/// declared maxima fit, repairing `km/h` format directives that printed the
/// speed as a floating value.
pub struct CompressStorage {
    single_byte_max: f64,
    speed_typedef: Regex,
    satellites_typedef: Regex,
    speed_format: Regex,
}

impl CompressStorage {
    pub fn new(config: &TemplateConfig) -> Self {
        Self {
            single_byte_max: config.single_byte_max,
            speed_typedef: Regex::new(r"\btypedef\s+(?:double|float)\s+(\w*speed)\s*;").unwrap(),
            satellites_typedef: Regex::new(
                r"\btypedef\s+(?:unsigned\s+|signed\s+)?(?:int|short|long)\s+(\w*satellites)\s*;",
            )
            .unwrap(),
            speed_format: Regex::new(
                r#"\bprintf\s*\(\s*"([^"%]*)%[-+ #0]*\d*(?:\.\d+)?[fF]([^"]*km/h[^"]*)"\s*,\s*([\w.>-]*speed)\s*\)"#,
            )
            .unwrap(),
        }
    }

    fn fits(&self, facts: &SpecFacts, max_fact: &str, min_fact: Option<&str>) -> bool {
        let min_ok = min_fact
            .and_then(|name| facts.get(name))
            .map_or(true, |min| min >= 0.0);
        min_ok
            && facts
                .get(max_fact)
                .is_some_and(|max| max >= 0.0 && max <= self.single_byte_max)
    }

    fn speed_fits(&self, facts: &SpecFacts) -> bool {
        self.fits(facts, FACT_SPEED_MAX, Some(FACT_SPEED_MIN))
    }

    fn satellites_fit(&self, facts: &SpecFacts) -> bool {
        self.fits(facts, FACT_SATELLITES_MAX, Some("satellites_min"))
    }

    fn narrow(&self, text: &str, typedef: &Regex) -> (String, Vec<String>) {
        let aliases: Vec<String> = typedef
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect();
        let mut out = typedef
            .replace_all(text, |caps: &Captures| {
                format!(
                    "typedef unsigned char {};  // {MARKER} 0-255 sufficient",
                    optimized_alias(&caps[1])
                )
            })
            .into_owned();
        for alias in &aliases {
            out = rename_identifier(&out, alias, &optimized_alias(alias));
        }
        (out, aliases)
    }
}

impl RewriteTemplate for CompressStorage {
    fn id(&self) -> OptimizationId {
        OptimizationId::CompressDataTypes
    }

    fn precondition(&self, facts: &SpecFacts) -> bool {
        self.speed_fits(facts) || self.satellites_fit(facts)
    }

    fn rewrite(&self, text: &str, facts: &SpecFacts, _confidence: f64) -> String {
        let mut out = text.to_string();
        if self.speed_fits(facts) {
            let (narrowed, aliases) = self.narrow(&out, &self.speed_typedef);
            out = narrowed;
            if !aliases.is_empty() {
                out = self
                    .speed_format
                    .replace_all(&out, r#"printf("${1}%d${2}", ${3})"#)
                    .into_owned();
            }
        }
        if self.satellites_fit(facts) {
            out = self.narrow(&out, &self.satellites_typedef).0;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = r#"typedef double generic_speed;
typedef int generic_satellites;

void report(generic_speed speed, generic_satellites sats) {
    printf("speed: %.1f km/h\n", speed);
    printf("sats: %d\n", sats);
    printf("ratio: %.2f\n", speed);
}
"#;

    fn facts(speed_max: Option<f64>, sats_max: Option<f64>) -> SpecFacts {
        let mut f = SpecFacts::empty();
        if let Some(max) = speed_max {
            f.insert(FACT_SPEED_MIN, 0.0);
            f.insert(FACT_SPEED_MAX, max);
        }
        if let Some(max) = sats_max {
            f.insert(FACT_SATELLITES_MAX, max);
        }
        f
    }

    #[test]
    fn narrows_speed_and_repairs_format() {
        let t = CompressStorage::new(&TemplateConfig::default());
        let out = t.transform(SRC, &facts(Some(120.0), None), 0.9);
        assert!(out.contains("typedef unsigned char optimized_speed;"));
        assert!(out.contains("void report(optimized_speed speed, generic_satellites sats)"));
        assert!(out.contains(r#"printf("speed: %d km/h\n", speed);"#));
        // Only km/h displays are repaired.
        assert!(out.contains(r#"printf("ratio: %.2f\n", speed);"#));
        assert!(out.contains("typedef int generic_satellites;"));
    }

    #[test]
    fn narrows_satellites_independently() {
        let t = CompressStorage::new(&TemplateConfig::default());
        let out = t.transform(SRC, &facts(Some(300.0), Some(24.0)), 0.9);
        assert!(out.contains("typedef double generic_speed;"));
        assert!(out.contains("typedef unsigned char optimized_satellites;"));
        assert!(out.contains("optimized_satellites sats"));
    }

    #[test]
    fn unknown_maxima_never_fit() {
        let t = CompressStorage::new(&TemplateConfig::default());
        assert!(!t.precondition(&facts(None, None)));
        assert!(!t.precondition(&SpecFacts::conservative_default()));
        let mut negative = facts(Some(100.0), None);
        negative.insert(FACT_SPEED_MIN, -5.0);
        assert!(!t.precondition(&negative));
        assert_eq!(t.transform(SRC, &facts(Some(256.0), Some(400.0)), 0.9), SRC);
    }

    #[test]
    fn idempotent() {
        let t = CompressStorage::new(&TemplateConfig::default());
        let f = facts(Some(90.0), Some(12.0));
        let once = t.transform(SRC, &f, 0.9);
        assert_eq!(t.transform(&once, &f, 0.9), once);
    }
}
