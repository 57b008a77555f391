use super::{optimized_alias, rename_identifier, RewriteTemplate, TemplateConfig};
use crate::optimization::OptimizationId;
use rangeopt_spec::SpecFacts;
use regex::{Captures, Regex};

/// `typedef double generic_latitude;` becomes `typedef float optimized_latitude;`
/// with every use of the alias renamed, and `double lat*` / `double lon*`
/// declarations become `float`.
pub struct NarrowCoordinateType {
    area_ceiling_km2: f64,
    alias_typedef: Regex,
    coordinate_decl: Regex,
}

impl NarrowCoordinateType {
    pub fn new(config: &TemplateConfig) -> Self {
        Self {
            area_ceiling_km2: config.narrow_area_ceiling_km2,
            alias_typedef: Regex::new(r"\btypedef\s+double\s+(\w*(?:latitude|longitude))\s*;").unwrap(),
            coordinate_decl: Regex::new(r"\bdouble(\s+)((?:lat|lon)\w*)\b").unwrap(),
        }
    }
}

impl RewriteTemplate for NarrowCoordinateType {
    fn id(&self) -> OptimizationId {
        OptimizationId::NarrowCoordinateType
    }

    fn precondition(&self, facts: &SpecFacts) -> bool {
        facts
            .area_km2()
            .is_some_and(|area| area <= self.area_ceiling_km2)
    }

    fn rewrite(&self, text: &str, _facts: &SpecFacts, _confidence: f64) -> String {
        let aliases: Vec<String> = self
            .alias_typedef
            .captures_iter(text)
            .map(|caps| caps[1].to_string())
            .collect();

        let mut out = self
            .alias_typedef
            .replace_all(text, |caps: &Captures| {
                format!("typedef float {};", optimized_alias(&caps[1]))
            })
            .into_owned();
        for alias in &aliases {
            out = rename_identifier(&out, alias, &optimized_alias(alias));
        }
        self.coordinate_decl
            .replace_all(&out, "float${1}${2}")
            .into_owned()
    }
}
