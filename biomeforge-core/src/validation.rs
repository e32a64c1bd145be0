//! Table Checks - Rule/Policy Separation
//!
//! Rules inspect a manifest and produce structured violations.
//! The validator decides whether the manifest is usable: any error blocks a
//! run, warnings and info are reported only.

use serde::{Deserialize, Serialize};

use crate::manifest::BiomeManifest;
use crate::tables::{Category, RangeEntry};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    #[serde(default)]
    pub category: Option<Category>,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn by_severity(&self, severity: ViolationSeverity) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(move |v| v.severity == severity)
    }
}

pub trait TableRule {
    fn name(&self) -> &'static str;
    fn check(&self, manifest: &BiomeManifest) -> Vec<ValidationViolation>;
}

fn describe(entry: &RangeEntry) -> String {
    format!("{}..={} ({})", entry.low, entry.high, entry.asset)
}

// --- Concrete Rules ---

/// A range whose low bound exceeds its high bound can never match.
pub struct InvertedRangeRule;

impl TableRule for InvertedRangeRule {
    fn name(&self) -> &'static str { "inverted_range" }

    fn check(&self, manifest: &BiomeManifest) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for category in Category::ALL {
            for entry in manifest.tables.table(category).entries() {
                if entry.low > entry.high {
                    violations.push(ValidationViolation {
                        rule: self.name().to_string(),
                        severity: ViolationSeverity::Error,
                        category: Some(category),
                        message: format!("Range for {} is inverted", entry.asset),
                        expected: Some("low <= high".to_string()),
                        actual: Some(describe(entry)),
                        remediation: vec!["Swap the bounds".to_string()],
                    });
                }
            }
        }
        violations
    }
}

/// Overlapping ranges resolve to the first-listed entry.
pub struct OverlapRule;

impl TableRule for OverlapRule {
    fn name(&self) -> &'static str { "overlap" }

    fn check(&self, manifest: &BiomeManifest) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for category in Category::ALL {
            let entries: Vec<&RangeEntry> = manifest.tables
                .table(category)
                .entries()
                .iter()
                .filter(|e| e.low <= e.high)
                .collect();
            for (i, first) in entries.iter().enumerate() {
                for second in &entries[i + 1..] {
                    if first.low <= second.high && second.low <= first.high {
                        violations.push(ValidationViolation {
                            rule: self.name().to_string(),
                            severity: ViolationSeverity::Warning,
                            category: Some(category),
                            message: format!(
                                "Ranges overlap; {} shadows {} on shared draws",
                                first.asset, second.asset
                            ),
                            expected: Some("disjoint ranges".to_string()),
                            actual: Some(format!("{} and {}", describe(first), describe(second))),
                            remediation: vec!["Narrow one of the ranges".to_string()],
                        });
                    }
                }
            }
        }
        violations
    }
}

/// Draws that no entry covers cause redraws; an empty table blocks every draw.
pub struct CoverageRule;

impl TableRule for CoverageRule {
    fn name(&self) -> &'static str { "coverage" }

    fn check(&self, manifest: &BiomeManifest) -> Vec<ValidationViolation> {
        let domain = manifest.draw_domain;
        let mut violations = vec![];

        for category in Category::ALL {
            let table = manifest.tables.table(category);
            if table.is_empty() {
                violations.push(ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Error,
                    category: Some(category),
                    message: "Table has no entries".to_string(),
                    expected: Some(format!("ranges covering {}..={}", domain.min, domain.max)),
                    actual: None,
                    remediation: vec![format!("Add at least one {} asset", category)],
                });
                continue;
            }

            let mut ranges: Vec<(u64, u64)> = table
                .entries()
                .iter()
                .filter(|e| e.low <= e.high)
                .map(|e| (e.low as u64, e.high as u64))
                .collect();
            ranges.sort_unstable();

            let mut gaps = vec![];
            let mut cursor = domain.min as u64;
            for (low, high) in ranges {
                if low > cursor {
                    gaps.push((cursor, low - 1));
                }
                cursor = cursor.max(high + 1);
            }
            if cursor <= domain.max as u64 {
                gaps.push((cursor, domain.max as u64));
            }

            for (start, end) in gaps.into_iter().filter(|(start, _)| *start <= domain.max as u64) {
                let end = end.min(domain.max as u64);
                violations.push(ValidationViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Warning,
                    category: Some(category),
                    message: "Draws in this range match no asset".to_string(),
                    expected: Some(format!("coverage of {}..={}", domain.min, domain.max)),
                    actual: Some(format!("gap {}..={}", start, end)),
                    remediation: vec!["Extend a neighbouring range over the gap".to_string()],
                });
            }
        }
        violations
    }
}

/// An inverted draw domain admits no draw, so no source can serve it.
pub struct DomainRule;

impl TableRule for DomainRule {
    fn name(&self) -> &'static str { "draw_domain" }

    fn check(&self, manifest: &BiomeManifest) -> Vec<ValidationViolation> {
        let domain = manifest.draw_domain;
        if !domain.is_empty() {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            category: None,
            message: "Draw domain is empty".to_string(),
            expected: Some("min <= max".to_string()),
            actual: Some(format!("{}..={}", domain.min, domain.max)),
            remediation: vec!["Swap drawDomain.min and drawDomain.max".to_string()],
        }]
    }
}

/// Conflict rules that name assets missing from the tables never fire.
pub struct ConflictReferenceRule;

impl TableRule for ConflictReferenceRule {
    fn name(&self) -> &'static str { "conflict_reference" }

    fn check(&self, manifest: &BiomeManifest) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        let mut unknown = |category: Category, asset: &str| {
            violations.push(ValidationViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Info,
                category: Some(category),
                message: format!("Conflict rule names {} which is not in the {} table", asset, category),
                expected: None,
                actual: Some(asset.to_string()),
                remediation: vec!["Check the asset filename for typos".to_string()],
            });
        };

        for (background, foregrounds) in manifest.conflicts.rules() {
            if !manifest.tables.background.has_asset(background) {
                unknown(Category::Background, background);
            }
            for foreground in foregrounds {
                if !manifest.tables.foreground.has_asset(foreground) {
                    unknown(Category::Foreground, foreground);
                }
            }
        }
        violations
    }
}

/// Runs every rule and applies the blocking policy.
pub struct TableValidator {
    rules: Vec<Box<dyn TableRule>>,
}

impl TableValidator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(DomainRule),
                Box::new(InvertedRangeRule),
                Box::new(OverlapRule),
                Box::new(CoverageRule),
                Box::new(ConflictReferenceRule),
            ],
        }
    }

    pub fn validate(&self, manifest: &BiomeManifest) -> ValidationReport {
        let violations: Vec<_> = self.rules
            .iter()
            .flat_map(|rule| rule.check(manifest))
            .collect();

        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        ValidationReport { valid, violations }
    }
}

impl Default for TableValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: &str) -> BiomeManifest {
        BiomeManifest::from_json(json).unwrap()
    }

    const CLEAN: &str = r#"{
        "drawDomain": {"min": 1, "max": 100},
        "tables": {
            "background": [{"low": 1, "high": 50, "asset": "a.png"}, {"low": 51, "high": 100, "asset": "b.png"}],
            "foreground": [{"low": 1, "high": 100, "asset": "c.png"}],
            "object": [{"low": 1, "high": 100, "asset": "d.png"}]
        },
        "conflicts": {"a.png": ["c.png"]}
    }"#;

    #[test]
    fn test_clean_manifest() {
        let report = TableValidator::new().validate(&manifest(CLEAN));
        assert!(report.valid);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_gap_detected() {
        let m = manifest(r#"{
            "drawDomain": {"min": 1, "max": 100},
            "tables": {
                "background": [{"low": 1, "high": 40, "asset": "a.png"}, {"low": 61, "high": 90, "asset": "b.png"}],
                "foreground": [{"low": 1, "high": 100, "asset": "c.png"}],
                "object": [{"low": 1, "high": 100, "asset": "d.png"}]
            }
        }"#);
        let violations = CoverageRule.check(&m);
        let gaps: Vec<_> = violations.iter().filter_map(|v| v.actual.clone()).collect();
        assert_eq!(gaps, vec!["gap 41..=60".to_string(), "gap 91..=100".to_string()]);
        assert!(violations.iter().all(|v| v.severity == ViolationSeverity::Warning));
    }

    #[test]
    fn test_empty_table_blocks() {
        let m = manifest(r#"{
            "tables": {
                "background": [{"low": 1, "high": 65535, "asset": "a.png"}],
                "foreground": [{"low": 1, "high": 65535, "asset": "c.png"}]
            }
        }"#);
        let report = TableValidator::new().validate(&m);
        assert!(!report.valid);
        assert!(report.has_errors());
        let errors: Vec<_> = report.by_severity(ViolationSeverity::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].category, Some(Category::Object));
    }

    #[test]
    fn test_overlap_and_inverted() {
        let m = manifest(r#"{
            "drawDomain": {"min": 1, "max": 100},
            "tables": {
                "background": [{"low": 1, "high": 60, "asset": "a.png"}, {"low": 50, "high": 100, "asset": "b.png"}],
                "foreground": [{"low": 1, "high": 100, "asset": "c.png"}, {"low": 90, "high": 10, "asset": "x.png"}],
                "object": [{"low": 1, "high": 100, "asset": "d.png"}]
            }
        }"#);
        let overlaps = OverlapRule.check(&m);
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].category, Some(Category::Background));

        let inverted = InvertedRangeRule.check(&m);
        assert_eq!(inverted.len(), 1);
        assert_eq!(inverted[0].severity, ViolationSeverity::Error);
        assert!(!TableValidator::new().validate(&m).valid);
    }

    #[test]
    fn test_unknown_conflict_assets_reported() {
        let m = manifest(r#"{
            "drawDomain": {"min": 1, "max": 100},
            "tables": {
                "background": [{"low": 1, "high": 100, "asset": "a.png"}],
                "foreground": [{"low": 1, "high": 100, "asset": "c.png"}],
                "object": [{"low": 1, "high": 100, "asset": "d.png"}]
            },
            "conflicts": {"ghost.png": ["c.png"], "a.png": ["typo.png"]}
        }"#);
        let report = TableValidator::new().validate(&m);
        assert!(report.valid);
        let infos: Vec<_> = report.by_severity(ViolationSeverity::Info).collect();
        assert_eq!(infos.len(), 2);
    }

    #[test]
    fn test_inverted_domain_blocks() {
        let m = manifest(r#"{
            "drawDomain": {"min": 100, "max": 1},
            "tables": {
                "background": [{"low": 1, "high": 100, "asset": "a.png"}],
                "foreground": [{"low": 1, "high": 100, "asset": "c.png"}],
                "object": [{"low": 1, "high": 100, "asset": "d.png"}]
            }
        }"#);
        let report = TableValidator::new().validate(&m);
        assert!(!report.valid);
        let errors: Vec<_> = report.by_severity(ViolationSeverity::Error).collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "draw_domain");
        assert_eq!(errors[0].actual.as_deref(), Some("100..=1"));
    }
}
