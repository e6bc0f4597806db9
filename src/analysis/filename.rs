//! Keyword heuristics over model filenames.

use regex::Regex;
use std::sync::LazyLock;

/// Category keyword table. Keywords overlap across categories on purpose
/// so that one filename can pick up several tags.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "functional",
        &[
            "bracket", "mount", "holder", "clip", "hook", "stand", "organizer", "adapter", "tool",
            "jig", "fixture", "rack", "shelf",
        ],
    ),
    (
        "decorative",
        &[
            "vase", "pot", "planter", "ornament", "decoration", "statue", "sculpture",
            "plant pot",
        ],
    ),
    (
        "toy",
        &[
            "toy", "figure", "miniature", "figurine", "character", "dragon", "robot", "doll",
            "action figure",
        ],
    ),
    (
        "mechanical",
        &["gear", "bearing", "hinge", "wheel", "axle", "pulley", "spring", "cam", "crank"],
    ),
    (
        "storage",
        &["box", "case", "container", "tray", "drawer", "bin", "organizer", "shelf"],
    ),
    (
        "household",
        &[
            "coaster", "opener", "spoon", "fork", "cup", "plate", "bowl", "bottle", "dispenser",
            "holder",
        ],
    ),
    ("game", &["dice", "token", "card", "board", "chess", "puzzle", "mini"]),
    (
        "electronics",
        &["enclosure", "raspberry", "arduino", "pi", "esp", "pcb", "cable", "case", "box"],
    ),
    ("automotive", &["car", "vehicle", "wheel", "bumper", "spoiler", "mount"]),
    ("medical", &["splint", "brace", "prosthetic", "organizer", "holder"]),
    (
        "wearable",
        &[
            "headband", "glasses", "earring", "necklace", "bracelet", "ring", "pendant", "jewelry",
            "costume", "mask", "helmet", "crown", "tiara", "badge", "pin",
        ],
    ),
    (
        "kitchen",
        &["holder", "organizer", "rack", "dispenser", "container", "utensil"],
    ),
    ("office", &["organizer", "holder", "stand", "caddy", "desk"]),
    ("garden", &["planter", "pot", "bed", "fence"]),
    ("tool", &["holder", "organizer", "stand", "rack", "wall mount"]),
];

/// Keyword rules evaluated after the category table, in order.
const RULES: &[(&[&str], &[&str])] = &[
    (&["rack"], &["storage", "functional"]),
    (&["measure", "tape"], &["tool", "functional"]),
    (&["remix", "mod", "modified"], &["remix"]),
    (&["benchy", "3dbenchy"], &["calibration"]),
    (&["calibration", "test"], &["calibration"]),
    (&["prototype"], &["prototype"]),
    (&["bambu", "ams"], &["bambu-lab"]),
    (&["prusa", "mk3", "mk4"], &["prusa"]),
    (&["ender", "creality"], &["creality"]),
    (&["flexible", "tpu", "flex"], &["flexible"]),
    (
        &["strong", "reinforced", "heavy", "structural"],
        &["reinforced"],
    ),
    (&["light", "lightweight"], &["lightweight"]),
];

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"20\d{2}").unwrap());
static PART_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"part\s*\d+").unwrap());
static PIECE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+.*piece").unwrap());

/// Tags and features inferred from a filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenameAnalysis {
    /// Unique tags in the order they were first matched.
    pub tags: Vec<&'static str>,
    /// Free-text features; only the year hint populates this.
    pub features: Vec<String>,
}

impl FilenameAnalysis {
    fn tag(&mut self, tag: &'static str) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Classify a filename by substring keywords.
pub fn analyze_filename(file_name: &str) -> FilenameAnalysis {
    let lower = file_name.to_lowercase();
    let mut analysis = FilenameAnalysis::default();

    for &(category, keywords) in CATEGORIES {
        if contains_any(&lower, keywords) {
            analysis.tag(category);
        }
    }

    if contains_any(&lower, &["spool", "filament"]) {
        analysis.tag("3d-printing");
        if lower.contains("holder") {
            analysis.tag("functional");
        }
    }

    if let Some(year) = YEAR_RE.find(&lower) {
        analysis.features.push(format!("{} themed", year.as_str()));
    }

    for &(keywords, tags) in RULES {
        if contains_any(&lower, keywords) {
            for &tag in tags {
                analysis.tag(tag);
            }
        }
    }

    if contains_any(&lower, &["assembly", "set"])
        || PART_RE.is_match(&lower)
        || PIECE_RE.is_match(&lower)
    {
        analysis.tag("assembly");
    }

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holder_hits_overlapping_categories() {
        let analysis = analyze_filename("phone_holder_v2.stl");
        for tag in ["functional", "household", "medical", "kitchen", "office", "tool"] {
            assert!(analysis.tags.contains(&tag), "missing {tag}");
        }
        assert!(analysis.features.is_empty());
    }

    #[test]
    fn test_tags_are_unique() {
        let analysis = analyze_filename("Organizer Rack Holder.3mf");
        let mut sorted = analysis.tags.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), analysis.tags.len());
        assert!(analysis.tags.contains(&"storage"));
    }

    #[test]
    fn test_case_insensitive_and_brand_rules() {
        let analysis = analyze_filename("BAMBU_Benchy_TPU.3MF");
        assert!(analysis.tags.contains(&"bambu-lab"));
        assert!(analysis.tags.contains(&"calibration"));
        assert!(analysis.tags.contains(&"flexible"));
    }

    #[test]
    fn test_spool_holder() {
        let analysis = analyze_filename("spool_holder.stl");
        assert!(analysis.tags.contains(&"3d-printing"));
        assert!(analysis.tags.contains(&"functional"));
    }

    #[test]
    fn test_year_feature_first_match() {
        let analysis = analyze_filename("xmas_2023_ornament_2024.stl");
        assert_eq!(analysis.features, vec!["2023 themed".to_string()]);
        assert!(analysis.tags.contains(&"decorative"));
    }

    #[test]
    fn test_assembly_patterns() {
        assert!(analyze_filename("rotor part 3.stl").tags.contains(&"assembly"));
        assert!(analyze_filename("rotor_part12.stl").tags.contains(&"assembly"));
        assert!(analyze_filename("4 piece puzzle.stl").tags.contains(&"assembly"));
        assert!(!analyze_filename("rotor.stl").tags.contains(&"assembly"));
    }

    #[test]
    fn test_no_keywords() {
        let analysis = analyze_filename("xyz.gcode");
        assert!(analysis.tags.is_empty());
        assert!(analysis.features.is_empty());
        assert!(analyze_filename("").tags.is_empty());
    }
}
