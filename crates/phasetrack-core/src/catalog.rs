//! Step definitions and the backend-phase lookup table.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::constants::WEIGHT_TOTAL;
use crate::errors::TrackError;

/// One named, weighted phase of a multi-phase operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Stable identifier, also the key used in historical averages.
    pub id: String,
    /// Human-readable label.
    pub name: String,
    /// Backend phase key this step maps from.
    pub phase: String,
    /// Additional backend phase keys that map to the same step.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Relative share of total work.
    pub weight: u32,
}

impl Step {
    #[must_use]
    pub fn new(id: &str, name: &str, phase: &str, weight: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            phase: phase.to_string(),
            aliases: Vec::new(),
            weight,
        }
    }

    /// Add backend phase aliases.
    #[must_use]
    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| (*a).to_string()).collect();
        self
    }
}

/// Fold a backend phase name into its lookup form.
///
/// Trims, lowercases ASCII, and maps `-` and spaces to `_`.
#[must_use]
pub fn canonical_phase(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Immutable ordered list of steps with a phase lookup table.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Vec<Step>,
    by_phase: HashMap<String, usize>,
    total_weight: u32,
}

impl StepCatalog {
    /// Build a catalog, validating ids, phase keys, and the weight sum.
    pub fn new(steps: Vec<Step>) -> Result<Self, TrackError> {
        if steps.is_empty() {
            return Err(TrackError::Catalog("catalog has no steps".into()));
        }

        let mut ids = HashSet::new();
        let mut by_phase = HashMap::new();
        for (index, step) in steps.iter().enumerate() {
            if !ids.insert(step.id.as_str()) {
                return Err(TrackError::Catalog(format!(
                    "duplicate step id {:?}",
                    step.id
                )));
            }
            for key in std::iter::once(&step.phase).chain(step.aliases.iter()) {
                let key = canonical_phase(key);
                if key.is_empty() {
                    return Err(TrackError::Catalog(format!(
                        "step {:?} has an empty phase key",
                        step.id
                    )));
                }
                if by_phase.insert(key.clone(), index).is_some() {
                    return Err(TrackError::Catalog(format!(
                        "phase {key:?} maps to more than one step"
                    )));
                }
            }
        }

        let total_weight: u32 = steps.iter().map(|s| s.weight).sum();
        if total_weight != WEIGHT_TOTAL {
            return Err(TrackError::Catalog(format!(
                "step weights sum to {total_weight}, expected {WEIGHT_TOTAL}"
            )));
        }

        Ok(Self {
            steps,
            by_phase,
            total_weight,
        })
    }

    /// Steps of the document-analysis dashboard.
    #[must_use]
    pub fn document_analysis() -> Self {
        Self::from_preset(vec![
            Step::new("upload", "Uploading document", "upload", 5)
                .with_aliases(&["uploading", "queued"]),
            Step::new("extract", "Extracting text", "extraction", 15)
                .with_aliases(&["extract", "ocr"]),
            Step::new("analyze", "Analyzing structure", "analysis", 20)
                .with_aliases(&["analyze", "parsing"]),
            Step::new("check", "Running quality checks", "checking", 35)
                .with_aliases(&["validation", "quality_checks"]),
            Step::new("report", "Building report", "report", 25)
                .with_aliases(&["reporting", "finalizing"]),
        ])
    }

    /// Steps of the URL-validation dashboard.
    #[must_use]
    pub fn url_validation() -> Self {
        Self::from_preset(vec![
            Step::new("collect", "Collecting URLs", "collecting", 10)
                .with_aliases(&["queued", "extracting_urls"]),
            Step::new("resolve", "Resolving domains", "resolving", 20)
                .with_aliases(&["dns", "resolving_domains"]),
            Step::new("validate", "Checking URLs", "validating", 60)
                .with_aliases(&["checking", "checking_urls"]),
            Step::new("summarize", "Summarizing results", "summarizing", 10)
                .with_aliases(&["summary", "finalizing"]),
        ])
    }

    fn from_preset(steps: Vec<Step>) -> Self {
        Self::new(steps).expect("built-in step catalogs are valid")
    }

    /// Index of the step a backend phase maps to, if any.
    #[must_use]
    pub fn index_of_phase(&self, phase: &str) -> Option<usize> {
        self.by_phase.get(&canonical_phase(phase)).copied()
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn total_weight(&self) -> u32 {
        self.total_weight
    }

    /// Sum of weights of the steps before `index`.
    #[must_use]
    pub fn weight_before(&self, index: usize) -> u32 {
        self.steps.iter().take(index).map(|s| s.weight).sum()
    }
}
