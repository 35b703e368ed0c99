//! Conjunctive filter over the in-memory collection.
//!
//! Every active predicate must match (implicit AND). The text predicate
//! matches case-insensitively against title, authors, abstract, and
//! keywords. Filtering never mutates records.

use crate::paper::PaperRecord;

/// One session's filter state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterState {
    /// Free-text query; empty means inactive.
    pub query: String,
    /// Research-area selector.
    pub category: Option<String>,
    /// Inclusive year range.
    pub year_range: Option<(i32, i32)>,
    /// Multi-select methodology values; empty means inactive.
    pub methodologies: Vec<String>,
    /// Multi-select study-type values; empty means inactive.
    pub study_types: Vec<String>,
    /// Single venue selector.
    pub venue: Option<String>,
    /// Inclusive citation range.
    pub citation_range: Option<(u32, u32)>,
}

impl FilterState {
    /// Whether this filter matches everything.
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty()
            && self.category.is_none()
            && self.year_range.is_none()
            && self.methodologies.is_empty()
            && self.study_types.is_empty()
            && self.venue.is_none()
            && self.citation_range.is_none()
    }

    /// Whether a record passes every active predicate.
    pub fn matches(&self, record: &PaperRecord) -> bool {
        let query = self.query.trim().to_lowercase();
        if !query.is_empty() && !record.search_text().contains(&query) {
            return false;
        }

        if let Some(category) = &self.category {
            if &record.research_area != category {
                return false;
            }
        }

        if let Some((min, max)) = self.year_range {
            if record.year < min || record.year > max {
                return false;
            }
        }

        if !self.methodologies.is_empty()
            && !self.methodologies.iter().any(|m| m == &record.methodology)
        {
            return false;
        }

        if !self.study_types.is_empty()
            && !self.study_types.iter().any(|s| s == &record.study_type)
        {
            return false;
        }

        if let Some(venue) = &self.venue {
            if &record.venue != venue {
                return false;
            }
        }

        if let Some((min, max)) = self.citation_range {
            if record.citations < min || record.citations > max {
                return false;
            }
        }

        true
    }
}

/// Apply a filter to a collection. Pure: same state over an unmutated
/// collection yields the same result.
pub fn apply<'a>(papers: &'a [PaperRecord], state: &FilterState) -> Vec<&'a PaperRecord> {
    papers.iter().filter(|p| state.matches(p)).collect()
}
