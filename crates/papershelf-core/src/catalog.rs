//! The catalog service: in-memory collection plus every mutation path.

use std::collections::BTreeMap;
use std::sync::Arc;

use papershelf_domain::{
    derive_h_index, filter, new_paper_id, validate_record, FilterState, PaperRecord,
};
use papershelf_store::{migrate_from_fallback, FallbackStore, RecordStore};

use crate::error::CatalogError;

/// Fixed page size for catalog views.
pub const PAGE_SIZE: usize = 12;

/// Sort order for the filtered view. Sorting is stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    YearDesc,
    YearAsc,
    CitationsDesc,
    CitationsAsc,
    TitleAsc,
}

impl SortKey {
    /// Parse the view-layer key names ("year-desc", "citations-asc", "title").
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "year-desc" => Some(Self::YearDesc),
            "year-asc" => Some(Self::YearAsc),
            "citations-desc" => Some(Self::CitationsDesc),
            "citations-asc" => Some(Self::CitationsAsc),
            "title" | "title-asc" => Some(Self::TitleAsc),
            _ => None,
        }
    }
}

/// Where the initial collection came from at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOrigin {
    /// A deployed static bundle was present.
    StaticSnapshot,
    /// The record store held data.
    RecordStore,
    /// The fallback store held data; migration ran when the record store
    /// was available.
    Fallback { migrated: usize, failed: usize },
    /// Nothing persisted anywhere.
    Empty,
}

/// Storage backends handed to [`Catalog::load`]. The catalog is built
/// explicitly from these; nothing is looked up ambiently.
pub struct CatalogSources {
    /// Records from a deployed static bundle, when one was found.
    pub snapshot: Option<Vec<PaperRecord>>,
    /// The record store, when it initialized.
    pub store: Option<Arc<dyn RecordStore>>,
    /// The fallback store, when configured.
    pub fallback: Option<FallbackStore>,
}

/// One page of the filtered, sorted view.
#[derive(Clone, Debug)]
pub struct Page {
    pub papers: Vec<PaperRecord>,
    pub page: usize,
    pub total_pages: usize,
    pub total_records: usize,
}

/// Distinct filterable values with per-value counts, re-derived after
/// every mutation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Facets {
    pub methodologies: Vec<(String, usize)>,
    pub study_types: Vec<(String, usize)>,
    pub venues: Vec<(String, usize)>,
}

pub struct Catalog {
    papers: Vec<PaperRecord>,
    filter: FilterState,
    sort: SortKey,
    page: usize,
    store: Option<Arc<dyn RecordStore>>,
    fallback: Option<FallbackStore>,
    origin: LoadOrigin,
}

impl Catalog {
    /// Resolve the initial collection.
    ///
    /// Startup order: static snapshot, then the record store, then the
    /// fallback store (triggering the one-shot migration when the record
    /// store is also available), else empty.
    pub fn load(sources: CatalogSources) -> Result<Self, CatalogError> {
        let CatalogSources {
            snapshot,
            store,
            fallback,
        } = sources;

        let mut papers = Vec::new();
        let mut origin = LoadOrigin::Empty;

        if let Some(records) = snapshot {
            origin = LoadOrigin::StaticSnapshot;
            papers = records;
        } else {
            let mut loaded = false;
            if let Some(store) = &store {
                match store.get_all() {
                    Ok(records) if !records.is_empty() => {
                        papers = records;
                        origin = LoadOrigin::RecordStore;
                        loaded = true;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "record store load failed, trying fallback");
                    }
                }
            }

            if !loaded {
                if let Some(fb) = &fallback {
                    match fb.load() {
                        Ok(Some(mut records)) => {
                            // Migration runs only when data came from the
                            // fallback and the record store is live.
                            let (migrated, failed) = match &store {
                                Some(store) => {
                                    let report =
                                        migrate_from_fallback(&mut records, store.as_ref(), fb)?;
                                    (report.migrated, report.failed)
                                }
                                None => (0, 0),
                            };
                            origin = LoadOrigin::Fallback { migrated, failed };
                            papers = records;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "fallback load failed, starting empty");
                        }
                    }
                }
            }
        }

        tracing::info!(records = papers.len(), origin = ?origin, "catalog loaded");
        Ok(Self {
            papers,
            filter: FilterState::default(),
            sort: SortKey::default(),
            page: 1,
            store,
            fallback,
            origin,
        })
    }

    /// Build a catalog over an already-resolved collection (tests, tools).
    pub fn from_records(papers: Vec<PaperRecord>) -> Self {
        Self {
            papers,
            filter: FilterState::default(),
            sort: SortKey::default(),
            page: 1,
            store: None,
            fallback: None,
            origin: LoadOrigin::Empty,
        }
    }

    pub fn origin(&self) -> &LoadOrigin {
        &self.origin
    }

    pub fn papers(&self) -> &[PaperRecord] {
        &self.papers
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PaperRecord> {
        self.papers.iter().find(|p| p.id == id)
    }

    /// Add a record (with its PDF bytes when present).
    ///
    /// Assigns an id when absent, derives `h_index`, persists via the
    /// record store when available (otherwise the whole payload goes to
    /// the fallback store), and resets the view to page 1.
    pub fn add(
        &mut self,
        mut record: PaperRecord,
        binary: Option<&[u8]>,
    ) -> Result<String, CatalogError> {
        if record.id.is_empty() {
            record.id = new_paper_id();
        }
        record.h_index = derive_h_index(record.citations);

        if let Some(store) = &self.store {
            store.put(&record, binary)?;
            if let Some(thumbnail) = &record.thumbnail {
                if let Err(e) = store.put_thumbnail(&record.id, Some(thumbnail)) {
                    tracing::warn!(paper = %record.id, error = %e, "thumbnail persist failed");
                }
            }
            let id = record.id.clone();
            self.papers.push(record);
            self.page = 1;
            return Ok(id);
        }

        // Fallback path: the record joins the in-memory collection first;
        // a quota failure is surfaced for the remediation prompt while the
        // record stays visible in the session.
        let id = record.id.clone();
        self.papers.push(record);
        self.page = 1;
        self.save_fallback()?;
        Ok(id)
    }

    /// Full-field replace of an existing record.
    ///
    /// Validated against the required-field policy; on rejection the
    /// offending fields are itemized and the prior state is untouched.
    /// `id` is immutable and the thumbnail pair is owned by the
    /// image-management flow, so both carry over from the stored record.
    pub fn edit(&mut self, id: &str, update: PaperRecord) -> Result<(), CatalogError> {
        let index = self
            .papers
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        let mut replacement = update;
        replacement.id = self.papers[index].id.clone();
        replacement.thumbnail = self.papers[index].thumbnail.clone();
        replacement.original_thumbnail = self.papers[index].original_thumbnail.clone();
        replacement.h_index = derive_h_index(replacement.citations);

        let errors = validate_record(&replacement);
        if !errors.is_empty() {
            return Err(CatalogError::Validation(errors));
        }

        if let Some(store) = &self.store {
            store.put(&replacement, None)?;
        }
        self.papers[index] = replacement;
        if self.store.is_none() {
            self.save_fallback()?;
        }
        Ok(())
    }

    /// Remove a record from memory and from whichever store holds it.
    pub fn delete(&mut self, id: &str) -> Result<(), CatalogError> {
        let index = self
            .papers
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        if let Some(store) = &self.store {
            store.delete(id)?;
        }
        self.papers.remove(index);
        if self.store.is_none() {
            self.save_fallback()?;
        }
        Ok(())
    }

    /// Set or clear the thumbnail, independent of `edit`. Persists
    /// immediately; never touches `original_thumbnail`.
    pub fn set_thumbnail(
        &mut self,
        id: &str,
        image: Option<String>,
    ) -> Result<(), CatalogError> {
        let index = self
            .papers
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        if let Some(store) = &self.store {
            store.put_thumbnail(id, image.as_deref())?;
        }
        self.papers[index].thumbnail = image;
        if self.store.is_none() {
            self.save_fallback()?;
        }
        Ok(())
    }

    /// Restore the system-generated thumbnail, or clear when none exists.
    pub fn reset_thumbnail(&mut self, id: &str) -> Result<(), CatalogError> {
        let original = self
            .get(id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?
            .original_thumbnail
            .clone();
        self.set_thumbnail(id, original)
    }

    pub fn set_filter(&mut self, state: FilterState) {
        self.filter = state;
        self.page = 1;
    }

    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// The filtered, sorted view. Pure with respect to the collection.
    pub fn filtered(&self) -> Vec<&PaperRecord> {
        let mut items = filter::apply(&self.papers, &self.filter);
        match self.sort {
            SortKey::YearDesc => items.sort_by(|a, b| b.year.cmp(&a.year)),
            SortKey::YearAsc => items.sort_by(|a, b| a.year.cmp(&b.year)),
            SortKey::CitationsDesc => items.sort_by(|a, b| b.citations.cmp(&a.citations)),
            SortKey::CitationsAsc => items.sort_by(|a, b| a.citations.cmp(&b.citations)),
            SortKey::TitleAsc => items.sort_by(|a, b| a.title.cmp(&b.title)),
        }
        items
    }

    /// The current page of the filtered view, clamped to the valid range.
    pub fn page(&self) -> Page {
        let items = self.filtered();
        let total_records = items.len();
        let total_pages = total_records.div_ceil(PAGE_SIZE).max(1);
        let page = self.page.clamp(1, total_pages);
        let start = (page - 1) * PAGE_SIZE;
        let papers = items
            .into_iter()
            .skip(start)
            .take(PAGE_SIZE)
            .cloned()
            .collect();
        Page {
            papers,
            page,
            total_pages,
            total_records,
        }
    }

    /// Distinct methodology / study-type / venue values with counts.
    pub fn facets(&self) -> Facets {
        fn count<'a>(
            values: impl Iterator<Item = &'a str>,
        ) -> Vec<(String, usize)> {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for v in values {
                if !v.is_empty() {
                    *counts.entry(v).or_insert(0) += 1;
                }
            }
            counts
                .into_iter()
                .map(|(v, n)| (v.to_string(), n))
                .collect()
        }

        Facets {
            methodologies: count(self.papers.iter().map(|p| p.methodology.as_str())),
            study_types: count(self.papers.iter().map(|p| p.study_type.as_str())),
            venues: count(self.papers.iter().map(|p| p.venue.as_str())),
        }
    }

    fn save_fallback(&self) -> Result<(), CatalogError> {
        if let Some(fb) = &self.fallback {
            fb.save(&self.papers)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use papershelf_domain::PdfRef;
    use papershelf_store::{SqlitePaperStore, StoreError};

    fn paper(title: &str, year: i32, citations: u32) -> PaperRecord {
        let mut r = PaperRecord::new(
            title.to_string(),
            vec!["Author".to_string()],
            year,
            "Venue".to_string(),
        );
        r.citations = citations;
        r
    }

    fn catalog_with_store() -> (Catalog, Arc<SqlitePaperStore>) {
        let store = Arc::new(SqlitePaperStore::open_in_memory().unwrap());
        let catalog = Catalog::load(CatalogSources {
            snapshot: None,
            store: Some(store.clone()),
            fallback: None,
        })
        .unwrap();
        (catalog, store)
    }

    #[test]
    fn load_prefers_snapshot() {
        let store = Arc::new(SqlitePaperStore::open_in_memory().unwrap());
        store.put(&paper("stored", 2020, 0), None).unwrap();

        let catalog = Catalog::load(CatalogSources {
            snapshot: Some(vec![paper("snap", 2021, 0)]),
            store: Some(store),
            fallback: None,
        })
        .unwrap();
        assert_eq!(catalog.origin(), &LoadOrigin::StaticSnapshot);
        assert_eq!(catalog.papers()[0].title, "snap");
    }

    #[test]
    fn load_from_record_store_skips_migration() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = FallbackStore::new(dir.path().join("fb.json"));
        fallback.save(&[paper("old", 2019, 0)]).unwrap();

        let store = Arc::new(SqlitePaperStore::open_in_memory().unwrap());
        store.put(&paper("stored", 2020, 0), None).unwrap();

        let catalog = Catalog::load(CatalogSources {
            snapshot: None,
            store: Some(store),
            fallback: Some(fallback),
        })
        .unwrap();
        assert_eq!(catalog.origin(), &LoadOrigin::RecordStore);
        // Fallback payload untouched: migration never ran.
        assert!(catalog.fallback.as_ref().unwrap().load().unwrap().is_some());
    }

    #[test]
    fn load_from_fallback_migrates_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = FallbackStore::new(dir.path().join("fb.json"));
        fallback
            .save(&[paper("a", 2019, 0), paper("b", 2020, 0)])
            .unwrap();

        let store = Arc::new(SqlitePaperStore::open_in_memory().unwrap());
        let catalog = Catalog::load(CatalogSources {
            snapshot: None,
            store: Some(store.clone()),
            fallback: Some(fallback),
        })
        .unwrap();

        assert_eq!(
            catalog.origin(),
            &LoadOrigin::Fallback {
                migrated: 2,
                failed: 0
            }
        );
        assert_eq!(store.get_all().unwrap().len(), 2);
        assert!(catalog.fallback.as_ref().unwrap().load().unwrap().is_none());
    }

    #[test]
    fn load_empty_everywhere() {
        let (catalog, _) = catalog_with_store();
        assert_eq!(catalog.origin(), &LoadOrigin::Empty);
        assert!(catalog.is_empty());
    }

    #[test]
    fn add_assigns_unique_ids_and_persists() {
        let (mut catalog, store) = catalog_with_store();
        let mut blank = paper("A", 2020, 0);
        blank.id.clear();
        let a = catalog.add(blank, None).unwrap();
        let b = catalog.add(paper("B", 2021, 0), None).unwrap();

        assert_ne!(a, b);
        assert_eq!(store.get_all().unwrap().len(), 2);
        let ids: Vec<&str> = catalog.papers().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids.len(),
            ids.iter().collect::<std::collections::HashSet<_>>().len()
        );
    }

    #[test]
    fn add_with_binary_stores_blob() {
        let (mut catalog, store) = catalog_with_store();
        let id = catalog
            .add(paper("With PDF", 2020, 0), Some(b"%PDF-1.4"))
            .unwrap();
        assert_eq!(store.get_binary(&id).unwrap().unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn edit_recomputes_h_index() {
        let (mut catalog, _) = catalog_with_store();
        let id = catalog.add(paper("A", 2020, 0), None).unwrap();

        let mut update = paper("A", 2020, 10);
        catalog.edit(&id, update.clone()).unwrap();
        assert_eq!(catalog.get(&id).unwrap().h_index, 3);

        update.citations = 99;
        catalog.edit(&id, update).unwrap();
        assert_eq!(catalog.get(&id).unwrap().h_index, 33);
    }

    #[test]
    fn edit_year_boundaries() {
        let (mut catalog, _) = catalog_with_store();
        let id = catalog.add(paper("A", 2020, 0), None).unwrap();

        let err = catalog.edit(&id, paper("A", 1899, 0)).unwrap_err();
        match err {
            CatalogError::Validation(fields) => {
                assert_eq!(fields[0].field, "year");
            }
            other => panic!("expected validation error, got {other}"),
        }
        // Prior state untouched.
        assert_eq!(catalog.get(&id).unwrap().year, 2020);

        catalog.edit(&id, paper("A", 1900, 0)).unwrap();
        assert_eq!(catalog.get(&id).unwrap().year, 1900);
        catalog.edit(&id, paper("A", 2030, 0)).unwrap();
        assert_eq!(catalog.get(&id).unwrap().year, 2030);
    }

    #[test]
    fn edit_cannot_change_id_or_thumbnails() {
        let (mut catalog, _) = catalog_with_store();
        let mut original = paper("A", 2020, 0);
        original.thumbnail = Some("thumb".to_string());
        original.original_thumbnail = Some("orig".to_string());
        let id = catalog.add(original, None).unwrap();

        let mut update = paper("A edited", 2021, 0);
        update.id = "forged".to_string();
        update.thumbnail = Some("smuggled".to_string());
        catalog.edit(&id, update).unwrap();

        let record = catalog.get(&id).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.thumbnail.as_deref(), Some("thumb"));
        assert_eq!(record.original_thumbnail.as_deref(), Some("orig"));
    }

    #[test]
    fn delete_removes_everywhere() {
        let (mut catalog, store) = catalog_with_store();
        let id = catalog.add(paper("A", 2020, 0), Some(b"pdf")).unwrap();
        catalog.delete(&id).unwrap();

        assert!(catalog.is_empty());
        assert!(store.get_all().unwrap().is_empty());
        assert!(matches!(
            catalog.delete(&id),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn thumbnail_flow_preserves_original() {
        let (mut catalog, store) = catalog_with_store();
        let mut record = paper("A", 2020, 0);
        record.original_thumbnail = Some("generated".to_string());
        let id = catalog.add(record, None).unwrap();

        catalog
            .set_thumbnail(&id, Some("custom".to_string()))
            .unwrap();
        assert_eq!(catalog.get(&id).unwrap().thumbnail.as_deref(), Some("custom"));
        assert_eq!(
            catalog.get(&id).unwrap().original_thumbnail.as_deref(),
            Some("generated")
        );
        assert_eq!(store.get_thumbnail(&id).unwrap().as_deref(), Some("custom"));

        catalog.reset_thumbnail(&id).unwrap();
        assert_eq!(
            catalog.get(&id).unwrap().thumbnail.as_deref(),
            Some("generated")
        );
    }

    #[test]
    fn reset_thumbnail_clears_when_no_original() {
        let (mut catalog, _) = catalog_with_store();
        let mut record = paper("A", 2020, 0);
        record.thumbnail = Some("custom".to_string());
        let id = catalog.add(record, None).unwrap();

        catalog.reset_thumbnail(&id).unwrap();
        assert!(catalog.get(&id).unwrap().thumbnail.is_none());
    }

    #[test]
    fn sort_year_desc_scenario() {
        let mut catalog = Catalog::from_records(vec![
            paper("first", 2019, 0),
            paper("second", 2021, 0),
            paper("third", 2020, 0),
        ]);
        catalog.set_sort(SortKey::YearDesc);
        let years: Vec<i32> = catalog.filtered().iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2021, 2020, 2019]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut catalog = Catalog::from_records(vec![
            paper("alpha", 2020, 5),
            paper("beta", 2020, 5),
            paper("gamma", 2020, 5),
        ]);
        catalog.set_sort(SortKey::YearDesc);
        let titles: Vec<&str> = catalog.filtered().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn pagination_clamps_and_counts() {
        let records: Vec<PaperRecord> =
            (0..30).map(|i| paper(&format!("p{i}"), 2020, 0)).collect();
        let mut catalog = Catalog::from_records(records);

        let page = catalog.page();
        assert_eq!(page.papers.len(), PAGE_SIZE);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_records, 30);

        catalog.set_page(99);
        let page = catalog.page();
        assert_eq!(page.page, 3);
        assert_eq!(page.papers.len(), 6);
    }

    #[test]
    fn set_filter_resets_page() {
        let records: Vec<PaperRecord> =
            (0..30).map(|i| paper(&format!("p{i}"), 2020, 0)).collect();
        let mut catalog = Catalog::from_records(records);
        catalog.set_page(3);
        catalog.set_filter(FilterState::default());
        assert_eq!(catalog.page().page, 1);
    }

    #[test]
    fn facets_count_distinct_values() {
        let mut a = paper("A", 2020, 0);
        a.methodology = "Qualitative".to_string();
        let mut b = paper("B", 2020, 0);
        b.methodology = "Qualitative".to_string();
        let mut c = paper("C", 2020, 0);
        c.methodology = "Quantitative".to_string();

        let catalog = Catalog::from_records(vec![a, b, c]);
        let facets = catalog.facets();
        assert_eq!(
            facets.methodologies,
            vec![
                ("Qualitative".to_string(), 2),
                ("Quantitative".to_string(), 1)
            ]
        );
        assert_eq!(facets.venues, vec![("Venue".to_string(), 3)]);
    }

    #[test]
    fn fallback_only_catalog_accumulates_saves() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = FallbackStore::new(dir.path().join("fb.json"));
        let mut catalog = Catalog::load(CatalogSources {
            snapshot: None,
            store: None,
            fallback: Some(fallback),
        })
        .unwrap();

        catalog.add(paper("A", 2020, 0), None).unwrap();
        catalog.add(paper("B", 2021, 0), None).unwrap();

        let saved = catalog.fallback.as_ref().unwrap().load().unwrap().unwrap();
        assert_eq!(saved.len(), 2);
    }

    #[test]
    fn fallback_quota_error_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let fallback = FallbackStore::with_capacity(dir.path().join("fb.json"), 100);
        let mut catalog = Catalog::load(CatalogSources {
            snapshot: None,
            store: None,
            fallback: Some(fallback),
        })
        .unwrap();

        let mut fat = paper("A", 2020, 0);
        fat.abstract_text = "x".repeat(1_000);
        let err = catalog.add(fat, None).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Store(StoreError::QuotaExceeded { .. })
        ));
        // The record stays visible in the session.
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn session_pdf_refs_are_placeholder_after_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("papers.db");
        {
            let store = Arc::new(SqlitePaperStore::open(&path).unwrap());
            let mut catalog = Catalog::load(CatalogSources {
                snapshot: None,
                store: Some(store),
                fallback: None,
            })
            .unwrap();
            let mut record = paper("A", 2020, 0);
            record.pdf = PdfRef::Session("blob-1".to_string());
            catalog.add(record, Some(b"pdf bytes")).unwrap();
        }

        let store = Arc::new(SqlitePaperStore::open(&path).unwrap());
        let catalog = Catalog::load(CatalogSources {
            snapshot: None,
            store: Some(store),
            fallback: None,
        })
        .unwrap();
        assert_eq!(catalog.papers()[0].pdf, PdfRef::None);
    }
}
