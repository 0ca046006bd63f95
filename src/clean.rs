// src/clean.rs
// =============================================================================
// Removes boilerplate that repeats across pages.
//
// How it works:
// 1. Count, for every paragraph text, on how many successfully fetched pages
//    it appears (exact, case-sensitive match on the trimmed text). The count
//    is per page, not per occurrence: a text repeated inside one page adds 1
// 2. Drop every paragraph whose count is above the repetition threshold, so
//    a text found on at most `threshold` pages is kept everywhere. Navigation
//    bars and footers repeat on most pages, real content doesn't
// 3. Remove repeated entries from each page's h1/h2/h3 lists
//
// Failure records pass through untouched. This needs the complete batch
// before it can decide anything, so it runs once after all fetches finish.
// =============================================================================

use std::collections::{HashMap, HashSet};

use crate::record::{PageOutcome, PageRecord};

// Paragraph text -> number of pages it appears on
pub type FrequencyTable = HashMap<String, usize>;

#[derive(Debug, Clone, Copy)]
pub struct ContentCleaner {
    threshold: usize,
}

impl ContentCleaner {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    // Builds the frequency table over all success records
    //
    // A paragraph repeated within one page counts once for that page.
    pub fn frequency_table(records: &[PageRecord]) -> FrequencyTable {
        let mut table = FrequencyTable::new();

        for content in records.iter().filter_map(PageRecord::content) {
            let distinct: HashSet<&str> = content.paragraphs.iter().map(String::as_str).collect();
            for paragraph in distinct {
                *table.entry(paragraph.to_string()).or_insert(0) += 1;
            }
        }

        table
    }

    // Cleans a whole batch and returns it in the same order
    pub fn clean(&self, records: Vec<PageRecord>) -> Vec<PageRecord> {
        let frequencies = Self::frequency_table(&records);

        records
            .into_iter()
            .map(|mut record| {
                if let PageOutcome::Content(content) = &mut record.outcome {
                    content.paragraphs.retain(|paragraph| {
                        frequencies.get(paragraph).copied().unwrap_or(0) <= self.threshold
                    });
                    dedup_headings(&mut content.h1);
                    dedup_headings(&mut content.h2);
                    dedup_headings(&mut content.h3);
                }
                record
            })
            .collect()
    }
}

// Keeps the first occurrence of each heading text
fn dedup_headings(headings: &mut Vec<String>) {
    let mut seen = HashSet::new();
    headings.retain(|heading| seen.insert(heading.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PageContent;

    fn page(url: &str, paragraphs: &[&str]) -> PageRecord {
        PageRecord::success(
            url,
            PageContent {
                title: Some(url.to_string()),
                paragraphs: paragraphs.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_paragraph_above_threshold_is_removed_everywhere() {
        // "Copyright 2024" on 4 of 5 pages, threshold 3
        let records = vec![
            page("https://e.com/1", &["One", "Copyright 2024"]),
            page("https://e.com/2", &["Two", "Copyright 2024"]),
            page("https://e.com/3", &["Three", "Copyright 2024"]),
            page("https://e.com/4", &["Four", "Copyright 2024"]),
            page("https://e.com/5", &["Five"]),
        ];

        let cleaned = ContentCleaner::new(3).clean(records);

        assert_eq!(cleaned.len(), 5);
        for record in &cleaned {
            let paragraphs = &record.content().unwrap().paragraphs;
            assert!(!paragraphs.contains(&"Copyright 2024".to_string()));
            assert_eq!(paragraphs.len(), 1);
        }
    }

    #[test]
    fn test_paragraph_at_threshold_is_kept() {
        let records = vec![
            page("https://e.com/1", &["Shared", "A"]),
            page("https://e.com/2", &["Shared", "B"]),
            page("https://e.com/3", &["Shared", "C"]),
            page("https://e.com/4", &["D"]),
        ];

        let cleaned = ContentCleaner::new(3).clean(records);

        assert_eq!(cleaned[0].content().unwrap().paragraphs, vec!["Shared", "A"]);
        assert_eq!(cleaned[2].content().unwrap().paragraphs, vec!["Shared", "C"]);
        assert_eq!(cleaned[3].content().unwrap().paragraphs, vec!["D"]);
    }

    #[test]
    fn test_repeats_within_one_page_count_once() {
        let records = vec![page("https://e.com/1", &["Echo", "Echo", "Echo", "Echo"])];
        let table = ContentCleaner::frequency_table(&records);
        assert_eq!(table.get("Echo"), Some(&1));

        let cleaned = ContentCleaner::new(3).clean(records);
        assert_eq!(cleaned[0].content().unwrap().paragraphs.len(), 4);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let records = vec![
            page("https://e.com/1", &["Menu"]),
            page("https://e.com/2", &["menu"]),
        ];
        let cleaned = ContentCleaner::new(1).clean(records);
        assert_eq!(cleaned[0].content().unwrap().paragraphs, vec!["Menu"]);
        assert_eq!(cleaned[1].content().unwrap().paragraphs, vec!["menu"]);
    }

    #[test]
    fn test_failure_records_pass_through_and_do_not_count() {
        let failure = PageRecord::failure("https://e.com/broken", "Navigation timed out");
        let records = vec![
            page("https://e.com/1", &["Footer"]),
            failure.clone(),
            page("https://e.com/2", &["Footer"]),
        ];

        let cleaned = ContentCleaner::new(1).clean(records);

        assert_eq!(cleaned[1], failure);
        assert!(cleaned[0].content().unwrap().paragraphs.is_empty());
        assert!(cleaned[2].content().unwrap().paragraphs.is_empty());
    }

    #[test]
    fn test_headings_are_deduplicated_per_page() {
        let record = PageRecord::success(
            "https://e.com/",
            PageContent {
                h1: vec!["Title".into(), "Title".into()],
                h2: vec!["A".into(), "B".into(), "A".into()],
                h3: vec!["x".into()],
                ..Default::default()
            },
        );

        let cleaned = ContentCleaner::new(3).clean(vec![record]);
        let content = cleaned[0].content().unwrap();

        assert_eq!(content.h1, vec!["Title"]);
        assert_eq!(content.h2, vec!["A", "B"]);
        assert_eq!(content.h3, vec!["x"]);
    }
}
