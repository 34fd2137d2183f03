//! Batch coordinator: one source file, one transaction
//!
//! Pipeline for a file: read bytes, hash them, derive the (year, semester)
//! term from the filename, validate every record, reconcile the sourcefile
//! row, then resolve + write + link inside a single transaction. Any failure
//! after the transaction opens rolls the whole file back; validation
//! failures abort before anything is written.

use std::convert::TryFrom;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::error::ImportError;
use crate::model::{CourseRecord, RawCourse};
use crate::store::{
    insert_course, link_course, link_course_sourcefile, resolve_batch, CatalogStore,
};

/// What one file's import did.
#[derive(Debug)]
pub struct ImportSummary {
    pub year: i32,
    pub semester: i32,
    pub courses: usize,
    /// True when this exact content had been imported before and its old
    /// course rows were replaced.
    pub replaced: bool,
}

/// Import one JSON course file. Idempotent: re-importing identical content
/// for the same term replaces the previous rows instead of duplicating them.
pub fn import_file(store: &mut CatalogStore, path: &Path) -> Result<ImportSummary> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let hash = hex::encode(Sha256::digest(&bytes));
    let (year, semester) = term_from_filename(path)?;

    let raw: Vec<RawCourse> = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let courses = raw
        .into_iter()
        .map(CourseRecord::try_from)
        .collect::<Result<Vec<_>, ImportError>>()
        .with_context(|| format!("invalid course record in {}", path.display()))?;

    let (sourcefile_id, created) = store.find_or_create_sourcefile(year, semester, &hash)?;
    if !created {
        // Seen this exact content before: clear the old rows so the
        // re-import replaces instead of duplicating
        store.delete_sourcefile_courses(sourcefile_id)?;
    }

    let tx = store.transaction()?;

    // One resolution pass per entity type across the whole batch, before
    // any per-course work
    let resolved = resolve_batch(&tx, &courses)?;

    for course in &courses {
        let course_id = insert_course(&tx, course)?;
        link_course(&tx, course_id, course, &resolved)?;
        link_course_sourcefile(&tx, course_id, sourcefile_id)?;
    }

    tx.commit()?;

    Ok(ImportSummary {
        year,
        semester,
        courses: courses.len(),
        replaced: !created,
    })
}

/// Derive (year, semester) from the filename convention: a 4-digit year
/// followed immediately by a 1-digit semester code, e.g. `20131.json`.
pub fn term_from_filename(path: &Path) -> Result<(i32, i32), ImportError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let prefix = stem.as_bytes();
    if prefix.len() < 5 || !prefix[..5].iter().all(|b| b.is_ascii_digit()) {
        return Err(ImportError::BadFileName(stem.to_string()));
    }

    let bad = || ImportError::BadFileName(stem.to_string());
    let year = stem[..4].parse().map_err(|_| bad())?;
    let semester = stem[4..5].parse().map_err(|_| bad())?;
    Ok((year, semester))
}
