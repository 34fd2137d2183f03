//! End-to-end import tests: JSON file in, relational rows out.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::TempDir;

use registrar::{import_file, CatalogStore};

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn open_store(dir: &Path) -> CatalogStore {
    CatalogStore::open(&dir.join("courses.sqlite")).unwrap()
}

fn raw_conn(dir: &Path) -> Connection {
    Connection::open(dir.join("courses.sqlite")).unwrap()
}

const ASIAN_COURSE: &str = r#"[
    {"clbid": 1, "year": 2017, "semester": 3,
     "departments": ["ASIAN"], "times": ["MWF 0830-0945"]}
]"#;

#[test]
fn test_single_course_import() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "20173.json", ASIAN_COURSE);

    let mut store = open_store(dir.path());
    let summary = import_file(&mut store, &file).unwrap();

    assert_eq!(summary.year, 2017);
    assert_eq!(summary.semester, 3);
    assert_eq!(summary.courses, 1);
    assert!(!summary.replaced);

    assert_eq!(store.table_count("course").unwrap(), 1);
    assert_eq!(store.table_count("department").unwrap(), 1);
    assert_eq!(store.table_count("time").unwrap(), 1);
    assert_eq!(store.table_count("course_department").unwrap(), 1);
    assert_eq!(store.table_count("course_time").unwrap(), 1);
    assert_eq!(store.table_count("sourcefile").unwrap(), 1);
    assert_eq!(store.table_count("course_sourcefile").unwrap(), 1);
    drop(store);

    let conn = raw_conn(dir.path());
    let (days, start, end): (String, String, String) = conn
        .query_row("SELECT days, start, end FROM time", [], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .unwrap();
    assert_eq!((days.as_str(), start.as_str(), end.as_str()), ("MWF", "0830", "0945"));

    let dept: String = conn
        .query_row("SELECT name FROM department", [], |row| row.get(0))
        .unwrap();
    assert_eq!(dept, "ASIAN");
}

#[test]
fn test_shared_entity_resolved_once() {
    let dir = TempDir::new().unwrap();
    let file = write_file(
        dir.path(),
        "20131.json",
        r#"[
            {"clbid": 1, "year": 2013, "semester": 1, "departments": ["ASIAN"]},
            {"clbid": 2, "year": 2013, "semester": 1, "departments": ["ASIAN"]}
        ]"#,
    );

    let mut store = open_store(dir.path());
    import_file(&mut store, &file).unwrap();

    assert_eq!(store.table_count("course").unwrap(), 2);
    assert_eq!(store.table_count("department").unwrap(), 1);
    assert_eq!(store.table_count("course_department").unwrap(), 2);
}

#[test]
fn test_duplicate_value_within_one_course_links_once() {
    let dir = TempDir::new().unwrap();
    let file = write_file(
        dir.path(),
        "20131.json",
        r#"[{"clbid": 1, "year": 2013, "semester": 1, "departments": ["ASIAN", "ASIAN"]}]"#,
    );

    let mut store = open_store(dir.path());
    import_file(&mut store, &file).unwrap();

    assert_eq!(store.table_count("department").unwrap(), 1);
    assert_eq!(store.table_count("course_department").unwrap(), 1);
}

#[test]
fn test_reimport_identical_file_replaces_courses() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "20173.json", ASIAN_COURSE);

    let mut store = open_store(dir.path());
    import_file(&mut store, &file).unwrap();

    let first_id: i64 = {
        drop(store);
        let conn = raw_conn(dir.path());
        conn.query_row("SELECT id FROM course", [], |row| row.get(0))
            .unwrap()
    };

    let mut store = open_store(dir.path());
    let summary = import_file(&mut store, &file).unwrap();
    assert!(summary.replaced);

    // one sourcefile, one course set - the second import replaced the first
    assert_eq!(store.table_count("sourcefile").unwrap(), 1);
    assert_eq!(store.table_count("course").unwrap(), 1);
    assert_eq!(store.table_count("course_department").unwrap(), 1);
    assert_eq!(store.table_count("course_time").unwrap(), 1);
    assert_eq!(store.table_count("course_sourcefile").unwrap(), 1);

    // entity rows are append-only and survive the replacement
    assert_eq!(store.table_count("department").unwrap(), 1);
    drop(store);

    let conn = raw_conn(dir.path());
    let second_id: i64 = conn
        .query_row("SELECT id FROM course", [], |row| row.get(0))
        .unwrap();
    assert_ne!(first_id, second_id);

    // no orphaned join rows pointing at the deleted course
    let orphans: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM course_department
             WHERE course_id NOT IN (SELECT id FROM course)",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn test_entities_deduped_across_files() {
    let dir = TempDir::new().unwrap();
    let spring = write_file(
        dir.path(),
        "20131.json",
        r#"[{"clbid": 1, "year": 2013, "semester": 1, "departments": ["ASIAN"]}]"#,
    );
    let fall = write_file(
        dir.path(),
        "20133.json",
        r#"[{"clbid": 2, "year": 2013, "semester": 3, "departments": ["ASIAN"]}]"#,
    );

    let mut store = open_store(dir.path());
    import_file(&mut store, &spring).unwrap();
    import_file(&mut store, &fall).unwrap();

    assert_eq!(store.table_count("course").unwrap(), 2);
    assert_eq!(store.table_count("department").unwrap(), 1);
    assert_eq!(store.table_count("sourcefile").unwrap(), 2);
}

#[test]
fn test_prerequisite_is_singular() {
    let dir = TempDir::new().unwrap();
    let file = write_file(
        dir.path(),
        "20131.json",
        r#"[
            {"clbid": 1, "year": 2013, "semester": 1, "prerequisites": "CSCI 121 or placement"},
            {"clbid": 2, "year": 2013, "semester": 1, "prerequisites": "CSCI 121 or placement"}
        ]"#,
    );

    let mut store = open_store(dir.path());
    import_file(&mut store, &file).unwrap();

    assert_eq!(store.table_count("prerequisite").unwrap(), 1);
    assert_eq!(store.table_count("course_prerequisite").unwrap(), 2);
}

#[test]
fn test_missing_year_aborts_without_writes() {
    let dir = TempDir::new().unwrap();
    let file = write_file(
        dir.path(),
        "20131.json",
        r#"[
            {"clbid": 1, "year": 2013, "semester": 1},
            {"clbid": 2, "semester": 1}
        ]"#,
    );

    let mut store = open_store(dir.path());
    let err = import_file(&mut store, &file).unwrap_err();
    assert!(err.to_string().contains("invalid course record"));

    // validation runs before the sourcefile row or any course row is written
    assert_eq!(store.table_count("course").unwrap(), 0);
    assert_eq!(store.table_count("sourcefile").unwrap(), 0);
}

#[test]
fn test_bad_time_string_aborts_without_writes() {
    let dir = TempDir::new().unwrap();
    let file = write_file(
        dir.path(),
        "20131.json",
        r#"[{"clbid": 1, "year": 2013, "semester": 1, "times": ["MWF"]}]"#,
    );

    let mut store = open_store(dir.path());
    assert!(import_file(&mut store, &file).is_err());
    assert_eq!(store.table_count("course").unwrap(), 0);
    assert_eq!(store.table_count("time").unwrap(), 0);
}

#[test]
fn test_bad_filename_is_rejected() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "courses.json", "[]");

    let mut store = open_store(dir.path());
    assert!(import_file(&mut store, &file).is_err());
}

#[test]
fn test_empty_batch_commits_nothing_but_records_the_file() {
    let dir = TempDir::new().unwrap();
    let file = write_file(dir.path(), "20131.json", "[]");

    let mut store = open_store(dir.path());
    let summary = import_file(&mut store, &file).unwrap();

    assert_eq!(summary.courses, 0);
    assert_eq!(store.table_count("course").unwrap(), 0);
    assert_eq!(store.table_count("sourcefile").unwrap(), 1);
}

#[test]
fn test_course_field_coercion_lands_in_the_row() {
    let dir = TempDir::new().unwrap();
    let file = write_file(
        dir.path(),
        "20173.json",
        r#"[{
            "clbid": 42, "credits": 1.5, "crsid": 99,
            "level": 100, "name": "Programming", "number": "251",
            "pn": true, "status": "O", "type": "Research",
            "year": 2017, "semester": 3
        }]"#,
    );

    let mut store = open_store(dir.path());
    import_file(&mut store, &file).unwrap();
    drop(store);

    let conn = raw_conn(dir.path());
    let (level, number, pn, section, title): (String, String, i64, Option<String>, Option<String>) =
        conn.query_row(
            "SELECT level, number, pn, section, title FROM course WHERE clbid = 42",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            },
        )
        .unwrap();

    assert_eq!(level, "100");
    assert_eq!(number, "251");
    assert_eq!(pn, 1);
    assert!(section.is_none());
    assert!(title.is_none());
}
