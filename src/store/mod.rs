//! Course catalog storage with SQLite
//!
//! Three pieces share this module:
//! - the entity resolver, which turns the distinct shared values of a batch
//!   into value -> row-id maps (insert-if-missing, resolve-to-id)
//! - the course and link writers, which insert one course row and its
//!   join-table rows against already-resolved ids
//! - `CatalogStore`, which owns the connection, the schema, and the
//!   sourcefile bookkeeping used for idempotent re-imports
//!
//! The resolver and writer functions take a plain `&Connection` so they run
//! unchanged inside the coordinator's transaction (`Transaction` derefs to
//! `Connection`).

mod schema;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Transaction};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::error::ImportError;
use crate::model::{CourseRecord, TimeSlot};

pub use schema::SCHEMA;

/// SQLite's default host-parameter limit is 999; stay well under it when
/// building `IN (...)` lists.
const LOOKUP_CHUNK: usize = 500;

/// Time lookups bind three parameters per slot.
const TIME_LOOKUP_CHUNK: usize = 150;

pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Join tables cascade-delete when their course row goes away
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// One transaction per imported file; rollback on drop unless committed.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }

    // ============================================
    // SOURCE FILES
    // ============================================

    /// Look up or create the sourcefile row for (year, semester, hash).
    /// Returns `(id, created)`; `created == false` means this exact file
    /// content was imported before.
    pub fn find_or_create_sourcefile(
        &self,
        year: i32,
        semester: i32,
        hash: &str,
    ) -> Result<(i64, bool)> {
        let existing = self.conn.query_row(
            "SELECT id FROM sourcefile WHERE year = ? AND semester = ? AND hash = ?",
            params![year, semester, hash],
            |row| row.get(0),
        );

        match existing {
            Ok(id) => Ok((id, false)),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                let id = self.conn.query_row(
                    "INSERT INTO sourcefile (year, semester, hash, imported_at)
                     VALUES (?, ?, ?, ?)
                     RETURNING id",
                    params![year, semester, hash, Utc::now().to_rfc3339()],
                    |row| row.get(0),
                )?;
                Ok((id, true))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every course previously written for a sourcefile. The cascade
    /// on `course_id` clears the join tables, including `course_sourcefile`
    /// itself; entity rows are append-only and stay.
    pub fn delete_sourcefile_courses(&self, sourcefile_id: i64) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM course WHERE id IN
                 (SELECT course_id FROM course_sourcefile WHERE sourcefile_id = ?)",
            params![sourcefile_id],
        )?;
        Ok(deleted)
    }

    // ============================================
    // QUERIES
    // ============================================

    pub fn table_count(&self, table: &str) -> Result<i64> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    pub fn course_count(&self, year: i32, semester: i32) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM course WHERE year = ? AND semester = ?",
            params![year, semester],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ============================================
// ENTITY RESOLVER
// ============================================

/// The single-column entity tables. Time is handled separately because its
/// uniqueness key is the composite (days, start, end) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityTable {
    Department,
    Instructor,
    Gereq,
    Location,
    Description,
    Note,
    Prerequisite,
}

impl EntityTable {
    pub fn table(self) -> &'static str {
        match self {
            EntityTable::Department => "department",
            EntityTable::Instructor => "instructor",
            EntityTable::Gereq => "gereq",
            EntityTable::Location => "location",
            EntityTable::Description => "description",
            EntityTable::Note => "note",
            EntityTable::Prerequisite => "prerequisite",
        }
    }

    pub fn value_column(self) -> &'static str {
        match self {
            EntityTable::Department
            | EntityTable::Instructor
            | EntityTable::Gereq
            | EntityTable::Location => "name",
            EntityTable::Description | EntityTable::Note | EntityTable::Prerequisite => "content",
        }
    }

    pub fn join_table(self) -> &'static str {
        match self {
            EntityTable::Department => "course_department",
            EntityTable::Instructor => "course_instructor",
            EntityTable::Gereq => "course_gereq",
            EntityTable::Location => "course_location",
            EntityTable::Description => "course_description",
            EntityTable::Note => "course_note",
            EntityTable::Prerequisite => "course_prerequisite",
        }
    }

    pub fn link_column(self) -> &'static str {
        match self {
            EntityTable::Department => "department_id",
            EntityTable::Instructor => "instructor_id",
            EntityTable::Gereq => "gereq_id",
            EntityTable::Location => "location_id",
            EntityTable::Description => "description_id",
            EntityTable::Note => "note_id",
            EntityTable::Prerequisite => "prerequisite_id",
        }
    }
}

/// Resolved value -> row-id maps for one batch, built once per file and
/// passed to the link writer. Never cached across batches.
#[derive(Debug, Default)]
pub struct ResolvedBatch {
    pub departments: HashMap<String, i64>,
    pub gereqs: HashMap<String, i64>,
    pub instructors: HashMap<String, i64>,
    pub locations: HashMap<String, i64>,
    pub descriptions: HashMap<String, i64>,
    pub notes: HashMap<String, i64>,
    pub prerequisites: HashMap<String, i64>,
    pub times: HashMap<TimeSlot, i64>,
}

/// Run every per-type resolution pass for one batch of courses.
pub fn resolve_batch(conn: &Connection, courses: &[CourseRecord]) -> Result<ResolvedBatch> {
    let collect = |extract: fn(&CourseRecord) -> &[String]| -> BTreeSet<String> {
        courses
            .iter()
            .flat_map(|c| extract(c).iter().cloned())
            .collect()
    };

    let prerequisites: BTreeSet<String> = courses
        .iter()
        .filter_map(|c| c.prerequisites.clone())
        .collect();

    let times: BTreeSet<TimeSlot> = courses.iter().flat_map(|c| c.times.iter().cloned()).collect();

    Ok(ResolvedBatch {
        departments: resolve_entities(conn, EntityTable::Department, &collect(|c| &c.departments))?,
        gereqs: resolve_entities(conn, EntityTable::Gereq, &collect(|c| &c.gereqs))?,
        instructors: resolve_entities(conn, EntityTable::Instructor, &collect(|c| &c.instructors))?,
        locations: resolve_entities(conn, EntityTable::Location, &collect(|c| &c.locations))?,
        descriptions: resolve_entities(conn, EntityTable::Description, &collect(|c| &c.description))?,
        notes: resolve_entities(conn, EntityTable::Note, &collect(|c| &c.notes))?,
        prerequisites: resolve_entities(conn, EntityTable::Prerequisite, &prerequisites)?,
        times: resolve_times(conn, &times)?,
    })
}

/// Resolve a distinct set of values against one entity table: look up what
/// exists, insert-or-ignore the rest, and read back until every value has an
/// id. Calling this twice with the same values is a no-op the second time.
pub fn resolve_entities(
    conn: &Connection,
    table: EntityTable,
    values: &BTreeSet<String>,
) -> Result<HashMap<String, i64>> {
    let mut ids = HashMap::with_capacity(values.len());
    if values.is_empty() {
        return Ok(ids);
    }

    let values: Vec<&str> = values.iter().map(String::as_str).collect();
    select_entity_ids(conn, table, &values, &mut ids)?;

    let missing: Vec<&str> = values
        .iter()
        .copied()
        .filter(|v| !ids.contains_key(*v))
        .collect();
    if missing.is_empty() {
        return Ok(ids);
    }

    let sql = format!(
        "INSERT OR IGNORE INTO {} ({}) VALUES (?)",
        table.table(),
        table.value_column()
    );
    let mut stmt = conn.prepare(&sql)?;
    for value in &missing {
        stmt.execute(params![value])?;
    }

    // INSERT OR IGNORE reports no id for rows another writer got to first,
    // so read the inserted set back instead of trusting last_insert_rowid
    select_entity_ids(conn, table, &missing, &mut ids)?;
    Ok(ids)
}

fn select_entity_ids(
    conn: &Connection,
    table: EntityTable,
    values: &[&str],
    out: &mut HashMap<String, i64>,
) -> Result<()> {
    for chunk in values.chunks(LOOKUP_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT id, {col} FROM {table} WHERE {col} IN ({placeholders})",
            col = table.value_column(),
            table = table.table(),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (id, value) = row?;
            out.insert(value, id);
        }
    }
    Ok(())
}

/// Resolve a distinct set of meeting times. Same shape as `resolve_entities`
/// but the lookup is an OR of triple-equality clauses, since the uniqueness
/// key spans three columns.
pub fn resolve_times(
    conn: &Connection,
    slots: &BTreeSet<TimeSlot>,
) -> Result<HashMap<TimeSlot, i64>> {
    let mut ids = HashMap::with_capacity(slots.len());
    if slots.is_empty() {
        return Ok(ids);
    }

    let slots: Vec<&TimeSlot> = slots.iter().collect();
    select_time_ids(conn, &slots, &mut ids)?;

    let missing: Vec<&TimeSlot> = slots
        .iter()
        .copied()
        .filter(|s| !ids.contains_key(*s))
        .collect();
    if missing.is_empty() {
        return Ok(ids);
    }

    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO time (days, start, end) VALUES (?, ?, ?)")?;
    for slot in &missing {
        stmt.execute(params![slot.days, slot.start, slot.end])?;
    }

    select_time_ids(conn, &missing, &mut ids)?;
    Ok(ids)
}

fn select_time_ids(
    conn: &Connection,
    slots: &[&TimeSlot],
    out: &mut HashMap<TimeSlot, i64>,
) -> Result<()> {
    for chunk in slots.chunks(TIME_LOOKUP_CHUNK) {
        let clause = vec!["(days = ? AND start = ? AND end = ?)"; chunk.len()].join(" OR ");
        let sql = format!("SELECT id, days, start, end FROM time WHERE {clause}");
        let params = chunk
            .iter()
            .flat_map(|s| [s.days.as_str(), s.start.as_str(), s.end.as_str()]);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                TimeSlot {
                    days: row.get(1)?,
                    start: row.get(2)?,
                    end: row.get(3)?,
                },
            ))
        })?;
        for row in rows {
            let (id, slot) = row?;
            out.insert(slot, id);
        }
    }
    Ok(())
}

// ============================================
// COURSE WRITER
// ============================================

/// Insert one course row and return its generated id.
pub fn insert_course(conn: &Connection, course: &CourseRecord) -> Result<i64> {
    let id = conn.query_row(
        "INSERT INTO course
             (clbid, credits, crsid, level, name, number, pn, section,
              status, title, type, year, semester, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
        params![
            course.clbid,
            course.credits,
            course.crsid,
            course.level,
            course.name,
            course.number,
            course.pn,
            course.section,
            course.status,
            course.title,
            course.kind,
            course.year,
            course.semester,
            Utc::now().to_rfc3339(),
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

// ============================================
// LINK WRITER
// ============================================

/// Write the join rows for one course. Every value must already be in
/// `resolved`; this only links, it never resolves. Duplicate pairs are a
/// silent no-op via INSERT OR IGNORE.
pub fn link_course(
    conn: &Connection,
    course_id: i64,
    course: &CourseRecord,
    resolved: &ResolvedBatch,
) -> Result<()> {
    link_values(conn, course_id, EntityTable::Department, &course.departments, &resolved.departments)?;
    link_values(conn, course_id, EntityTable::Gereq, &course.gereqs, &resolved.gereqs)?;
    link_values(conn, course_id, EntityTable::Instructor, &course.instructors, &resolved.instructors)?;
    link_values(conn, course_id, EntityTable::Location, &course.locations, &resolved.locations)?;
    link_values(conn, course_id, EntityTable::Note, &course.notes, &resolved.notes)?;
    link_values(conn, course_id, EntityTable::Description, &course.description, &resolved.descriptions)?;

    if let Some(prereq) = &course.prerequisites {
        let id = *resolved
            .prerequisites
            .get(prereq)
            .ok_or_else(|| ImportError::Unresolved {
                table: "prerequisite",
                value: prereq.clone(),
            })?;
        insert_link(conn, EntityTable::Prerequisite, course_id, id)?;
    }

    for slot in &course.times {
        let id = *resolved
            .times
            .get(slot)
            .ok_or_else(|| ImportError::Unresolved {
                table: "time",
                value: slot.to_string(),
            })?;
        conn.execute(
            "INSERT OR IGNORE INTO course_time (course_id, time_id) VALUES (?, ?)",
            params![course_id, id],
        )?;
    }

    Ok(())
}

fn link_values(
    conn: &Connection,
    course_id: i64,
    table: EntityTable,
    values: &[String],
    ids: &HashMap<String, i64>,
) -> Result<()> {
    for value in values {
        let id = *ids.get(value).ok_or_else(|| ImportError::Unresolved {
            table: table.table(),
            value: value.clone(),
        })?;
        insert_link(conn, table, course_id, id)?;
    }
    Ok(())
}

fn insert_link(
    conn: &Connection,
    table: EntityTable,
    course_id: i64,
    entity_id: i64,
) -> Result<()> {
    let sql = format!(
        "INSERT OR IGNORE INTO {} (course_id, {}) VALUES (?, ?)",
        table.join_table(),
        table.link_column()
    );
    conn.execute(&sql, params![course_id, entity_id])?;
    Ok(())
}

/// Associate one course with the sourcefile it came from.
pub fn link_course_sourcefile(
    conn: &Connection,
    course_id: i64,
    sourcefile_id: i64,
) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO course_sourcefile (course_id, sourcefile_id) VALUES (?, ?)",
        params![course_id, sourcefile_id],
    )?;
    Ok(())
}
