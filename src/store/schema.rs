//! SQLite schema definition
//!
//! Eight entity tables hold the normalized, deduplicated reference values
//! that course records share; one join table per (course, entity) pair links
//! them back together. The `sourcefile` table records which file produced
//! which courses, so re-importing identical content replaces instead of
//! duplicating.

pub const SCHEMA: &str = r#"
-- ============================================
-- ENTITY TABLES
-- ============================================

CREATE TABLE IF NOT EXISTS department (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS instructor (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS gereq (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS location (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

-- Meeting times are unique on the whole (days, start, end) triple
CREATE TABLE IF NOT EXISTS time (
    id INTEGER PRIMARY KEY,
    days TEXT NOT NULL,
    start TEXT NOT NULL,
    end TEXT NOT NULL,
    UNIQUE(days, start, end)
);

CREATE TABLE IF NOT EXISTS description (
    id INTEGER PRIMARY KEY,
    content TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS note (
    id INTEGER PRIMARY KEY,
    content TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS prerequisite (
    id INTEGER PRIMARY KEY,
    content TEXT NOT NULL UNIQUE
);

-- ============================================
-- COURSES
-- ============================================

-- AUTOINCREMENT so a replacement import never reuses the ids of the
-- course rows it deleted
CREATE TABLE IF NOT EXISTS course (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    clbid INTEGER NOT NULL,
    credits REAL,
    crsid INTEGER,
    level TEXT,
    name TEXT,
    number TEXT,
    pn INTEGER NOT NULL DEFAULT 0,
    section TEXT,
    status TEXT,
    title TEXT,
    type TEXT,

    year INTEGER NOT NULL,
    semester INTEGER NOT NULL,

    created_at TEXT
);

-- ============================================
-- SOURCE FILES
-- ============================================

-- One row per imported file; the hash detects re-imports of identical content
CREATE TABLE IF NOT EXISTS sourcefile (
    id INTEGER PRIMARY KEY,
    year INTEGER NOT NULL,
    semester INTEGER NOT NULL,
    hash TEXT NOT NULL,
    imported_at TEXT,
    UNIQUE(year, semester, hash)
);

-- ============================================
-- JOIN TABLES
-- ============================================

-- Cascade on course deletion keeps sourcefile-replacement cleanup to a
-- single DELETE against the course table

CREATE TABLE IF NOT EXISTS course_department (
    id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
    department_id INTEGER NOT NULL REFERENCES department(id),
    UNIQUE(course_id, department_id)
);

CREATE TABLE IF NOT EXISTS course_instructor (
    id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
    instructor_id INTEGER NOT NULL REFERENCES instructor(id),
    UNIQUE(course_id, instructor_id)
);

CREATE TABLE IF NOT EXISTS course_gereq (
    id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
    gereq_id INTEGER NOT NULL REFERENCES gereq(id),
    UNIQUE(course_id, gereq_id)
);

CREATE TABLE IF NOT EXISTS course_location (
    id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
    location_id INTEGER NOT NULL REFERENCES location(id),
    UNIQUE(course_id, location_id)
);

CREATE TABLE IF NOT EXISTS course_time (
    id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
    time_id INTEGER NOT NULL REFERENCES time(id),
    UNIQUE(course_id, time_id)
);

CREATE TABLE IF NOT EXISTS course_description (
    id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
    description_id INTEGER NOT NULL REFERENCES description(id),
    UNIQUE(course_id, description_id)
);

CREATE TABLE IF NOT EXISTS course_note (
    id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
    note_id INTEGER NOT NULL REFERENCES note(id),
    UNIQUE(course_id, note_id)
);

CREATE TABLE IF NOT EXISTS course_prerequisite (
    id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
    prerequisite_id INTEGER NOT NULL REFERENCES prerequisite(id),
    UNIQUE(course_id, prerequisite_id)
);

CREATE TABLE IF NOT EXISTS course_sourcefile (
    id INTEGER PRIMARY KEY,
    course_id INTEGER NOT NULL REFERENCES course(id) ON DELETE CASCADE,
    sourcefile_id INTEGER NOT NULL REFERENCES sourcefile(id),
    UNIQUE(course_id, sourcefile_id)
);

-- ============================================
-- INDEXES
-- ============================================

CREATE INDEX IF NOT EXISTS idx_course_term ON course(year, semester);
CREATE INDEX IF NOT EXISTS idx_course_clbid ON course(clbid);
CREATE INDEX IF NOT EXISTS idx_course_sourcefile_file ON course_sourcefile(sourcefile_id);
"#;
