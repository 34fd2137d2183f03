//! Input schema for course catalog files
//!
//! Source files are JSON arrays of course objects with loosely typed fields:
//! `level` and `number` arrive as either strings or numbers, most fields are
//! optional, and meeting times are compact strings like `"MWF 0830-0945"`.
//! `RawCourse` accepts that shape as-is; `CourseRecord` is the validated,
//! strongly typed form the importer actually works with.

use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::ImportError;

/// A course object exactly as it appears in a source file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCourse {
    pub clbid: i64,
    pub credits: Option<f64>,
    pub crsid: Option<i64>,
    #[serde(default, deserialize_with = "stringish")]
    pub level: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub number: Option<String>,
    #[serde(default)]
    pub pn: Option<bool>,
    pub section: Option<String>,
    pub status: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub year: Option<i32>,
    pub semester: Option<i32>,

    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub gereqs: Vec<String>,
    #[serde(default)]
    pub instructors: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub times: Vec<String>,
    /// Singular: at most one prerequisite string per course.
    #[serde(default)]
    pub prerequisites: Option<String>,
}

/// Accept a JSON string or number and coerce it to text.
fn stringish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stringish {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Stringish>::deserialize(deserializer)?.map(|v| match v {
        Stringish::Text(s) => s,
        Stringish::Int(n) => n.to_string(),
        Stringish::Float(n) => n.to_string(),
    }))
}

/// A meeting time, parsed from the compact `"<days> <start>-<end>"` format.
///
/// The triple is the uniqueness key in the `time` table, and `Display`
/// re-serializes to the identical source string, so normalization is
/// consistent between the existence check and the insert.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeSlot {
    pub days: String,
    pub start: String,
    pub end: String,
}

impl FromStr for TimeSlot {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ImportError::BadTimeString(s.to_string());

        // Whitespace first, then the single '-' between start and end
        let mut parts = s.split_whitespace();
        let days = parts.next().ok_or_else(bad)?;
        let clock = parts.next().ok_or_else(bad)?;
        let (start, end) = clock.split_once('-').ok_or_else(bad)?;
        if start.is_empty() || end.is_empty() {
            return Err(bad());
        }

        Ok(TimeSlot {
            days: days.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        })
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.days, self.start, self.end)
    }
}

/// A validated course record ready for insertion.
#[derive(Debug, Clone)]
pub struct CourseRecord {
    pub clbid: i64,
    pub credits: Option<f64>,
    pub crsid: Option<i64>,
    pub level: Option<String>,
    pub name: Option<String>,
    pub number: Option<String>,
    pub pn: bool,
    pub section: Option<String>,
    pub status: Option<String>,
    pub title: Option<String>,
    pub kind: Option<String>,
    pub year: i32,
    pub semester: i32,

    pub departments: Vec<String>,
    pub gereqs: Vec<String>,
    pub instructors: Vec<String>,
    pub locations: Vec<String>,
    pub notes: Vec<String>,
    pub description: Vec<String>,
    pub times: Vec<TimeSlot>,
    pub prerequisites: Option<String>,
}

impl TryFrom<RawCourse> for CourseRecord {
    type Error = ImportError;

    fn try_from(raw: RawCourse) -> Result<Self, Self::Error> {
        let clbid = raw.clbid;
        let year = raw.year.ok_or(ImportError::MissingField {
            clbid,
            field: "year",
        })?;
        let semester = raw.semester.ok_or(ImportError::MissingField {
            clbid,
            field: "semester",
        })?;

        // Empty strings are never entities and never link targets
        let times = raw
            .times
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.parse())
            .collect::<Result<Vec<TimeSlot>, _>>()?;

        Ok(CourseRecord {
            clbid,
            credits: raw.credits,
            crsid: raw.crsid,
            level: raw.level,
            name: raw.name,
            number: raw.number,
            pn: raw.pn.unwrap_or(false),
            section: raw.section,
            status: raw.status,
            title: raw.title,
            kind: raw.kind,
            year,
            semester,
            departments: non_empty(raw.departments),
            gereqs: non_empty(raw.gereqs),
            instructors: non_empty(raw.instructors),
            locations: non_empty(raw.locations),
            notes: non_empty(raw.notes),
            description: non_empty(raw.description),
            times,
            prerequisites: raw.prerequisites.filter(|p| !p.trim().is_empty()),
        })
    }
}

fn non_empty(values: Vec<String>) -> Vec<String> {
    values.into_iter().filter(|v| !v.trim().is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_round_trip() {
        let slot: TimeSlot = "MWF 0830-0945".parse().unwrap();
        assert_eq!(slot.days, "MWF");
        assert_eq!(slot.start, "0830");
        assert_eq!(slot.end, "0945");
        assert_eq!(slot.to_string(), "MWF 0830-0945");
    }

    #[test]
    fn test_time_extra_whitespace() {
        let slot: TimeSlot = "Th  0800-0900".parse().unwrap();
        assert_eq!(slot.days, "Th");
        assert_eq!(slot.start, "0800");
        assert_eq!(slot.end, "0900");
    }

    #[test]
    fn test_time_rejects_garbage() {
        assert!("MWF".parse::<TimeSlot>().is_err());
        assert!("MWF 0830".parse::<TimeSlot>().is_err());
        assert!("MWF -0945".parse::<TimeSlot>().is_err());
        assert!("".parse::<TimeSlot>().is_err());
    }

    #[test]
    fn test_level_and_number_coercion() {
        let raw: RawCourse = serde_json::from_value(serde_json::json!({
            "clbid": 1,
            "level": 100,
            "number": "101",
            "year": 2013,
            "semester": 1,
        }))
        .unwrap();
        assert_eq!(raw.level.as_deref(), Some("100"));
        assert_eq!(raw.number.as_deref(), Some("101"));
    }

    #[test]
    fn test_missing_year_is_an_error() {
        let raw: RawCourse = serde_json::from_value(serde_json::json!({
            "clbid": 7,
            "semester": 1,
        }))
        .unwrap();
        let err = CourseRecord::try_from(raw).unwrap_err();
        assert!(matches!(
            err,
            ImportError::MissingField { clbid: 7, field: "year" }
        ));
    }

    #[test]
    fn test_empty_values_are_filtered() {
        let raw: RawCourse = serde_json::from_value(serde_json::json!({
            "clbid": 1,
            "year": 2013,
            "semester": 1,
            "departments": ["ASIAN", ""],
            "times": ["MWF 0830-0945", "  "],
            "prerequisites": "",
        }))
        .unwrap();
        let course = CourseRecord::try_from(raw).unwrap();
        assert_eq!(course.departments, vec!["ASIAN"]);
        assert_eq!(course.times.len(), 1);
        assert!(course.prerequisites.is_none());
    }

    #[test]
    fn test_pn_defaults_to_false() {
        let raw: RawCourse = serde_json::from_value(serde_json::json!({
            "clbid": 1,
            "year": 2013,
            "semester": 1,
        }))
        .unwrap();
        let course = CourseRecord::try_from(raw).unwrap();
        assert!(!course.pn);
    }
}
