//! Stats command implementation

use anyhow::Result;

use crate::store::CatalogStore;

const TABLES: &[&str] = &[
    "course",
    "department",
    "instructor",
    "gereq",
    "location",
    "time",
    "description",
    "note",
    "prerequisite",
    "sourcefile",
];

pub fn run(store: &CatalogStore) -> Result<()> {
    println!("{:<14} {:>8}", "Table", "Rows");
    println!("{}", "-".repeat(23));

    for table in TABLES {
        println!("{:<14} {:>8}", table, store.table_count(table)?);
    }

    Ok(())
}
