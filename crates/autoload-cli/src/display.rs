//! Display utilities for formatting CLI output.

use tabled::{Table, Tabled};

use autoload_core::types::InferredSchema;

/// Table row representation for displaying an inferred field.
#[derive(Tabled)]
pub struct FieldRow {
    /// Sanitized column name.
    #[tabled(rename = "Field")]
    pub name: String,
    /// Inferred column type.
    #[tabled(rename = "Type")]
    pub column_type: String,
    /// Whether the field can contain null values.
    #[tabled(rename = "Nullable")]
    pub nullable: String,
    /// Field description.
    #[tabled(rename = "Description")]
    pub description: String,
}

/// Table row representation for displaying a finished load job.
#[derive(Tabled)]
pub struct JobRow {
    /// Executor job identifier.
    #[tabled(rename = "Job")]
    pub job_id: String,
    /// Destination table.
    #[tabled(rename = "Table")]
    pub table: String,
    /// Rows appended, or `-` if the job failed.
    #[tabled(rename = "Rows")]
    pub rows: String,
    /// `OK` or the failure message.
    #[tabled(rename = "Status")]
    pub status: String,
}

/// Build one row per inferred field.
#[must_use]
pub fn field_rows(inferred: &InferredSchema) -> Vec<FieldRow> {
    inferred
        .schema
        .fields()
        .iter()
        .map(|f| FieldRow {
            name: f.name.clone(),
            column_type: f.column_type.to_string(),
            nullable: if f.nullable { "Yes" } else { "No" }.to_string(),
            description: f.description.clone(),
        })
        .collect()
}

/// Display an inferred schema in a formatted table.
pub fn display_inferred_schema(source: &str, inferred: &InferredSchema) {
    println!("\nSource: {source}");
    println!(
        "Dialect: delimiter {:?}, quote {:?}",
        char::from(inferred.dialect.delimiter),
        char::from(inferred.dialect.quote)
    );
    println!("Sampled rows: {}", inferred.sampled_rows);

    println!("\n=== Fields ===");
    let table = Table::new(field_rows(inferred)).to_string();
    println!("{table}");
}

/// Display finished load jobs in a formatted table.
pub fn display_jobs(rows: Vec<JobRow>) {
    if rows.is_empty() {
        println!("\nNo load jobs were submitted.");
        return;
    }
    println!("\n=== Load Jobs ===");
    let table = Table::new(rows).to_string();
    println!("{table}");
}
