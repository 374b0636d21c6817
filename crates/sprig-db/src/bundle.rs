//! Export and import of the whole database as a portable bundle.
//!
//! A bundle is a gzip-compressed tar archive:
//!
//! ```text
//! manifest.json            format version, generator, per-table row and byte counts
//! tables/<name>.jsonl      one JSON object per row, column name -> value
//! ```
//!
//! Tables are written and imported in [`TABLES`] order so that referenced
//! rows come first; imports additionally defer foreign key checks to commit.
//! A forced import refuses to clear tables whose `ON DELETE` actions would
//! reach non-empty tables missing from the bundle.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_jsonlines::{JsonLinesReader, JsonLinesWriter};

use crate::error::DatabaseError;
use crate::helpers::now;
use crate::service::SprigService;

/// Every exportable table, parents before children.
pub const TABLES: &[&str] = &[
    "consumables",
    "recipes",
    "watering_steps",
    "products",
    "orders",
    "order_items",
    "crop_batches",
    "crops",
    "crop_plans",
    "crop_tasks",
    "harvests",
];

pub const FORMAT_VERSION: u32 = 1;

const MANIFEST_PATH: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub name: String,
    pub rows: u64,
    /// Size of the uncompressed JSONL file.
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub format_version: u32,
    pub generator: String,
    pub created_at: DateTime<Utc>,
    pub tables: Vec<TableEntry>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Replace existing rows in the bundle's tables.
    pub force: bool,
    /// Validate only.
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub dry_run: bool,
    pub bundle_created_at: DateTime<Utc>,
    pub tables: Vec<TableEntry>,
    /// Tables emptied before the import (`force` only).
    pub cleared: Vec<String>,
    pub rows_imported: u64,
}

type Row = Map<String, Value>;

fn table_file(name: &str) -> String {
    format!("tables/{name}.jsonl")
}

fn bundle_err(msg: impl Into<String>) -> DatabaseError {
    DatabaseError::Bundle(msg.into())
}

/// Reject unknown names and return the selection in dependency order.
fn select_tables(requested: Option<&[String]>) -> Result<Vec<&'static str>, DatabaseError> {
    let Some(requested) = requested.filter(|r| !r.is_empty()) else {
        return Ok(TABLES.to_vec());
    };
    if let Some(unknown) = requested.iter().find(|r| !TABLES.contains(&r.as_str())) {
        return Err(DatabaseError::Validation(format!(
            "unknown table '{unknown}' (known: {})",
            TABLES.join(", ")
        )));
    }
    Ok(TABLES
        .iter()
        .copied()
        .filter(|t| requested.iter().any(|r| r == t))
        .collect())
}

fn sql_to_json(value: libsql::Value) -> Result<Value, DatabaseError> {
    Ok(match value {
        libsql::Value::Null => Value::Null,
        libsql::Value::Integer(i) => Value::from(i),
        libsql::Value::Real(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        libsql::Value::Text(s) => Value::String(s),
        libsql::Value::Blob(_) => return Err(bundle_err("binary columns are not exportable")),
    })
}

fn json_to_sql(table: &str, column: &str, value: &Value) -> Result<libsql::Value, DatabaseError> {
    Ok(match value {
        Value::Null => libsql::Value::Null,
        Value::Bool(b) => libsql::Value::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => libsql::Value::Integer(i),
            None => libsql::Value::Real(n.as_f64().ok_or_else(|| {
                bundle_err(format!("{table}.{column}: number out of range"))
            })?),
        },
        Value::String(s) => libsql::Value::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => {
            return Err(bundle_err(format!("{table}.{column}: nested values are not allowed")));
        }
    })
}

fn write_archive(path: &Path, files: &[(String, Vec<u8>)]) -> Result<(), DatabaseError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let encoder = GzEncoder::new(File::create(path)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mtime = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    for (name, bytes) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(mtime);
        header.set_cksum();
        builder.append_data(&mut header, name, bytes.as_slice())?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

fn read_archive(path: &Path) -> Result<HashMap<String, Vec<u8>>, DatabaseError> {
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(path)?));
    let mut files = HashMap::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().into_owned();
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        files.insert(name, bytes);
    }
    Ok(files)
}

fn parse_manifest(files: &HashMap<String, Vec<u8>>) -> Result<BundleManifest, DatabaseError> {
    let raw = files
        .get(MANIFEST_PATH)
        .ok_or_else(|| bundle_err("bundle has no manifest.json"))?;
    let manifest: BundleManifest = serde_json::from_slice(raw)
        .map_err(|e| bundle_err(format!("manifest.json is malformed: {e}")))?;

    if manifest.format_version != FORMAT_VERSION {
        return Err(bundle_err(format!(
            "unsupported bundle format version {} (expected {FORMAT_VERSION})",
            manifest.format_version
        )));
    }
    let mut seen = HashSet::new();
    for entry in &manifest.tables {
        if !TABLES.contains(&entry.name.as_str()) {
            return Err(bundle_err(format!("manifest lists unknown table '{}'", entry.name)));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(bundle_err(format!("manifest lists table '{}' twice", entry.name)));
        }
    }
    Ok(manifest)
}

fn parse_rows(entry: &TableEntry, bytes: &[u8]) -> Result<Vec<Row>, DatabaseError> {
    if bytes.len() as u64 != entry.bytes {
        return Err(bundle_err(format!(
            "{}: file is {} bytes, manifest says {}",
            entry.name,
            bytes.len(),
            entry.bytes
        )));
    }
    let rows = JsonLinesReader::new(bytes)
        .read_all::<Row>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| bundle_err(format!("{}: malformed row: {e}", entry.name)))?;
    if rows.len() as u64 != entry.rows {
        return Err(bundle_err(format!(
            "{}: file has {} rows, manifest says {}",
            entry.name,
            rows.len(),
            entry.rows
        )));
    }
    Ok(rows)
}

impl SprigService {
    /// Column names of `table`, in declaration order.
    async fn table_columns(&self, table: &str) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("PRAGMA table_info({table})"), ())
            .await?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next().await? {
            columns.push(row.get::<String>(1)?);
        }
        Ok(columns)
    }

    /// Tables outside `cleared` whose rows would be deleted or rewritten by
    /// `ON DELETE` actions when the tables in `cleared` are emptied.
    async fn cascade_targets(
        &self,
        cleared: &[&str],
    ) -> Result<Vec<(&'static str, String)>, DatabaseError> {
        let mut affected = Vec::new();
        for child in TABLES.iter().copied().filter(|t| !cleared.contains(t)) {
            let mut rows = self
                .db()
                .conn()
                .query(&format!("PRAGMA foreign_key_list({child})"), ())
                .await?;
            while let Some(row) = rows.next().await? {
                let parent: String = row.get(2)?;
                let on_delete: String = row.get(6)?;
                let acts = matches!(
                    on_delete.to_ascii_uppercase().as_str(),
                    "CASCADE" | "SET NULL" | "SET DEFAULT"
                );
                if acts && cleared.contains(&parent.as_str()) {
                    affected.push((child, parent));
                }
            }
        }
        Ok(affected)
    }

    async fn dump_table(&self, table: &str) -> Result<(u64, Vec<u8>), DatabaseError> {
        let columns = self.table_columns(table).await?;
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {} FROM {table} ORDER BY rowid", columns.join(", ")),
                (),
            )
            .await?;

        let mut buf = Vec::new();
        let mut writer = JsonLinesWriter::new(&mut buf);
        let mut count = 0u64;
        while let Some(row) = rows.next().await? {
            let mut object = Row::new();
            for (idx, column) in (0i32..).zip(&columns) {
                object.insert(column.clone(), sql_to_json(row.get_value(idx)?)?);
            }
            writer.write(&object)?;
            count += 1;
        }
        writer.flush()?;
        drop(writer);
        Ok((count, buf))
    }

    /// Write the selected tables (all when `tables` is `None` or empty) to `path`.
    pub async fn export_bundle(
        &self,
        path: &Path,
        tables: Option<&[String]>,
    ) -> Result<BundleManifest, DatabaseError> {
        let selected = select_tables(tables)?;

        let mut files = Vec::with_capacity(selected.len() + 1);
        let mut entries = Vec::with_capacity(selected.len());
        for table in selected {
            let (rows, bytes) = self.dump_table(table).await?;
            entries.push(TableEntry {
                name: table.to_string(),
                rows,
                bytes: bytes.len() as u64,
            });
            files.push((table_file(table), bytes));
        }

        let manifest = BundleManifest {
            format_version: FORMAT_VERSION,
            generator: format!("sprig {}", env!("CARGO_PKG_VERSION")),
            created_at: now(),
            tables: entries,
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| bundle_err(format!("manifest serialization: {e}")))?;
        files.insert(0, (MANIFEST_PATH.to_string(), manifest_bytes));

        write_archive(path, &files)?;
        tracing::info!(
            path = %path.display(),
            tables = manifest.tables.len(),
            rows = manifest.tables.iter().map(|t| t.rows).sum::<u64>(),
            "bundle exported"
        );
        Ok(manifest)
    }

    /// Read and validate a bundle's manifest without touching the database.
    pub fn inspect_bundle(path: &Path) -> Result<BundleManifest, DatabaseError> {
        parse_manifest(&read_archive(path)?)
    }

    /// Load a bundle into the database in one transaction.
    pub async fn import_bundle(
        &self,
        path: &Path,
        options: ImportOptions,
    ) -> Result<ImportReport, DatabaseError> {
        let files = read_archive(path)?;
        let manifest = parse_manifest(&files)?;

        let mut data: HashMap<&str, Vec<Row>> = HashMap::new();
        for entry in &manifest.tables {
            let file = table_file(&entry.name);
            let bytes = files
                .get(&file)
                .ok_or_else(|| bundle_err(format!("bundle is missing {file}")))?;
            let rows = parse_rows(entry, bytes)?;

            let columns: HashSet<String> =
                self.table_columns(&entry.name).await?.into_iter().collect();
            for row in &rows {
                if let Some(unknown) = row.keys().find(|k| !columns.contains(*k)) {
                    return Err(bundle_err(format!(
                        "{}: unknown column '{unknown}'",
                        entry.name
                    )));
                }
            }
            data.insert(entry.name.as_str(), rows);
        }

        let order: Vec<&'static str> = TABLES
            .iter()
            .copied()
            .filter(|t| data.contains_key(t))
            .collect();

        if !options.force {
            for table in &order {
                let existing = self.db().count_rows(table).await?;
                if existing > 0 {
                    return Err(DatabaseError::InvalidState(format!(
                        "table {table} already has {existing} rows; import with force to replace them"
                    )));
                }
            }
        }

        if options.force {
            let mut blocking = Vec::new();
            for (child, parent) in self.cascade_targets(&order).await? {
                if self.db().count_rows(child).await? > 0 {
                    blocking.push(format!("{child} (via {parent})"));
                }
            }
            if !blocking.is_empty() {
                return Err(bundle_err(format!(
                    "clearing {} would also change rows in {}; include those tables in the bundle",
                    order.join(", "),
                    blocking.join(", ")
                )));
            }
        }

        let cleared: Vec<String> = if options.force {
            order.iter().rev().map(|t| (*t).to_string()).collect()
        } else {
            Vec::new()
        };
        let rows_imported = data.values().map(|rows| rows.len() as u64).sum();
        let report = ImportReport {
            dry_run: options.dry_run,
            bundle_created_at: manifest.created_at,
            tables: manifest.tables.clone(),
            cleared,
            rows_imported,
        };
        if options.dry_run {
            return Ok(report);
        }

        let tx = self.begin().await?;
        let result = self.load_tables(&order, &data, &report.cleared).await;
        Self::finish(tx, result).await?;

        tracing::info!(
            path = %path.display(),
            tables = order.len(),
            rows = rows_imported,
            force = options.force,
            "bundle imported"
        );
        Ok(report)
    }

    async fn load_tables(
        &self,
        order: &[&'static str],
        data: &HashMap<&str, Vec<Row>>,
        clear: &[String],
    ) -> Result<(), DatabaseError> {
        let conn = self.db().conn();
        conn.execute("PRAGMA defer_foreign_keys = ON", ()).await?;

        for table in clear {
            conn.execute(&format!("DELETE FROM {table}"), ()).await?;
        }

        for table in order {
            let Some(rows) = data.get(table) else {
                continue;
            };
            for row in rows {
                let columns: Vec<&String> = row.keys().collect();
                let placeholders: Vec<String> =
                    (1..=columns.len()).map(|i| format!("?{i}")).collect();
                let values = row
                    .iter()
                    .map(|(column, value)| json_to_sql(table, column, value))
                    .collect::<Result<Vec<_>, _>>()?;
                let sql = format!(
                    "INSERT INTO {table} ({}) VALUES ({})",
                    columns
                        .iter()
                        .map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                    placeholders.join(", ")
                );
                conn.execute(&sql, libsql::params_from_iter(values)).await?;
            }
            tracing::debug!(table, rows = rows.len(), "table imported");
        }
        Ok(())
    }
}
