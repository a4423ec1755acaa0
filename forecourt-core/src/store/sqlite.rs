//! SQLite-backed listing catalog.
//!
//! The catalog lives in a single `listings` table with one column per schema
//! field. Numbers are stored as `REAL`, dates as ISO-8601 `TEXT` and booleans
//! as `INTEGER`; absent optional fields are `NULL`.

use std::{
    collections::HashSet,
    fmt,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{
    Connection, Error as SqliteError, ErrorCode, OptionalExtension, Row, Transaction,
    params_from_iter, types::Value as SqlValue,
};
use thiserror::Error;

use crate::{
    ExternalId, FieldDef, FieldKind, FieldValue, ListingSchema, NormalizedListing, StoreKey,
    StoredListing,
};

use super::{ListingStore, StoreError};

/// Version recorded in `catalog_schema_version` by [`initialise_catalog`].
pub const CATALOG_SCHEMA_VERSION: i64 = 1;

const RESERVED_COLUMNS: [&str; 3] = ["key", "external_id", "last_synced"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised while opening or initialising the catalog database.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogSchemaError {
    /// Opening the SQLite database failed.
    #[error("failed to open catalog database at {path:?}: {source}")]
    OpenDatabase {
        /// Location of the database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A schema field collides with a bookkeeping column.
    #[error("schema field `{name}` clashes with a reserved catalog column")]
    ReservedColumn {
        /// Offending field name.
        name: String,
    },
    /// A DDL statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Human-readable step description.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database was initialised by an incompatible release.
    #[error(
        "expected catalog schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version this build understands.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
    /// An existing `listings` table lacks a required or bookkeeping column.
    #[error("catalog table is missing column `{column}`")]
    MissingColumn {
        /// Name of the absent column.
        column: String,
    },
}

/// Create the catalog tables for `schema` inside an existing connection.
///
/// Running the initialiser again is a no-op for a database created with the
/// same schema. Optional schema fields missing from an existing `listings`
/// table are added as nullable columns. Databases recorded with another
/// version, or lacking a required or bookkeeping column, are rejected.
///
/// # Examples
/// ```
/// use forecourt_core::ListingSchema;
/// use forecourt_core::store::initialise_catalog;
/// use rusqlite::Connection;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_catalog(&mut conn, &ListingSchema::vehicle()).expect("create catalog");
/// initialise_catalog(&mut conn, &ListingSchema::vehicle()).expect("re-run is a no-op");
///
/// let version: i64 = conn
///     .query_row("SELECT version FROM catalog_schema_version", [], |row| row.get(0))
///     .expect("read schema version");
/// assert_eq!(version, 1);
/// ```
pub fn initialise_catalog(
    connection: &mut Connection,
    schema: &ListingSchema,
) -> Result<(), CatalogSchemaError> {
    if let Some(field) = schema
        .fields()
        .iter()
        .find(|field| RESERVED_COLUMNS.contains(&field.name.as_str()))
    {
        return Err(CatalogSchemaError::ReservedColumn {
            name: field.name.clone(),
        });
    }

    let transaction = connection
        .transaction()
        .map_err(|source| CatalogSchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    run_migration_step(&transaction, "create listings", &listings_table_ddl(schema))?;
    ensure_schema_version(&transaction)?;
    ensure_columns(&transaction, schema)?;

    transaction
        .commit()
        .map_err(|source| CatalogSchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn listings_table_ddl(schema: &ListingSchema) -> String {
    let mut columns = vec![
        "key INTEGER PRIMARY KEY AUTOINCREMENT".to_owned(),
        "external_id TEXT NOT NULL UNIQUE CHECK (length(trim(external_id)) > 0)".to_owned(),
        "last_synced TEXT NOT NULL".to_owned(),
    ];
    columns.extend(schema.fields().iter().map(column_ddl));
    format!(
        "CREATE TABLE IF NOT EXISTS listings (\n    {}\n)",
        columns.join(",\n    ")
    )
}

fn column_ddl(field: &FieldDef) -> String {
    let affinity = match field.kind {
        FieldKind::Number => "REAL",
        FieldKind::Text | FieldKind::Date => "TEXT",
        FieldKind::Bool => "INTEGER",
    };
    let constraint = if field.required { " NOT NULL" } else { "" };
    format!("{} {affinity}{constraint}", quote_identifier(&field.name))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), CatalogSchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS catalog_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM catalog_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| CatalogSchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == CATALOG_SCHEMA_VERSION => Ok(()),
        Some(found) => Err(CatalogSchemaError::VersionMismatch {
            expected: CATALOG_SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO catalog_schema_version (version) VALUES (?1)",
                [CATALOG_SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| CatalogSchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn ensure_columns(
    transaction: &Transaction<'_>,
    schema: &ListingSchema,
) -> Result<(), CatalogSchemaError> {
    let inspect = |source| CatalogSchemaError::Migration {
        step: "inspect listings columns",
        source,
    };
    let mut statement = transaction
        .prepare("SELECT name FROM pragma_table_info('listings')")
        .map_err(inspect)?;
    let columns = statement
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(inspect)?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(inspect)?;
    for column in RESERVED_COLUMNS {
        if !columns.contains(column) {
            return Err(CatalogSchemaError::MissingColumn {
                column: column.to_owned(),
            });
        }
    }
    for field in schema.fields() {
        if columns.contains(field.name.as_str()) {
            continue;
        }
        if field.required {
            return Err(CatalogSchemaError::MissingColumn {
                column: field.name.clone(),
            });
        }
        run_migration_step(
            transaction,
            "add optional listings column",
            &format!("ALTER TABLE listings ADD COLUMN {}", column_ddl(field)),
        )?;
        log::info!("added optional catalog column `{}`", field.name);
    }
    Ok(())
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), CatalogSchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| CatalogSchemaError::Migration { step, source })
}

/// Listing catalog persisted in SQLite.
pub struct SqliteListingStore {
    connection: Connection,
    schema: ListingSchema,
    location: Option<PathBuf>,
    statements: Statements,
}

impl fmt::Debug for SqliteListingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteListingStore")
            .field("location", &self.location)
            .field("fields", &self.schema.len())
            .finish_non_exhaustive()
    }
}

impl SqliteListingStore {
    /// Open (or create) the catalog at `path`, initialising its tables.
    ///
    /// # Examples
    /// ```
    /// # use forecourt_core::{ListingSchema, ListingStore, SqliteListingStore};
    /// let dir = tempfile::tempdir().expect("create temp dir");
    /// let path = dir.path().join("catalog.sqlite");
    /// let store = SqliteListingStore::open(&path, ListingSchema::vehicle()).expect("open catalog");
    /// assert!(store.list_all().expect("list listings").is_empty());
    /// assert_eq!(store.path(), Some(path.as_path()));
    /// ```
    pub fn open(path: &Path, schema: ListingSchema) -> Result<Self, CatalogSchemaError> {
        let connection =
            Connection::open(path).map_err(|source| CatalogSchemaError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_connection(connection, schema, Some(path.to_path_buf()))
    }

    /// Open a private in-memory catalog.
    pub fn open_in_memory(schema: ListingSchema) -> Result<Self, CatalogSchemaError> {
        let connection =
            Connection::open_in_memory().map_err(|source| CatalogSchemaError::OpenDatabase {
                path: PathBuf::from(":memory:"),
                source,
            })?;
        Self::from_connection(connection, schema, None)
    }

    fn from_connection(
        mut connection: Connection,
        schema: ListingSchema,
        location: Option<PathBuf>,
    ) -> Result<Self, CatalogSchemaError> {
        initialise_catalog(&mut connection, &schema)?;
        let statements = Statements::for_schema(&schema);
        Ok(Self {
            connection,
            schema,
            location,
            statements,
        })
    }

    /// Schema every write is validated against.
    #[must_use]
    pub const fn schema(&self) -> &ListingSchema {
        &self.schema
    }

    /// Location of the database file, or `None` for in-memory catalogs.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn row_values(&self, listing: &NormalizedListing, last_synced: &str) -> Vec<SqlValue> {
        let mut values = Vec::with_capacity(self.schema.len() + 2);
        values.push(SqlValue::Text(listing.external_id().to_string()));
        values.push(SqlValue::Text(last_synced.to_owned()));
        values.extend(
            self.schema
                .fields()
                .iter()
                .map(|field| listing.get(&field.name).map_or(SqlValue::Null, encode_value)),
        );
        values
    }

    fn query_listings(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<StoredListing>, StoreError> {
        let mut statement = self.connection.prepare(sql).map_err(backend("query"))?;
        let mut rows = statement
            .query(params_from_iter(params.iter()))
            .map_err(backend("query"))?;
        let mut listings = Vec::new();
        while let Some(row) = rows.next().map_err(backend("query"))? {
            listings.push(decode_row(row, &self.schema)?);
        }
        Ok(listings)
    }
}

impl ListingStore for SqliteListingStore {
    fn find_by_external_id(&self, id: &ExternalId) -> Result<Option<StoredListing>, StoreError> {
        let params = [SqlValue::Text(id.to_string())];
        let found = self.query_listings(&self.statements.find_by_external_id, &params)?;
        Ok(found.into_iter().next())
    }

    fn list_all(&self) -> Result<Vec<StoredListing>, StoreError> {
        self.query_listings(&self.statements.list_all, &[])
    }

    fn create(&mut self, listing: NormalizedListing) -> Result<StoredListing, StoreError> {
        self.schema.validate(&listing)?;
        if self.find_by_external_id(listing.external_id())?.is_some() {
            return Err(StoreError::DuplicateExternalId {
                external_id: listing.external_id().clone(),
            });
        }
        let (stamp, last_synced) = sync_timestamp()?;
        let values = self.row_values(&listing, &stamp);
        self.connection
            .execute(&self.statements.insert, params_from_iter(values))
            .map_err(|source| write_error("insert", &listing, source))?;
        Ok(StoredListing {
            key: StoreKey::new(self.connection.last_insert_rowid()),
            listing,
            last_synced,
        })
    }

    fn update(
        &mut self,
        key: StoreKey,
        listing: NormalizedListing,
    ) -> Result<StoredListing, StoreError> {
        self.schema.validate(&listing)?;
        let (stamp, last_synced) = sync_timestamp()?;
        let mut values = self.row_values(&listing, &stamp);
        values.push(SqlValue::Integer(key.get()));
        let changed = self
            .connection
            .execute(&self.statements.update, params_from_iter(values))
            .map_err(|source| write_error("update", &listing, source))?;
        if changed == 0 {
            return Err(StoreError::NotFound { key });
        }
        Ok(StoredListing {
            key,
            listing,
            last_synced,
        })
    }

    fn delete(&mut self, key: StoreKey) -> Result<(), StoreError> {
        let changed = self
            .connection
            .execute("DELETE FROM listings WHERE key = ?1", [key.get()])
            .map_err(backend("delete"))?;
        if changed == 0 {
            return Err(StoreError::NotFound { key });
        }
        Ok(())
    }
}

/// SQL text derived once from the schema's column list.
#[derive(Debug)]
struct Statements {
    find_by_external_id: String,
    list_all: String,
    insert: String,
    update: String,
}

impl Statements {
    fn for_schema(schema: &ListingSchema) -> Self {
        let field_columns: Vec<String> = schema
            .fields()
            .iter()
            .map(|field| quote_identifier(&field.name))
            .collect();
        let mut select_columns = vec![
            "key".to_owned(),
            "external_id".to_owned(),
            "last_synced".to_owned(),
        ];
        select_columns.extend(field_columns.iter().cloned());
        let select = format!("SELECT {} FROM listings", select_columns.join(", "));

        let mut write_columns = vec!["external_id".to_owned(), "last_synced".to_owned()];
        write_columns.extend(field_columns);
        let placeholders = vec!["?"; write_columns.len()].join(", ");
        let assignments: Vec<String> = write_columns
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect();

        Self {
            find_by_external_id: format!("{select} WHERE external_id = ?1 ORDER BY key LIMIT 1"),
            list_all: format!("{select} ORDER BY key"),
            insert: format!(
                "INSERT INTO listings ({}) VALUES ({placeholders})",
                write_columns.join(", ")
            ),
            update: format!("UPDATE listings SET {} WHERE key = ?", assignments.join(", ")),
        }
    }
}

const FIXED_COLUMNS: usize = 3;

fn decode_row(row: &Row<'_>, schema: &ListingSchema) -> Result<StoredListing, StoreError> {
    let key = StoreKey::new(row.get(0).map_err(backend("read row"))?);
    let external_id: String = row.get(1).map_err(backend("read row"))?;
    let stamp: String = row.get(2).map_err(backend("read row"))?;
    let last_synced = DateTime::parse_from_rfc3339(&stamp)
        .map_err(|err| StoreError::CorruptRecord {
            key,
            message: format!("invalid last_synced timestamp {stamp:?}: {err}"),
        })?
        .with_timezone(&Utc);

    let mut listing = NormalizedListing::new(external_id);
    for (offset, field) in schema.fields().iter().enumerate() {
        let raw: SqlValue = row
            .get(FIXED_COLUMNS + offset)
            .map_err(backend("read row"))?;
        if let Some(value) = decode_value(key, field, raw)? {
            listing.insert(field.name.clone(), value);
        }
    }
    Ok(StoredListing {
        key,
        listing,
        last_synced,
    })
}

fn decode_value(
    key: StoreKey,
    field: &FieldDef,
    raw: SqlValue,
) -> Result<Option<FieldValue>, StoreError> {
    let value = match (field.kind, raw) {
        (_, SqlValue::Null) => return Ok(None),
        (FieldKind::Number, SqlValue::Real(number)) => FieldValue::Number(number),
        (FieldKind::Text, SqlValue::Text(text)) => FieldValue::Text(text),
        (FieldKind::Date, SqlValue::Text(text)) => {
            let date = NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|err| {
                StoreError::CorruptRecord {
                    key,
                    message: format!("column `{}` holds invalid date {text:?}: {err}", field.name),
                }
            })?;
            FieldValue::Date(date)
        }
        (FieldKind::Bool, SqlValue::Integer(flag)) => FieldValue::Bool(flag != 0),
        (kind, other) => {
            return Err(StoreError::CorruptRecord {
                key,
                message: format!(
                    "column `{}` holds {} data, expected {kind}",
                    field.name,
                    other.data_type()
                ),
            });
        }
    };
    Ok(Some(value))
}

fn encode_value(value: &FieldValue) -> SqlValue {
    match value {
        FieldValue::Number(number) => SqlValue::Real(*number),
        FieldValue::Text(text) => SqlValue::Text(text.clone()),
        FieldValue::Date(date) => SqlValue::Text(date.format(DATE_FORMAT).to_string()),
        FieldValue::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
    }
}

/// Current time rendered for storage, alongside the value it reads back as.
fn sync_timestamp() -> Result<(String, DateTime<Utc>), StoreError> {
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true);
    let parsed = DateTime::parse_from_rfc3339(&stamp)
        .map_err(|err| StoreError::Backend {
            operation: "timestamp",
            source: Box::new(err),
        })?
        .with_timezone(&Utc);
    Ok((stamp, parsed))
}

fn backend(operation: &'static str) -> impl Fn(SqliteError) -> StoreError {
    move |source| StoreError::Backend {
        operation,
        source: Box::new(source),
    }
}

fn write_error(operation: &'static str, listing: &NormalizedListing, source: SqliteError) -> StoreError {
    match source {
        SqliteError::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::DuplicateExternalId {
                external_id: listing.external_id().clone(),
            }
        }
        other => backend(operation)(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::vehicle;
    use crate::ValidationError;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn store() -> SqliteListingStore {
        SqliteListingStore::open_in_memory(ListingSchema::vehicle())
            .expect("in-memory catalog should open")
    }

    fn rich_listing(id: &str) -> NormalizedListing {
        vehicle(id, "Mazda", "CX-5")
            .with_field("mileage", FieldValue::Number(84_250.0))
            .with_field("kmPerLiter", FieldValue::Number(16.4))
            .with_field(
                "registrationDate",
                FieldValue::Date(NaiveDate::from_ymd_opt(2019, 3, 14).expect("valid date")),
            )
            .with_field("serviceBook", FieldValue::Bool(true))
            .with_field("color", FieldValue::Text("Soul Red".to_owned()))
    }

    #[rstest]
    fn round_trips_every_field_kind(mut store: SqliteListingStore) {
        let created = store
            .create(rich_listing("A"))
            .expect("create should succeed");
        let found = store
            .find_by_external_id(&ExternalId::from("A"))
            .expect("lookup should succeed")
            .expect("listing should exist");
        assert_eq!(found, created);
        assert_eq!(found.listing, rich_listing("A"));
    }

    #[rstest]
    fn update_clears_removed_optional_fields(mut store: SqliteListingStore) {
        let created = store
            .create(rich_listing("A"))
            .expect("create should succeed");
        let mut replacement = rich_listing("A");
        replacement.remove("color");
        store
            .update(created.key, replacement.clone())
            .expect("update should succeed");
        let all = store.list_all().expect("list should succeed");
        let row = all.first().expect("one listing");
        assert_eq!(row.listing, replacement);
        assert!(row.last_synced >= created.last_synced);
    }

    #[rstest]
    fn rejects_schema_violations(mut store: SqliteListingStore) {
        let listing = NormalizedListing::new("A").with_field("make", FieldValue::Number(1.0));
        let err = store.create(listing).expect_err("violation expected");
        assert!(matches!(
            err,
            StoreError::Schema(ValidationError::KindMismatch { .. })
        ));
    }

    #[rstest]
    fn rejects_duplicate_external_ids(mut store: SqliteListingStore) {
        store.create(vehicle("A", "Fiat", "500")).expect("first create");
        let err = store
            .create(vehicle("A", "Fiat", "Panda"))
            .expect_err("duplicate expected");
        assert!(matches!(err, StoreError::DuplicateExternalId { .. }));
    }

    #[rstest]
    fn missing_keys_are_reported(mut store: SqliteListingStore) {
        let missing = StoreKey::new(77);
        assert!(matches!(
            store.delete(missing),
            Err(StoreError::NotFound { key }) if key == missing
        ));
        assert!(matches!(
            store.update(missing, vehicle("A", "Fiat", "500")),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[rstest]
    fn persists_across_reopen() {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("catalog.sqlite");
        {
            let mut store = SqliteListingStore::open(&path, ListingSchema::vehicle())
                .expect("open catalog");
            store.create(rich_listing("A")).expect("create");
            store.create(rich_listing("B")).expect("create");
        }
        let reopened =
            SqliteListingStore::open(&path, ListingSchema::vehicle()).expect("reopen catalog");
        let ids: Vec<String> = reopened
            .list_all()
            .expect("list")
            .into_iter()
            .map(|row| row.listing.external_id().to_string())
            .collect();
        assert_eq!(ids, ["A", "B"]);
    }

    #[rstest]
    fn rejects_unknown_schema_versions() {
        let mut connection = Connection::open_in_memory().expect("open database");
        initialise_catalog(&mut connection, &ListingSchema::vehicle()).expect("initialise");
        connection
            .execute("UPDATE catalog_schema_version SET version = 9", [])
            .expect("tamper with version");
        let err = initialise_catalog(&mut connection, &ListingSchema::vehicle())
            .expect_err("mismatch expected");
        assert!(matches!(
            err,
            CatalogSchemaError::VersionMismatch { expected: 1, found: 9 }
        ));
    }

    fn listings_columns(connection: &Connection) -> HashSet<String> {
        let mut statement = connection
            .prepare("SELECT name FROM pragma_table_info('listings')")
            .expect("prepare column query");
        statement
            .query_map([], |row| row.get::<_, String>(0))
            .expect("query columns")
            .collect::<Result<_, _>>()
            .expect("read columns")
    }

    #[rstest]
    fn rejects_catalogs_missing_required_columns() {
        let mut connection = Connection::open_in_memory().expect("open database");
        let narrow = ListingSchema::new([FieldDef::required("make", FieldKind::Text)])
            .expect("valid schema");
        initialise_catalog(&mut connection, &narrow).expect("initialise narrow catalog");
        let err = initialise_catalog(&mut connection, &ListingSchema::vehicle())
            .expect_err("missing required column expected");
        match err {
            CatalogSchemaError::MissingColumn { column } => assert_eq!(column, "model"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(
            !listings_columns(&connection).contains("mileage"),
            "a rejected upgrade must not leave new columns behind"
        );
    }

    #[rstest]
    fn adds_missing_optional_columns() {
        let mut connection = Connection::open_in_memory().expect("open database");
        let required_only = ListingSchema::new(
            ListingSchema::vehicle()
                .fields()
                .iter()
                .filter(|field| field.required)
                .cloned(),
        )
        .expect("valid schema");
        initialise_catalog(&mut connection, &required_only).expect("initialise narrow catalog");
        assert!(!listings_columns(&connection).contains("mileage"));

        initialise_catalog(&mut connection, &ListingSchema::vehicle())
            .expect("optional columns should be added");
        let columns = listings_columns(&connection);
        for field in ListingSchema::vehicle().fields() {
            assert!(columns.contains(&field.name), "missing column {}", field.name);
        }

        let mut store = SqliteListingStore::from_connection(
            connection,
            ListingSchema::vehicle(),
            None,
        )
        .expect("upgraded catalog opens");
        store
            .create(rich_listing("A"))
            .expect("optional fields persist after the upgrade");
    }

    #[rstest]
    fn rejects_reserved_field_names() {
        let schema = ListingSchema::new([FieldDef::optional("key", FieldKind::Number)])
            .expect("valid schema");
        let err = SqliteListingStore::open_in_memory(schema).expect_err("reserved name");
        assert!(matches!(err, CatalogSchemaError::ReservedColumn { .. }));
    }
}
