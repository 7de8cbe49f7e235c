//! Relational store.
//!
//! Owns the SQLite pool, runs arbitrary SQL text and materialises rows as
//! ordered JSON maps, reads table/column metadata and seeds the demo dataset.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use common::errors::{AppError, AppResult};
use common::models::Row;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, SqlitePool, TypeInfo, ValueRef};

/// Table name to ordered column names.
pub type SchemaDescription = BTreeMap<String, Vec<String>>;

const DEMO_SCHEMA: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        age INTEGER,
        email TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        price DECIMAL(10, 2),
        category TEXT,
        stock INTEGER,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    )",
    "CREATE TABLE IF NOT EXISTS orders (
        id INTEGER PRIMARY KEY,
        user_id INTEGER,
        total_amount DECIMAL(10, 2),
        status TEXT,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (user_id) REFERENCES users (id)
    )",
];

#[derive(Clone, Copy)]
enum Seed {
    Text(&'static str),
    Int(i64),
    Real(f64),
}

struct SeedTable {
    table: &'static str,
    insert: &'static str,
    rows: &'static [&'static [Seed]],
}

use Seed::{Int, Real, Text};

// Order matters: orders reference users.
const SEED_DATA: [SeedTable; 3] = [
    SeedTable {
        table: "users",
        insert: "INSERT INTO users (name, age, email) VALUES (?, ?, ?)",
        rows: &[
            &[Text("John Doe"), Int(28), Text("john@example.com")],
            &[Text("Jane Smith"), Int(32), Text("jane@example.com")],
            &[Text("Bob Johnson"), Int(45), Text("bob@example.com")],
            &[Text("Alice Brown"), Int(29), Text("alice@example.com")],
            &[Text("Charlie Wilson"), Int(35), Text("charlie@example.com")],
        ],
    },
    SeedTable {
        table: "products",
        insert: "INSERT INTO products (name, price, category, stock) VALUES (?, ?, ?, ?)",
        rows: &[
            &[Text("Laptop"), Real(999.99), Text("Electronics"), Int(50)],
            &[Text("Smartphone"), Real(599.99), Text("Electronics"), Int(100)],
            &[Text("Desk Chair"), Real(199.99), Text("Furniture"), Int(30)],
            &[Text("Coffee Maker"), Real(79.99), Text("Appliances"), Int(75)],
            &[Text("Headphones"), Real(149.99), Text("Electronics"), Int(200)],
        ],
    },
    SeedTable {
        table: "orders",
        insert: "INSERT INTO orders (user_id, total_amount, status) VALUES (?, ?, ?)",
        rows: &[
            &[Int(1), Real(999.99), Text("completed")],
            &[Int(2), Real(799.98), Text("completed")],
            &[Int(3), Real(199.99), Text("pending")],
            &[Int(1), Real(149.99), Text("completed")],
            &[Int(4), Real(679.98), Text("processing")],
        ],
    },
];

/// Handle to the relational store.
///
/// The pool holds a single connection, so concurrent requests are serialised
/// at the pool rather than racing on the database file.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if missing) the store file at `path` and seeds it.
    pub async fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Internal(format!(
                    "failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        let store = Self::connect(options).await?;
        tracing::info!(path = %path.display(), "Store opened");
        Ok(store)
    }

    /// Opens a private in-memory store and seeds it.
    pub async fn in_memory() -> AppResult<Self> {
        Self::connect(SqliteConnectOptions::new().foreign_keys(true)).await
    }

    async fn connect(options: SqliteConnectOptions) -> AppResult<Self> {
        // No idle/lifetime reaping: an in-memory database lives only as long
        // as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Internal(format!("failed to open store: {}", e)))?;

        let store = Self { pool };
        store.bootstrap().await?;
        Ok(store)
    }

    /// Creates the demo tables and seeds every table that is still empty.
    ///
    /// Safe to call repeatedly; each table's count-then-insert runs in its own
    /// transaction.
    pub async fn bootstrap(&self) -> AppResult<()> {
        for ddl in DEMO_SCHEMA {
            sqlx::query(ddl).execute(&self.pool).await.map_err(|e| {
                tracing::error!(operation = "bootstrap", error = %e, "Failed to create demo table");
                AppError::Internal(format!("failed to create demo schema: {}", e))
            })?;
        }

        for seed in &SEED_DATA {
            self.seed_table(seed).await.map_err(|e| {
                tracing::error!(operation = "bootstrap", table = seed.table, error = %e, "Failed to seed table");
                AppError::Internal(format!("failed to seed table {}: {}", seed.table, e))
            })?;
        }

        tracing::info!("Store initialized");
        Ok(())
    }

    async fn seed_table(&self, seed: &SeedTable) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let count_sql = format!("SELECT COUNT(*) FROM {}", seed.table);
        let count: i64 = sqlx::query_scalar(&count_sql).fetch_one(&mut *tx).await?;

        if count == 0 {
            for values in seed.rows {
                let mut query = sqlx::query(seed.insert);
                for value in values.iter() {
                    query = match *value {
                        Text(v) => query.bind(v),
                        Int(v) => query.bind(v),
                        Real(v) => query.bind(v),
                    };
                }
                query.execute(&mut *tx).await?;
            }
            tracing::debug!(table = seed.table, rows = seed.rows.len(), "Seeded demo rows");
        }

        tx.commit().await
    }

    /// Runs `sql` verbatim and returns every result row.
    ///
    /// Mutating statements are executed as well; they simply yield no rows.
    pub async fn execute(&self, sql: &str) -> AppResult<Vec<Row>> {
        let rows = sqlx::query(sql)
            .persistent(false)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(operation = "execute", sql = %sql, error = %e, "Query execution failed");
                AppError::QueryExecution(e.to_string())
            })?;

        rows.iter()
            .map(row_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                tracing::error!(operation = "execute", sql = %sql, error = %e, "Failed to decode result row");
                AppError::QueryExecution(e.to_string())
            })
    }

    /// Lists user tables and their columns in declaration order.
    pub async fn schema(&self) -> AppResult<SchemaDescription> {
        self.read_schema().await.map_err(|e| {
            tracing::error!(operation = "schema", error = %e, "Schema introspection failed");
            AppError::SchemaIntrospection(e.to_string())
        })
    }

    async fn read_schema(&self) -> Result<SchemaDescription, sqlx::Error> {
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut schema = SchemaDescription::new();
        for table in tables {
            let columns: Vec<String> =
                sqlx::query_scalar("SELECT name FROM pragma_table_info(?) ORDER BY cid")
                    .bind(&table)
                    .fetch_all(&self.pool)
                    .await?;
            schema.insert(table, columns);
        }
        Ok(schema)
    }
}

/// Converts one row into a column-ordered JSON map keyed by column name.
fn row_to_json(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let storage_class = {
            let raw = row.try_get_raw(idx)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_string())
            }
        };

        let value = match storage_class.as_deref() {
            None => Value::Null,
            Some("INTEGER") => Value::from(row.try_get::<i64, _>(idx)?),
            Some("REAL") => Value::from(row.try_get::<f64, _>(idx)?),
            Some("BLOB") => Value::from(row.try_get::<Vec<u8>, _>(idx)?),
            Some(_) => Value::from(row.try_get::<String, _>(idx)?),
        };
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn count(store: &Store, table: &str) -> i64 {
        let rows = store
            .execute(&format!("SELECT COUNT(*) AS n FROM {}", table))
            .await
            .unwrap();
        rows[0]["n"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        store.bootstrap().await.unwrap();

        assert_eq!(count(&store, "users").await, 5);
        assert_eq!(count(&store, "products").await, 5);
        assert_eq!(count(&store, "orders").await, 5);
    }

    #[tokio::test]
    async fn test_count_returns_single_row() {
        let store = Store::in_memory().await.unwrap();
        let rows = store
            .execute("SELECT COUNT(*) AS n FROM users")
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(Value::Object(rows[0].clone()), json!({ "n": 5 }));
    }

    #[tokio::test]
    async fn test_rows_keep_column_order() {
        let store = Store::in_memory().await.unwrap();
        let rows = store
            .execute("SELECT email, name, id FROM users WHERE id = 1")
            .await
            .unwrap();

        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["email", "name", "id"]);
        assert_eq!(rows[0]["name"], "John Doe");
    }

    #[tokio::test]
    async fn test_scalar_types() {
        let store = Store::in_memory().await.unwrap();
        let rows = store
            .execute("SELECT price, stock, category, NULL AS empty_col FROM products WHERE name = 'Laptop'")
            .await
            .unwrap();

        assert_eq!(rows[0]["price"], json!(999.99));
        assert_eq!(rows[0]["stock"], json!(50));
        assert_eq!(rows[0]["category"], json!("Electronics"));
        assert_eq!(rows[0]["empty_col"], Value::Null);
    }

    #[tokio::test]
    async fn test_orders_join_users() {
        let store = Store::in_memory().await.unwrap();
        let rows = store
            .execute(
                "SELECT u.name, COUNT(o.id) AS orders FROM users u
                 JOIN orders o ON o.user_id = u.id
                 GROUP BY u.id ORDER BY orders DESC, u.id LIMIT 1",
            )
            .await
            .unwrap();

        assert_eq!(rows[0]["name"], "John Doe");
        assert_eq!(rows[0]["orders"], 2);
    }

    #[tokio::test]
    async fn test_malformed_sql_preserves_message() {
        let store = Store::in_memory().await.unwrap();
        let err = store.execute("SELECT * FROM missing_table").await.unwrap_err();

        match err {
            AppError::QueryExecution(msg) => assert!(msg.contains("no such table")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mutating_statement_returns_no_rows() {
        let store = Store::in_memory().await.unwrap();
        let rows = store
            .execute("UPDATE products SET stock = stock - 1 WHERE id = 1")
            .await
            .unwrap();

        assert!(rows.is_empty());
        let rows = store.execute("SELECT stock FROM products WHERE id = 1").await.unwrap();
        assert_eq!(rows[0]["stock"], 49);
    }

    #[tokio::test]
    async fn test_schema_lists_demo_tables() {
        let store = Store::in_memory().await.unwrap();
        let schema = store.schema().await.unwrap();

        assert_eq!(
            schema.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["orders", "products", "users"]
        );
        assert_eq!(
            schema["users"],
            vec!["id", "name", "age", "email", "created_at"]
        );
    }

    #[tokio::test]
    async fn test_schema_reflects_new_tables() {
        let store = Store::in_memory().await.unwrap();
        store
            .execute("CREATE TABLE reviews (id INTEGER PRIMARY KEY, body TEXT)")
            .await
            .unwrap();

        let schema = store.schema().await.unwrap();
        assert_eq!(schema["reviews"], vec!["id", "body"]);
    }

    #[tokio::test]
    async fn test_file_store_is_seeded_once() {
        let dir = std::env::temp_dir().join(format!(
            "nlsql-store-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let path = dir.join("database.db");

        {
            let store = Store::open(&path).await.unwrap();
            assert_eq!(count(&store, "users").await, 5);
            store.pool.close().await;
        }

        let store = Store::open(&path).await.unwrap();
        assert_eq!(count(&store, "orders").await, 5);
        store.pool.close().await;

        let _ = std::fs::remove_dir_all(&dir);
    }
}
