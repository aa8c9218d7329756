//! Structured symbol storage on SQLite.
//!
//! [`DebugSymbolTable`] is the write-ahead backend: a generator stores every
//! instance, variable and breakpoint before the session starts, and the
//! engine reads them back by id or location.
//!
//! Referential integrity is checked by the writer before anything touches
//! storage. A rejected write leaves the table exactly as it was.
//!
//! # Example
//!
//! ```no_run
//! use hgdb_core::types::{BreakpointSymbol, Instance};
//! use hgdb_symbols::DebugSymbolTable;
//!
//! # async fn example() -> Result<(), hgdb_symbols::SymbolTableError> {
//! let table = DebugSymbolTable::open("design.db").await?;
//! table.begin_transaction().await?;
//! table.store_instance(&Instance::new(0, "top")).await?;
//! table.store_breakpoint(&BreakpointSymbol::new(0, 0, "top.sv", 12)).await?;
//! table.end_transaction().await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use async_lock::Mutex;
use hgdb_core::types::{
    Annotation, BreakpointKind, BreakpointSymbol, ContextVariable, GeneratorVariable, IndexRange,
    Instance, ScopeEntry, Variable, VariableType,
};
use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};

use crate::error::{Result, SymbolTableError};
use crate::schema::{BREAKPOINT_COLUMNS, CREATE_TABLES};

type BreakpointRow = (i64, i64, String, i64, i64, String, String);
type VariableRow = (i64, String, bool, Option<String>, i64);

/// A symbol table persisted in SQLite.
pub struct DebugSymbolTable {
    conn: Mutex<SqliteConnection>,
    location: String,
    in_transaction: AtomicBool,
}

impl DebugSymbolTable {
    /// Open (or create) a store on disk.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .connect()
            .await?;
        Self::init(conn, path.display().to_string()).await
    }

    /// Create a private in-memory store.
    pub async fn in_memory() -> Result<Self> {
        let conn = SqliteConnectOptions::from_str("sqlite::memory:")?
            .connect()
            .await?;
        Self::init(conn, ":memory:".to_string()).await
    }

    async fn init(mut conn: SqliteConnection, location: String) -> Result<Self> {
        for statement in CREATE_TABLES {
            sqlx::query(statement).execute(&mut conn).await?;
        }
        tracing::debug!(location = %location, "symbol table opened");
        Ok(Self {
            conn: Mutex::new(conn),
            location,
            in_transaction: AtomicBool::new(false),
        })
    }

    /// Where the store lives.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Start a batch. Stores until [`end_transaction`](Self::end_transaction)
    /// become visible atomically.
    pub async fn begin_transaction(&self) -> Result<()> {
        if self.in_transaction.swap(true, Ordering::SeqCst) {
            return Err(SymbolTableError::Transaction(
                "a transaction is already open".to_string(),
            ));
        }
        let mut conn = self.conn.lock().await;
        if let Err(e) = sqlx::query("BEGIN").execute(&mut *conn).await {
            self.in_transaction.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        Ok(())
    }

    /// Commit the open batch.
    pub async fn end_transaction(&self) -> Result<()> {
        self.finish_transaction("COMMIT").await
    }

    /// Discard the open batch.
    pub async fn rollback_transaction(&self) -> Result<()> {
        self.finish_transaction("ROLLBACK").await
    }

    async fn finish_transaction(&self, statement: &str) -> Result<()> {
        if !self.in_transaction.swap(false, Ordering::SeqCst) {
            return Err(SymbolTableError::Transaction(
                "no transaction is open".to_string(),
            ));
        }
        let mut conn = self.conn.lock().await;
        sqlx::query(statement).execute(&mut *conn).await?;
        Ok(())
    }

    /// Whether a batch is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Writers
    // ========================================================================

    /// Store an instance.
    pub async fn store_instance(&self, instance: &Instance) -> Result<()> {
        let mut conn = self.conn.lock().await;
        ensure_new(&mut conn, "instance", instance.id).await?;
        sqlx::query("INSERT INTO instance (id, name, annotation) VALUES (?, ?, ?)")
            .bind(instance.id as i64)
            .bind(&instance.name)
            .bind(&instance.annotation)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Store a variable.
    pub async fn store_variable(&self, variable: &Variable) -> Result<()> {
        let indices = variable
            .indices
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut conn = self.conn.lock().await;
        ensure_new(&mut conn, "variable", variable.id).await?;
        sqlx::query("INSERT INTO variable (id, value, is_rtl, indices, type) VALUES (?, ?, ?, ?, ?)")
            .bind(variable.id as i64)
            .bind(&variable.value)
            .bind(variable.is_rtl)
            .bind(indices)
            .bind(variable.var_type.as_i64())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Store a breakpoint. Fails if its instance is unknown.
    pub async fn store_breakpoint(&self, breakpoint: &BreakpointSymbol) -> Result<()> {
        let mut conn = self.conn.lock().await;
        if !exists(&mut conn, "instance", breakpoint.instance_id).await? {
            return Err(SymbolTableError::UnknownInstance(breakpoint.instance_id));
        }
        ensure_new(&mut conn, "breakpoint", breakpoint.id).await?;

        let sql = format!("INSERT INTO breakpoint ({BREAKPOINT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)");
        sqlx::query(&sql)
            .bind(breakpoint.id as i64)
            .bind(breakpoint.instance_id as i64)
            .bind(&breakpoint.filename)
            .bind(i64::from(breakpoint.line_num))
            .bind(i64::from(breakpoint.column_num))
            .bind(&breakpoint.condition)
            .bind(&breakpoint.trigger)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Group breakpoints under one scope id. The order is kept verbatim.
    pub async fn store_scope(&self, scope_id: u64, breakpoints: &[u64]) -> Result<()> {
        let mut conn = self.conn.lock().await;
        for &id in breakpoints {
            if !exists(&mut conn, "breakpoint", id).await? {
                return Err(SymbolTableError::UnknownBreakpoint(id));
            }
        }
        ensure_new(&mut conn, "scope", scope_id).await?;

        let list = breakpoints
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        sqlx::query("INSERT INTO scope (id, breakpoints) VALUES (?, ?)")
            .bind(scope_id as i64)
            .bind(list)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Bind a name in a breakpoint context. Both ids must exist.
    pub async fn store_context_variable(&self, var: &ContextVariable) -> Result<()> {
        let mut conn = self.conn.lock().await;
        if !exists(&mut conn, "breakpoint", var.breakpoint_id).await? {
            return Err(SymbolTableError::UnknownBreakpoint(var.breakpoint_id));
        }
        if !exists(&mut conn, "variable", var.variable_id).await? {
            return Err(SymbolTableError::UnknownVariable(var.variable_id));
        }
        sqlx::query(
            "INSERT INTO context_variable (name, breakpoint_id, variable_id, type) VALUES (?, ?, ?, ?)",
        )
        .bind(&var.name)
        .bind(var.breakpoint_id as i64)
        .bind(var.variable_id as i64)
        .bind(var.delay_mode.as_i64())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Bind a name in an instance scope. Both ids must exist.
    pub async fn store_generator_variable(&self, var: &GeneratorVariable) -> Result<()> {
        let mut conn = self.conn.lock().await;
        if !exists(&mut conn, "instance", var.instance_id).await? {
            return Err(SymbolTableError::UnknownInstance(var.instance_id));
        }
        if !exists(&mut conn, "variable", var.variable_id).await? {
            return Err(SymbolTableError::UnknownVariable(var.variable_id));
        }
        sqlx::query(
            "INSERT INTO generator_variable (name, instance_id, variable_id, annotation) VALUES (?, ?, ?, ?)",
        )
        .bind(&var.name)
        .bind(var.instance_id as i64)
        .bind(var.variable_id as i64)
        .bind(&var.annotation)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Store an annotation.
    pub async fn store_annotation(&self, annotation: &Annotation) -> Result<()> {
        let mut conn = self.conn.lock().await;
        sqlx::query("INSERT INTO annotation (name, value) VALUES (?, ?)")
            .bind(&annotation.name)
            .bind(&annotation.value)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    // ========================================================================
    // Readers
    // ========================================================================

    /// Whether an instance id is stored.
    pub async fn has_instance_id(&self, id: u64) -> Result<bool> {
        exists(&mut *self.conn.lock().await, "instance", id).await
    }

    /// Whether a breakpoint id is stored.
    pub async fn has_breakpoint_id(&self, id: u64) -> Result<bool> {
        exists(&mut *self.conn.lock().await, "breakpoint", id).await
    }

    /// Whether a variable id is stored.
    pub async fn has_variable_id(&self, id: u64) -> Result<bool> {
        exists(&mut *self.conn.lock().await, "variable", id).await
    }

    /// Look up an instance.
    pub async fn get_instance(&self, id: u64) -> Result<Option<Instance>> {
        let mut conn = self.conn.lock().await;
        let row: Option<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, annotation FROM instance WHERE id = ?")
                .bind(id as i64)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(row.map(|(id, name, annotation)| Instance {
            id: id as u64,
            name,
            annotation,
        }))
    }

    /// Look up a breakpoint.
    pub async fn get_breakpoint(&self, id: u64) -> Result<Option<BreakpointSymbol>> {
        let mut conn = self.conn.lock().await;
        let sql = format!("SELECT {BREAKPOINT_COLUMNS} FROM breakpoint WHERE id = ?");
        let row: Option<BreakpointRow> = sqlx::query_as(&sql)
            .bind(id as i64)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(breakpoint_from_row))
    }

    /// Breakpoints at a location. A zero `column_num` matches every column
    /// on the line; otherwise the column must match exactly.
    pub async fn get_breakpoints(
        &self,
        filename: &str,
        line_num: u32,
        column_num: u32,
    ) -> Result<Vec<BreakpointSymbol>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<BreakpointRow> = if column_num == 0 {
            let sql = format!(
                "SELECT {BREAKPOINT_COLUMNS} FROM breakpoint WHERE filename = ? AND line_num = ? ORDER BY id"
            );
            sqlx::query_as(&sql)
                .bind(filename)
                .bind(i64::from(line_num))
                .fetch_all(&mut *conn)
                .await?
        } else {
            let sql = format!(
                "SELECT {BREAKPOINT_COLUMNS} FROM breakpoint WHERE filename = ? AND line_num = ? AND column_num = ? ORDER BY id"
            );
            sqlx::query_as(&sql)
                .bind(filename)
                .bind(i64::from(line_num))
                .bind(i64::from(column_num))
                .fetch_all(&mut *conn)
                .await?
        };
        Ok(rows.into_iter().map(breakpoint_from_row).collect())
    }

    /// Every breakpoint in a file, by line then column.
    pub async fn get_breakpoints_in_file(&self, filename: &str) -> Result<Vec<BreakpointSymbol>> {
        let mut conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {BREAKPOINT_COLUMNS} FROM breakpoint WHERE filename = ? ORDER BY line_num, column_num, id"
        );
        let rows: Vec<BreakpointRow> = sqlx::query_as(&sql)
            .bind(filename)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(breakpoint_from_row).collect())
    }

    /// Stored breakpoints whose kind intersects `kind`.
    ///
    /// Every stored breakpoint is a normal breakpoint; data breakpoints exist
    /// only inside a running engine.
    pub async fn get_breakpoints_by_kind(
        &self,
        kind: BreakpointKind,
    ) -> Result<Vec<BreakpointSymbol>> {
        if !kind.intersects(BreakpointKind::NORMAL) {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.lock().await;
        let sql = format!("SELECT {BREAKPOINT_COLUMNS} FROM breakpoint ORDER BY id");
        let rows: Vec<BreakpointRow> = sqlx::query_as(&sql).fetch_all(&mut *conn).await?;
        Ok(rows.into_iter().map(breakpoint_from_row).collect())
    }

    /// Name of an instance.
    pub async fn get_instance_name(&self, instance_id: u64) -> Result<Option<String>> {
        Ok(self.get_instance(instance_id).await?.map(|i| i.name))
    }

    /// Id of an instance by hierarchical name.
    pub async fn get_instance_id_by_name(&self, name: &str) -> Result<Option<u64>> {
        let mut conn = self.conn.lock().await;
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM instance WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|(id,)| id as u64))
    }

    /// Id of the instance owning a breakpoint.
    pub async fn get_instance_id_by_bp(&self, breakpoint_id: u64) -> Result<Option<u64>> {
        let mut conn = self.conn.lock().await;
        let row: Option<(i64,)> = sqlx::query_as("SELECT instance_id FROM breakpoint WHERE id = ?")
            .bind(breakpoint_id as i64)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|(id,)| id as u64))
    }

    /// Context bindings of a breakpoint with their variables, in store order.
    pub async fn get_context_variables(
        &self,
        breakpoint_id: u64,
    ) -> Result<Vec<(ContextVariable, Variable)>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<(String, i64, i64, i64, i64, String, bool, Option<String>, i64)> =
            sqlx::query_as(
                "SELECT c.name, c.breakpoint_id, c.variable_id, c.type, \
                        v.id, v.value, v.is_rtl, v.indices, v.type \
                 FROM context_variable c JOIN variable v ON v.id = c.variable_id \
                 WHERE c.breakpoint_id = ? ORDER BY c.rowid",
            )
            .bind(breakpoint_id as i64)
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter()
            .map(|(name, bp, var_id, mode, id, value, is_rtl, indices, ty)| {
                let binding = ContextVariable {
                    name,
                    breakpoint_id: bp as u64,
                    variable_id: var_id as u64,
                    delay_mode: VariableType::from_i64(mode),
                };
                Ok((binding, variable_from_row((id, value, is_rtl, indices, ty))?))
            })
            .collect()
    }

    /// Generator bindings of an instance with their variables, in store order.
    pub async fn get_generator_variables(
        &self,
        instance_id: u64,
    ) -> Result<Vec<(GeneratorVariable, Variable)>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<(String, i64, i64, String, i64, String, bool, Option<String>, i64)> =
            sqlx::query_as(
                "SELECT g.name, g.instance_id, g.variable_id, g.annotation, \
                        v.id, v.value, v.is_rtl, v.indices, v.type \
                 FROM generator_variable g JOIN variable v ON v.id = g.variable_id \
                 WHERE g.instance_id = ? ORDER BY g.rowid",
            )
            .bind(instance_id as i64)
            .fetch_all(&mut *conn)
            .await?;

        rows.into_iter()
            .map(|(name, inst, var_id, annotation, id, value, is_rtl, indices, ty)| {
                let binding = GeneratorVariable {
                    name,
                    instance_id: inst as u64,
                    variable_id: var_id as u64,
                    annotation,
                };
                Ok((binding, variable_from_row((id, value, is_rtl, indices, ty))?))
            })
            .collect()
    }

    /// All instance names, by id.
    pub async fn get_instance_names(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM instance ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Values stored under an annotation name.
    pub async fn get_annotation_values(&self, name: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT value FROM annotation WHERE name = ? ORDER BY rowid")
                .bind(name)
                .fetch_all(&mut *conn)
                .await?;
        Ok(rows.into_iter().map(|(value,)| value).collect())
    }

    /// Signal names of every array variable.
    pub async fn get_all_array_names(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT value FROM variable WHERE indices IS NOT NULL AND is_rtl = 1 ORDER BY value",
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(|(value,)| value).collect())
    }

    /// Distinct source filenames.
    pub async fn get_filenames(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT filename FROM breakpoint ORDER BY filename")
                .fetch_all(&mut *conn)
                .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// A scope grouping, with breakpoint ids in stored order.
    pub async fn get_scope(&self, scope_id: u64) -> Result<Option<ScopeEntry>> {
        let mut conn = self.conn.lock().await;
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, breakpoints FROM scope WHERE id = ?")
                .bind(scope_id as i64)
                .fetch_optional(&mut *conn)
                .await?;
        row.map(|(id, list)| {
            Ok(ScopeEntry {
                id: id as u64,
                breakpoints: parse_scope_list(&list)?,
            })
        })
        .transpose()
    }

    /// Breakpoint ids in execution order: every scope, by scope id.
    pub async fn execution_bp_orders(&self) -> Result<Vec<u64>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<(String,)> = sqlx::query_as("SELECT breakpoints FROM scope ORDER BY id")
            .fetch_all(&mut *conn)
            .await?;
        let mut order = Vec::new();
        for (list,) in rows {
            order.extend(parse_scope_list(&list)?);
        }
        Ok(order)
    }
}

async fn exists(conn: &mut SqliteConnection, table: &'static str, id: u64) -> Result<bool> {
    let sql = format!("SELECT 1 FROM {table} WHERE id = ? LIMIT 1");
    let row: Option<(i64,)> = sqlx::query_as(&sql)
        .bind(id as i64)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

async fn ensure_new(conn: &mut SqliteConnection, entity: &'static str, id: u64) -> Result<()> {
    if exists(conn, entity, id).await? {
        return Err(SymbolTableError::DuplicateId { entity, id });
    }
    Ok(())
}

fn breakpoint_from_row(row: BreakpointRow) -> BreakpointSymbol {
    let (id, instance_id, filename, line_num, column_num, condition, trigger) = row;
    BreakpointSymbol {
        id: id as u64,
        instance_id: instance_id as u64,
        filename,
        line_num: line_num as u32,
        column_num: column_num as u32,
        condition,
        trigger,
    }
}

fn variable_from_row(row: VariableRow) -> Result<Variable> {
    let (id, value, is_rtl, indices, ty) = row;
    let indices = indices
        .map(|text| serde_json::from_str::<Vec<IndexRange>>(&text))
        .transpose()
        .map_err(|e| SymbolTableError::Corrupt {
            table: "variable",
            message: format!("indices of variable {id}: {e}"),
        })?;
    Ok(Variable {
        id: id as u64,
        value,
        is_rtl,
        indices,
        var_type: VariableType::from_i64(ty),
    })
}

fn parse_scope_list(list: &str) -> Result<Vec<u64>> {
    list.split_whitespace()
        .map(|id| {
            id.parse::<u64>().map_err(|e| SymbolTableError::Corrupt {
                table: "scope",
                message: format!("'{id}': {e}"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn seeded() -> DebugSymbolTable {
        let table = DebugSymbolTable::in_memory().await.unwrap();
        table.store_instance(&Instance::new(0, "top")).await.unwrap();
        table.store_instance(&Instance::new(1, "top.child")).await.unwrap();
        table
            .store_breakpoint(&BreakpointSymbol::new(0, 0, "a.sv", 1).with_column(3))
            .await
            .unwrap();
        table
            .store_breakpoint(&BreakpointSymbol::new(1, 1, "a.sv", 1).with_column(9))
            .await
            .unwrap();
        table
            .store_breakpoint(&BreakpointSymbol::new(2, 1, "a.sv", 2).with_condition("en"))
            .await
            .unwrap();
        table.store_variable(&Variable::new(0, "a0", true)).await.unwrap();
        table.store_variable(&Variable::new(1, "42", false)).await.unwrap();
        table
    }

    #[tokio::test]
    async fn test_location_lookup() {
        let table = seeded().await;

        let all = table.get_breakpoints("a.sv", 1, 0).await.unwrap();
        assert_eq!(all.iter().map(|b| b.id).collect::<Vec<_>>(), vec![0, 1]);

        let exact = table.get_breakpoints("a.sv", 1, 9).await.unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].id, 1);

        assert!(table.get_breakpoints("a.sv", 1, 4).await.unwrap().is_empty());
        assert!(table.get_breakpoints("b.sv", 1, 0).await.unwrap().is_empty());

        let bp = table.get_breakpoint(2).await.unwrap().unwrap();
        assert_eq!(bp.condition, "en");
        assert_eq!(table.get_instance_id_by_bp(2).await.unwrap(), Some(1));
        assert_eq!(table.get_filenames().await.unwrap(), vec!["a.sv".to_string()]);
    }

    #[tokio::test]
    async fn test_breakpoints_by_kind() {
        let table = seeded().await;
        assert_eq!(table.get_breakpoints_by_kind(BreakpointKind::ANY).await.unwrap().len(), 3);
        assert!(table.get_breakpoints_by_kind(BreakpointKind::DATA).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_breakpoint_requires_instance() {
        let table = seeded().await;
        let err = table
            .store_breakpoint(&BreakpointSymbol::new(9, 42, "a.sv", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, SymbolTableError::UnknownInstance(42)));
        assert!(!table.has_breakpoint_id(9).await.unwrap());
    }

    #[tokio::test]
    async fn test_integrity_checked_before_mutation() {
        let table = seeded().await;

        let err = table
            .store_context_variable(&ContextVariable::new("a", 7, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SymbolTableError::UnknownBreakpoint(7)));

        let err = table
            .store_context_variable(&ContextVariable::new("a", 0, 99))
            .await
            .unwrap_err();
        assert!(matches!(err, SymbolTableError::UnknownVariable(99)));
        assert!(table.get_context_variables(0).await.unwrap().is_empty());

        let err = table
            .store_generator_variable(&GeneratorVariable::new("p", 5, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, SymbolTableError::UnknownInstance(5)));
        assert!(table.get_generator_variables(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let table = seeded().await;
        let err = table.store_instance(&Instance::new(0, "again")).await.unwrap_err();
        assert!(matches!(
            err,
            SymbolTableError::DuplicateId { entity: "instance", id: 0 }
        ));
        assert_eq!(table.get_instance_name(0).await.unwrap().as_deref(), Some("top"));
    }

    #[tokio::test]
    async fn test_variable_bindings() {
        let table = seeded().await;
        table
            .store_context_variable(&ContextVariable::new("a", 0, 0))
            .await
            .unwrap();
        table
            .store_generator_variable(&GeneratorVariable::new("WIDTH", 0, 1))
            .await
            .unwrap();

        let ctx = table.get_context_variables(0).await.unwrap();
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx[0].0.name, "a");
        assert_eq!(ctx[0].1, Variable::new(0, "a0", true));

        let generator = table.get_generator_variables(0).await.unwrap();
        assert_eq!(generator[0].0.name, "WIDTH");
        assert!(!generator[0].1.is_rtl);
    }

    #[tokio::test]
    async fn test_scope_order_is_verbatim() {
        let table = seeded().await;
        table.store_scope(1, &[2, 0]).await.unwrap();
        table.store_scope(0, &[1]).await.unwrap();

        let scope = table.get_scope(1).await.unwrap().unwrap();
        assert_eq!(scope.breakpoints, vec![2, 0]);
        assert_eq!(table.execution_bp_orders().await.unwrap(), vec![1, 2, 0]);

        let err = table.store_scope(2, &[0, 77]).await.unwrap_err();
        assert!(matches!(err, SymbolTableError::UnknownBreakpoint(77)));
        assert!(table.get_scope(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_array_variables_and_annotations() {
        let table = seeded().await;
        let mut mem = Variable::new(5, "top.mem", true);
        mem.indices = Some(vec![IndexRange { min: 0, max: 7 }]);
        table.store_variable(&mem).await.unwrap();
        table
            .store_annotation(&Annotation::new(Annotation::CLOCK, "top.clk"))
            .await
            .unwrap();

        assert_eq!(table.get_all_array_names().await.unwrap(), vec!["top.mem".to_string()]);
        assert_eq!(
            table.get_annotation_values("clock").await.unwrap(),
            vec!["top.clk".to_string()]
        );
        assert!(table.get_annotation_values("reset").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transaction_rollback_and_commit() {
        let table = seeded().await;

        table.begin_transaction().await.unwrap();
        assert!(table.begin_transaction().await.is_err());
        table.store_instance(&Instance::new(10, "tmp")).await.unwrap();
        table.rollback_transaction().await.unwrap();
        assert!(!table.has_instance_id(10).await.unwrap());

        table.begin_transaction().await.unwrap();
        table.store_instance(&Instance::new(11, "kept")).await.unwrap();
        table.end_transaction().await.unwrap();
        assert!(table.has_instance_id(11).await.unwrap());

        assert!(table.end_transaction().await.is_err());
    }

    #[tokio::test]
    async fn test_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design.db");
        {
            let table = DebugSymbolTable::open(&path).await.unwrap();
            table.store_instance(&Instance::new(0, "top")).await.unwrap();
        }
        let table = DebugSymbolTable::open(&path).await.unwrap();
        assert_eq!(table.get_instance_names().await.unwrap(), vec!["top".to_string()]);
        assert_eq!(table.location(), path.display().to_string());
    }
}
