use anyhow::bail;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

/// Listings stop after this many documents; there is no continuation token,
/// anything past the cap is silently omitted.
pub const DOCUMENT_PAGE_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct DocumentMeta {
    pub id: String,
    pub name: String,
    pub can_edit: Option<bool>,
}

#[derive(Debug, Clone, Copy)]
pub struct SheetDims {
    pub last_row: i64,
    pub last_col: i64,
}

/// Narrow storage capability the operation layer runs against. The shipped
/// backend is [`SqliteStore`]; tests substitute an in-memory grid.
pub trait SheetStore: Send {
    fn list_documents(&self) -> anyhow::Result<Vec<DocumentMeta>>;
    fn create_document(
        &self,
        name: &str,
        time_zone: &str,
        sheet_names: &[String],
    ) -> anyhow::Result<String>;
    fn sheet_names(&self, document_id: &str) -> anyhow::Result<Option<Vec<String>>>;
    fn open_sheet(&self, document_id: &str, sheet_name: &str)
        -> anyhow::Result<Option<SheetDims>>;
    fn get_range(
        &self,
        document_id: &str,
        sheet_name: &str,
        row: i64,
        col: i64,
        rows: i64,
        cols: i64,
    ) -> anyhow::Result<Vec<Vec<String>>>;
    fn set_cell(
        &self,
        document_id: &str,
        sheet_name: &str,
        row: i64,
        col: i64,
        value: &str,
    ) -> anyhow::Result<()>;
    fn insert_column_after(
        &self,
        document_id: &str,
        sheet_name: &str,
        col: i64,
    ) -> anyhow::Result<()>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        SqliteStore { conn }
    }

    fn sheet_id(&self, document_id: &str, sheet_name: &str) -> anyhow::Result<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM sheets WHERE document_id = ? AND name = ?",
                (document_id, sheet_name),
                |r| r.get::<_, String>(0),
            )
            .optional()?;
        Ok(id)
    }
}

impl SheetStore for SqliteStore {
    fn list_documents(&self) -> anyhow::Result<Vec<DocumentMeta>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, can_edit
             FROM documents
             WHERE trashed = 0 AND kind = 'spreadsheet' AND writer = 1
             ORDER BY name
             LIMIT ?",
        )?;
        let docs = stmt
            .query_map([DOCUMENT_PAGE_LIMIT as i64], |r| {
                Ok(DocumentMeta {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    can_edit: r.get::<_, Option<i64>>(2)?.map(|v| v != 0),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(docs)
    }

    fn create_document(
        &self,
        name: &str,
        time_zone: &str,
        sheet_names: &[String],
    ) -> anyhow::Result<String> {
        let document_id = Uuid::new_v4().to_string();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO documents(id, name, kind, time_zone, writer, can_edit, trashed)
             VALUES(?, ?, 'spreadsheet', ?, 1, 1, 0)",
            (&document_id, name, time_zone),
        )?;
        for (i, sheet_name) in sheet_names.iter().enumerate() {
            tx.execute(
                "INSERT INTO sheets(id, document_id, name, sort_order) VALUES(?, ?, ?, ?)",
                (
                    Uuid::new_v4().to_string(),
                    &document_id,
                    sheet_name,
                    i as i64,
                ),
            )?;
        }
        tx.commit()?;
        Ok(document_id)
    }

    fn sheet_names(&self, document_id: &str) -> anyhow::Result<Option<Vec<String>>> {
        let exists = self
            .conn
            .query_row("SELECT 1 FROM documents WHERE id = ?", [document_id], |r| {
                r.get::<_, i64>(0)
            })
            .optional()?
            .is_some();
        if !exists {
            return Ok(None);
        }
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sheets WHERE document_id = ? ORDER BY sort_order, name",
        )?;
        let names = stmt
            .query_map([document_id], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(names))
    }

    fn open_sheet(
        &self,
        document_id: &str,
        sheet_name: &str,
    ) -> anyhow::Result<Option<SheetDims>> {
        let Some(sheet_id) = self.sheet_id(document_id, sheet_name)? else {
            return Ok(None);
        };
        let dims = self.conn.query_row(
            "SELECT COALESCE(MAX(row_idx), 0), COALESCE(MAX(col_idx), 0)
             FROM cells WHERE sheet_id = ?",
            [&sheet_id],
            |r| {
                Ok(SheetDims {
                    last_row: r.get(0)?,
                    last_col: r.get(1)?,
                })
            },
        )?;
        Ok(Some(dims))
    }

    fn get_range(
        &self,
        document_id: &str,
        sheet_name: &str,
        row: i64,
        col: i64,
        rows: i64,
        cols: i64,
    ) -> anyhow::Result<Vec<Vec<String>>> {
        let Some(sheet_id) = self.sheet_id(document_id, sheet_name)? else {
            bail!("no sheet named {sheet_name}");
        };
        let mut grid = vec![vec![String::new(); cols.max(0) as usize]; rows.max(0) as usize];
        let mut stmt = self.conn.prepare(
            "SELECT row_idx, col_idx, value FROM cells
             WHERE sheet_id = ? AND row_idx BETWEEN ? AND ? AND col_idx BETWEEN ? AND ?",
        )?;
        let cells = stmt
            .query_map(
                (&sheet_id, row, row + rows - 1, col, col + cols - 1),
                |r| {
                    Ok((
                        r.get::<_, i64>(0)?,
                        r.get::<_, i64>(1)?,
                        r.get::<_, String>(2)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        for (r, c, value) in cells {
            grid[(r - row) as usize][(c - col) as usize] = value;
        }
        Ok(grid)
    }

    fn set_cell(
        &self,
        document_id: &str,
        sheet_name: &str,
        row: i64,
        col: i64,
        value: &str,
    ) -> anyhow::Result<()> {
        let Some(sheet_id) = self.sheet_id(document_id, sheet_name)? else {
            bail!("no sheet named {sheet_name}");
        };
        if value.is_empty() {
            self.conn.execute(
                "DELETE FROM cells WHERE sheet_id = ? AND row_idx = ? AND col_idx = ?",
                (&sheet_id, row, col),
            )?;
            return Ok(());
        }
        self.conn.execute(
            "INSERT INTO cells(sheet_id, row_idx, col_idx, value)
             VALUES(?, ?, ?, ?)
             ON CONFLICT(sheet_id, row_idx, col_idx) DO UPDATE SET
               value = excluded.value",
            (&sheet_id, row, col, value),
        )?;
        Ok(())
    }

    fn insert_column_after(
        &self,
        document_id: &str,
        sheet_name: &str,
        col: i64,
    ) -> anyhow::Result<()> {
        let Some(sheet_id) = self.sheet_id(document_id, sheet_name)? else {
            bail!("no sheet named {sheet_name}");
        };
        // Two passes through negative indices so the shift cannot collide
        // with the (sheet_id, row_idx, col_idx) primary key.
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE cells SET col_idx = -(col_idx + 1) WHERE sheet_id = ? AND col_idx > ?",
            (&sheet_id, col),
        )?;
        tx.execute(
            "UPDATE cells SET col_idx = -col_idx WHERE sheet_id = ? AND col_idx < 0",
            [&sheet_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}
