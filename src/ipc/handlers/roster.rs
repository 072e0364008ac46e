use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_i64, get_required_str, store_err, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::SheetStore;
use serde_json::json;

fn read_roster(
    store: &dyn SheetStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let document_id = get_required_str(params, "documentId")?;
    let sheet_name = get_required_str(params, "sheetName")?;
    let name_col = get_required_i64(params, "nameCol")?;
    let start_row = get_required_i64(params, "startRow")?;
    let attendance_col = get_required_i64(params, "attendanceCol")?;
    if name_col < 1 || start_row < 1 || attendance_col < 1 {
        return Err(HandlerErr::new(
            "bad_params",
            "nameCol, startRow and attendanceCol are 1-based",
        ));
    }

    let dims = store
        .open_sheet(&document_id, &sheet_name)
        .map_err(store_err)?;
    let Some(dims) = dims else {
        return Err(HandlerErr::new(
            "not_found",
            format!("no sheet named {sheet_name}"),
        ));
    };
    if dims.last_row < start_row {
        return Err(HandlerErr::new(
            "out_of_range",
            format!(
                "no roster rows at row {} or below (last row {})",
                start_row, dims.last_row
            ),
        ));
    }

    let count = dims.last_row - start_row + 1;
    let names = store
        .get_range(&document_id, &sheet_name, start_row, name_col, count, 1)
        .map_err(store_err)?;
    let marks = store
        .get_range(&document_id, &sheet_name, start_row, attendance_col, count, 1)
        .map_err(store_err)?;

    // Blank-after-trim name cells are separator rows, skipped without
    // breaking the absolute row indices of later entries.
    let mut entries = Vec::new();
    for (i, row) in names.iter().enumerate() {
        let name = row.first().map(|s| s.trim()).unwrap_or("");
        if name.is_empty() {
            continue;
        }
        let status = marks
            .get(i)
            .and_then(|r| r.first())
            .map(|s| s.to_uppercase())
            .unwrap_or_default();
        entries.push(json!({
            "name": name,
            "rowIndex": start_row + i as i64,
            "status": status
        }));
    }

    Ok(json!({ "entries": entries }))
}

fn handle_roster_read(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_deref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match read_roster(store, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.read" => Some(handle_roster_read(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::FakeStore;

    fn params() -> serde_json::Value {
        json!({
            "documentId": "doc",
            "sheetName": "ClassA",
            "nameCol": 2,
            "startRow": 3,
            "attendanceCol": 5
        })
    }

    #[test]
    fn skips_blank_rows_and_keeps_absolute_indices() {
        let store = FakeStore::with_sheet("doc", "ClassA");
        store.put("doc", "ClassA", 3, 2, "Alice");
        store.put("doc", "ClassA", 4, 2, "   ");
        store.put("doc", "ClassA", 5, 2, "Bob");
        store.put("doc", "ClassA", 3, 5, "P");
        store.put("doc", "ClassA", 5, 5, "A");

        let result = read_roster(&store, &params()).expect("read roster");
        let entries = result["entries"].as_array().expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["name"], "Alice");
        assert_eq!(entries[0]["rowIndex"], 3);
        assert_eq!(entries[0]["status"], "P");
        assert_eq!(entries[1]["name"], "Bob");
        assert_eq!(entries[1]["rowIndex"], 5);
        assert_eq!(entries[1]["status"], "A");
    }

    #[test]
    fn status_is_uppercased_and_blank_when_unmarked() {
        let store = FakeStore::with_sheet("doc", "ClassA");
        store.put("doc", "ClassA", 3, 2, "  Alice  ");
        store.put("doc", "ClassA", 3, 5, "p");
        store.put("doc", "ClassA", 4, 2, "Bob");

        let result = read_roster(&store, &params()).expect("read roster");
        let entries = result["entries"].as_array().expect("entries");
        assert_eq!(entries[0]["name"], "Alice");
        assert_eq!(entries[0]["status"], "P");
        assert_eq!(entries[1]["name"], "Bob");
        assert_eq!(entries[1]["status"], "");
    }

    #[test]
    fn empty_roster_is_out_of_range_not_empty_list() {
        let store = FakeStore::with_sheet("doc", "ClassA");
        let err = read_roster(&store, &params()).expect_err("no rows");
        assert_eq!(err.code, "out_of_range");
    }

    #[test]
    fn rows_above_start_row_do_not_count() {
        let store = FakeStore::with_sheet("doc", "ClassA");
        store.put("doc", "ClassA", 1, 2, "Header");
        store.put("doc", "ClassA", 2, 2, "Name");
        let err = read_roster(&store, &params()).expect_err("nothing at start row");
        assert_eq!(err.code, "out_of_range");
    }
}
