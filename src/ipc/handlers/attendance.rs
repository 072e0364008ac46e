use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::SheetStore;
use serde_json::json;

// Unlike every other method, a failed write reports {success: false,
// message} inside an ok envelope, so one bad cell does not abort a batch
// of submissions from the page.
fn write_attendance(store: &dyn SheetStore, params: &serde_json::Value) -> serde_json::Value {
    match try_write(store, params) {
        Ok(()) => json!({ "success": true }),
        Err(message) => json!({ "success": false, "message": message }),
    }
}

fn try_write(store: &dyn SheetStore, params: &serde_json::Value) -> Result<(), String> {
    let document_id = required_str(params, "documentId")?;
    let sheet_name = required_str(params, "sheetName")?;
    let row = required_i64(params, "rowIndex")?;
    let col = required_i64(params, "colIndex")?;
    // The status is stored verbatim; P/A/L is a page-level convention, not
    // a storage constraint.
    let status = required_str(params, "status")?;

    let dims = store
        .open_sheet(&document_id, &sheet_name)
        .map_err(|e| e.to_string())?;
    if dims.is_none() {
        return Err(format!(
            "no sheet named {sheet_name} in document {document_id}"
        ));
    }
    store
        .set_cell(&document_id, &sheet_name, row, col, &status)
        .map_err(|e| e.to_string())?;
    Ok(())
}

fn required_str(params: &serde_json::Value, key: &str) -> Result<String, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| format!("missing {}", key))
}

fn required_i64(params: &serde_json::Value, key: &str) -> Result<i64, String> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| format!("missing {}", key))
}

fn handle_attendance_write(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_deref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(&req.id, write_attendance(store, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.write" => Some(handle_attendance_write(state, req)),
        _ => None,
    }
}
