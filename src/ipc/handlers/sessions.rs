use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_str, store_err, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::SheetStore;
use chrono::NaiveDate;
use serde_json::json;

/// Row whose cells label the session columns.
const DEFAULT_HEADER_ROW: i64 = 1;

fn parse_session_date(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    let mut parts = t.splitn(3, '-');
    let (y, m, d) = (parts.next()?, parts.next()?, parts.next()?);
    if y.len() != 4 || m.len() != 2 || d.len() != 2 {
        return None;
    }
    let year = y.parse::<i32>().ok()?;
    let month = m.parse::<u32>().ok()?;
    let day = d.parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn format_session_header(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

fn create_session_column(
    store: &dyn SheetStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let document_id = get_required_str(params, "documentId")?;
    let sheet_name = get_required_str(params, "sheetName")?;
    let date_str = get_required_str(params, "date")?;
    let Some(date) = parse_session_date(&date_str) else {
        return Err(HandlerErr::new("bad_params", "date must be YYYY-MM-DD"));
    };
    let header_row = params
        .get("headerRow")
        .and_then(|v| v.as_i64())
        .unwrap_or(DEFAULT_HEADER_ROW);

    let dims = store
        .open_sheet(&document_id, &sheet_name)
        .map_err(store_err)?;
    let Some(dims) = dims else {
        return Err(HandlerErr::new(
            "not_found",
            format!("no sheet named {sheet_name}"),
        ));
    };

    // Always stamp a fresh column after the current last one. A column
    // created earlier for the same date is never reused; repeated calls
    // for one date produce consecutive new columns.
    let new_col = dims.last_col + 1;
    if dims.last_col > 0 {
        store
            .insert_column_after(&document_id, &sheet_name, dims.last_col)
            .map_err(|e| HandlerErr::new("store_update_failed", e.to_string()))?;
    }
    store
        .set_cell(
            &document_id,
            &sheet_name,
            header_row,
            new_col,
            &format_session_header(date),
        )
        .map_err(|e| HandlerErr::new("store_update_failed", e.to_string()))?;

    Ok(json!({ "columnIndex": new_col }))
}

fn handle_create_column(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_deref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match create_session_column(store, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "sessions.createColumn" => Some(handle_create_column(state, req)),
        _ => None,
    }
}
