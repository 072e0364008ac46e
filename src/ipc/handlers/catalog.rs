use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_str, store_err, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::SheetStore;
use serde_json::json;

fn documents_list(store: &dyn SheetStore) -> Result<serde_json::Value, HandlerErr> {
    let docs = store.list_documents().map_err(store_err)?;
    // The backend already restricts to writer-access spreadsheets; anything
    // whose edit capability is unset or false is dropped here as well.
    let documents: Vec<serde_json::Value> = docs
        .iter()
        .filter(|d| d.can_edit == Some(true))
        .map(|d| json!({ "id": d.id, "name": d.name }))
        .collect();
    Ok(json!({ "documents": documents }))
}

fn documents_create(
    store: &dyn SheetStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    if name.trim().is_empty() {
        return Err(HandlerErr::new("bad_params", "name must not be blank"));
    }
    let time_zone = params
        .get("timeZone")
        .and_then(|v| v.as_str())
        .unwrap_or("UTC")
        .to_string();
    let sheet_names: Vec<String> = match params.get("sheetNames").and_then(|v| v.as_array()) {
        Some(values) => {
            let names: Vec<String> = values
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect();
            if names.is_empty() {
                return Err(HandlerErr::new(
                    "bad_params",
                    "sheetNames must contain at least one name",
                ));
            }
            names
        }
        None => vec!["Roster".to_string()],
    };
    let document_id = store
        .create_document(&name, &time_zone, &sheet_names)
        .map_err(|e| HandlerErr::new("store_update_failed", e.to_string()))?;
    Ok(json!({ "documentId": document_id }))
}

fn documents_sheets(
    store: &dyn SheetStore,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let document_id = get_required_str(params, "documentId")?;
    let names = store.sheet_names(&document_id).map_err(store_err)?;
    let Some(names) = names else {
        return Err(HandlerErr::new("not_found", "document not found"));
    };
    Ok(json!({ "sheets": names }))
}

fn handle_documents_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_deref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match documents_list(store) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_documents_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_deref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match documents_create(store, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

fn handle_documents_sheets(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_deref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match documents_sheets(store, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "documents.list" => Some(handle_documents_list(state, req)),
        "documents.create" => Some(handle_documents_create(state, req)),
        "documents.sheets" => Some(handle_documents_sheets(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::FakeStore;
    use crate::store::DocumentMeta;

    #[test]
    fn list_keeps_only_documents_with_confirmed_edit_capability() {
        let mut store = FakeStore::default();
        store.documents = vec![
            DocumentMeta {
                id: "a".into(),
                name: "Math 8D".into(),
                can_edit: Some(true),
            },
            DocumentMeta {
                id: "b".into(),
                name: "Shared view".into(),
                can_edit: Some(false),
            },
            DocumentMeta {
                id: "c".into(),
                name: "No capability info".into(),
                can_edit: None,
            },
        ];

        let result = documents_list(&store).expect("list");
        let docs = result["documents"].as_array().expect("documents array");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["id"], "a");
        assert_eq!(docs[0]["name"], "Math 8D");
    }

    #[test]
    fn sheets_of_unknown_document_is_not_found() {
        let store = FakeStore::default();
        let err = documents_sheets(&store, &serde_json::json!({ "documentId": "nope" }))
            .expect_err("unknown document");
        assert_eq!(err.code, "not_found");
    }
}
