use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_workspace(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rollbookd");
    let mut child = Command::new(exe)
        .arg("--stdio")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rollbookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn documents_listing_and_sheet_names() {
    let workspace = temp_workspace("rollbook-catalog");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    // Before a workspace is selected, every document method refuses.
    let early = request(&mut stdin, &mut reader, "0", "documents.list", json!({}));
    assert_eq!(early["ok"], false);
    assert_eq!(early["error"]["code"], "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let health = request_ok(&mut stdin, &mut reader, "2", "health", json!({}));
    assert!(health["version"].as_str().is_some());
    assert_eq!(
        health["workspacePath"].as_str(),
        Some(workspace.to_string_lossy().as_ref())
    );

    let science = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "documents.create",
        json!({ "name": "Science 9B", "sheetNames": ["Period 1", "Period 2"] }),
    );
    let science_id = science["documentId"].as_str().expect("documentId");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "documents.create",
        json!({ "name": "Math 8D" }),
    );

    let listing = request_ok(&mut stdin, &mut reader, "5", "documents.list", json!({}));
    let docs = listing["documents"].as_array().expect("documents");
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["name"], "Math 8D");
    assert_eq!(docs[1]["name"], "Science 9B");

    let sheets = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "documents.sheets",
        json!({ "documentId": science_id }),
    );
    assert_eq!(sheets["sheets"], json!(["Period 1", "Period 2"]));

    let missing = request(
        &mut stdin,
        &mut reader,
        "7",
        "documents.sheets",
        json!({ "documentId": "no-such-document" }),
    );
    assert_eq!(missing["ok"], false);
    assert_eq!(missing["error"]["code"], "not_found");
}

#[test]
fn unknown_method_is_reported() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let resp = request(&mut stdin, &mut reader, "1", "documents.trash", json!({}));
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "not_implemented");
}
