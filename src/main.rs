mod db;
mod ipc;
mod store;
mod web;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

fn main() {
    env_logger::init();

    let mut stdio = false;
    let mut addr = String::from("127.0.0.1:7878");
    let mut workspace: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--stdio" => stdio = true,
            "--addr" => {
                if let Some(a) = args.next() {
                    addr = a;
                }
            }
            other => workspace = Some(PathBuf::from(other)),
        }
    }

    let mut state = ipc::AppState {
        workspace: None,
        store: None,
    };
    if let Some(path) = workspace {
        match db::open_db(&path) {
            Ok(conn) => {
                log::info!("workspace opened at {}", path.display());
                state.store = Some(Box::new(store::SqliteStore::new(conn)));
                state.workspace = Some(path);
            }
            Err(e) => {
                eprintln!("failed to open workspace: {e:?}");
                std::process::exit(1);
            }
        }
    }

    if stdio {
        run_stdio(state);
        return;
    }

    // Web mode needs a workspace up front; sidecar mode selects one over IPC.
    if state.store.is_none() {
        eprintln!("usage: rollbookd <workspace-dir> [--addr HOST:PORT] [--stdio]");
        std::process::exit(2);
    }
    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(web::serve(&addr, state)) {
        eprintln!("server error: {e:?}");
        std::process::exit(1);
    }
}

fn run_stdio(mut state: ipc::AppState) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply with an id; report and move on.
                log::warn!("malformed request line: {e}");
                let _ = writeln!(
                    stdout,
                    "{{\"ok\":false,\"error\":{{\"code\":\"bad_json\",\"message\":\"{}\"}}}}",
                    e
                );
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
