//! Integration tests for the ngramkit-rpc JSON-RPC server.
//!
//! These tests start the real binary and talk to it over HTTP.

use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncBufReadExt;

/// Make an RPC call to the server.
async fn rpc_call(port: u16, method: &str, params: Value) -> Result<Value, String> {
    let json = rpc_call_raw(port, method, params).await?;
    if let Some(error) = json.get("error") {
        return Err(error.to_string());
    }
    Ok(json.get("result").cloned().unwrap_or(Value::Null))
}

/// Make an RPC call and return the full JSON-RPC payload.
async fn rpc_call_raw(port: u16, method: &str, params: Value) -> Result<Value, String> {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/rpc", port))
        .json(&json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| e.to_string())?;

    response.json::<Value>().await.map_err(|e| e.to_string())
}

/// Check health endpoint.
async fn check_health(port: u16) -> bool {
    let client = reqwest::Client::new();
    if let Ok(response) = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
    {
        if let Ok(json) = response.json::<Value>().await {
            return json.get("status").and_then(|v| v.as_str()) == Some("ok");
        }
    }
    false
}

/// Wait for server to be ready.
async fn wait_for_server(port: u16, timeout_secs: u64) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_secs(timeout_secs) {
        if check_health(port).await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

struct RpcServerHandle {
    child: tokio::process::Child,
    port: u16,
    stdout_drain: Option<tokio::task::JoinHandle<()>>,
}

impl RpcServerHandle {
    async fn stop(mut self) {
        if let Some(drain) = self.stdout_drain.take() {
            drain.abort();
        }
        let _ = self.child.kill().await;
        let _ = self.child.wait().await;
    }
}

impl Drop for RpcServerHandle {
    fn drop(&mut self) {
        if let Some(drain) = self.stdout_drain.take() {
            drain.abort();
        }
        let _ = self.child.start_kill();
    }
}

fn binary_path() -> Result<PathBuf, String> {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_ngramkit-rpc") {
        return Ok(PathBuf::from(path));
    }

    let current_exe = std::env::current_exe()
        .map_err(|e| format!("failed to resolve current_exe for fallback: {e}"))?;
    let target_debug_dir = current_exe
        .parent()
        .and_then(|p| p.parent())
        .ok_or_else(|| "failed to resolve target/debug directory for fallback".to_string())?;

    let mut fallback = target_debug_dir.join("ngramkit-rpc");
    if cfg!(target_os = "windows") {
        fallback.set_extension("exe");
    }
    if !fallback.exists() {
        return Err(format!(
            "CARGO_BIN_EXE_ngramkit-rpc not set and fallback binary not found at {}",
            fallback.display()
        ));
    }
    Ok(fallback)
}

/// Start the RPC binary and wait until `/health` is ready.
async fn start_rpc_server(extra_args: &[&str]) -> Result<RpcServerHandle, String> {
    let binary = binary_path()?;

    let mut child = tokio::process::Command::new(&binary)
        .arg("--host")
        .arg("127.0.0.1")
        .arg("--port")
        .arg("0")
        .args(extra_args)
        .env_remove("NGRAMKIT_DIALECT")
        .env_remove("NGRAMKIT_SETTINGS")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("failed to spawn ngramkit-rpc: {e}"))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| "failed to capture stdout".to_string())?;
    let mut lines = tokio::io::BufReader::new(stdout).lines();

    let mut discovered_port: Option<u16> = None;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(250), lines.next_line()).await {
            Ok(Ok(Some(line))) => {
                if let Some(value) = line.strip_prefix("RPC_PORT=") {
                    let parsed = value
                        .trim()
                        .parse::<u16>()
                        .map_err(|e| format!("invalid RPC_PORT value '{value}': {e}"))?;
                    discovered_port = Some(parsed);
                    break;
                }
            }
            Ok(Ok(None)) => break,
            Ok(Err(err)) => return Err(format!("failed to read ngramkit-rpc stdout: {err}")),
            Err(_) => continue,
        }
    }

    let port =
        discovered_port.ok_or_else(|| "RPC_PORT line not emitted by ngramkit-rpc".to_string())?;
    if !wait_for_server(port, 15).await {
        return Err(format!("ngramkit-rpc failed health check on port {port}"));
    }

    let stdout_drain =
        tokio::spawn(async move { while let Ok(Some(_)) = lines.next_line().await {} });

    Ok(RpcServerHandle {
        child,
        port,
        stdout_drain: Some(stdout_drain),
    })
}

#[tokio::test]
async fn test_health_check_rpc() {
    let server = start_rpc_server(&[]).await.unwrap();

    let result = rpc_call(server.port, "health_check", json!({})).await.unwrap();
    assert_eq!(result["status"], "ok");

    server.stop().await;
}

#[tokio::test]
async fn test_search_round_trip() {
    let server = start_rpc_server(&["--dialect", "sqlite"]).await.unwrap();
    let port = server.port;

    rpc_call(
        port,
        "register_record_type",
        json!({"recordType": "article", "config": {"mode": "all", "minLength": 3, "maxLength": 5}}),
    )
    .await
    .unwrap();

    let assembled = rpc_call(
        port,
        "assemble_search_data",
        json!({"document": {
            "recordType": "article",
            "id": "a-1",
            "sources": [{"name": "title", "value": "Hello World"}],
            "maxSearchDataLength": 1048575
        }}),
    )
    .await
    .unwrap();
    assert_eq!(assembled["outcome"]["status"], "rebuilt");
    assert!(assembled["document"]["searchDataChecksum"].is_string());

    let plan = rpc_call(
        port,
        "plan_search",
        json!({
            "recordType": "article",
            "phrase": "wrld",
            "request": {"pagination": {"kind": "paged", "page": 2, "size": 20}}
        }),
    )
    .await
    .unwrap();
    assert_eq!(
        plan["condition"]["predicate"],
        "FULL_TEXT_SEARCH(full_text_search_data, 'wrld OR wrl OR rld') = 1"
    );
    assert_eq!(plan["sort"]["offset"], 40);
    assert_eq!(plan["sort"]["limit"], 20);

    server.stop().await;
}

#[tokio::test]
async fn test_error_codes() {
    let server = start_rpc_server(&[]).await.unwrap();
    let port = server.port;

    let raw = rpc_call_raw(port, "build_search_condition", json!({"phrase": "abc", "recordType": "ghost"}))
        .await
        .unwrap();
    assert_eq!(raw["error"]["code"], -32010);

    let raw = rpc_call_raw(port, "build_date_range", json!({"column": "created_date", "timeZone": "UTC'--"}))
        .await
        .unwrap();
    assert_eq!(raw["error"]["code"], -32005);

    let raw = rpc_call_raw(port, "compute_checksum", json!({})).await.unwrap();
    assert_eq!(raw["error"]["code"], -32602);

    server.stop().await;
}

#[tokio::test]
async fn test_settings_file_preconfigures_record_types() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"dialect":"sqlite","recordTypes":{{"venue":{{"mode":"words","minLength":2,"maxLength":10}}}}}}"#
    )
    .unwrap();
    let path = file.path().to_string_lossy().to_string();

    let server = start_rpc_server(&["--settings", &path]).await.unwrap();

    let dialect = rpc_call(server.port, "get_dialect", json!({})).await.unwrap();
    assert_eq!(dialect["dialect"], "sqlite");

    let config = rpc_call(server.port, "get_record_config", json!({"record_type": "venue"}))
        .await
        .unwrap();
    assert_eq!(config["mode"], "words");

    server.stop().await;
}
