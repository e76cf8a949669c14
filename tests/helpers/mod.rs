//! Fake subordinate servers for integration tests.
//!
//! Each server is a `sh -c` script speaking newline-delimited JSON-RPC on
//! stdin/stdout. Request IDs are extracted with an anchored sed expression,
//! which relies on the `{"jsonrpc":"2.0","id":N,...` field order.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use serde_json::Value;
use tweetbridge::{Connection, ConnectionConfig, SubordinateCommand};

/// Shell snippet setting `$id` from `$line`.
const EXTRACT_ID: &str = r#"id=$(printf '%s\n' "$line" | sed -n 's/^{"jsonrpc":"2.0","id":\([0-9]*\),.*/\1/p')"#;

/// Shell snippet setting `$esc` to `$line` escaped for a JSON string.
const ESCAPE_LINE: &str = r#"esc=$(printf '%s' "$line" | sed 's/\\/\\\\/g; s/"/\\"/g')"#;

/// Answers every request with its own request line as a JSON string.
pub fn recording_server() -> String {
    format!(
        r#"while IFS= read -r line; do
  {EXTRACT_ID}
  {ESCAPE_LINE}
  printf '{{"jsonrpc":"2.0","id":%s,"result":"%s"}}\n' "$id" "$esc"
done"#
    )
}

/// Answers `tools/list` with a fixed tool list, after some startup noise.
pub fn tools_server() -> String {
    format!(
        r#"echo "Starting actors server..."
echo ""
while IFS= read -r line; do
  {EXTRACT_ID}
  echo "debug: handling request $id"
  printf '{{"jsonrpc":"2.0","id":%s,"result":{{"tools":[{{"name":"scraper"}}]}}}}\n' "$id"
done"#
    )
}

/// Answers the first request, then collects `count` requests and answers
/// them in reverse order with their recorded lines.
pub fn reversing_server(count: usize) -> String {
    format!(
        r#"IFS= read -r line
{EXTRACT_ID}
printf '{{"jsonrpc":"2.0","id":%s,"result":{{}}}}\n' "$id"
i=0
stack=""
while [ "$i" -lt {count} ] && IFS= read -r line; do
  {EXTRACT_ID}
  {ESCAPE_LINE}
  stack="$(printf '{{"jsonrpc":"2.0","id":%s,"result":"%s"}}' "$id" "$esc")
$stack"
  i=$((i + 1))
done
printf '%s\n' "$stack"
cat > /dev/null"#
    )
}

/// Emits a stray response, a notification and noise before each real answer.
pub fn stray_response_server() -> String {
    format!(
        r#"while IFS= read -r line; do
  {EXTRACT_ID}
  printf '{{"jsonrpc":"2.0","id":99999,"result":"stray"}}\n'
  printf '{{"jsonrpc":"2.0","method":"notifications/progress","params":{{"progress":1}}}}\n'
  echo "not json at all"
  printf '{{"jsonrpc":"2.0","id":%s,"result":{{"echo":%s}}}}\n' "$id" "$id"
done"#
    )
}

/// Answers `tools/call` after `delay_secs`, everything else immediately.
pub fn slow_call_server(delay_secs: u64) -> String {
    format!(
        r#"while IFS= read -r line; do
  {EXTRACT_ID}
  case "$line" in
    *'"tools/call"'*)
      (sleep {delay_secs}; printf '{{"jsonrpc":"2.0","id":%s,"result":"late"}}\n' "$id") & ;;
    *)
      printf '{{"jsonrpc":"2.0","id":%s,"result":{{"tools":[]}}}}\n' "$id" ;;
  esac
done"#
    )
}

/// Answers the first request, then swallows everything.
pub fn silent_after_ready_server() -> String {
    format!(
        r#"IFS= read -r line
{EXTRACT_ID}
printf '{{"jsonrpc":"2.0","id":%s,"result":{{}}}}\n' "$id"
cat > /dev/null"#
    )
}

/// Answers the first request, reads `count` more, then exits.
pub fn exit_after_server(count: usize) -> String {
    let reads = "IFS= read -r line\n".repeat(count);
    format!(
        r#"IFS= read -r line
{EXTRACT_ID}
printf '{{"jsonrpc":"2.0","id":%s,"result":{{}}}}\n' "$id"
{reads}exit 0"#
    )
}

/// Rejects the first request with a remote error, then runs `then`.
pub fn rejecting_first_request_server(then: &str) -> String {
    format!(
        r#"IFS= read -r line
{EXTRACT_ID}
printf '{{"jsonrpc":"2.0","id":%s,"error":{{"code":-32603,"message":"not ready"}}}}\n' "$id"
{then}"#
    )
}

/// Prefix a script with writing the shell's pid to `pid_file`.
pub fn recording_pid(pid_file: &Path, script: &str) -> String {
    format!("echo $$ > '{}'\n{}", pid_file.display(), script)
}

/// Whether the pid written by [`recording_pid`] still names a live process.
pub fn recorded_process_alive(pid_file: &Path) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let pid: i32 = std::fs::read_to_string(pid_file)
        .expect("pid file should be written")
        .trim()
        .parse()
        .expect("pid file should hold a number");
    kill(Pid::from_raw(pid), None).is_ok()
}

/// Prefix a script with an unsolicited success, which makes the session
/// ready without a probe.
pub fn announce_ready(script: &str) -> String {
    format!(
        r#"printf '{{"jsonrpc":"2.0","id":0,"result":{{}}}}\n'
{script}"#
    )
}

/// Connection config for a script with short timeouts.
pub fn sh_config(script: &str) -> ConnectionConfig {
    ConnectionConfig::new(SubordinateCommand::new(vec![
        "sh".to_string(),
        "-c".to_string(),
        script.to_string(),
    ]))
    .with_connect_timeout(Duration::from_secs(3))
    .with_request_timeout(Duration::from_secs(3))
    .with_terminate_grace(Duration::from_millis(200))
}

/// Connect to a script, panicking on failure.
pub async fn connect(config: ConnectionConfig) -> Connection {
    let connection = Connection::new(config);
    connection
        .connect()
        .await
        .expect("fake server should become ready");
    connection
}

/// Decode a request line echoed back by the recording servers.
pub fn recorded_request(result: &Value) -> Value {
    let line = result
        .as_str()
        .expect("recording server answers with a string");
    serde_json::from_str(line).expect("recorded line should be JSON")
}

/// Poll until `condition` holds or a second passes.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
