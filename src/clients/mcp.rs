//! Client for MCP servers reached over the SSE transport.
//!
//! The server announces a POST endpoint as the first `endpoint` event of a
//! long-lived event stream. Requests are POSTed there and their JSON-RPC
//! responses come back on the stream, matched to the caller by id.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use eventsource_stream::{Event, Eventsource};
use futures_util::{Stream, StreamExt, stream};
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use crate::formatter::ResponseFormatter;

const PROTOCOL_VERSION: &str = "2024-11-05";

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// A tool advertised by an MCP server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolsPage {
    #[serde(default)]
    tools: Vec<McpTool>,
    next_cursor: Option<String>,
}

pub struct McpClient {
    client: Client,
    endpoint: Url,
    auth: String,
    timeout: Duration,
    next_id: AtomicU64,
    pending: Pending,
    reader: JoinHandle<()>,
    server_name: String,
}

impl McpClient {
    /// Open the event stream, wait for the endpoint, and run the
    /// `initialize` handshake.
    pub async fn connect(client: Client, url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(url)?;
        let auth = format!("Basic {api_key}");
        tracing::info!("connecting to MCP server at {base}");

        let response = client
            .get(base.clone())
            .header("Authorization", &auth)
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("Failed to connect to MCP server: {}", response.status());
        }

        let mut events = Box::pin(response.bytes_stream().eventsource());
        let endpoint = tokio::time::timeout(timeout, wait_for_endpoint(&mut events, &base))
            .await
            .map_err(|_| anyhow!("timed out waiting for the MCP endpoint"))??;
        tracing::debug!("MCP endpoint: {endpoint}");

        let pending: Pending = Arc::default();
        let reader = tokio::spawn(read_events(events, pending.clone()));

        let mut mcp = Self {
            client,
            endpoint,
            auth,
            timeout,
            next_id: AtomicU64::new(1),
            pending,
            reader,
            server_name: String::new(),
        };

        let init = mcp
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await?;
        mcp.server_name = init["serverInfo"]["name"].as_str().unwrap_or("unknown").to_string();
        mcp.notify("notifications/initialized").await?;
        tracing::info!("connected to MCP server {}", mcp.server_name);

        Ok(mcp)
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(cursor) => json!({"cursor": cursor}),
                None => json!({}),
            };
            let page: ToolsPage = serde_json::from_value(self.request("tools/list", params).await?)?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }

    /// Call a tool and return the raw `CallToolResult`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        let result = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;
        if result["isError"].as_bool() == Some(true) {
            bail!("{name} failed: {}", ResponseFormatter::new().mcp_result_text(&result));
        }
        Ok(result)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        if let Err(e) = self.post(&body).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => bail!("MCP connection closed while waiting for {method}"),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                bail!("MCP {method} timed out after {}s", self.timeout.as_secs());
            }
        };

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            bail!("MCP {method} failed: {message}");
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn notify(&self, method: &str) -> Result<()> {
        self.post(&json!({"jsonrpc": "2.0", "method": method, "params": {}}))
            .await
    }

    async fn post(&self, body: &Value) -> Result<()> {
        tracing::trace!("mcp request: {body}");
        let response = self
            .client
            .post(self.endpoint.clone())
            .header("Authorization", &self.auth)
            .header("Accept", "application/json, text/event-stream")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("MCP request failed: {status} {text}");
        }

        // Some servers answer inline instead of on the event stream
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(());
        }
        if serde_json::from_str::<Value>(&text).is_ok() {
            dispatch(&text, &self.pending).await;
        } else {
            for event in parse_events(text).await {
                dispatch_event(&event, &self.pending).await;
            }
        }
        Ok(())
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Read events until the server announces where requests go.
async fn wait_for_endpoint<S, E>(events: &mut S, base: &Url) -> Result<Url>
where
    S: Stream<Item = Result<Event, E>> + Unpin,
    E: Display,
{
    while let Some(event) = events.next().await {
        let event = event.map_err(|e| anyhow!("MCP event stream error: {e}"))?;
        if event.event == "endpoint" {
            return resolve_endpoint(base, &event.data);
        }
        tracing::debug!("skipping MCP {} event before the endpoint", event.event);
    }
    Err(anyhow!("MCP stream closed before announcing its endpoint"))
}

fn resolve_endpoint(base: &Url, data: &str) -> Result<Url> {
    base.join(data.trim())
        .map_err(|e| anyhow!("invalid MCP endpoint {data:?}: {e}"))
}

async fn read_events<S, E>(mut events: S, pending: Pending)
where
    S: Stream<Item = Result<Event, E>> + Unpin,
    E: Display,
{
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => dispatch_event(&event, &pending).await,
            Err(e) => {
                tracing::warn!("MCP event stream error: {e}");
                break;
            }
        }
    }
    tracing::debug!("MCP event stream closed");
    // Dropping the senders wakes every waiter with an error
    pending.lock().await.clear();
}

/// Events of a complete `text/event-stream` body.
async fn parse_events(body: String) -> Vec<Event> {
    stream::iter([Ok::<_, Infallible>(format!("{body}\n\n"))])
        .eventsource()
        .filter_map(|event| async move { event.ok() })
        .collect()
        .await
}

async fn dispatch_event(event: &Event, pending: &Pending) {
    if event.event == "message" {
        dispatch(&event.data, pending).await;
    }
}

/// Route a JSON-RPC response to the request waiting on its id.
async fn dispatch(data: &str, pending: &Pending) {
    let value: Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("failed to parse MCP message: {e}, data: {data}");
            return;
        }
    };
    tracing::trace!("mcp message: {value}");

    let is_response = value.get("result").is_some() || value.get("error").is_some();
    match value.get("id").and_then(Value::as_u64) {
        Some(id) if is_response => {
            if let Some(tx) = pending.lock().await.remove(&id) {
                let _ = tx.send(value);
            }
        }
        _ => {
            if let Some(method) = value.get("method").and_then(Value::as_str) {
                tracing::debug!("ignoring MCP server message {method}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    type Replies = fn(&Value) -> Option<Value>;

    /// A local MCP server: `GET /sse` holds an event stream open, and every
    /// POSTed request is acknowledged with 202 while its reply (if `replies`
    /// has one) goes out on that stream.
    async fn mcp_server(replies: Replies) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let rx = Arc::new(Mutex::new(Some(rx)));

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve(socket, replies, tx.clone(), rx.clone()));
            }
        });
        format!("http://{addr}/sse")
    }

    async fn serve(
        mut socket: TcpStream,
        replies: Replies,
        tx: mpsc::UnboundedSender<String>,
        rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<String>>>>,
    ) {
        let (head, body) = read_request(&mut socket).await;
        if head.starts_with("GET") {
            let Some(mut rx) = rx.lock().await.take() else { return };
            let opening = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncache-control: no-cache\r\n\r\n\
                           : welcome\r\n\r\nevent: endpoint\r\ndata: /messages?session_id=1\r\n\r\n";
            if socket.write_all(opening.as_bytes()).await.is_err() {
                return;
            }
            while let Some(data) = rx.recv().await {
                let frame = format!("event: message\ndata: {data}\n\n");
                if socket.write_all(frame.as_bytes()).await.is_err() {
                    return;
                }
            }
            return;
        }

        let request: Value = serde_json::from_slice(&body).unwrap();
        let _ = socket
            .write_all(b"HTTP/1.1 202 Accepted\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await;
        if let (Some(id), Some(mut reply)) = (request.get("id"), replies(&request)) {
            reply["jsonrpc"] = json!("2.0");
            reply["id"] = id.clone();
            let _ = tx.send(reply.to_string());
        }
    }

    async fn read_request(socket: &mut TcpStream) -> (String, Vec<u8>) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_string();
                let len = head
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                let mut body = buf[end + 4..].to_vec();
                while body.len() < len {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    body.extend_from_slice(&chunk[..n]);
                }
                return (head, body);
            }
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return (String::from_utf8_lossy(&buf).to_string(), Vec::new());
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn nimble_replies(request: &Value) -> Option<Value> {
        let params = &request["params"];
        match request["method"].as_str()? {
            "initialize" => Some(json!({"result": {
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {"name": "nimble-test", "version": "1.0"},
                "capabilities": {"tools": {}}
            }})),
            "tools/list" => match params["cursor"].as_str() {
                None => Some(json!({"result": {
                    "tools": [{"name": "nimble_deep_web_search", "description": "Search the web"}],
                    "nextCursor": "page-2"
                }})),
                Some("page-2") => Some(json!({"result": {
                    "tools": [{"name": "nimble_google_maps_search"}],
                    "nextCursor": ""
                }})),
                Some(_) => Some(json!({"error": {"code": -32602, "message": "bad cursor"}})),
            },
            "tools/call" => match params["name"].as_str()? {
                "nimble_deep_web_search" => Some(json!({"result": {
                    "content": [{"type": "text", "text": "three results"}]
                }})),
                "nimble_broken" => Some(json!({"result": {
                    "content": [{"type": "text", "text": "quota exhausted"}],
                    "isError": true
                }})),
                "nimble_slow" => None,
                _ => Some(json!({"error": {"code": -32601, "message": "Unknown tool"}})),
            },
            _ => None,
        }
    }

    async fn connect(url: &str, timeout: Duration) -> McpClient {
        McpClient::connect(Client::new(), url, "key", timeout).await.unwrap()
    }

    #[tokio::test]
    async fn test_handshake_and_paged_tools() {
        let url = mcp_server(nimble_replies).await;
        let mcp = connect(&url, Duration::from_secs(5)).await;
        assert_eq!(mcp.server_name(), "nimble-test");
        assert_eq!(mcp.endpoint.path(), "/messages");

        let names: Vec<String> = mcp.list_tools().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["nimble_deep_web_search", "nimble_google_maps_search"]);

        let result = mcp
            .call_tool("nimble_deep_web_search", json!({"query": "rust"}))
            .await
            .unwrap();
        assert_eq!(result["content"][0]["text"], "three results");
    }

    #[tokio::test]
    async fn test_tool_and_rpc_errors() {
        let url = mcp_server(nimble_replies).await;
        let mcp = connect(&url, Duration::from_secs(5)).await;

        let err = mcp.call_tool("nimble_broken", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "nimble_broken failed: quota exhausted");

        let err = mcp.call_tool("nimble_unknown", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "MCP tools/call failed: Unknown tool");
    }

    #[tokio::test]
    async fn test_request_timeout_frees_waiter() {
        let url = mcp_server(nimble_replies).await;
        let mcp = connect(&url, Duration::from_millis(300)).await;

        let err = mcp.call_tool("nimble_slow", json!({})).await.unwrap_err();
        assert!(err.to_string().contains("MCP tools/call timed out"));
        assert!(mcp.pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_inline_event_stream_body() {
        let events = parse_events(
            ": keep-alive\r\n\r\nevent: message\r\ndata: {\"id\":1,\r\ndata: \"result\":{}}\r\rdata: tail".to_string(),
        )
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "message");
        assert_eq!(events[0].data, "{\"id\":1,\n\"result\":{}}");
        assert_eq!(events[1].data, "tail");
    }

    #[test]
    fn test_resolve_relative_endpoint() {
        let base = Url::parse("https://mcp.nimbleway.com/sse").unwrap();
        let endpoint = resolve_endpoint(&base, "/messages/?session_id=42\n").unwrap();
        assert_eq!(endpoint.as_str(), "https://mcp.nimbleway.com/messages/?session_id=42");

        let absolute = resolve_endpoint(&base, "https://other.test/rpc").unwrap();
        assert_eq!(absolute.host_str(), Some("other.test"));
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_id() {
        let pending: Pending = Arc::default();
        let (tx, rx) = oneshot::channel();
        pending.lock().await.insert(7, tx);

        // notifications and unknown ids are ignored
        dispatch(r#"{"jsonrpc":"2.0","method":"notifications/progress","params":{}}"#, &pending).await;
        dispatch(r#"{"jsonrpc":"2.0","id":99,"result":{}}"#, &pending).await;
        assert_eq!(pending.lock().await.len(), 1);

        dispatch(r#"{"jsonrpc":"2.0","id":7,"result":{"tools":[]}}"#, &pending).await;
        assert!(pending.lock().await.is_empty());
        assert_eq!(rx.await.unwrap()["result"]["tools"], json!([]));
    }

    #[test]
    fn test_tools_page_parsing() {
        let page: ToolsPage = serde_json::from_value(json!({
            "tools": [
                {"name": "nimble_deep_web_search", "description": "Search", "inputSchema": {"type": "object"}},
                {"name": "nimble_google_maps_reviews"}
            ],
            "nextCursor": "abc"
        }))
        .unwrap();
        assert_eq!(page.tools.len(), 2);
        assert_eq!(page.tools[1].description, "");
        assert_eq!(page.tools[1].input_schema["type"], "object");
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
    }
}
