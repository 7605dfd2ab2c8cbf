use futures::StreamExt;
use notechat_core::{ChatMessage, CompletionParams, Error};
use notechat_providers::{CompletionRequest, OpenAiCompatProvider, Provider};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// A request as the fake server saw it
#[derive(Debug)]
struct Captured {
    head: String,
    body: serde_json::Value,
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Captured {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let (head, body_start) = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break (String::from_utf8_lossy(&buffer[..pos]).to_string(), pos + 4);
        }
    };

    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    while buffer.len() < body_start + length {
        let n = socket.read(&mut chunk).await.unwrap();
        buffer.extend_from_slice(&chunk[..n]);
    }

    let body = serde_json::from_slice(&buffer[body_start..body_start + length]).unwrap_or_default();
    Captured { head, body }
}

/// Serve exactly one HTTP/1.1 exchange on a random local port
async fn serve_once(status: &'static str, content_type: &'static str, body: String) -> (String, oneshot::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut socket).await;
        let _ = tx.send(captured);

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            content_type,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    (format!("http://{}/v1/chat/completions", addr), rx)
}

fn request(url: &str, stream: bool) -> CompletionRequest {
    let params = CompletionParams { api_url: url.to_string(), ..CompletionParams::default() }.with_stream(stream);
    CompletionRequest::new(vec![ChatMessage::system("/no_think"), ChatMessage::user("Hello")], params)
}

fn delta_line(piece: &str) -> String {
    format!("data: {}\n\n", serde_json::json!({"choices": [{"delta": {"content": piece}}]}))
}

#[tokio::test]
async fn test_complete_sends_wire_request() {
    let reply = serde_json::json!({"choices": [{"message": {"role": "assistant", "content": "  Hi there \n"}}]});
    let (url, captured) = serve_once("200 OK", "application/json", reply.to_string()).await;

    let provider = OpenAiCompatProvider::new("secret-key");
    let content = provider.complete(request(&url, false)).await.unwrap();
    assert_eq!(content, "Hi there");

    let captured = captured.await.unwrap();
    assert!(captured.head.starts_with("POST /v1/chat/completions"));
    assert!(captured.head.to_ascii_lowercase().contains("authorization: bearer secret-key"));
    assert_eq!(captured.body["model"], "Qwen3-32B");
    assert_eq!(captured.body["stream"], false);
    assert_eq!(captured.body["max_tokens"], 12800);
    assert_eq!(captured.body["messages"][0]["role"], "system");
    assert_eq!(captured.body["messages"][1]["content"], "Hello");
}

#[tokio::test]
async fn test_http_error_surfaces_status_and_body() {
    let (url, _captured) = serve_once("500 Internal Server Error", "text/plain", "model overloaded".to_string()).await;

    let provider = OpenAiCompatProvider::new("k");
    let err = provider.complete(request(&url, false)).await.unwrap_err();
    match err {
        Error::Http { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "model overloaded");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_http_error_before_snapshots() {
    let (url, _captured) = serve_once("401 Unauthorized", "application/json", r#"{"error":"bad key"}"#.to_string()).await;

    let provider = OpenAiCompatProvider::new("k");
    let result = provider.stream_completion(request(&url, true)).await;
    match result {
        Err(Error::Http { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, r#"{"error":"bad key"}"#);
        }
        Err(other) => panic!("expected HTTP error, got {other:?}"),
        Ok(_) => panic!("expected HTTP error, got a stream"),
    }
}

#[tokio::test]
async fn test_missing_content_is_decode_error() {
    let (url, _captured) = serve_once("200 OK", "application/json", r#"{"choices":[]}"#.to_string()).await;

    let provider = OpenAiCompatProvider::new("k");
    let err = provider.complete(request(&url, false)).await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
}

#[tokio::test]
async fn test_stream_completion_snapshots() {
    let body = format!(
        "{}: keep-alive\n{}{}data: [DONE]\n\n",
        delta_line("Hel"),
        delta_line("lo"),
        delta_line(", world")
    );
    let (url, captured) = serve_once("200 OK", "text/event-stream", body).await;

    let provider = OpenAiCompatProvider::new("k");
    let stream = provider.stream_completion(request(&url, true)).await.unwrap();
    let snapshots: Vec<String> = stream.map(|item| item.unwrap()).collect().await;
    assert_eq!(snapshots, vec!["Hel", "Hello", "Hello, world"]);

    let captured = captured.await.unwrap();
    assert_eq!(captured.body["stream"], true);
}

#[tokio::test]
async fn test_request_once_renders_reasoning() {
    let reply = serde_json::json!({"choices": [{"message": {"content": "<think>\nplan\n</think>\n\nAnswer"}}]});
    let (url, _captured) = serve_once("200 OK", "application/json", reply.to_string()).await;

    let provider = OpenAiCompatProvider::new("k");
    let rendered = provider.request_once(request(&url, false)).await.unwrap();
    assert_eq!(rendered, "<details><summary>Reasoning</summary>\n\nplan\n\n</details>\n\nAnswer");
}
