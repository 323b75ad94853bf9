//! Drives the HTTP backend against a local socket serving canned responses.

use std::time::Duration;

use spart_chat::prelude::*;
use spart_chat::{AssistantBackend, HttpBackend};
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

const SSE_HEAD: &str =
    "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n";

/// Accepts one connection, records the request and writes the response in
/// separate flushed parts.
async fn serve_once(head: String, parts: Vec<Vec<u8>>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut socket).await;
        socket.write_all(head.as_bytes()).await.expect("write head");
        for part in parts {
            socket.write_all(&part).await.expect("write part");
            socket.flush().await.expect("flush");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let _ = socket.shutdown().await;
        request
    });
    (format!("http://{addr}"), handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.expect("read request");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + body_len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn json_response(status_line: &str, body: &str) -> (String, Vec<Vec<u8>>) {
    (
        format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        ),
        vec![body.as_bytes().to_vec()],
    )
}

#[tokio::test]
async fn streams_reply_split_across_writes() {
    let body = concat!(
        "data: {\"session_id\":\"sess-1\"}\n",
        "data: {\"content\":\"Olá, \"}\n",
        "data: {malformed}\n",
        "data: {\"content\":\"ação concluída\"}\n",
        "data: {\"done\":true,\"similaridade\":0.91,\"imagens\":[{\"url\":\"/media/backup.png\",\"alt_text\":\"Tela de backup\"}]}\n",
        "data: [DONE]\n",
    )
    .as_bytes();
    // Split inside "Olá" and inside a JSON line.
    let split_a = body
        .windows(2)
        .position(|w| w == "á".as_bytes())
        .expect("multibyte char")
        + 1;
    let split_b = split_a + 20;
    let parts = vec![
        body[..split_a].to_vec(),
        body[split_a..split_b].to_vec(),
        body[split_b..].to_vec(),
    ];
    let (base_url, server) = serve_once(SSE_HEAD.to_string(), parts).await;

    let client = AssistantClient::http(ClientConfig::new(base_url)).expect("client");
    let mut conversation = Conversation::new(client);
    let mut turn = conversation.ask("Como faço backup?").await.expect("turn");

    let mut observed = Vec::new();
    while let Some(event) = turn.next_event().await {
        match event {
            ReplyEvent::TextDelta { text, .. } => observed.push(text),
            ReplyEvent::Completed { .. } | ReplyEvent::Failed { .. } => break,
            _ => {}
        }
    }
    let reply = turn.finish().await.expect("reply");

    assert_eq!(reply.text, "Olá, ação concluída");
    assert_eq!(observed, vec!["Olá, ".to_string(), "Olá, ação concluída".to_string()]);
    assert_eq!(
        reply.attachments,
        vec![Attachment::new("/media/backup.png", "Tela de backup")]
    );
    assert_eq!(reply.similarity, Some(0.91));
    assert!(reply.completion_flagged());
    assert_eq!(conversation.session_id(), Some("sess-1"));

    let request = server.await.expect("server task");
    assert!(request.starts_with("POST /api/perguntar/stream/ HTTP/1.1"));
    assert!(request.contains("\"pergunta\":\"Como faço backup?\""));
    assert!(!request.contains("session_id"));
}

#[tokio::test]
async fn closed_stream_without_done_finalizes_reply() {
    let parts = vec![b"data: {\"content\":\"sem fim\"}\n".to_vec()];
    let (base_url, _server) = serve_once(SSE_HEAD.to_string(), parts).await;
    let client = AssistantClient::http(ClientConfig::new(base_url)).expect("client");

    let reply = client
        .collect_reply(AskRequest::new("oi").expect("request"))
        .await
        .expect("reply");
    assert_eq!(reply.text, "sem fim");
    assert_eq!(reply.completion, Completion::EndOfStream);
    assert!(reply.attachments.is_empty());
}

#[tokio::test]
async fn non_success_status_is_reported_before_streaming() {
    let (head, parts) = json_response("503 Service Unavailable", "{\"error\":\"down\"}");
    let (base_url, _server) = serve_once(head, parts).await;
    let client = AssistantClient::http(ClientConfig::new(base_url)).expect("client");

    let result = client
        .ask_stream(AskRequest::new("oi").expect("request"))
        .await;
    match result {
        Ok(_) => panic!("503 must not open a reply stream"),
        Err(ClientError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert!(body.contains("down"));
        }
        Err(other) => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let client = AssistantClient::http(
        ClientConfig::new(format!("http://{addr}")).timeout(Duration::from_secs(5)),
    )
    .expect("client");
    let result = client
        .ask_stream(AskRequest::new("oi").expect("request"))
        .await;
    let err = match result {
        Ok(_) => panic!("refused connection must not open a reply stream"),
        Err(err) => err,
    };
    assert!(matches!(err, ClientError::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn blocking_ask_decodes_answer_and_sends_session() {
    let (head, parts) = json_response(
        "200 OK",
        r#"{"resposta":"Acesse Configurações > Backup.","audio_url":"/media/a.mp3","feedback":"Resposta gerada com IA.","manual":"https://kb.example.com/backup","similaridade":0.72}"#,
    );
    let (base_url, server) = serve_once(head, parts).await;
    let client = AssistantClient::http(ClientConfig::new(base_url)).expect("client");
    let mut conversation = Conversation::with_session(client, "sess-7");

    let answer = conversation.ask_blocking("backup?").await.expect("answer");
    assert_eq!(answer.text, "Acesse Configurações > Backup.");
    assert_eq!(answer.audio_link(), Some("/media/a.mp3"));
    assert_eq!(answer.manual_link(), Some("https://kb.example.com/backup"));
    assert_eq!(conversation.session_id(), Some("sess-7"));

    let request = server.await.expect("server task");
    assert!(request.starts_with("POST /api/perguntar/ HTTP/1.1"));
    assert!(request.contains("\"session_id\":\"sess-7\""));
}

#[tokio::test]
async fn status_endpoint_is_queried_with_get() {
    let (head, parts) = json_response(
        "200 OK",
        r#"{"status":"online","version":"1.0.0","endpoints":{"perguntar":"/api/agente/perguntar/"},"features":["Streaming de respostas em tempo real"]}"#,
    );
    let (base_url, server) = serve_once(head, parts).await;
    let backend = HttpBackend::new(ClientConfig::new(base_url)).expect("backend");

    let status = backend.status().await.expect("status");
    assert!(status.is_online());
    assert_eq!(status.version, "1.0.0");

    let request = server.await.expect("server task");
    assert!(request.starts_with("GET /api/agente/status/ HTTP/1.1"));
}
