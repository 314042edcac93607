//! End-to-end tests for the transport adapter, against a mock upstream.

use std::sync::{Arc, Mutex};

use flowstream::client::{WorkflowClient, WorkflowRequest};
use flowstream::dispatch::WorkflowCallbacks;
use flowstream::error::FlowError;
use flowstream::session::SessionPhase;
use flowstream::types::WorkflowEvent;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse_body(lines: &[&str]) -> String {
    let mut body = String::new();
    for line in lines {
        body.push_str("data: ");
        body.push_str(line);
        body.push_str("\n\n");
    }
    body
}

fn request() -> WorkflowRequest {
    WorkflowRequest::new(json!({"topic": "intro"}), "user-1")
}

#[derive(Default)]
struct Observed {
    log: Vec<String>,
    completions: Vec<bool>,
}

fn observing_callbacks(observed: &Arc<Mutex<Observed>>) -> WorkflowCallbacks {
    let log = |observed: &Arc<Mutex<Observed>>, entry: String| {
        observed.lock().unwrap().log.push(entry);
    };
    WorkflowCallbacks::new()
        .on_workflow_started({
            let observed = observed.clone();
            move |e| log(&observed, format!("started:{}", e.workflow_run_id))
        })
        .on_node_started({
            let observed = observed.clone();
            move |e| log(&observed, format!("node_started:{}", e.data.node_id))
        })
        .on_node_finished({
            let observed = observed.clone();
            move |e| log(&observed, format!("node_finished:{}", e.data.node_id))
        })
        .on_text_chunk({
            let observed = observed.clone();
            move |chunk, is_first| {
                log(&observed, format!("chunk:{}:{}", chunk.fragment(), is_first))
            }
        })
        .on_message({
            let observed = observed.clone();
            move |message, is_first| {
                log(&observed, format!("message:{}:{}", message.answer, is_first))
            }
        })
        .on_error({
            let observed = observed.clone();
            move |message, code| {
                log(&observed, format!("error:{message}:{}", code.unwrap_or("-")))
            }
        })
        .on_workflow_finished({
            let observed = observed.clone();
            move |e| {
                log(
                    &observed,
                    format!("finished:{}", e.data.status.as_deref().unwrap_or("-")),
                )
            }
        })
        .on_completed({
            let observed = observed.clone();
            move |has_error| observed.lock().unwrap().completions.push(has_error)
        })
}

#[tokio::test]
async fn streaming_happy_path_dispatches_in_order() {
    let server = MockServer::start().await;

    let body = sse_body(&[
        r#"{"event":"workflow_started","task_id":"t1","workflow_run_id":"w1","data":{"id":"w1","workflow_id":"wf1","sequence_number":1,"created_at":0}}"#,
        r#"{"event":"node_started","task_id":"t1","workflow_run_id":"w1","data":{"id":"n1","node_id":"answer","index":1}}"#,
        r#"{"event":"text_chunk","task_id":"t1","workflow_run_id":"w1","data":{"text":"a"}}"#,
        r#"{"event":"text_chunk","task_id":"t1","workflow_run_id":"w1","data":{"text":"b"}}"#,
        r#"{"event":"node_finished","task_id":"t1","workflow_run_id":"w1","data":{"id":"n1","node_id":"answer","index":1,"status":"succeeded"}}"#,
        r#"{"event":"workflow_finished","task_id":"t1","workflow_run_id":"w1","data":{"id":"w1","status":"succeeded","outputs":{"text":"ab"}}}"#,
    ]);

    Mock::given(method("POST"))
        .and(path("/workflows/run"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("\"response_mode\":\"streaming\""))
        .and(body_string_contains("\"user\":\"user-1\""))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = WorkflowClient::new("test-key", server.uri());
    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut callbacks = observing_callbacks(&observed);

    let phase = client.run(&request(), &mut callbacks).await;
    assert_eq!(phase, SessionPhase::Completed);

    let observed = observed.lock().unwrap();
    assert_eq!(
        observed.log,
        vec![
            "started:w1",
            "node_started:answer",
            "chunk:a:true",
            "chunk:b:false",
            "node_finished:answer",
            "finished:succeeded",
        ]
    );
    assert_eq!(observed.completions, vec![false]);
}

#[tokio::test]
async fn stream_events_surface_yields_typed_events() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        r#"{"event":"workflow_started","task_id":"t1","workflow_run_id":"w1","data":{"id":"w1","workflow_id":"wf1"}}"#,
        r#"{"event":"sub_workflow_scheduled","task_id":"t1"}"#,
        r#"{"event":"workflow_finished","task_id":"t1","workflow_run_id":"w1","data":{"id":"w1","status":"succeeded"}}"#,
    ]);

    Mock::given(method("POST"))
        .and(path("/workflows/run"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = WorkflowClient::new("test-key", server.uri());
    let mut events = client.stream_events(&request()).await.expect("stream");

    let mut kinds = Vec::new();
    while let Some(item) = events.next().await {
        let event = item.expect("event");
        kinds.push(match event.event {
            WorkflowEvent::WorkflowStarted(_) => "started",
            WorkflowEvent::Unknown => "unknown",
            WorkflowEvent::WorkflowFinished(_) => "finished",
            other => panic!("unexpected kind: {other:?}"),
        });
    }
    // Unknown discriminators surface on the stream instead of vanishing.
    assert_eq!(kinds, vec!["started", "unknown", "finished"]);
}

#[tokio::test]
async fn non_2xx_with_structured_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workflows/run"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "invalid app",
            "code": "invalid_param"
        })))
        .mount(&server)
        .await;

    let client = WorkflowClient::new("test-key", server.uri());

    match client.stream_events(&request()).await {
        Err(FlowError::Api { status, message, code }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "invalid app");
            assert_eq!(code.as_deref(), Some("invalid_param"));
        }
        other => panic!("expected api error, got {:?}", other.map(|_| "stream")),
    }

    // The callback surface reports the same failure and still completes.
    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut callbacks = observing_callbacks(&observed);
    let phase = client.run(&request(), &mut callbacks).await;
    assert_eq!(phase, SessionPhase::Failed);

    let observed = observed.lock().unwrap();
    assert_eq!(observed.log, vec!["error:invalid app:invalid_param"]);
    assert_eq!(observed.completions, vec![true]);
}

#[tokio::test]
async fn non_2xx_with_unparseable_body_reports_generic_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workflows/run"))
        .respond_with(ResponseTemplate::new(500).set_body_string("gateway exploded"))
        .mount(&server)
        .await;

    let client = WorkflowClient::new("test-key", server.uri());
    match client.stream_events(&request()).await {
        Err(FlowError::Api { status, message, code }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "gateway exploded");
            assert_eq!(code, None);
        }
        other => panic!("expected api error, got {:?}", other.map(|_| "stream")),
    }
}

#[tokio::test]
async fn protocol_error_event_finalizes_with_no_further_dispatch() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        r#"{"event":"workflow_started","task_id":"t1","workflow_run_id":"w1","data":{"id":"w1","workflow_id":"wf1"}}"#,
        r#"{"event":"error","message":"upstream failure","code":"E1"}"#,
        r#"{"event":"text_chunk","data":{"text":"never"}}"#,
    ]);

    Mock::given(method("POST"))
        .and(path("/workflows/run"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = WorkflowClient::new("test-key", server.uri());
    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut callbacks = observing_callbacks(&observed);
    let phase = client.run(&request(), &mut callbacks).await;
    assert_eq!(phase, SessionPhase::Failed);

    let observed = observed.lock().unwrap();
    assert_eq!(observed.log, vec!["started:w1", "error:upstream failure:E1"]);
    assert_eq!(observed.completions, vec![true]);
}

#[tokio::test]
async fn recoverable_frame_error_keeps_session_alive_and_flags_completion() {
    let server = MockServer::start().await;
    let body = "data: {broken\n\
                data: {\"event\":\"text_chunk\",\"data\":{\"text\":\"still here\"}}\n";

    Mock::given(method("POST"))
        .and(path("/workflows/run"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = WorkflowClient::new("test-key", server.uri());
    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut callbacks = observing_callbacks(&observed);
    let phase = client.run(&request(), &mut callbacks).await;
    assert_eq!(phase, SessionPhase::Completed);

    let observed = observed.lock().unwrap();
    assert_eq!(observed.log.len(), 2);
    assert!(observed.log[0].starts_with("error:"));
    assert_eq!(observed.log[1], "chunk:still here:true");
    assert_eq!(observed.completions, vec![true]);
}

#[tokio::test]
async fn truncated_trailing_line_completes_without_error() {
    let server = MockServer::start().await;
    let body = "data: {\"event\":\"workflow_started\",\"task_id\":\"t1\",\"workflow_run_id\":\"w1\",\"data\":{\"id\":\"w1\",\"workflow_id\":\"wf1\"}}\n\
                data: {\"event\":\"work";

    Mock::given(method("POST"))
        .and(path("/workflows/run"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = WorkflowClient::new("test-key", server.uri());
    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut callbacks = observing_callbacks(&observed);
    let phase = client.run(&request(), &mut callbacks).await;
    assert_eq!(phase, SessionPhase::Completed);

    let observed = observed.lock().unwrap();
    assert_eq!(observed.log, vec!["started:w1"]);
    assert_eq!(observed.completions, vec![false]);
}

#[tokio::test]
async fn legacy_completion_mode_targets_the_message_endpoint() {
    let server = MockServer::start().await;
    let body = sse_body(&[
        r#"{"event":"message","id":"m1","conversation_id":"c1","answer":"caf\\u00e9","created_at":0}"#,
    ]);

    Mock::given(method("POST"))
        .and(path("/completion-messages"))
        .and(body_string_contains("\"query\":\"hello\""))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = WorkflowClient::new("test-key", server.uri());
    let req = request()
        .completion_mode()
        .with_field("query", json!("hello"));

    let observed = Arc::new(Mutex::new(Observed::default()));
    let mut callbacks = observing_callbacks(&observed);
    let phase = client.run(&req, &mut callbacks).await;
    assert_eq!(phase, SessionPhase::Completed);

    let observed = observed.lock().unwrap();
    assert_eq!(observed.log, vec!["message:café:true"]);
    assert_eq!(observed.completions, vec![false]);
}
