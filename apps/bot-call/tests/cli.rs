use std::process::{Command, Output};

use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

fn bot_call(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_bot-call"));
    cmd.env_remove("BOT_API_ROOT")
        .env_remove("BOT_ACCESS_TOKEN")
        .env_remove("BOT_API_TIMEOUT_SECS")
        .env("RUST_LOG", "warn")
        .args(args);
    cmd
}

fn run(args: &[&str]) -> Output {
    bot_call(args).output().expect("run bot-call")
}

#[test]
fn fails_without_an_api_root() {
    let output = run(&["get_status"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no api transport is available"),
        "stderr={stderr}"
    );
}

#[test]
fn rejects_malformed_params() {
    let output = run(&["--api-root", "http://127.0.0.1:9", "send_msg", "oops"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("key=value"), "stderr={stderr}");
}

#[test]
fn falls_back_to_environment_settings() {
    let output = bot_call(&["get_status"])
        .env("BOT_API_ROOT", "http://127.0.0.1:9")
        .env("BOT_API_TIMEOUT_SECS", "2")
        .output()
        .expect("run bot-call");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("action `get_status` failed"), "stderr={stderr}");
    assert!(!stderr.contains("no api transport is available"), "stderr={stderr}");
}

#[test]
fn rejects_a_zero_timeout_from_the_environment() {
    let output = bot_call(&["get_status"])
        .env("BOT_API_ROOT", "http://127.0.0.1:9")
        .env("BOT_API_TIMEOUT_SECS", "0")
        .output()
        .expect("run bot-call");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("BOT_API_TIMEOUT_SECS"), "stderr={stderr}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn prints_the_action_payload() {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("skipping prints_the_action_payload: {err}");
            return;
        }
    };
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/send_private_msg",
        post(|Json(body): Json<Value>| async move {
            Json(json!({"status": "ok", "retcode": 0, "data": {"echo": body}}))
        }),
    );
    let server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app.into_make_service()).await {
            eprintln!("bot api mock server error: {err}");
        }
    });

    let root = format!("http://{addr}");
    let output = tokio::task::spawn_blocking(move || {
        run(&[
            "--api-root",
            &root,
            "send_private_msg",
            "user_id=10001",
            "message=hi",
        ])
    })
    .await
    .unwrap();

    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        printed,
        json!({"echo": {"user_id": 10001, "message": "hi"}})
    );

    server.abort();
}
