//! Runs in its own test binary: the signal is delivered to the whole
//! process, so no other server may be listening for it.
#![cfg(unix)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use easyroute::{Reply, Router, Server, State};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn get(addr: std::net::SocketAddr, path: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!("GET {path} HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await?;
    Ok(raw)
}

fn sigterm_self() {
    let status = std::process::Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

#[tokio::test]
async fn sigterm_drains_then_runs_after_close_once() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let finished = Arc::new(AtomicBool::new(false));
    let finished_before_close = Arc::new(AtomicBool::new(false));
    let calls = Arc::new(AtomicUsize::new(0));

    let app = Router::new()
        .get("/ping", || async { Reply::ok_data("pong") })
        .get("/slow", {
            let finished = Arc::clone(&finished);
            move || {
                let finished = Arc::clone(&finished);
                async move {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    finished.store(true, Ordering::SeqCst);
                    Reply::ok_data("slow")
                }
            }
        });

    let server = Server::bind("127.0.0.1:0").unwrap().on_shutdown({
        let finished = Arc::clone(&finished);
        let finished_before_close = Arc::clone(&finished_before_close);
        let calls = Arc::clone(&calls);
        move || {
            finished_before_close.store(finished.load(Ordering::SeqCst), Ordering::SeqCst);
            calls.fetch_add(1, Ordering::SeqCst);
        }
    });
    let handle = server.handle();
    let running = tokio::spawn(server.serve_on(listener, app));

    // A served request means the accept loop has polled the signal listener,
    // so SIGTERM is handled instead of killing the process.
    let pong = get(addr, "/ping").await.unwrap();
    assert!(pong.ends_with(r#""data":"pong"}"#), "{pong}");

    let client = tokio::spawn(get(addr, "/slow"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    sigterm_self();

    let raw = client.await.unwrap().unwrap();
    assert!(raw.ends_with(r#"{"code":0,"message":"success","data":"slow"}"#), "{raw}");

    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("SIGTERM must stop the server")
        .unwrap()
        .unwrap();
    assert!(finished_before_close.load(Ordering::SeqCst));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(handle.is_triggered());
    assert_eq!(handle.state(), State::Stopped);
}
