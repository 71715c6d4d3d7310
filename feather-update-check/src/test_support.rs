//! Loopback HTTP server for exercising the reqwest client in unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

#[derive(Debug, Clone)]
pub enum Reply {
    /// `200 OK` with the whole body at once.
    Body(Vec<u8>),
    /// Empty response with the given status.
    Status(u16),
    /// `200 OK`, body sent in pieces with a pause before each.
    Slow { chunks: Vec<Vec<u8>>, delay: Duration },
    /// Read the request and never answer.
    Stall,
}

pub struct TestServer {
    addr: std::net::SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start(reply: Reply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let task = tokio::spawn({
            let requests = requests.clone();

            async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve(stream, reply.clone(), requests.clone()));
                }
            }
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
    }

    /// Request lines seen so far, e.g. `GET /files/x HTTP/1.1`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(mut stream: TcpStream, reply: Reply, requests: Arc<Mutex<Vec<String>>>) {
    let mut head = Vec::new();
    let mut buffer = [0u8; 1024];
    while !head.windows(4).any(|window| window == b"\r\n\r\n") {
        match stream.read(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(read) => head.extend_from_slice(&buffer[..read]),
        }
    }

    let head = String::from_utf8_lossy(&head);
    if let Some(line) = head.lines().next() {
        requests.lock().unwrap().push(line.to_owned());
    }

    match reply {
        Reply::Body(body) => {
            let _ = stream.write_all(&response_head(200, body.len())).await;
            let _ = stream.write_all(&body).await;
        }
        Reply::Status(status) => {
            let _ = stream.write_all(&response_head(status, 0)).await;
        }
        Reply::Slow { chunks, delay } => {
            let length = chunks.iter().map(Vec::len).sum();
            let _ = stream.write_all(&response_head(200, length)).await;
            for chunk in chunks {
                tokio::time::sleep(delay).await;
                if stream.write_all(&chunk).await.is_err() {
                    return;
                }
                let _ = stream.flush().await;
            }
        }
        Reply::Stall => std::future::pending::<()>().await,
    }

    let _ = stream.shutdown().await;
}

fn response_head(status: u16, length: usize) -> Vec<u8> {
    format!(
        "HTTP/1.1 {} Test\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status, length
    )
    .into_bytes()
}
