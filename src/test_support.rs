//! Raw HTTP/1.1 origin for stream shapes a mock library cannot produce:
//! bodies split across reads, missing lengths, early hang-ups, stalls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

#[derive(Clone, Debug)]
pub struct ScriptedResponse {
    chunks: Vec<Vec<u8>>,
    /// `None` omits the header and ends the body by closing the connection.
    content_length: Option<usize>,
    chunk_delay: Duration,
    /// Keep the socket open this long after the last chunk before closing.
    hold_open: Duration,
}

impl ScriptedResponse {
    /// Binary body written in the given pieces, pausing between pieces so the
    /// client observes them as separate reads.
    pub fn chunked(chunks: Vec<Vec<u8>>) -> Self {
        let total = chunks.iter().map(Vec::len).sum();
        Self {
            content_length: Some(total),
            chunks,
            chunk_delay: Duration::from_millis(50),
            hold_open: Duration::ZERO,
        }
    }

    pub fn without_content_length(mut self) -> Self {
        self.content_length = None;
        self
    }

    /// Declare `declared` bytes but hang up after sending the configured chunks.
    pub fn truncated(mut self, declared: usize) -> Self {
        self.content_length = Some(declared);
        self
    }

    /// Send the configured chunks, then go silent with the socket still open.
    pub fn stalled(mut self, declared: usize, hold_open: Duration) -> Self {
        self.content_length = Some(declared);
        self.hold_open = hold_open;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }
}

pub struct ScriptedOrigin {
    addr: std::net::SocketAddr,
    paths: Arc<Mutex<Vec<String>>>,
}

impl ScriptedOrigin {
    /// Serve `responses` in order, one per connection.
    pub async fn start(responses: Vec<ScriptedResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind scripted origin");
        let addr = listener.local_addr().expect("scripted origin address");
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));
        let paths = Arc::new(Mutex::new(Vec::new()));

        let recorded = paths.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let Some(response) = queue.lock().await.pop_front() else {
                    break;
                };
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = serve(socket, response, recorded).await;
                });
            }
        });

        Self { addr, paths }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    pub async fn requested_paths(&self) -> Vec<String> {
        self.paths.lock().await.clone()
    }
}

async fn serve(
    mut socket: TcpStream,
    response: ScriptedResponse,
    paths: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }
    let head = String::from_utf8_lossy(&request);
    if let Some(path) = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
    {
        paths.lock().await.push(path.to_owned());
    }

    let mut header = String::from(
        "HTTP/1.1 200 OK\r\nconnection: close\r\ncontent-type: application/octet-stream\r\n",
    );
    if let Some(len) = response.content_length {
        header.push_str(&format!("content-length: {len}\r\n"));
    }
    header.push_str("\r\n");

    let mut chunks = response.chunks.into_iter();
    let mut first = header.into_bytes();
    if let Some(chunk) = chunks.next() {
        first.extend_from_slice(&chunk);
    }
    socket.write_all(&first).await?;
    socket.flush().await?;

    for chunk in chunks {
        tokio::time::sleep(response.chunk_delay).await;
        socket.write_all(&chunk).await?;
        socket.flush().await?;
    }
    tokio::time::sleep(response.hold_open).await;
    socket.shutdown().await
}
