//! Test POP3 client.
//!
//! Provides a line-oriented client for integration testing that can
//! send commands and assert on received replies.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test POP3 client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }

    /// Send one command line; CRLF is appended.
    pub async fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Write raw bytes with no framing, for split-write tests.
    pub async fn send_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single reply line.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a reply line with a timeout.
    ///
    /// Strips exactly the line terminator, so replies with trailing
    /// spaces (the `+ ` SASL prompt) come back verbatim.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("connection closed");
        }
        let body = line
            .strip_suffix("\r\n")
            .or_else(|| line.strip_suffix('\n'))
            .unwrap_or(&line);
        Ok(body.to_string())
    }

    /// Receive lines until the multi-line terminator; the terminator
    /// itself is not included.
    pub async fn recv_until_end(&mut self) -> anyhow::Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.recv().await?;
            if line == "." {
                break;
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Send a command and return the first reply line.
    pub async fn command(&mut self, line: &str) -> anyhow::Result<String> {
        self.send_line(line).await?;
        self.recv().await
    }

    /// Read the greeting banner.
    pub async fn greeting(&mut self) -> anyhow::Result<String> {
        self.recv().await
    }

    /// Log in with USER/PASS, asserting both steps succeed.
    pub async fn login(&mut self, user: &str, password: &str) -> anyhow::Result<()> {
        let reply = self.command(&format!("USER {user}")).await?;
        anyhow::ensure!(reply.starts_with("+OK"), "USER failed: {reply}");
        let reply = self.command(&format!("PASS {password}")).await?;
        anyhow::ensure!(reply.starts_with("+OK"), "PASS failed: {reply}");
        Ok(())
    }

    /// Send QUIT and return the sign-off line.
    pub async fn quit(&mut self) -> anyhow::Result<String> {
        self.command("QUIT").await
    }

    /// Expect the server to close the connection within the window.
    pub async fn expect_eof(&mut self, dur: Duration) -> anyhow::Result<()> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        anyhow::ensure!(n == 0, "expected EOF, read {line:?}");
        Ok(())
    }
}
