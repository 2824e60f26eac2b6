//! Framing tests: commands split across TCP writes and commands
//! batched into a single write must decode identically.

mod common;

use std::time::Duration;

use common::{PASSWORD, TestServer};

#[tokio::test]
async fn test_command_sent_byte_by_byte() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    for byte in b"USER jdoe\r\n" {
        client.send_bytes(&[*byte]).await?;
    }
    assert_eq!(client.recv().await?, "+OK User accepted");
    Ok(())
}

#[tokio::test]
async fn test_partial_line_produces_no_reply() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_bytes(b"USER jd").await?;
    assert!(
        client
            .recv_timeout(Duration::from_millis(300))
            .await
            .is_err()
    );

    client.send_bytes(b"oe\r\n").await?;
    assert_eq!(client.recv().await?, "+OK User accepted");
    Ok(())
}

#[tokio::test]
async fn test_crlf_split_across_writes() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    client.send_bytes(b"CAPA\r").await?;
    assert!(
        client
            .recv_timeout(Duration::from_millis(300))
            .await
            .is_err()
    );

    client.send_bytes(b"\n").await?;
    assert_eq!(client.recv().await?, "+OK Capability list follows");
    client.recv_until_end().await?;
    Ok(())
}

#[tokio::test]
async fn test_bare_lf_does_not_terminate() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;

    // A lone LF is payload, not a terminator.
    client.send_bytes(b"CAPA\n").await?;
    assert!(
        client
            .recv_timeout(Duration::from_millis(300))
            .await
            .is_err()
    );

    // Once a real CRLF arrives the whole buffer decodes as one line;
    // the stray LF is trimmed out of the argument field.
    client.send_bytes(b"\r\n").await?;
    assert_eq!(client.recv().await?, "+OK Capability list follows");
    client.recv_until_end().await?;
    Ok(())
}

#[tokio::test]
async fn test_pipelined_commands_reply_in_order() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;
    client.login("jdoe", PASSWORD).await?;

    client.send_bytes(b"STAT\r\nNOOP\r\nLIST\r\n").await?;
    assert_eq!(client.recv().await?, "+OK 3 24");
    assert_eq!(client.recv().await?, "+OK");
    assert_eq!(client.recv().await?, "+OK");
    assert_eq!(client.recv_until_end().await?, vec!["1 8", "2 8", "3 8"]);
    Ok(())
}

#[tokio::test]
async fn test_pipelined_quit_replies_then_closes() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut client = server.connect().await?;
    client.login("jdoe", PASSWORD).await?;

    client.send_bytes(b"STAT\r\nQUIT\r\n").await?;
    assert_eq!(client.recv().await?, "+OK 3 24");
    assert_eq!(client.recv().await?, "+OK POP3 Server signing off");
    client.expect_eof(Duration::from_secs(2)).await?;
    Ok(())
}
