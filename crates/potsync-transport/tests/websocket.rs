//! Integration tests for the WebSocket transport.
//!
//! A real listener and client exchange frames over loopback.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use potsync_transport::{Connection, Frame, Transport, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn connect_client(addr: &str) -> ClientWs {
        let url = format!("ws://{addr}");
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("client should connect");
        ws
    }

    /// Binds on an OS-assigned port and accepts exactly one client.
    async fn accepted_pair() -> (
        potsync_transport::WebSocketConnection,
        ClientWs,
    ) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let client = connect_client(&addr).await;
        let server = server_handle.await.expect("task should complete");
        (server, client)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (server_conn, mut client_ws) = accepted_pair().await;

        assert!(server_conn.id().into_inner() > 0);

        server_conn
            .send(b"room snapshot")
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"room snapshot");

        client_ws
            .send(Message::Binary(b"join intent".to_vec().into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, Frame::Data(b"join intent".to_vec()));

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_text_frames_are_delivered_as_bytes() {
        let (server_conn, mut client_ws) = accepted_pair().await;

        client_ws
            .send(Message::Text("{\"hello\":1}".into()))
            .await
            .unwrap();

        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, Frame::Data(b"{\"hello\":1}".to_vec()));
    }

    #[tokio::test]
    async fn test_websocket_send_not_blocked_by_pending_recv() {
        let (server_conn, mut client_ws) = accepted_pair().await;
        let server_conn = std::sync::Arc::new(server_conn);

        // Park a reader that will never see a frame.
        let reader = {
            let conn = std::sync::Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(
            Duration::from_secs(2),
            server_conn.send(b"broadcast"),
        )
        .await
        .expect("send must not wait on recv")
        .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"broadcast");
        reader.abort();
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server_conn, mut client_ws) = accepted_pair().await;

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_client_ping_is_reported_as_keepalive() {
        let (server_conn, mut client_ws) = accepted_pair().await;

        client_ws
            .send(Message::Ping(b"hb".to_vec().into()))
            .await
            .unwrap();

        let received = server_conn.recv().await.unwrap();
        assert_eq!(received, Some(Frame::Keepalive));
    }

    #[tokio::test]
    async fn test_websocket_server_ping_is_answered_by_client() {
        let (server_conn, mut client_ws) = accepted_pair().await;

        server_conn.ping().await.expect("ping should send");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_ping());

        // Polling again flushes the client's queued pong.
        let client = tokio::spawn(async move {
            let _ = tokio::time::timeout(
                Duration::from_millis(200),
                client_ws.next(),
            )
            .await;
            client_ws
        });
        let received = tokio::time::timeout(
            Duration::from_secs(2),
            server_conn.recv(),
        )
        .await
        .expect("pong should arrive")
        .unwrap();
        assert_eq!(received, Some(Frame::Keepalive));
        drop(client.await);
    }
}
