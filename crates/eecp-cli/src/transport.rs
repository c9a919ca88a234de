use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use eecp_protocol::MessageEnvelope;

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn connect(server: &str, workspace: Option<uuid::Uuid>) -> anyhow::Result<Socket> {
    let mut url = format!("ws://{server}/ws");
    if let Some(id) = workspace {
        url.push_str(&format!("?workspace={id}"));
    }
    let (socket, _) = tokio_tungstenite::connect_async(url).await?;
    Ok(socket)
}

pub async fn send(socket: &mut Socket, envelope: &MessageEnvelope) -> anyhow::Result<()> {
    let text = serde_json::to_string(envelope)?;
    socket.send(WsMessage::Text(text)).await?;
    Ok(())
}

pub async fn recv(socket: &mut Socket) -> anyhow::Result<MessageEnvelope> {
    while let Some(frame) = socket.next().await {
        match frame? {
            WsMessage::Text(text) => return Ok(serde_json::from_str(&text)?),
            WsMessage::Close(_) => anyhow::bail!("server closed the connection"),
            _ => continue,
        }
    }
    anyhow::bail!("connection ended without a response")
}
