use std::sync::Arc;

use anyhow::Context;
use run_coach_lib::position_fix::PositionFix;
use serde::Deserialize;
use serde_json::json;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream, tcp::OwnedWriteHalf},
};

use crate::session_service::SessionService;

/// One JSON value per line: either a session command or a position fix.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClientMessage {
    Command { cmd: Command },
    Fix(PositionFix),
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum Command {
    Start,
    Stop,
    Reset,
    Status,
    Complete,
}

pub async fn listen(service: Arc<SessionService>, bind_address: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_address)
        .await
        .context("Failed to bind fix endpoint")?;

    tracing::info!("listening on {}", bind_address);
    loop {
        let Ok((stream, addr)) = listener.accept().await else {
            tracing::error!("Failed to accept connection");
            continue;
        };

        tracing::info!("New connection from {}", addr);

        let service = service.clone();
        tokio::spawn(async move {
            let res = handle_connection(stream, service).await;
            tracing::info!("Connection from {} ended with result: {:?}", addr, res);
        });
    }
}

async fn handle_connection(stream: TcpStream, service: Arc<SessionService>) -> Result<(), anyhow::Error> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let message: ClientMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(err) => {
                // Malformed input is dropped, never fatal
                tracing::warn!("Dropping malformed line: {}", err);
                continue;
            }
        };

        match message {
            ClientMessage::Fix(fix) => service.handle_fix(fix).await,
            ClientMessage::Command { cmd } => handle_command(cmd, &service, &mut writer).await?,
        }
    }

    Ok(())
}

async fn handle_command(cmd: Command, service: &SessionService, writer: &mut OwnedWriteHalf) -> Result<(), anyhow::Error> {
    let reply = match cmd {
        Command::Start => {
            let fresh = service.start().await;
            let message = if fresh { "Tracking started" } else { "Already tracking" };
            json!({ "success": true, "message": message })
        }
        Command::Stop => {
            let final_distance = service.stop().await;
            json!({ "success": true, "final_distance": final_distance })
        }
        Command::Reset => {
            service.reset().await;
            json!({ "success": true })
        }
        Command::Status => serde_json::to_value(service.status().await)?,
        Command::Complete => {
            service.complete().await;
            json!({ "success": true })
        }
    };

    let mut out = serde_json::to_vec(&reply)?;
    out.push(b'\n');
    writer.write_all(&out).await.context("Failed to send reply")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_lines_parse() {
        let message: ClientMessage = serde_json::from_str("{\"cmd\":\"start\"}").unwrap();
        assert!(matches!(message, ClientMessage::Command { cmd: Command::Start }));

        let message: ClientMessage = serde_json::from_str("{\"cmd\":\"complete\"}").unwrap();
        assert!(matches!(message, ClientMessage::Command { cmd: Command::Complete }));
    }

    #[test]
    fn fix_lines_parse() {
        let line = "{\"position\":{\"x\":9.0,\"y\":55.0},\"accuracy\":5.0,\"altitude\":20.0,\"speed\":2.5,\"heading\":90.0,\"timestamp\":\"2025-06-01T09:00:00Z\"}";
        let message: ClientMessage = serde_json::from_str(line).unwrap();

        let ClientMessage::Fix(fix) = message else {
            panic!("expected a fix");
        };
        assert_eq!(fix.latitude(), 55.0);
        assert_eq!(fix.accuracy, 5.0);
    }

    #[test]
    fn garbage_lines_fail_to_parse() {
        assert!(serde_json::from_str::<ClientMessage>("{\"cmd\":\"fly\"}").is_err());
        assert!(serde_json::from_str::<ClientMessage>("not json").is_err());
    }
}
