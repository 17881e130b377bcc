//! stdio transport
//!
//! Newline-delimited JSON-RPC 2.0: one request per line on stdin, one
//! response per line on stdout.

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::rpc::RpcHandler;

pub struct StdioServer {
    handler: RpcHandler,
}

impl StdioServer {
    pub fn new(handler: RpcHandler) -> Self {
        Self { handler }
    }

    /// Run the server, reading from stdin and writing to stdout
    pub async fn run(&self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout()).await
    }

    /// Serve until `reader` hits EOF
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                info!("Client disconnected");
                break;
            }

            let message = line.trim();
            if message.is_empty() {
                continue;
            }

            debug!("Received: {}", message);

            if let Some(response) = self.handler.handle_message(message).await {
                let encoded = serde_json::to_string(&response)?;
                debug!("Sending: {}", encoded);
                writer.write_all(encoded.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }
}
