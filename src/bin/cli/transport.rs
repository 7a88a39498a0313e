use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use url::{Position, Url};

use soundcase::protocol::{ClientMsg, ServerMsg};

use super::printer::EventPrinter;

/// Build a websocket URL from a base string (like "localhost:3000" or
/// "http://host:3000").
pub fn build_ws_url(base: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(base).or_else(|_| Url::parse(&format!("http://{}", base)))?;

    match url.scheme() {
        "http" => url.set_scheme("ws").ok(),
        "https" => url.set_scheme("wss").ok(),
        "ws" | "wss" => Some(()),
        _ => None,
    }
    .ok_or_else(|| anyhow::anyhow!("Unsupported URL scheme: {}", url.scheme()))?;

    // Force path to /ws
    if url.path() != "/ws" {
        url.set_path("/ws");
    }
    Ok(url)
}

/// Build the HTTP origin for API calls from the same base strings
/// `build_ws_url` accepts.
pub fn build_http_base(base: &str) -> anyhow::Result<String> {
    let mut url = Url::parse(base).or_else(|_| Url::parse(&format!("http://{}", base)))?;

    match url.scheme() {
        "ws" => url.set_scheme("http").ok(),
        "wss" => url.set_scheme("https").ok(),
        "http" | "https" => Some(()),
        _ => None,
    }
    .ok_or_else(|| anyhow::anyhow!("Unsupported URL scheme: {}", url.scheme()))?;

    Ok(url[..Position::BeforePath].to_string())
}

/// Connect over websocket, identify as `username`, send the provided
/// messages in order and pass all responses to the printer. With a wait
/// timeout the session ends on the first quiet period; without one it
/// runs until the socket closes.
pub async fn run_session(
    server: &str,
    username: &str,
    actions: Vec<ClientMsg>,
    wait_ms: Option<u64>,
    printer: &mut EventPrinter,
) -> anyhow::Result<()> {
    let ws_url = build_ws_url(server)?;
    let (ws_stream, _resp) = tokio_tungstenite::connect_async(ws_url.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    let hello = ClientMsg::Hello {
        username: username.to_owned(),
    };
    for msg in std::iter::once(hello).chain(actions) {
        let txt = serde_json::to_string(&msg)?;
        write.send(Message::Text(txt)).await?;
    }

    loop {
        let incoming = match wait_ms {
            Some(ms) => {
                match tokio::time::timeout(Duration::from_millis(ms), read.next()).await {
                    Ok(incoming) => incoming,
                    Err(_) => break, // quiet period, command is done
                }
            }
            None => read.next().await,
        };
        match incoming {
            Some(Ok(Message::Text(txt))) => {
                if let Ok(sm) = serde_json::from_str::<ServerMsg>(&txt) {
                    printer.handle(&sm);
                }
            }
            Some(Ok(_other)) => { /* ignore non-text frames */ }
            Some(Err(e)) => {
                eprintln!("WebSocket error: {}", e);
                break;
            }
            None => break, // socket closed
        }
    }

    Ok(())
}

/// GET a JSON view from the server's HTTP API.
pub async fn fetch_json<T: serde::de::DeserializeOwned>(
    server: &str,
    path: &str,
) -> anyhow::Result<T> {
    let base = build_http_base(server)?;
    let url = format!("{}{}", base, path);
    let response = reqwest::get(&url).await?.error_for_status()?;
    Ok(response.json().await?)
}
