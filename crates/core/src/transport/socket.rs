use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{OutboundSender, TransportEvent};

/// Channels connecting a [`super::FrameTransport`] to its socket task.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: OutboundSender,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens a WebSocket to `url` on a background task.
///
/// The task reports `Opened` or `Failed` for the handshake, then forwards
/// every inbound text message until the peer closes, an error occurs, or the
/// outbound sender is dropped. Exactly one terminal event (`Closed` or
/// `Failed`) is emitted per link.
pub fn spawn_link(url: impl Into<String>) -> TransportLink {
    let url = url.into();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let (event_tx, events) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        tracing::info!(%url, "connecting to detection service");
        let stream = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(err) => {
                let _ = event_tx.send(TransportEvent::Failed(err.to_string()));
                return;
            }
        };
        let _ = event_tx.send(TransportEvent::Opened);

        let (mut sink, mut source) = stream.split();
        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => match outbound {
                    Some(text) => {
                        if let Err(err) = sink.send(Message::Text(text)).await {
                            let _ = event_tx.send(TransportEvent::Failed(err.to_string()));
                            return;
                        }
                    }
                    None => {
                        let _ = sink.close().await;
                        let _ = event_tx.send(TransportEvent::Closed);
                        return;
                    }
                },
                inbound = source.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let _ = event_tx.send(TransportEvent::Message(text));
                    }
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => {
                            let _ = event_tx.send(TransportEvent::Message(text));
                        }
                        Err(_) => tracing::debug!("ignoring non-UTF-8 binary message"),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = event_tx.send(TransportEvent::Closed);
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        let _ = event_tx.send(TransportEvent::Failed(err.to_string()));
                        return;
                    }
                },
            }
        }
    });

    TransportLink { outbound, events }
}
