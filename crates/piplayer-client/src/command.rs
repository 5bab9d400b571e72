//! Command channel: one-shot structured requests to the server of record.
//!
//! `send` always resolves to a [`Response`].  Transport failures are logged
//! and folded into `Response { success: false, .. }`; nothing is retried.
//! A `(component, method)` pair outside the recognised table is answered
//! locally and never reaches the network.

use std::future::Future;
use std::time::Duration;

use piplayer_proto::protocol::{self, Command, Response, API_PATH};
use tracing::{debug, error, warn};

use crate::error::TransportError;

/// Request/response seam.  The session only ever talks to the server through
/// this trait.
pub trait CommandTransport: Send + Sync {
    fn send(&self, command: Command) -> impl Future<Output = Response> + Send;
}

/// The local answer for a command the server would not recognise.
pub fn refuse_unrecognized(command: &Command) -> Option<Response> {
    if protocol::is_recognized(command.component, &command.method) {
        None
    } else {
        Some(Response::failure("Method not supported"))
    }
}

/// `POST /api` over HTTP with a JSON body.
pub struct HttpCommandChannel {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCommandChannel {
    pub fn new(server_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", server_url.trim_end_matches('/'), API_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn try_send(&self, command: &Command) -> Result<Response, TransportError> {
        let res = self
            .client
            .post(&self.endpoint)
            .json(command)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json::<Response>().await?)
    }
}

impl CommandTransport for HttpCommandChannel {
    async fn send(&self, command: Command) -> Response {
        if let Some(refused) = refuse_unrecognized(&command) {
            warn!("command {}.{} not recognised, not sent", command.component, command.method);
            return refused;
        }
        debug!("command → {}.{} {:?}", command.component, command.method, command.arguments);
        match self.try_send(&command).await {
            Ok(res) => {
                debug!("command ← {}.{} success={}", command.component, command.method, res.success);
                res
            }
            Err(e) => {
                error!("command {}.{} failed: {}", command.component, command.method, e);
                Response::failure(e.to_string())
            }
        }
    }
}
