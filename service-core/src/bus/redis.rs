//! Redis transport.
//!
//! Requests are LPUSH'd onto a list per (node type, module); every live
//! instance of that module BRPOPs the same list, so exactly one consumer
//! takes each call and horizontal scaling load-balances for free. Replies go
//! onto a per-call reply list the caller BRPOPs with its timeout. Nothing is
//! redelivered: a request popped by a crashing worker is lost, which is the
//! contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde_json::Value;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{
    split_function_ref, BusError, CallEnvelope, Dispatcher, ReplyEnvelope, RpcBus,
    DEFAULT_CALL_TIMEOUT,
};

/// Reply lists linger this long before Redis reaps them, covering callers
/// that give up before the reply lands.
const REPLY_TTL_SECS: i64 = 30;

#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    publish: MultiplexedConnection,
    prefix: String,
    call_timeout: Duration,
}

impl RedisBus {
    pub async fn connect(uri: &str, prefix: &str) -> Result<Self, BusError> {
        Self::connect_with_timeout(uri, prefix, DEFAULT_CALL_TIMEOUT).await
    }

    pub async fn connect_with_timeout(
        uri: &str,
        prefix: &str,
        call_timeout: Duration,
    ) -> Result<Self, BusError> {
        let client = redis::Client::open(uri).map_err(transport)?;
        let publish = client
            .get_multiplexed_async_connection()
            .await
            .map_err(transport)?;
        tracing::info!(uri = %uri, prefix = %prefix, "connected to redis bus");
        Ok(Self {
            client,
            publish,
            prefix: prefix.to_string(),
            call_timeout,
        })
    }

    fn request_key(&self, node_type: &str, module: &str) -> String {
        format!("{}:rpc:{}:{}", self.prefix, node_type, module)
    }

    fn reply_key(&self, id: &str) -> String {
        format!("{}:reply:{}", self.prefix, id)
    }

    async fn push_request(
        &self,
        node_type: &str,
        function_ref: &str,
        args: Value,
        reply_to: Option<String>,
    ) -> Result<(), BusError> {
        let (module, _) = split_function_ref(function_ref)?;
        let envelope = CallEnvelope {
            id: Uuid::new_v4().to_string(),
            call: function_ref.to_string(),
            args,
            reply_to,
        };
        let payload = serde_json::to_string(&envelope).map_err(codec)?;
        let mut conn = self.publish.clone();
        let _: () = conn
            .lpush(self.request_key(node_type, module), payload)
            .await
            .map_err(transport)?;
        Ok(())
    }
}

#[async_trait]
impl RpcBus for RedisBus {
    async fn call(
        &self,
        node_type: &str,
        function_ref: &str,
        args: Value,
    ) -> Result<Value, BusError> {
        let reply_key = self.reply_key(&Uuid::new_v4().to_string());
        self.push_request(node_type, function_ref, args, Some(reply_key.clone()))
            .await?;

        // The blocking pop gets a dedicated connection so it cannot stall
        // commands multiplexed on the shared one.
        let mut blocking = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(transport)?;
        let popped: Option<(String, String)> = blocking
            .brpop(&reply_key, self.call_timeout.as_secs_f64())
            .await
            .map_err(transport)?;
        match popped {
            Some((_, raw)) => {
                let reply: ReplyEnvelope = serde_json::from_str(&raw).map_err(codec)?;
                Ok(reply.body)
            }
            None => Err(BusError::Timeout(self.call_timeout)),
        }
    }

    async fn notify(
        &self,
        node_type: &str,
        function_ref: &str,
        args: Value,
    ) -> Result<(), BusError> {
        self.push_request(node_type, function_ref, args, None)
            .await?;
        Ok(())
    }
}

/// Spawn one consumer loop per module hosted by `dispatcher`.
///
/// Each loop BRPOPs its module's request list, dispatches, and pushes the
/// reply when the caller asked for one. Workers reconnect on transport
/// errors and run until aborted.
pub fn serve(bus: &RedisBus, node_type: &str, dispatcher: Arc<Dispatcher>) -> Vec<JoinHandle<()>> {
    dispatcher
        .module_names()
        .into_iter()
        .map(|module| {
            let client = bus.client.clone();
            let key = bus.request_key(node_type, &module);
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                tracing::info!(module = %module, key = %key, "bus worker started");
                worker_loop(client, key, dispatcher).await;
            })
        })
        .collect()
}

async fn worker_loop(client: redis::Client, key: String, dispatcher: Arc<Dispatcher>) {
    loop {
        let mut conn = match client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(error = %err, "bus worker cannot reach redis, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };
        loop {
            let popped: Result<Option<(String, String)>, redis::RedisError> =
                conn.brpop(&key, 1.0).await;
            match popped {
                Ok(Some((_, raw))) => handle_request(&raw, &dispatcher, &mut conn).await,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(error = %err, "bus worker lost its connection");
                    break;
                }
            }
        }
    }
}

async fn handle_request(raw: &str, dispatcher: &Dispatcher, conn: &mut MultiplexedConnection) {
    let envelope: CallEnvelope = match serde_json::from_str(raw) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(error = %err, "dropping malformed bus request");
            return;
        }
    };
    let reply = dispatcher.dispatch(&envelope.call, envelope.args).await;
    let Some(reply_to) = envelope.reply_to else {
        return;
    };
    let frame = ReplyEnvelope {
        id: envelope.id,
        body: reply,
    };
    let payload = match serde_json::to_string(&frame) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "failed to encode bus reply");
            return;
        }
    };
    if let Err(err) = async {
        let _: () = conn.lpush(&reply_to, payload).await?;
        let _: () = conn.expire(&reply_to, REPLY_TTL_SECS).await?;
        Ok::<(), redis::RedisError>(())
    }
    .await
    {
        tracing::warn!(error = %err, reply_to = %reply_to, "failed to push bus reply");
    }
}

fn transport(err: redis::RedisError) -> BusError {
    BusError::Transport(err.to_string())
}

fn codec(err: serde_json::Error) -> BusError {
    BusError::Codec(err.to_string())
}
