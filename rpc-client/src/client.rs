//! RPC session over the voice client's IPC socket
//!
//! A session performs the handshake on the raw stream, then splits it: a
//! background reader routes replies to waiting requests by nonce and
//! forwards `DISPATCH` pushes to an event channel, while requests write
//! through a shared writer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{Result, RpcError};
use crate::frame::{read_frame, write_frame, Frame, Opcode};
use crate::oauth::{self, Credentials, DEFAULT_SCOPES, DEFAULT_TOKEN_URL};
use crate::transport::{self, IpcStream};
use crate::types::{EventKind, RpcEvent, SelectedVoiceChannel, User, VoiceSettings};

/// Protocol version sent in the handshake
pub const RPC_VERSION: u32 = 1;

type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;
type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Result<Value>>>>>;

/// Options for a single RPC session
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Application id presented in the handshake
    pub client_id: String,
    /// Restrict endpoint discovery to one IPC slot
    pub pipe: Option<u8>,
    /// Timeout for ordinary requests
    /// Default: 5 seconds
    pub request_timeout: Duration,
    /// Timeout for the handshake to produce `READY`
    /// Default: 5 seconds
    pub handshake_timeout: Duration,
    /// Timeout for `AUTHORIZE`, which waits on the user approving a prompt
    /// Default: 60 seconds
    pub authorize_timeout: Duration,
    /// OAuth2 token endpoint
    pub token_url: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            pipe: None,
            request_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
            authorize_timeout: Duration::from_secs(60),
            token_url: DEFAULT_TOKEN_URL.to_string(),
        }
    }
}

impl ClientOptions {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Default::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_pipe(mut self, pipe: Option<u8>) -> Self {
        self.pipe = pipe;
        self
    }
}

/// An established RPC session
pub struct RpcClient {
    options: ClientOptions,
    writer: SharedWriter,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    user: Option<User>,
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("client_id", &self.options.client_id)
            .field("user", &self.user)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

impl RpcClient {
    /// Discover the local endpoint, connect, and complete the handshake
    pub async fn connect(
        options: ClientOptions,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RpcEvent>)> {
        let stream = transport::open(options.pipe).await?;
        Self::from_stream(stream, options).await
    }

    /// Run a session over an already-open stream
    pub async fn from_stream<S>(
        stream: S,
        options: ClientOptions,
    ) -> Result<(Self, mpsc::UnboundedReceiver<RpcEvent>)>
    where
        S: IpcStream,
    {
        let (mut read_half, write_half) = tokio::io::split(stream);
        let mut writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(write_half);

        let user = tokio::time::timeout(
            options.handshake_timeout,
            handshake(&mut read_half, &mut writer, &options.client_id),
        )
        .await
        .map_err(|_| RpcError::Handshake("timed out waiting for READY".to_string()))??;

        let writer: SharedWriter = Arc::new(Mutex::new(writer));
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(read_loop(
            read_half,
            Arc::clone(&writer),
            Arc::clone(&pending),
            Arc::clone(&closed),
            event_tx,
        ));

        tracing::info!(
            "RPC session established{}",
            user.as_ref()
                .map(|u| format!(" for user {}", u.id))
                .unwrap_or_default()
        );

        Ok((
            Self {
                options,
                writer,
                pending,
                closed,
                user,
                reader,
            },
            event_rx,
        ))
    }

    /// The local user, as announced in `READY` or confirmed by `AUTHENTICATE`
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Whether the reader has observed the end of the session
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send a command and wait for its reply
    pub async fn request(&self, cmd: &str, args: Value, evt: Option<&str>) -> Result<Value> {
        self.request_with_timeout(cmd, args, evt, self.options.request_timeout)
            .await
    }

    async fn request_with_timeout(
        &self,
        cmd: &str,
        args: Value,
        evt: Option<&str>,
        timeout: Duration,
    ) -> Result<Value> {
        let nonce = Uuid::new_v4().to_string();
        let mut payload = json!({ "cmd": cmd, "args": args, "nonce": nonce });
        if let Some(evt) = evt {
            payload["evt"] = json!(evt);
        }

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(nonce.clone(), tx);

        if self.is_closed() {
            self.pending.lock().await.remove(&nonce);
            return Err(RpcError::Closed(None));
        }

        let sent = {
            let mut writer = self.writer.lock().await;
            write_frame(&mut *writer, &Frame::new(Opcode::Frame, payload)).await
        };
        if let Err(e) = sent {
            self.pending.lock().await.remove(&nonce);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RpcError::Closed(None)),
            Err(_) => {
                self.pending.lock().await.remove(&nonce);
                Err(RpcError::Timeout(cmd.to_string()))
            }
        }
    }

    /// `GET_VOICE_SETTINGS`
    pub async fn voice_settings(&self) -> Result<VoiceSettings> {
        let data = self.request("GET_VOICE_SETTINGS", json!({}), None).await?;
        Ok(serde_json::from_value(data)?)
    }

    /// `GET_SELECTED_VOICE_CHANNEL`; `None` when the user is not in a channel
    pub async fn selected_voice_channel(&self) -> Result<Option<SelectedVoiceChannel>> {
        let data = self
            .request("GET_SELECTED_VOICE_CHANNEL", json!({}), None)
            .await?;
        if data.is_null() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(data)?))
    }

    /// `SUBSCRIBE` to a push event
    pub async fn subscribe(&self, kind: EventKind, channel_id: Option<&str>) -> Result<()> {
        self.request("SUBSCRIBE", subscription_args(kind, channel_id)?, Some(kind.as_str()))
            .await
            .map(|_| ())
    }

    /// `UNSUBSCRIBE` from a push event
    pub async fn unsubscribe(&self, kind: EventKind, channel_id: Option<&str>) -> Result<()> {
        self.request("UNSUBSCRIBE", subscription_args(kind, channel_id)?, Some(kind.as_str()))
            .await
            .map(|_| ())
    }

    /// `AUTHORIZE`: ask the user to approve this application, returning an authorization code
    pub async fn authorize(&self, scopes: &[&str]) -> Result<String> {
        let data = self
            .request_with_timeout(
                "AUTHORIZE",
                json!({ "client_id": self.options.client_id, "scopes": scopes }),
                None,
                self.options.authorize_timeout,
            )
            .await?;

        data.get("code")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RpcError::Auth("AUTHORIZE reply carried no code".to_string()))
    }

    /// `AUTHENTICATE` with an access token
    pub async fn authenticate(&mut self, access_token: &str) -> Result<User> {
        let data = self
            .request("AUTHENTICATE", json!({ "access_token": access_token }), None)
            .await?;

        let user: User = data
            .get("user")
            .cloned()
            .ok_or_else(|| RpcError::Auth("AUTHENTICATE reply carried no user".to_string()))
            .and_then(|u| serde_json::from_value(u).map_err(RpcError::from))?;

        tracing::info!("Authenticated as {} ({})", user.username, user.id);
        self.user = Some(user.clone());
        Ok(user)
    }

    /// Authenticate according to the configured credentials
    pub async fn login(&mut self, credentials: &Credentials) -> Result<Option<User>> {
        match credentials {
            Credentials::None => Ok(None),
            Credentials::AccessToken(token) => self.authenticate(token).await.map(Some),
            Credentials::ClientSecret {
                secret,
                redirect_uri,
            } => {
                let code = self.authorize(DEFAULT_SCOPES).await?;
                let token = oauth::exchange_code(
                    &reqwest::Client::new(),
                    &self.options.token_url,
                    &self.options.client_id,
                    secret,
                    &code,
                    redirect_uri.as_deref(),
                    self.options.request_timeout,
                )
                .await?;
                self.authenticate(&token.access_token).await.map(Some)
            }
        }
    }

    /// Send a `Close` frame and stop the reader
    pub async fn close(&self) {
        if !self.is_closed() {
            let mut writer = self.writer.lock().await;
            if let Err(e) = write_frame(&mut *writer, &Frame::new(Opcode::Close, json!({}))).await {
                tracing::debug!("Failed to send close frame: {}", e);
            }
        }
        self.reader.abort();
        self.closed.store(true, Ordering::Release);
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn subscription_args(kind: EventKind, channel_id: Option<&str>) -> Result<Value> {
    match (kind.is_channel_scoped(), channel_id) {
        (true, Some(id)) => Ok(json!({ "channel_id": id })),
        (true, None) => Err(RpcError::Protocol(format!(
            "{} requires a channel id",
            kind
        ))),
        (false, _) => Ok(json!({})),
    }
}

fn response_error(data: &Value) -> RpcError {
    RpcError::Response {
        code: data.get("code").and_then(Value::as_i64).unwrap_or(0),
        message: data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string(),
    }
}

fn close_reason(payload: &Value) -> Option<String> {
    payload
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Send the handshake and wait for `READY`, returning the announced user
async fn handshake<R, W>(reader: &mut R, writer: &mut W, client_id: &str) -> Result<Option<User>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let hello = Frame::new(
        Opcode::Handshake,
        json!({ "v": RPC_VERSION, "client_id": client_id }),
    );
    write_frame(writer, &hello).await?;

    loop {
        let frame = read_frame(reader)
            .await?
            .ok_or_else(|| RpcError::Handshake("stream ended before READY".to_string()))?;

        match frame.opcode {
            Opcode::Frame => {
                let evt = frame.payload.get("evt").and_then(Value::as_str);
                match evt {
                    Some("READY") => {
                        let user = frame
                            .payload
                            .get("data")
                            .and_then(|d| d.get("user"))
                            .and_then(|u| serde_json::from_value::<User>(u.clone()).ok());
                        return Ok(user);
                    }
                    Some("ERROR") => {
                        let data = frame.payload.get("data").cloned().unwrap_or(Value::Null);
                        return Err(RpcError::Handshake(response_error(&data).to_string()));
                    }
                    _ => tracing::trace!("Ignoring pre-READY frame: {}", frame.payload),
                }
            }
            Opcode::Close => {
                return Err(RpcError::Handshake(
                    close_reason(&frame.payload).unwrap_or_else(|| "closed by peer".to_string()),
                ));
            }
            Opcode::Ping => {
                write_frame(writer, &Frame::new(Opcode::Pong, frame.payload)).await?;
            }
            _ => {}
        }
    }
}

async fn read_loop<R>(
    mut reader: R,
    writer: SharedWriter,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<RpcEvent>,
) where
    R: AsyncRead + Unpin,
{
    let reason = loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame)) => match frame.opcode {
                Opcode::Frame => dispatch(frame.payload, &pending, &events).await,
                Opcode::Ping => {
                    let mut w = writer.lock().await;
                    if let Err(e) = write_frame(&mut *w, &Frame::new(Opcode::Pong, frame.payload)).await {
                        break Some(e.to_string());
                    }
                }
                Opcode::Close => break close_reason(&frame.payload),
                Opcode::Pong | Opcode::Handshake => {}
            },
            Ok(None) => break None,
            Err(e) => break Some(e.to_string()),
        }
    };

    tracing::debug!(
        "RPC reader finished: {}",
        reason.as_deref().unwrap_or("end of stream")
    );

    closed.store(true, Ordering::Release);
    for (_, tx) in pending.lock().await.drain() {
        let _ = tx.send(Err(RpcError::Closed(reason.clone())));
    }
    let _ = events.send(RpcEvent::Closed { reason });
}

async fn dispatch(payload: Value, pending: &PendingMap, events: &mpsc::UnboundedSender<RpcEvent>) {
    let evt = payload.get("evt").and_then(Value::as_str);
    let data = payload.get("data").cloned().unwrap_or(Value::Null);

    if let Some(nonce) = payload.get("nonce").and_then(Value::as_str) {
        if let Some(tx) = pending.lock().await.remove(nonce) {
            let result = if evt == Some("ERROR") {
                Err(response_error(&data))
            } else {
                Ok(data)
            };
            let _ = tx.send(result);
            return;
        }
    }

    let cmd = payload.get("cmd").and_then(Value::as_str);
    match (cmd, evt) {
        (Some("DISPATCH"), Some(evt)) => {
            let _ = events.send(RpcEvent::from_dispatch(evt, data));
        }
        _ => tracing::trace!("Unmatched RPC frame: {}", payload),
    }
}
