//! RTC Signaling Session
//!
//! Drives one peer connection through a single negotiation:
//! - Configure transceivers (and local media when publishing)
//! - Create the offer and commit it as local description
//! - Exchange it with the signaling API
//! - Apply the answer
//!
//! `close()` is the only cancellation primitive. Closing while the exchange
//! is in flight resolves the pending `open()` with [`SignalingError::Cancelled`].

use super::address::{resolve_with, PageSchema, ResolveOptions, Role, SignalingEndpoint, StreamAddress};
use super::exchange::SignalingExchange;
use super::peer_connection::{Direction, MediaKind, PeerTransport};
use super::signaling::{ExchangeResponse, OfferRequest};
use super::SignalingError;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing negotiated yet
    Idle,
    /// Local description committed
    OfferCreated,
    /// Offer sent, waiting for the answer
    AwaitingAnswer,
    /// Remote answer applied
    Established,
    /// Terminated, cannot be reopened
    Closed,
}

/// Per-session settings
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Settings used by [`SignalingSession::publish`] and [`SignalingSession::play`]
    pub resolve: ResolveOptions,
    /// Exchange deadline. `None` waits as long as the exchange itself does.
    pub exchange_timeout: Option<Duration>,
}

/// What a caller gets back from a successful negotiation
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session_id: String,
    pub api_url: String,
    pub stream_url: String,
    pub schema: PageSchema,
    pub port: u16,
    pub transaction_id: String,
    pub simulator_url: String,
    pub local_sdp: String,
    pub remote_sdp: String,
    /// Additional fields of the server response (`sessionid`, `server`, ...)
    pub response: Map<String, Value>,
}

struct SessionInner {
    state: SessionState,
    opened: bool,
    /// Cancellation slot of the exchange in flight
    pending: Option<oneshot::Sender<()>>,
    simulator_url: Option<String>,
}

/// One negotiation over an exclusively owned transport handle
pub struct SignalingSession<T: PeerTransport> {
    id: String,
    transport: tokio::sync::Mutex<Option<T>>,
    exchange: Arc<dyn SignalingExchange>,
    options: SessionOptions,
    inner: Mutex<SessionInner>,
}

impl<T: PeerTransport> SignalingSession<T> {
    /// Create a new idle session
    pub fn new(transport: T, exchange: Arc<dyn SignalingExchange>, options: SessionOptions) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            transport: tokio::sync::Mutex::new(Some(transport)),
            exchange,
            options,
            inner: Mutex::new(SessionInner {
                state: SessionState::Idle,
                opened: false,
                pending: None,
                simulator_url: None,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Diagnostic URL stored after a successful negotiation
    pub fn simulator_url(&self) -> Option<String> {
        self.inner.lock().simulator_url.clone()
    }

    /// Resolve `url` and publish local media to it
    pub async fn publish(&self, url: &str) -> Result<SessionHandle, SignalingError> {
        let (endpoint, address) = resolve_with(url, Role::Publish, &self.options.resolve)?;
        self.open(Role::Publish, &endpoint, &address).await
    }

    /// Resolve `url` and play it
    pub async fn play(&self, url: &str) -> Result<SessionHandle, SignalingError> {
        let (endpoint, address) = resolve_with(url, Role::Play, &self.options.resolve)?;
        self.open(Role::Play, &endpoint, &address).await
    }

    /// Run the negotiation. A session negotiates at most once.
    pub async fn open(
        &self,
        role: Role,
        endpoint: &SignalingEndpoint,
        address: &StreamAddress,
    ) -> Result<SessionHandle, SignalingError> {
        {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Closed {
                return Err(SignalingError::InvalidState(format!("session {} is closed", self.id)));
            }
            if inner.opened {
                return Err(SignalingError::InvalidState(format!(
                    "session {} already negotiated ({:?})",
                    self.id, inner.state
                )));
            }
            inner.opened = true;
        }

        info!(
            "Session {} {} {} via {} tid={}",
            self.id,
            role.as_str(),
            address.stream_key(),
            endpoint.api_url,
            endpoint.transaction_id
        );

        let offer = self.create_local_offer(role).await?;

        let cancel_rx = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Closed {
                return Err(SignalingError::Cancelled);
            }
            inner.state = SessionState::OfferCreated;
            let (cancel_tx, cancel_rx) = oneshot::channel();
            inner.pending = Some(cancel_tx);
            inner.state = SessionState::AwaitingAnswer;
            cancel_rx
        };

        let request = OfferRequest::new(endpoint, address, &offer);
        debug!("Session {} offer: {:?}", self.id, request);

        let result = tokio::select! {
            _ = cancel_rx => Err(SignalingError::Cancelled),
            result = self.exchange_with_deadline(&endpoint.api_url, &request) => result,
        };

        {
            let mut inner = self.inner.lock();
            inner.pending = None;
            if inner.state == SessionState::Closed {
                return Err(SignalingError::Cancelled);
            }
        }

        let value = result.map_err(|e| {
            warn!("Session {} exchange failed: {}", self.id, e);
            e
        })?;
        debug!("Session {} answer: {}", self.id, value);

        let (answer, response) = match ExchangeResponse::decode(value)? {
            ExchangeResponse::Answer { sdp, extra } => (sdp, extra),
            ExchangeResponse::Rejected { code } => {
                self.transition(SessionState::AwaitingAnswer, SessionState::OfferCreated);
                warn!("Session {} rejected by server with code {}", self.id, code);
                return Err(SignalingError::SignalingRejected { code });
            }
        };

        {
            let mut guard = self.transport.lock().await;
            let transport = guard.as_mut().ok_or(SignalingError::Cancelled)?;
            transport.set_remote_description(&answer).await?;
        }

        {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Closed {
                return Err(SignalingError::Cancelled);
            }
            inner.state = SessionState::Established;
            inner.simulator_url = Some(endpoint.simulator_url.clone());
        }

        info!("Session {} established, simulator {}", self.id, endpoint.simulator_url);

        Ok(SessionHandle {
            session_id: self.id.clone(),
            api_url: endpoint.api_url.clone(),
            stream_url: address.url.clone(),
            schema: endpoint.api_schema,
            port: endpoint.port,
            transaction_id: endpoint.transaction_id.clone(),
            simulator_url: endpoint.simulator_url.clone(),
            local_sdp: offer,
            remote_sdp: answer,
            response,
        })
    }

    /// Close the session. Safe in any state, repeated calls are no-ops.
    pub async fn close(&self) -> Result<(), SignalingError> {
        let pending = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Closed {
                return Ok(());
            }
            debug!("Session {} state change: {:?} -> Closed", self.id, inner.state);
            inner.state = SessionState::Closed;
            inner.pending.take()
        };

        if let Some(cancel_tx) = pending {
            debug!("Session {} cancelling pending exchange", self.id);
            let _ = cancel_tx.send(());
        }

        let transport = self.transport.lock().await.take();
        if let Some(mut transport) = transport {
            transport.close().await?;
        }

        info!("Session {} closed", self.id);
        Ok(())
    }

    async fn create_local_offer(&self, role: Role) -> Result<String, SignalingError> {
        let mut guard = self.transport.lock().await;
        let transport = guard.as_mut().ok_or(SignalingError::Cancelled)?;

        match role {
            Role::Publish => {
                transport.add_transceiver(MediaKind::Audio, Direction::SendOnly).await?;
                transport.add_transceiver(MediaKind::Video, Direction::SendOnly).await?;
                transport.attach_local_media().await?;
            }
            Role::Play => {
                transport.add_transceiver(MediaKind::Audio, Direction::RecvOnly).await?;
                transport.add_transceiver(MediaKind::Video, Direction::RecvOnly).await?;
            }
        }

        let offer = transport.create_offer().await?;
        // Must be committed before the offer goes out, or ICE gathering races the exchange.
        transport.set_local_description(&offer).await?;
        Ok(offer)
    }

    async fn exchange_with_deadline(&self, api_url: &str, request: &OfferRequest) -> Result<Value, SignalingError> {
        let exchange = self.exchange.exchange(api_url, request);
        match self.options.exchange_timeout {
            Some(deadline) => tokio::time::timeout(deadline, exchange).await.map_err(|_| {
                SignalingError::Transport(format!("no answer from {} within {:?}", api_url, deadline))
            })?,
            None => exchange.await,
        }
    }

    fn transition(&self, from: SessionState, to: SessionState) {
        let mut inner = self.inner.lock();
        if inner.state == from {
            debug!("Session {} state change: {:?} -> {:?}", self.id, from, to);
            inner.state = to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webrtc::address::resolve;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    #[derive(Debug, Default, Clone)]
    struct TransportLog {
        transceivers: Vec<(MediaKind, Direction)>,
        media_attached: bool,
        local: Option<String>,
        remote: Option<String>,
        closed: bool,
    }

    /// Holds a transport step until released.
    #[derive(Default)]
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    impl Gate {
        async fn pass(&self) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    struct FakeTransport {
        name: String,
        log: Arc<Mutex<TransportLog>>,
        fail_media: bool,
        offer_gate: Option<Arc<Gate>>,
        answer_gate: Option<Arc<Gate>>,
    }

    impl FakeTransport {
        fn new(name: &str) -> (Self, Arc<Mutex<TransportLog>>) {
            let log = Arc::new(Mutex::new(TransportLog::default()));
            (
                Self {
                    name: name.to_string(),
                    log: log.clone(),
                    fail_media: false,
                    offer_gate: None,
                    answer_gate: None,
                },
                log,
            )
        }
    }

    #[async_trait]
    impl PeerTransport for FakeTransport {
        async fn add_transceiver(&mut self, kind: MediaKind, direction: Direction) -> Result<(), SignalingError> {
            self.log.lock().transceivers.push((kind, direction));
            Ok(())
        }

        async fn attach_local_media(&mut self) -> Result<(), SignalingError> {
            if self.fail_media {
                return Err(SignalingError::MediaAcquisition("no camera".to_string()));
            }
            self.log.lock().media_attached = true;
            Ok(())
        }

        async fn create_offer(&mut self) -> Result<String, SignalingError> {
            if let Some(gate) = &self.offer_gate {
                gate.pass().await;
            }
            Ok(format!("offer-{}", self.name))
        }

        async fn set_local_description(&mut self, sdp: &str) -> Result<(), SignalingError> {
            self.log.lock().local = Some(sdp.to_string());
            Ok(())
        }

        async fn set_remote_description(&mut self, sdp: &str) -> Result<(), SignalingError> {
            if let Some(gate) = &self.answer_gate {
                gate.pass().await;
            }
            self.log.lock().remote = Some(sdp.to_string());
            Ok(())
        }

        async fn close(&mut self) -> Result<(), SignalingError> {
            self.log.lock().closed = true;
            Ok(())
        }
    }

    /// Replies with a fixed JSON value and records requests.
    struct FakeExchange {
        reply: Result<Value, SignalingError>,
        requests: Mutex<Vec<OfferRequest>>,
        local_committed_first: Arc<Mutex<TransportLog>>,
        ordered: Mutex<bool>,
    }

    impl FakeExchange {
        fn new(reply: Result<Value, SignalingError>, log: Arc<Mutex<TransportLog>>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                requests: Mutex::new(Vec::new()),
                local_committed_first: log,
                ordered: Mutex::new(false),
            })
        }
    }

    #[async_trait]
    impl SignalingExchange for FakeExchange {
        async fn exchange(&self, _api_url: &str, request: &OfferRequest) -> Result<Value, SignalingError> {
            let local = self.local_committed_first.lock().local.clone();
            *self.ordered.lock() = local.as_deref() == Some(request.sdp.as_str());
            self.requests.lock().push(request.clone());
            self.reply.clone()
        }
    }

    /// Never answers until released.
    struct StalledExchange {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl SignalingExchange for StalledExchange {
        async fn exchange(&self, _api_url: &str, _request: &OfferRequest) -> Result<Value, SignalingError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(json!({"sdp": "late-answer"}))
        }
    }

    async fn wait_for_state<T: PeerTransport>(session: &SignalingSession<T>, state: SessionState) {
        while session.state() != state {
            tokio::task::yield_now().await;
        }
    }

    fn target(url: &str, role: Role) -> (SignalingEndpoint, StreamAddress) {
        resolve(url, role).unwrap()
    }

    #[tokio::test]
    async fn test_play_happy_path() {
        let (transport, log) = FakeTransport::new("a");
        let exchange = FakeExchange::new(Ok(json!({"code": 0, "sdp": "valid-answer", "sessionid": "s1"})), log.clone());
        let session = SignalingSession::new(transport, exchange.clone(), SessionOptions::default());
        let (endpoint, address) = target("webrtc://host/live/s", Role::Play);

        let handle = session.open(Role::Play, &endpoint, &address).await.unwrap();

        assert_eq!(session.state(), SessionState::Established);
        assert_eq!(log.lock().remote.as_deref(), Some("valid-answer"));
        assert_eq!(handle.remote_sdp, "valid-answer");
        assert_eq!(handle.local_sdp, "offer-a");
        assert_eq!(handle.api_url, "http://host:1985/rtc/v1/play/");
        assert_eq!(handle.stream_url, "webrtc://host/live/s");
        assert_eq!(handle.port, 1985);
        assert_eq!(handle.schema, PageSchema::Http);
        assert_eq!(handle.transaction_id, endpoint.transaction_id);
        assert_eq!(handle.simulator_url, "http://host:1985/rtc/v1/nack/");
        assert_eq!(handle.response["sessionid"], "s1");
        assert_eq!(session.simulator_url().as_deref(), Some("http://host:1985/rtc/v1/nack/"));

        let log = log.lock().clone();
        assert_eq!(
            log.transceivers,
            vec![(MediaKind::Audio, Direction::RecvOnly), (MediaKind::Video, Direction::RecvOnly)]
        );
        assert!(!log.media_attached);

        let requests = exchange.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tid, endpoint.transaction_id);
        assert_eq!(requests[0].sdp, "offer-a");
        assert!(requests[0].clientip.is_none());
    }

    #[tokio::test]
    async fn test_local_description_set_before_exchange() {
        let (transport, log) = FakeTransport::new("a");
        let exchange = FakeExchange::new(Ok(json!({"sdp": "answer"})), log.clone());
        let session = SignalingSession::new(transport, exchange.clone(), SessionOptions::default());

        session.play("webrtc://host/live/s").await.unwrap();
        assert!(*exchange.ordered.lock());
    }

    #[tokio::test]
    async fn test_publish_attaches_sendonly_media() {
        let (transport, log) = FakeTransport::new("p");
        let exchange = FakeExchange::new(Ok(json!({"sdp": "answer"})), log.clone());
        let session = SignalingSession::new(transport, exchange.clone(), SessionOptions::default());

        let handle = session.publish("webrtc://host/live/s").await.unwrap();
        assert_eq!(handle.api_url, "http://host:1985/rtc/v1/publish/");

        let log = log.lock().clone();
        assert!(log.media_attached);
        assert_eq!(
            log.transceivers,
            vec![(MediaKind::Audio, Direction::SendOnly), (MediaKind::Video, Direction::SendOnly)]
        );
    }

    #[tokio::test]
    async fn test_media_failure_stops_before_exchange() {
        let (mut transport, log) = FakeTransport::new("p");
        transport.fail_media = true;
        let exchange = FakeExchange::new(Ok(json!({"sdp": "answer"})), log);
        let session = SignalingSession::new(transport, exchange.clone(), SessionOptions::default());

        let err = session.publish("webrtc://host/live/s").await.unwrap_err();
        assert!(matches!(err, SignalingError::MediaAcquisition(_)));
        assert!(exchange.requests.lock().is_empty());
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_rejected_negotiation() {
        let (transport, log) = FakeTransport::new("a");
        let exchange = FakeExchange::new(Ok(json!({"code": 1062})), log.clone());
        let session = SignalingSession::new(transport, exchange, SessionOptions::default());

        let err = session.play("webrtc://host/live/s").await.unwrap_err();
        assert_eq!(err, SignalingError::SignalingRejected { code: 1062 });
        assert_eq!(session.state(), SessionState::OfferCreated);
        assert!(log.lock().remote.is_none());
        assert!(session.simulator_url().is_none());
    }

    #[tokio::test]
    async fn test_missing_sdp_is_protocol_error() {
        let (transport, log) = FakeTransport::new("a");
        let exchange = FakeExchange::new(Ok(json!({"code": 0, "server": "x"})), log);
        let session = SignalingSession::new(transport, exchange, SessionOptions::default());

        let err = session.play("webrtc://host/live/s").await.unwrap_err();
        assert!(matches!(err, SignalingError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_transport_error_leaves_awaiting_answer() {
        let (transport, log) = FakeTransport::new("a");
        let exchange = FakeExchange::new(Err(SignalingError::Transport("connection reset".to_string())), log);
        let session = SignalingSession::new(transport, exchange, SessionOptions::default());

        let err = session.play("webrtc://host/live/s").await.unwrap_err();
        assert!(matches!(err, SignalingError::Transport(_)));
        assert_eq!(session.state(), SessionState::AwaitingAnswer);

        // No retry, no reopen.
        let err = session.play("webrtc://host/live/s").await.unwrap_err();
        assert!(matches!(err, SignalingError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_exchange_deadline() {
        let (transport, _log) = FakeTransport::new("a");
        let exchange = Arc::new(StalledExchange {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let options = SessionOptions {
            exchange_timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let session = SignalingSession::new(transport, exchange, options);

        let err = session.play("webrtc://host/live/s").await.unwrap_err();
        assert!(matches!(err, SignalingError::Transport(_)));
        assert_eq!(session.state(), SessionState::AwaitingAnswer);
    }

    #[tokio::test]
    async fn test_close_during_exchange_cancels() {
        let (transport, log) = FakeTransport::new("a");
        let exchange = Arc::new(StalledExchange {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let session = Arc::new(SignalingSession::new(transport, exchange.clone(), SessionOptions::default()));

        let opening = {
            let session = session.clone();
            tokio::spawn(async move { session.play("webrtc://host/live/s").await })
        };

        exchange.entered.notified().await;
        assert_eq!(session.state(), SessionState::AwaitingAnswer);

        session.close().await.unwrap();
        let result = opening.await.unwrap();
        assert_eq!(result.unwrap_err(), SignalingError::Cancelled);
        assert_eq!(session.state(), SessionState::Closed);
        assert!(log.lock().closed);
        assert!(log.lock().remote.is_none());

        // Idempotent.
        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_close_during_offer_creation_cancels() {
        let (mut transport, log) = FakeTransport::new("a");
        let gate = Arc::new(Gate::default());
        transport.offer_gate = Some(gate.clone());
        let exchange = FakeExchange::new(Ok(json!({"sdp": "answer"})), log.clone());
        let session = Arc::new(SignalingSession::new(transport, exchange.clone(), SessionOptions::default()));

        let opening = {
            let session = session.clone();
            tokio::spawn(async move { session.play("webrtc://host/live/s").await })
        };
        gate.entered.notified().await;
        assert_eq!(session.state(), SessionState::Idle);

        // close() waits for the transport, which open() holds while the offer is built.
        let closing = {
            let session = session.clone();
            tokio::spawn(async move { session.close().await })
        };
        wait_for_state(&session, SessionState::Closed).await;
        gate.release.notify_one();

        assert_eq!(opening.await.unwrap().unwrap_err(), SignalingError::Cancelled);
        closing.await.unwrap().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(exchange.requests.lock().is_empty());
        assert!(log.lock().closed);
        assert!(log.lock().remote.is_none());
    }

    #[tokio::test]
    async fn test_close_while_applying_answer_cancels() {
        let (mut transport, log) = FakeTransport::new("a");
        let gate = Arc::new(Gate::default());
        transport.answer_gate = Some(gate.clone());
        let exchange = FakeExchange::new(Ok(json!({"sdp": "answer"})), log.clone());
        let session = Arc::new(SignalingSession::new(transport, exchange.clone(), SessionOptions::default()));

        let opening = {
            let session = session.clone();
            tokio::spawn(async move { session.play("webrtc://host/live/s").await })
        };
        gate.entered.notified().await;
        assert_eq!(session.state(), SessionState::AwaitingAnswer);

        let closing = {
            let session = session.clone();
            tokio::spawn(async move { session.close().await })
        };
        wait_for_state(&session, SessionState::Closed).await;
        gate.release.notify_one();

        assert_eq!(opening.await.unwrap().unwrap_err(), SignalingError::Cancelled);
        closing.await.unwrap().unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(session.simulator_url().is_none());
        assert_eq!(exchange.requests.lock().len(), 1);
        assert!(log.lock().closed);
    }

    #[tokio::test]
    async fn test_close_idle_session() {
        let (transport, log) = FakeTransport::new("a");
        let exchange = FakeExchange::new(Ok(json!({"sdp": "answer"})), log.clone());
        let session = SignalingSession::new(transport, exchange.clone(), SessionOptions::default());

        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(log.lock().closed);

        let err = session.play("webrtc://host/live/s").await.unwrap_err();
        assert!(matches!(err, SignalingError::InvalidState(_)));
        assert!(exchange.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_close_established_session() {
        let (transport, log) = FakeTransport::new("a");
        let exchange = FakeExchange::new(Ok(json!({"sdp": "answer"})), log.clone());
        let session = SignalingSession::new(transport, exchange, SessionOptions::default());

        session.play("webrtc://host/live/s").await.unwrap();
        session.close().await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
        assert!(log.lock().closed);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let (transport_a, log_a) = FakeTransport::new("a");
        let (transport_b, log_b) = FakeTransport::new("b");
        let exchange_a = FakeExchange::new(Ok(json!({"sdp": "answer-a"})), log_a.clone());
        let exchange_b = FakeExchange::new(Ok(json!({"sdp": "answer-b"})), log_b.clone());
        let session_a = SignalingSession::new(transport_a, exchange_a.clone(), SessionOptions::default());
        let session_b = SignalingSession::new(transport_b, exchange_b.clone(), SessionOptions::default());

        let (a, b) = tokio::join!(
            session_a.play("webrtc://host/live/a"),
            session_b.publish("webrtc://host/live/b"),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(session_a.state(), SessionState::Established);
        assert_eq!(session_b.state(), SessionState::Established);
        assert_eq!(log_a.lock().remote.as_deref(), Some("answer-a"));
        assert_eq!(log_b.lock().remote.as_deref(), Some("answer-b"));
        assert_eq!(exchange_a.requests.lock()[0].sdp, "offer-a");
        assert_eq!(exchange_b.requests.lock()[0].sdp, "offer-b");
        assert_ne!(a.session_id, b.session_id);
        assert_ne!(a.transaction_id, b.transaction_id);
    }
}
