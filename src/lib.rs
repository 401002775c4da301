//! Typed entities and event dispatch for the Asterisk REST Interface (ARI)
//!
//! This crate turns the loosely-typed JSON that Asterisk sends over the ARI
//! WebSocket and returns from REST calls into immutable, strongly-typed
//! snapshots, and routes events to handlers registered per event type.
//! Transport is out of scope: bring your own WebSocket or HTTP client and feed
//! its text frames in.
//!
//! # Architecture
//!
//! - [`payload`]: raw message decoding and the [`FromPayload`] projection trait
//! - [`channel`] / [`resources`]: entity snapshots ([`Channel`], [`Bridge`], ...)
//! - [`event`]: the [`AriEvent`] sum type with a [`GenericEvent`] fallback
//! - [`router`]: [`EventRouter`], handler registration and synchronous dispatch
//! - [`pump`]: async loop draining an mpsc queue into a router
//!
//! # Examples
//!
//! ## Projecting an event
//!
//! ```rust
//! use asterisk_ari_events::{project_event, AriEvent};
//!
//! let event = project_event(r#"{
//!     "type": "StasisStart",
//!     "application": "demo",
//!     "channel": {"id": "1", "name": "SIP/foo-1", "state": "Up",
//!                 "caller": {"name": "Alice", "number": "100"}},
//!     "args": ["dialed"]
//! }"#).unwrap();
//!
//! match event {
//!     AriEvent::StasisStart(start) => {
//!         assert_eq!(start.channel().caller().unwrap().name(), "Alice");
//!         assert_eq!(start.args(), ["dialed"]);
//!     }
//!     other => panic!("unexpected {}", other.type_name()),
//! }
//! ```
//!
//! ## Projecting a REST response
//!
//! ```rust
//! use asterisk_ari_events::{project_list, project_response, Bridge, Channel};
//!
//! let channel: Channel =
//!     project_response(r#"{"id":"1","name":"SIP/foo-1","state":"Ring"}"#).unwrap();
//! assert_eq!(channel.state(), "Ring");
//!
//! let bridges: Vec<Bridge> = project_list(
//!     r#"[{"id":"b1","technology":"simple_bridge","bridge_type":"mixing","channels":[]}]"#,
//! ).unwrap();
//! assert_eq!(bridges[0].technology(), "simple_bridge");
//! ```
//!
//! ## Routing events
//!
//! ```rust
//! use std::sync::Arc;
//! use asterisk_ari_events::{pump, ChannelDtmfReceived, EventRouter};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let router = Arc::new(EventRouter::new());
//!     router.on(|dtmf: &ChannelDtmfReceived| {
//!         println!("{} pressed {}", dtmf.channel().name(), dtmf.digit());
//!         Ok(())
//!     });
//!     router.on_any(|event| {
//!         println!("saw {}", event.type_name());
//!         Ok(())
//!     });
//!
//!     let (tx, rx) = pump::default_channel();
//!     let pump = pump::spawn(router, rx);
//!
//!     // In a real application these come from the ARI WebSocket.
//!     tx.send(r#"{"type":"ChannelDtmfReceived","digit":"5","duration_ms":100,
//!                 "channel":{"id":"1","name":"SIP/foo-1","state":"Up"}}"#).await;
//!     drop(tx);
//!
//!     let stats = pump.await.unwrap();
//!     assert_eq!(stats.dispatched, 1);
//! }
//! ```

#[macro_use]
mod macros;

pub mod channel;
pub mod constants;
pub mod error;
pub mod event;
pub mod payload;
pub mod pump;
pub mod resources;
pub mod router;

pub use channel::{CallerId, Channel, ChannelState, DialplanCep, ParseChannelStateError};
pub use error::{
    AriError, AriResult, HandlerError, HandlerFailure, JsonShape, MalformedKind,
    MalformedPayloadError,
};
pub use event::{
    project_event, AriEvent, AriEventType, BridgeDestroyed, BridgeMerged, ChannelCallerId,
    ChannelDestroyed, ChannelDtmfReceived, ChannelHangupRequest, ChannelVarset, Dial,
    EventMetadata, EventVariant, GenericEvent, ParseEventTypeError, PlaybackFinished, StasisEnd,
    StasisStart,
};
pub use payload::{
    project_list, project_response, AriMessage, FromPayload, PayloadFields, RawMessage,
};
pub use pump::{PumpSender, PumpStats};
pub use resources::{
    Application, Bridge, BridgeType, Endpoint, EndpointState, EventFilter, ParseBridgeTypeError,
    ParseEndpointStateError, ParsePlaybackStateError, Playback, PlaybackState,
};
pub use router::{DispatchReport, EventRouter, RouterOptions, SubscriptionId, UnknownEventPolicy};
