//! A DHCPv4 server whose leases come from an external backing store.
//!
//! Known clients receive administrator-authored configurations resolved per
//! request through the [`Backend`](backend/trait.Backend.html) trait;
//! unknown clients are ignored, NAK'd in authoritative mode, or handed to
//! the [`Hooks`](hooks/trait.Hooks.html) extension points. Responses travel
//! over plain UDP or, for clients that cannot yet be reached at layer 3,
//! as hand-built Ethernet frames.

pub mod backend;
pub mod cache;
pub mod config;
pub mod engine;
pub mod hooks;
pub mod netlink;
pub mod resolver;
pub mod suspend;

mod server;

extern crate bytes;
extern crate chrono;
extern crate eui48;
#[macro_use]
extern crate failure;
extern crate futures;
extern crate futures_cpupool;
extern crate hostname;
#[macro_use]
extern crate log;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
extern crate tokio;

extern crate framed;
extern crate protocol;
extern crate rawlink;

pub use backend::{Backend, BackendError, Definition, Null};
pub use config::{CacheConfig, Config, QinqTag};
pub use engine::{Engine, PacketType, PortClass, Reply, RequestMeta};
pub use hooks::{DefaultHooks, Hooks, Verdict};
pub use server::{ControlEvent, Server};
