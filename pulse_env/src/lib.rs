//! Pulse Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the heartbeat simulator
//! run against the **Production** environment (tokio + a real UDP socket) or
//! a **Simulation** environment (virtual clock + recording sink).
//!
//! # Intercepted I/O
//!
//! - Time (`now()`, `sleep()`)
//! - Randomness (`random_in()`)
//! - Process identity (`pid()`)
//! - Datagram emission (`DatagramSink::send()`)
//!
//! # Example
//!
//! ```ignore
//! use pulse_env::{PulseContext, DatagramSink};
//!
//! async fn beat<Ctx: PulseContext, Sink: DatagramSink>(ctx: &Ctx, sink: &Sink) {
//!     loop {
//!         let _ = sink.send(format!("p{}", ctx.pid()).as_bytes()).await;
//!         ctx.sleep(Duration::from_secs(ctx.random_in(10, 15))).await;
//!     }
//! }
//! ```

mod context;
mod error;
mod sink;
mod tokio_impl;
mod udp;

pub use context::PulseContext;
pub use error::EnvError;
pub use sink::DatagramSink;
pub use tokio_impl::TokioContext;
pub use udp::UdpSink;
