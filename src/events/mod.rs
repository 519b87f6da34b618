//! # Events Module
//!
//! Progress events emitted while a pair or a batch is analyzed.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Pipeline(PipelineEvent::PhaseChanged { phase }) = event {
//!             println!("{}", phase);
//!         }
//!     }
//! });
//!
//! inspector.analyze_with_events(&reference, &target, Some(&boxes), &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
