//! Home-automation objects over CAN.
//!
//! Each [`Node`] maps application objects (indications, measured values,
//! commands and set points) to CAN frames. Outgoing reports carry a
//! timestamp and pass through a bounded queue. Incoming frames are handed
//! over by the driver through a [`Mailbox`] and decoded on the next
//! [`refresh`](Node::refresh).
//!
//! ```ignore
//! static MAILBOX: Mailbox<CriticalSectionRawMutex> = Mailbox::new(Config::new(IdKind::Standard));
//!
//! let mut on_relay = |state: bool| relay.set_state(state.into()).ok();
//! let mut relays = [Control::<SingleCommand>::new(0x01, &mut on_relay)];
//! let mut temperatures = [Report::<MeasuredValue16>::new(0x10, 0)];
//!
//! let registry = Registry::new()
//!     .with_single_commands(&mut relays)
//!     .with_measured_values16(&mut temperatures);
//!
//! let mut node = Node::new(&MAILBOX, registry, || rtc.unix_seconds())?;
//!
//! node.write_measured_value16(0, 2153)?;
//! node.run(&mut can, &mut Delay, 10).await
//! ```

#![no_std]

// must come first so the logging macros are visible to every module
pub(crate) mod fmt;

pub mod class;
pub mod codec;
pub mod config;
pub mod driver;
pub mod error;
pub mod frame;
pub mod frame_queue;
pub mod mailbox;
pub mod node;
pub mod object;
pub mod registry;
pub mod time;

pub use can_ha_payload as payload;

pub use class::{
    DoubleCommand, DoubleIndication, DoubleState, Inbound, MeasuredValue16, MeasuredValue32,
    Outbound, SetPoint16, SetPoint32, SingleCommand, SingleIndication,
};
pub use codec::Stamped;
pub use config::Config;
pub use driver::Driver;
pub use frame::{Frame, FrameKind, IdKind, MessageType};
pub use mailbox::{Mailbox, Stats};
pub use node::Node;
pub use object::{Control, Report};
pub use registry::{Dispatch, Registry};
pub use time::Clock;
