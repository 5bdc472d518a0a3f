/*!
    Register level driver for the mechatrolink interface of hostmot2-like FPGA firmwares.

    The FPGA exposes each mechatrolink instance as a handful of 32 bit registers: data ports and FIFOs for each direction, a mode/status register and some user parameter registers. This crate frames messages into these registers ([transmit]), rebuilds received messages from them ([receive]), and gathers this in a per-instance [Link] driven cyclically by the application.

    Register accesses go through the [RegisterBus] trait, so the same code runs on a memory mapped card ([MappedBus]) or a software model ([SimulatedBus]).
*/

pub mod data;
pub mod registers;
pub mod error;
pub mod message;
pub mod bus;
pub mod transmit;
pub mod receive;
pub mod queue;
pub mod config;
pub mod discovery;
pub mod link;

pub use crate::data::{Register, RegisterData};
pub use crate::error::{LinkError, LinkResult, Interrupted};
pub use crate::message::{Message, Station, MAX_MESSAGE};
pub use crate::bus::*;
pub use crate::transmit::{transmit, Transmitted, MAX_BURST};
pub use crate::receive::{receive, Received, ReceiveBuffer, Frame};
pub use crate::queue::WriteQueue;
pub use crate::config::{UserParameters, ParameterPacking, LinkConfig, DiscoveryConfig};
pub use crate::discovery::{discover, ModuleDescriptor, Strides, DiscoveryContext, Instance, Instances};
pub use crate::link::{Link, Cycle};
