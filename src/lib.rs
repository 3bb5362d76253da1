//! Transport core for DMX512 (ANSI E1.11) and DMX-RDM (ANSI E1.20) over an
//! RS485 bus, built around interchangeable uart drivers. The crate packs
//! and unpacks RDM frames through a small format language, speaks the
//! discovery euid encoding and drives a half-duplex port through
//! request, turnaround and response classification. It is no-std and
//! no-alloc to target embedded as well as os platforms.
//!
//! Please refer to the [official specifications](https://tsp.esta.org/)
//! published by the ESTA.
//!
//! # Usage
//!
//! A port is the pairing of a [dmx_uart_hal::DmxUartHal] implementation
//! with the shared bus state. With a driver in place, discovering and
//! addressing responders looks like this:
//!
//! ```no_run
//! use dmx_rdm_bus::dmx_port::{DmxPort, DmxPortConfig};
//! use dmx_rdm_bus::dmx_uart_hal::{Direction, DmxUartError, DmxUartHal};
//! use dmx_rdm_bus::unique_identifier::Uid;
//! use dmx_rdm_bus::utils::run_full_discovery;
//!
//! struct MyUart;
//!
//! impl DmxUartHal for MyUart {
//!     type Error = ();
//!
//!     fn rts(&mut self) -> Direction {
//!         Direction::Inbound
//!     }
//!
//!     fn set_rts(&mut self, _direction: Direction) {}
//!
//!     fn send_frame(&mut self, _frame: &[u8]) -> Result<(), DmxUartError<()>> {
//!         Ok(())
//!     }
//!
//!     fn wait_sent(&mut self, _ticks: u32) -> Result<(), DmxUartError<()>> {
//!         Ok(())
//!     }
//!
//!     fn read_frames(&mut self, _buffer: &mut [u8], _ticks: u32) -> Result<usize, DmxUartError<()>> {
//!         Err(DmxUartError::TimeoutError)
//!     }
//!
//!     fn read_frames_no_break(
//!         &mut self,
//!         _buffer: &mut [u8],
//!         _ticks: u32,
//!     ) -> Result<usize, DmxUartError<()>> {
//!         Err(DmxUartError::TimeoutError)
//!     }
//!
//!     fn millis_to_ticks(&self, millis: u32) -> u32 {
//!         millis
//!     }
//! }
//!
//! let mut port: DmxPort<_> = DmxPort::new(MyUart, DmxPortConfig::default());
//!
//! // Unmute all rdm responders, then sweep the uid space.
//! port.rdm_disc_un_mute(Uid::BROADCAST_ALL).unwrap();
//!
//! let mut uid_array = [Uid::NULL; 32];
//! let devices_found = run_full_discovery(&mut port, &mut uid_array).unwrap();
//!
//! for device in &uid_array[..devices_found] {
//!     match port.rdm_set_identify(*device, true) {
//!         Ok(()) => println!("activated identify for {device}"),
//!         Err(error) => println!("identify for {device} failed with {error}"),
//!     }
//! }
//! ```
//!
//! Custom pids ride on [dmx_port::DmxPort::rdm_request] directly: fill an
//! [rdm_header::RdmHeader], serialize the parameter data with
//! [format::emplace] and match on the returned [types::RdmAck].

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod command_class;
pub mod consts;
/// Codec for the header-less DISC_UNIQUE_BRANCH response frames.
pub mod discovery;
/// The transaction engine and the typed controller requests.
pub mod dmx_controller;
/// One half-duplex bus: shared slot buffer, frame read/write and the
/// transaction state behind a critical section.
pub mod dmx_port;
/// Trait for hooking up uart hardware that behaves like a direct uart
/// device at 250000 baud.
pub mod dmx_uart_hal;
/// The parameter-data format mini-language shared by every wire codec in
/// the crate.
pub mod format;
pub mod pids;
pub mod rdm_header;
pub mod rdm_types;
pub mod types;
pub mod unique_identifier;
pub mod utils;
