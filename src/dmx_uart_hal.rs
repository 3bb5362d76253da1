//! The hardware abstraction the transport core drives. Implementations
//! wrap a UART at 250000 baud 8-N-2 plus the RTS line of an RS485
//! transceiver, and own the BREAK/MAB timing and interrupt wiring.

/// State of the RS485 direction line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Driving the bus (transmit).
    Outbound,
    /// Listening on the bus (receive).
    Inbound,
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmxUartError<E> {
    /// The operation timed out.
    /// **Important:** If you implement a driver make sure this error gets
    /// raised instead of a driver specific error.
    TimeoutError,
    /// A driver specific error.
    DriverError(E),
}

impl<E: core::fmt::Display> core::fmt::Display for DmxUartError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DmxUartError::TimeoutError => write!(f, "timeout error occurred"),
            DmxUartError::DriverError(error) => error.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl<E: core::fmt::Display + core::fmt::Debug> std::error::Error for DmxUartError<E> {}

impl<E> From<E> for DmxUartError<E> {
    fn from(value: E) -> Self {
        Self::DriverError(value)
    }
}

/// Uart access for one DMX port. Timeouts are expressed in the ticks of
/// whatever scheduler the driver runs under; [DmxUartHal::millis_to_ticks]
/// translates protocol time budgets into that unit.
pub trait DmxUartHal {
    type Error;

    /// Current state of the direction line.
    fn rts(&mut self) -> Direction;

    /// Latch the direction line.
    fn set_rts(&mut self, direction: Direction);

    /// Transmit a frame preceded by a break and mark-after-break.
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), DmxUartError<Self::Error>>;

    /// Block until the transmitter is idle or `ticks` elapse.
    fn wait_sent(&mut self, ticks: u32) -> Result<(), DmxUartError<Self::Error>>;

    /// Block up to `ticks` for a complete inbound frame that starts with a
    /// break. Returns the number of bytes received.
    fn read_frames(
        &mut self,
        buffer: &mut [u8],
        ticks: u32,
    ) -> Result<usize, DmxUartError<Self::Error>>;

    /// Like [DmxUartHal::read_frames] but without waiting for a break;
    /// discovery responses carry none.
    fn read_frames_no_break(
        &mut self,
        buffer: &mut [u8],
        ticks: u32,
    ) -> Result<usize, DmxUartError<Self::Error>>;

    /// Convert a time budget into scheduler ticks.
    fn millis_to_ticks(&self, millis: u32) -> u32;
}
