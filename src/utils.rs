use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::discovery::DiscoveryOption;
use crate::dmx_controller::RdmResponseError;
use crate::dmx_port::DmxPort;
use crate::dmx_uart_hal::DmxUartHal;
use crate::unique_identifier::Uid;

/// Blocking discovery sweep.
///
/// Works the uid space as a stack of pending ranges: a collision splits
/// the range at its midpoint, a lone responder is recorded and muted so
/// the rest of the sweep goes quiet around it. Broadcast a DISC_UN_MUTE
/// first ([DmxPort::rdm_disc_un_mute]) or previously muted devices stay
/// hidden.
///
/// Returns how many uids were written into `uid_array`. A full array means
/// the bus may hold more devices; since everything found so far is muted,
/// calling again continues the sweep.
///
/// The sweep blocks until the space is resolved, so on embedded targets
/// treat it as a reference for a polled implementation (section 7 of
/// ANSI E1.20 describes the state machine).
pub fn run_full_discovery<D: DmxUartHal, M: RawMutex>(
    port: &mut DmxPort<D, M>,
    uid_array: &mut [Uid],
) -> Result<usize, RdmResponseError<D::Error>> {
    // Splitting halves a range, so one path through the 48-bit space forks
    // at most 48 times and the stack never comes near this capacity.
    let mut pending: heapless::Vec<(u64, u64), 64> = heapless::Vec::new();
    let _ = pending.push((u64::from(Uid::new(0, 1)), u64::from(Uid::MAX_DEVICE)));

    let mut found = 0;
    while found < uid_array.len() {
        let Some((low, high)) = pending.pop() else {
            break;
        };

        match port.rdm_disc_unique_branch(Uid::from(low), Uid::from(high))? {
            DiscoveryOption::NoDevice => {},
            DiscoveryOption::Found(uid) => match port.rdm_disc_mute(uid) {
                Ok(_) => {
                    uid_array[found] = uid;
                    found += 1;
                },
                // The device answered the branch but lost the mute; leave
                // it for a later sweep instead of recording it unmuted.
                Err(RdmResponseError::InvalidResponse(_)) => {},
                Err(error) => return Err(error),
            },
            DiscoveryOption::Collision if low < high => {
                let midpoint = low + (high - low) / 2;
                let _ = pending.push((midpoint + 1, high));
                let _ = pending.push((low, midpoint));
            },
            // A single uid cannot be split further; the collision is
            // wire noise.
            DiscoveryOption::Collision => {},
        }
    }

    Ok(found)
}

#[inline]
pub(crate) fn calculate_checksum(data: &[u8]) -> u16 {
    let mut checksum = 0u16;

    for byte in data {
        checksum = checksum.wrapping_add(*byte as u16);
    }

    checksum
}
