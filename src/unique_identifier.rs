/// A 48-bit RDM unique identifier, split into the ESTA-assigned
/// manufacturer id and a device id.
/// [more information](https://tsp.esta.org/tsp/working_groups/CP/mfctrIDs.php)
///
/// Unlike a plain device address, a `Uid` may also hold the broadcast and
/// null sentinels that appear in frame headers and discovery ranges; use
/// [Uid::is_null], [Uid::is_broadcast] and [Uid::is_target] to classify.
///
/// The derived ordering is lexicographic on `(manufacturer_id, device_id)`,
/// which is the ordering the discovery binary search relies on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Uid {
    manufacturer_id: u16,
    device_id: u32,
}

impl Uid {
    /// The null uid, `0000:00000000`. Used as a placeholder source address
    /// and as the "absent" value of optional uid fields.
    pub const NULL: Uid = Uid::new(0x0000, 0x00000000);

    /// Broadcast to all devices of all manufacturers.
    pub const BROADCAST_ALL: Uid = Uid::new(0xFFFF, 0xFFFFFFFF);

    /// The largest non-broadcast uid, the upper bound of a full discovery
    /// sweep.
    pub const MAX_DEVICE: Uid = Uid::new(0xFFFF, 0xFFFFFFFE);

    pub const fn new(manufacturer_id: u16, device_id: u32) -> Self {
        Self {
            manufacturer_id,
            device_id,
        }
    }

    /// Broadcast to all devices of one manufacturer.
    pub const fn manufacturer_broadcast(manufacturer_id: u16) -> Self {
        Self::new(manufacturer_id, 0xFFFFFFFF)
    }

    pub fn manufacturer_id(&self) -> u16 {
        self.manufacturer_id
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    pub fn is_null(&self) -> bool {
        self.manufacturer_id == 0 && self.device_id == 0
    }

    /// True for [Uid::BROADCAST_ALL] as well as manufacturer broadcasts.
    pub fn is_broadcast(&self) -> bool {
        self.device_id == 0xFFFFFFFF
    }

    /// True if a frame addressed to `alias` is meant for this uid: either
    /// an exact match or a broadcast covering this uid's manufacturer.
    pub fn is_target(&self, alias: &Uid) -> bool {
        ((alias.manufacturer_id == 0xFFFF || alias.manufacturer_id == self.manufacturer_id)
            && alias.device_id == 0xFFFFFFFF)
            || self == alias
    }

    /// The on-wire form: manufacturer id then device id, big-endian.
    pub fn to_bytes(&self) -> [u8; 6] {
        let mut buffer = [0u8; 6];
        buffer[..2].copy_from_slice(&self.manufacturer_id.to_be_bytes());
        buffer[2..].copy_from_slice(&self.device_id.to_be_bytes());
        buffer
    }

    pub fn from_bytes(buffer: &[u8; 6]) -> Self {
        Self {
            manufacturer_id: u16::from_be_bytes(buffer[0..2].try_into().unwrap()),
            device_id: u32::from_be_bytes(buffer[2..6].try_into().unwrap()),
        }
    }

    /// The host-order image the format codec operates on; the `u`/`v`
    /// tokens byte-swap between this and [Uid::to_bytes].
    pub fn to_le_bytes(&self) -> [u8; 6] {
        let mut buffer = [0u8; 6];
        buffer[..2].copy_from_slice(&self.manufacturer_id.to_le_bytes());
        buffer[2..].copy_from_slice(&self.device_id.to_le_bytes());
        buffer
    }

    pub fn from_le_bytes(buffer: &[u8; 6]) -> Self {
        Self {
            manufacturer_id: u16::from_le_bytes(buffer[0..2].try_into().unwrap()),
            device_id: u32::from_le_bytes(buffer[2..6].try_into().unwrap()),
        }
    }
}

impl core::fmt::Display for Uid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04X}:{:08X}", self.manufacturer_id, self.device_id)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Uid {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{:04X}:{:08X}", self.manufacturer_id, self.device_id);
    }
}

impl From<Uid> for u64 {
    fn from(value: Uid) -> Self {
        ((value.manufacturer_id as u64) << u32::BITS) | value.device_id as u64
    }
}

impl From<u64> for Uid {
    /// Truncates to the low 48 bits.
    fn from(value: u64) -> Self {
        Self {
            manufacturer_id: (value >> u32::BITS) as u16,
            device_id: (value & u32::MAX as u64) as u32,
        }
    }
}
