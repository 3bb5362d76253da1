//! The parameter ids the crate itself touches. The full ANSI E1.20 catalog
//! lives with the application.

pub const DISC_UNIQUE_BRANCH: u16 = 0x0001;
pub const DISC_MUTE: u16 = 0x0002;
pub const DISC_UN_MUTE: u16 = 0x0003;

pub const DEVICE_INFO: u16 = 0x0060;
pub const SOFTWARE_VERSION_LABEL: u16 = 0x00C0;
pub const DMX_START_ADDRESS: u16 = 0x00F0;
pub const IDENTIFY_DEVICE: u16 = 0x1000;
