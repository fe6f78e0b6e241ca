/// Bus address with AD0 tied low
pub const DEFAULT_ADDRESS: u8 = 0x68;
/// Bus address with AD0 tied high
pub const ALTERNATE_ADDRESS: u8 = 0x69;

/// Content of WHO_AM_I on a genuine MPU6050
pub const WHO_AM_I_VALUE: u8 = 0x68;

/// PWR_MGMT_1 after power-on: asleep, internal oscillator
pub const PWR_MGMT_1_RESET: u8 = 0x40;
pub const PWR_MGMT_1_SLEEP: u8 = 0x40;

// Default configuration written during init
pub const PWR_MGMT_1_AWAKE: u8 = 0x00; // no sleep, cycle off, temperature sensor on
pub const SMPLRT_DIV_DEFAULT: u8 = 0x07; // 8 kHz / (1 + 7) = 1 kHz
pub const CONFIG_DEFAULT: u8 = 0x00; // DLPF off: accel 260 Hz, gyro 256 Hz
pub const GYRO_CONFIG_DEFAULT: u8 = 0x00; // +/- 250 dps
pub const ACCEL_CONFIG_DEFAULT: u8 = 0x00; // +/- 2 g

/// Register addresses for the MPU6050
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    SmplrtDiv = 0x19,
    Config = 0x1A,
    GyroConfig = 0x1B,
    AccelConfig = 0x1C,
    AccelXoutH = 0x3B,
    AccelXoutL = 0x3C,
    AccelYoutH = 0x3D,
    AccelYoutL = 0x3E,
    AccelZoutH = 0x3F,
    AccelZoutL = 0x40,
    TempOutH = 0x41,
    TempOutL = 0x42,
    PwrMgmt1 = 0x6B,
    WhoAmI = 0x75,
}

impl Register {
    pub const fn addr(self) -> u8 {
        self as u8
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}
