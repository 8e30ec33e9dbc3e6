/// Hardware constants for supported receiver boards.
///
/// Selected at compile time via the `board-*` feature flags, which carry
/// no firmware dependencies so host tools can report the same board name.

#[cfg(feature = "board-xiao")]
mod hw {
    pub const HAS_PSRAM: bool = true;
    pub const BOARD_NAME: &str = "xiao_esp32s3";
}

#[cfg(all(feature = "board-m5stickc", not(feature = "board-xiao")))]
mod hw {
    pub const HAS_PSRAM: bool = false;
    pub const BOARD_NAME: &str = "m5stickc_plus2";
}

#[cfg(not(any(feature = "board-xiao", feature = "board-m5stickc")))]
mod hw {
    pub const HAS_PSRAM: bool = false;
    pub const BOARD_NAME: &str = "esp32_generic";
}

pub use hw::*;
