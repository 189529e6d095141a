/// Virtual pages per process address space.
pub const MAX_VPAGES: usize = 64;

/// Upper bound on the simulated physical frame count.
pub const MAX_FRAMES: usize = 128;

/// Working-set window, in instructions.
pub const TAU: u64 = 49;

/// Instructions between NRU reference-bit resets.
pub const NRU_RESET_PERIOD: u64 = 48;

pub const LD_ST_TIME: u64 = 1;
pub const CTX_SWITCH_TIME: u64 = 130;
pub const PROC_EXIT_TIME: u64 = 1230;

pub const MAP_TIME: u64 = 350;
pub const UNMAP_TIME: u64 = 410;
pub const IN_TIME: u64 = 3200;
pub const OUT_TIME: u64 = 2750;
pub const FIN_TIME: u64 = 2350;
pub const FOUT_TIME: u64 = 2800;
pub const ZERO_TIME: u64 = 150;
pub const SEGV_TIME: u64 = 440;
pub const SEGPROT_TIME: u64 = 410;
