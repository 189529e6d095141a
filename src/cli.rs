use std::path::PathBuf;

use clap::Parser;

use crate::constants::MAX_FRAMES;
use crate::error::SimError;
use crate::pager::Pager;

/// Trace-driven virtual-memory manager simulation.
#[derive(Debug, Parser)]
#[command(name = "mmu-sim")]
pub struct Cli {
    /// Number of physical frames to simulate (at most 128)
    #[arg(short = 'f', value_name = "NUM")]
    pub frames: usize,

    /// Replacement algorithm: f=FIFO r=Random c=Clock e=NRU a=Aging w=Working-Set
    #[arg(short = 'a', value_name = "ALGO", default_value = "f")]
    pub algorithm: String,

    /// Output options, a concatenation of O P F S x y f a
    #[arg(short = 'o', value_name = "OPTS", default_value = "")]
    pub options: String,

    /// Trace file: processes, their VMAs, and the instruction stream
    pub inputfile: PathBuf,

    /// Random-number table file
    pub randomfile: PathBuf,
}

impl Cli {
    /// Frame count, checked against the hard frame-table bound.
    pub fn validated_frames(&self) -> Result<usize, SimError> {
        if self.frames > MAX_FRAMES {
            Err(SimError::FrameCount(self.frames))
        } else {
            Ok(self.frames)
        }
    }

    /// Pager selected by the `-a` letter; FIFO when the flag is absent.
    pub fn pager(&self) -> Result<Pager, SimError> {
        let code = self.algorithm.chars().next().unwrap_or('f');
        Pager::from_code(code).ok_or(SimError::UnknownAlgorithm(code))
    }

    pub fn output_options(&self) -> Result<OutputOptions, SimError> {
        OutputOptions::parse(&self.options)
    }
}

/// Which output sections are enabled, from the `-o` option string.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutputOptions {
    /// `O`: per-reference trace lines
    pub verbose: bool,
    /// `P`: final page tables
    pub page_tables: bool,
    /// `F`: final frame table
    pub frame_table: bool,
    /// `S`: per-process and total statistics
    pub stats: bool,
    /// `x`: current process's page table after every instruction
    pub curr_pt: bool,
    /// `y`: every page table after every instruction
    pub all_pt: bool,
    /// `f`: frame table after every instruction
    pub curr_ft: bool,
    /// `a`: replacement-scan details
    pub aging_info: bool,
}

impl OutputOptions {
    pub fn parse(options: &str) -> Result<Self, SimError> {
        let mut opts = Self::default();
        for ch in options.chars() {
            match ch {
                'O' => opts.verbose = true,
                'P' => opts.page_tables = true,
                'F' => opts.frame_table = true,
                'S' => opts.stats = true,
                'x' => opts.curr_pt = true,
                'y' => opts.all_pt = true,
                'f' => opts.curr_ft = true,
                'a' => opts.aging_info = true,
                _ => return Err(SimError::UnknownOption(ch)),
            }
        }
        Ok(opts)
    }
}
