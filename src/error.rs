use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::constants::MAX_FRAMES;

/// Fatal conditions that abort the run. Everything the simulated program can
/// cause (SEGV, SEGPROT) is an in-simulation event, not an error.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("cannot open {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("number of frames {0} exceeds the maximum of {max}", max = MAX_FRAMES)]
    FrameCount(usize),

    #[error("Unknown Replacement Algorithm: {0}")]
    UnknownAlgorithm(char),

    #[error("unknown output option '{0}'")]
    UnknownOption(char),

    #[error("unknown opcode '{0}' in instruction stream")]
    UnknownOpcode(char),

    #[error("invalid {what}: {token}")]
    Invalid {
        what: &'static str,
        token: String,
    },

    #[error("unexpected end of {0}")]
    UnexpectedEof(&'static str),

    #[error("write error: {0}")]
    Output(#[from] io::Error),
}
