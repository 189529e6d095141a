use std::fs;
use std::path::Path;

use log::debug;

use crate::error::SimError;
use crate::process::{Process, Vma};
use crate::rng::RandomSource;

/// One trace instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    ContextSwitch,
    Read,
    Write,
    Exit,
}

impl Op {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'c' => Some(Op::ContextSwitch),
            'r' => Some(Op::Read),
            'w' => Some(Op::Write),
            'e' => Some(Op::Exit),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Op::ContextSwitch => 'c',
            Op::Read => 'r',
            Op::Write => 'w',
            Op::Exit => 'e',
        }
    }
}

/// An opcode plus its argument: a process index for `c`/`e`, a virtual page
/// number for `r`/`w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    pub arg: usize,
}

/// Parsed contents of the trace file: the process set and the instruction
/// stream it executes.
#[derive(Debug)]
pub struct Workload {
    pub processes: Vec<Process>,
    pub instructions: Vec<Instruction>,
}

impl Workload {
    /// Parse a trace file, failing with the path on an unreadable file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| SimError::File {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let workload = Self::parse(&content)?;
        debug!(
            "loaded {} processes, {} instructions from {}",
            workload.processes.len(),
            workload.instructions.len(),
            path.as_ref().display()
        );
        Ok(workload)
    }

    /// Parse trace data from a string. Lines starting with `#` are comments
    /// and may appear at any position.
    pub fn parse(content: &str) -> Result<Self, SimError> {
        let mut lines = content.lines().filter(|line| !line.starts_with('#'));

        let proc_count = next_count(&mut lines, "process count")?;
        let mut processes = Vec::with_capacity(proc_count);
        for _ in 0..proc_count {
            let vma_count = next_count(&mut lines, "VMA count")?;
            let mut vmas = Vec::with_capacity(vma_count);
            for _ in 0..vma_count {
                let line = lines.next().ok_or(SimError::UnexpectedEof("input file"))?;
                vmas.push(parse_vma(line)?);
            }
            processes.push(Process::new(vmas));
        }

        let mut instructions = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            instructions.push(parse_instruction(line)?);
        }

        Ok(Workload {
            processes,
            instructions,
        })
    }
}

fn next_count<'a, I>(lines: &mut I, what: &'static str) -> Result<usize, SimError>
where
    I: Iterator<Item = &'a str>,
{
    let line = lines.next().ok_or(SimError::UnexpectedEof("input file"))?;
    parse_number(line.trim(), what)
}

fn parse_number(token: &str, what: &'static str) -> Result<usize, SimError> {
    token.parse().map_err(|_| SimError::Invalid {
        what,
        token: token.to_string(),
    })
}

/// One VMA line: `start_page end_page write_protected file_mapped`.
fn parse_vma(line: &str) -> Result<Vma, SimError> {
    let mut tokens = line.split_whitespace();
    let mut field = |what| {
        tokens
            .next()
            .ok_or(SimError::UnexpectedEof("VMA line"))
            .and_then(|token| parse_number(token, what))
    };
    Ok(Vma {
        start_page: field("VMA start page")?,
        end_page: field("VMA end page")?,
        write_protected: field("VMA write-protect bit")? != 0,
        file_mapped: field("VMA file-map bit")? != 0,
    })
}

/// One instruction line: `<op> <arg>`.
fn parse_instruction(line: &str) -> Result<Instruction, SimError> {
    let mut tokens = line.split_whitespace();
    let op_token = tokens
        .next()
        .ok_or(SimError::UnexpectedEof("instruction line"))?;
    let code = op_token.chars().next().ok_or(SimError::UnexpectedEof("instruction line"))?;
    let op = Op::from_code(code).ok_or(SimError::UnknownOpcode(code))?;
    let arg_token = tokens
        .next()
        .ok_or(SimError::UnexpectedEof("instruction line"))?;
    let arg = parse_number(arg_token, "instruction argument")?;
    Ok(Instruction { op, arg })
}

/// Read the random-number file: a count line, then that many value lines.
pub fn read_random_file<P: AsRef<Path>>(path: P) -> Result<RandomSource, SimError> {
    let content = fs::read_to_string(path.as_ref()).map_err(|source| SimError::File {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    let rng = parse_randoms(&content)?;
    debug!(
        "loaded {} random values from {}",
        rng.len(),
        path.as_ref().display()
    );
    Ok(rng)
}

/// Parse random-number data from a string.
pub fn parse_randoms(content: &str) -> Result<RandomSource, SimError> {
    let mut lines = content.lines();
    let count_line = lines.next().ok_or(SimError::UnexpectedEof("random file"))?;
    let count = parse_number(count_line.trim(), "random count")?;

    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let line = lines.next().ok_or(SimError::UnexpectedEof("random file"))?;
        let value: u64 = line.trim().parse().map_err(|_| SimError::Invalid {
            what: "random value",
            token: line.trim().to_string(),
        })?;
        values.push(value);
    }

    Ok(RandomSource::new(values))
}
