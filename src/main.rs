use std::io::{self, BufWriter, Write};
use std::process;

use clap::Parser;
use log::debug;

use mmu_sim::cli::Cli;
use mmu_sim::io::{read_random_file, Workload};
use mmu_sim::{Mmu, SimError};

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), SimError> {
    let num_frames = cli.validated_frames()?;
    let pager = cli.pager()?;
    let opts = cli.output_options()?;

    let workload = Workload::from_file(&cli.inputfile)?;
    let rng = read_random_file(&cli.randomfile)?;
    debug!(
        "simulating {num_frames} frames, {:?} replacement",
        pager
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut mmu = Mmu::new(num_frames, workload.processes, pager, rng, opts, &mut out);
    mmu.run(&workload.instructions)?;
    mmu.write_summary()?;
    drop(mmu);
    out.flush()?;
    Ok(())
}
