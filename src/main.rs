use clap::{App, Arg};
use hmmfix::aligner::ClustalOmega;
use hmmfix::alignment::{AlignedSequence, Profile};
use hmmfix::{CorrectionConfig, CorrectionError};
use std::io::{BufWriter, Write};
#[macro_use]
extern crate log;

fn app() -> App<'static, 'static> {
    App::new("hmmfix")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Profile(aligned FASTA)xQueries(FASTA)->Corrected queries(FASTA)")
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Verbosity. -v shows per-record progress."),
        )
        .arg(
            Arg::with_name("file_in_good")
                .long("file_in_good")
                .value_name("FASTA")
                .takes_value(true)
                .help("Trusted reference sequences, aligned to each other."),
        )
        .arg(
            Arg::with_name("file_in_bad")
                .long("file_in_bad")
                .value_name("FASTA")
                .takes_value(true)
                .help("Sequences to be corrected."),
        )
        .arg(
            Arg::with_name("file_out")
                .long("file_out")
                .value_name("FASTA")
                .takes_value(true)
                .help("Output file."),
        )
        .arg(
            Arg::with_name("clustalo")
                .long("clustalo")
                .takes_value(true)
                .default_value("clustalo")
                .help("Path to the Clustal Omega binary."),
        )
        .arg(
            Arg::with_name("max_states")
                .long("max_states")
                .takes_value(true)
                .default_value("1000000")
                .help("Skip queries whose model has more states than this."),
        )
        .arg(
            Arg::with_name("report")
                .long("report")
                .value_name("JSON")
                .takes_value(true)
                .help("Write a summary of each corrected query."),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .short("t")
                .takes_value(true)
                .default_value("1")
                .help("Number of threads"),
        )
}

fn parse_arg<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str) -> Option<T> {
    let value = matches.value_of(name)?;
    match value.parse() {
        Ok(res) => Some(res),
        Err(_) => {
            eprintln!("Invalid value for --{}: {}", name, value);
            None
        }
    }
}

fn run(
    good: &str,
    bad: &str,
    out: &str,
    report: Option<&str>,
    aligner: &ClustalOmega,
    config: &CorrectionConfig,
) -> Result<(), CorrectionError> {
    let rows: Vec<_> = hmmfix::fasta::read_fasta(good)?
        .into_iter()
        .map(AlignedSequence::from)
        .collect();
    let profile = Profile::new(rows)?;
    debug!("Profile: {} rows, width {}", profile.len(), profile.width());
    let queries = hmmfix::fasta::read_fasta(bad)?;
    debug!("{} queries", queries.len());
    let mut wtr = std::fs::File::create(out).map(BufWriter::new)?;
    let corrected = hmmfix::correct_all(&profile, &queries, aligner, config)?;
    let records: Vec<_> = corrected.iter().map(|c| c.record.clone()).collect();
    hmmfix::fasta::write_fasta(&mut wtr, &records)?;
    wtr.flush()?;
    info!("Wrote {} of {} queries to {}", records.len(), queries.len(), out);
    if let Some(report) = report {
        let summaries: Vec<_> = corrected.iter().map(|c| &c.summary).collect();
        let mut wtr = std::fs::File::create(report).map(BufWriter::new)?;
        serde_json::to_writer_pretty(&mut wtr, &summaries).map_err(std::io::Error::from)?;
        wtr.flush()?;
    }
    Ok(())
}

fn main() {
    let matches = app().get_matches();
    let level = match matches.occurrences_of("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let (good, bad, out) = match (
        matches.value_of("file_in_good"),
        matches.value_of("file_in_bad"),
        matches.value_of("file_out"),
    ) {
        (Some(good), Some(bad), Some(out)) => (good, bad, out),
        _ => {
            println!("{}", matches.usage());
            return;
        }
    };
    let (threads, max_states) = match (
        parse_arg::<usize>(&matches, "threads"),
        parse_arg::<usize>(&matches, "max_states"),
    ) {
        (Some(threads), Some(max_states)) => (threads, max_states),
        _ => {
            println!("{}", matches.usage());
            std::process::exit(1);
        }
    };
    if let Err(why) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        debug!("{:?} The global pool is already set. This is Harmless.", why);
    }
    let config = CorrectionConfig::new(max_states, threads);
    let aligner = matches
        .value_of("clustalo")
        .map(ClustalOmega::new)
        .unwrap_or_default();
    debug!("Start");
    if let Err(why) = run(good, bad, out, matches.value_of("report"), &aligner, &config) {
        error!("{}", why);
        std::process::exit(1);
    }
}
