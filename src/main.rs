use anyhow::Context;
use clap::{ArgAction, Parser};
use i2cniff::analyser::containers::Message;
use i2cniff::analyser::{assembler::PacketAssembler, core::ExpectationModel, grouper, utils};
use i2cniff::ui::{filter::MessageFilter, output};
use std::fs;
use std::path::{Path, PathBuf};

/// i2cniff scores I2C bus captures against what each address did before
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Logic analyser CSV exports to analyze
    #[arg(required = true, value_parser)]
    files: Vec<PathBuf>,

    /// Pair up write-read exchanges
    #[arg(short = 'g', long, action = ArgAction::SetTrue)]
    group_packets: bool,

    /// Score messages against the per-address model of expected behaviour
    #[arg(short = 's', long, action = ArgAction::SetTrue)]
    stateful_filter: bool,

    /// Only keep messages whose address matches this regular expression
    #[arg(short = 'a', long, value_parser)]
    address_re: Option<String>,

    /// Only keep messages whose data matches this regular expression
    #[arg(short = 'r', long, value_parser)]
    data_re: Option<String>,

    /// Print a timeline summary of runs of identical messages
    #[arg(short = 't', long, action = ArgAction::SetTrue)]
    output_timesummary: bool,

    /// Output timeline points as JSON
    #[arg(short = 'j', long, action = ArgAction::SetTrue)]
    output_json: bool,

    /// Directory to write JSON output to instead of stdout
    #[arg(short = 'o', long, value_parser)]
    output_dir: Option<PathBuf>,

    /// Print messages with colour and timing
    #[arg(short = 'p', long, action = ArgAction::SetTrue)]
    print_packets: bool,

    /// Print payloads without filtering, colour or timing
    #[arg(long, action = ArgAction::SetTrue)]
    dump_packets: bool,

    /// Don't print messages that were fully expected
    #[arg(long, action = ArgAction::SetTrue)]
    hide_known: bool,

    /// Don't write X.csv results to Xout.csv
    #[arg(long, action = ArgAction::SetTrue)]
    noout: bool,
}

fn process_file(path: &Path, args: &Args, filter: &MessageFilter) -> anyhow::Result<()> {
    log::info!("Processing {}", path.display());

    let rows = utils::load_file(path)
        .with_context(|| format!("Cannot load capture {}", path.display()))?;
    let packets = PacketAssembler::new()
        .assemble(&rows)
        .with_context(|| format!("Cannot assemble transactions in {}", path.display()))?;

    let mut messages: Vec<Message> = if args.group_packets {
        grouper::group_packets(packets)
    } else {
        grouper::singletons(packets)
    };

    if args.stateful_filter {
        messages = ExpectationModel::standard().rate_all(messages);
    }

    if !args.noout {
        let outpath = utils::output_path(path);
        output::save_messages(&outpath, &messages)
            .with_context(|| format!("Cannot write results to {}", outpath.display()))?;
    }

    let messages = filter.apply(messages);

    if args.output_timesummary {
        output::print_time_summary(&messages);
    }
    if args.output_json {
        let json = output::data_as_json(&output::timeline_points(&messages))?;
        match args.output_dir.as_deref() {
            Some(dir) => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                output::data_to_file(json, &dir.join(format!("{stem}_timeline.json")))?;
            }
            None => println!("{json}"),
        }
    }
    if args.dump_packets {
        output::dump_messages(&messages);
    }
    if args.print_packets {
        output::print_messages(&messages, args.hide_known);
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    simple_logger::init_with_env()?;

    let args = Args::parse();

    if let Some(out_dir) = args.output_dir.as_deref() {
        log::info!("Output directory {}", out_dir.display());
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Cannot create {}", out_dir.display()))?;
    }

    let filter = MessageFilter::new(args.address_re.as_deref(), args.data_re.as_deref())
        .context("Invalid filter expression")?;

    // Each capture gets its own assembler and model; nothing carries over between files.
    for path in &args.files {
        process_file(path, &args, &filter)?;
    }

    Ok(())
}
