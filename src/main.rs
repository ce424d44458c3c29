//! soxchain - libsox effects-chain runner

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::process;
use soxchain::processing::{LevelMeter, Pipeline};
use soxchain::{get_library_info, init_logging, Args, Config, Sox};

fn main() {
    let args = Args::parse();

    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let list_effects = args.list_effects;
    let levels = args.levels;
    let config = Config::from_args_and_config(args)?;

    if !list_effects && !config.input.path.exists() {
        bail!("Input file does not exist: {}", config.input.path.display());
    }

    let sox = Sox::init(&config.library).context("Failed to initialise libsox")?;

    if config.verbose() {
        println!("{}", get_library_info().with_libsox(&sox));
        println!("Library: {}", sox.library_path().display());
        println!();
    }

    if list_effects {
        print_effects(&sox);
    } else if levels {
        print_levels(&sox, &config)?;
    } else {
        process_file(&sox, config)?;
    }

    sox.quit()?;
    Ok(())
}

fn process_file(sox: &Sox, config: Config) -> Result<()> {
    if let Some(parent) = config.output.path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create output directory {}", parent.display()))?;
    }

    println!("=== soxchain Effects Chain ===");
    println!("Input: {}", config.input.path.display());
    println!("Output: {}", config.output.path.display());
    if config.effects.is_empty() {
        println!("Effects: (none)");
    } else {
        let effects: Vec<String> = config.effects.iter().map(|e| e.to_string()).collect();
        println!("Effects: {}", effects.join(", "));
    }
    println!("==============================\n");

    let pipeline = Pipeline::new(sox, config);
    let report = pipeline.run()?;

    println!("=== Processing Complete ===");
    println!("Chain: {}", report.summary.effects.join(" -> "));
    println!("Signal: {} -> {}", report.input_signal, report.output_signal);
    println!("Time: {:.2}s", report.processing_time.as_secs_f64());
    println!("RTF: {:.3}", report.real_time_factor());
    if report.clips() > 0 {
        println!("Clipped: {} sample(s)", report.clips());
    }
    Ok(())
}

fn print_levels(sox: &Sox, config: &Config) -> Result<()> {
    let mut input = sox.open_read(&config.input.path, &config.input.read_options())?;
    let meter = LevelMeter::new(config.block_size())?;

    println!("=== Levels: {} ({}) ===", input.label(), input.signal());
    let mut blocks = Vec::new();
    meter.for_each_block(&mut input, |block| {
        println!(
            "{:>6}  L {:>6.2}  R {:>6.2}",
            block.index, block.levels.left, block.levels.right
        );
        blocks.push(block);
    });
    input.close()?;

    let overall = LevelMeter::overall(&blocks);
    println!("=== {} block(s), peak L {:.2} R {:.2} ===", blocks.len(), overall.left, overall.right);
    Ok(())
}

fn print_effects(sox: &Sox) {
    let mut handlers = sox.effects();
    handlers.retain(|h| !h.flags().is_internal());
    handlers.sort_by_key(|h| h.name());

    println!("=== libsox {} effects ({}) ===", sox.version(), handlers.len());
    for handler in handlers {
        let flags = handler.flags();
        let mut notes = Vec::new();
        if flags.changes_rate() {
            notes.push("rate");
        }
        if flags.changes_channels() {
            notes.push("channels");
        }
        if flags.is_deprecated() {
            notes.push("deprecated");
        }

        let usage = handler.usage().unwrap_or_default();
        if notes.is_empty() {
            println!("{:<14} {}", handler.name(), usage);
        } else {
            println!("{:<14} {} [{}]", handler.name(), usage, notes.join(", "));
        }
    }
}
