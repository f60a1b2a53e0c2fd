#![forbid(unsafe_code)]

//! FrankenScroll demo binary entry point.

use fscroll_demo::{cli, logging, session};

fn main() {
    let opts = cli::Opts::parse();
    logging::init();

    let config = match session::load_config(opts.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(
        items_per_page = config.items_per_page(),
        max_live_items = config.max_live_items(),
        item_height = config.item_height(),
        "starting demo session"
    );

    let json = opts.json;
    let result = session::run(config, &opts, |line| {
        if json {
            match serde_json::to_string(line) {
                Ok(text) => println!("{text}"),
                Err(e) => tracing::warn!("failed to encode step line: {e}"),
            }
        } else {
            println!("{line}");
        }
    });

    match result {
        Ok(report) => {
            if !json {
                println!(
                    "fetches {}  snapshots {}  settled {}",
                    report.fetches, report.snapshots, report.settled
                );
            }
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
