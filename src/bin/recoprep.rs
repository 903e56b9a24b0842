/**
 * RecoPrep
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

#[macro_use]
extern crate log;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;
use std::time::Instant;

use getopts::Options;
use scoped_pool::Pool;

use recoprep::config::{DatasetConfig, PipelineConfig};
use recoprep::context::RunContext;
use recoprep::features::FeatureBounds;
use recoprep::io;
use recoprep::postprocessing::Pipeline;
use recoprep::utils;

fn main() {

    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("c", "config", "Configuration file (required). A JSON document listing the \
        datasets to load and the filtering stages to apply to each of them.", "PATH");
    opts.optopt("t", "threads", "Number of datasets to process in parallel (optional, defaults \
        to the number of CPUs).", "NUMBER");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        print_usage(&program, &opts, None);
        return;
    }

    let config_path = match matches.opt_str("c") {
        Some(path) => path,
        None => return print_usage_and_exit(
            &program,
            opts,
            Some("Please specify a configuration file via --config."),
        ),
    };

    let num_threads: usize = match matches.opt_get_default("t", num_cpus::get()) {
        Ok(num_threads) if num_threads > 0 => num_threads,
        Ok(_) => return print_usage_and_exit(
            &program, opts, Some("Problem with option 't': needs at least one thread")),
        Err(failure) => {
            let hint = format!("Problem with option 't': {}", failure.to_string());
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    let config = match PipelineConfig::from_json_file(&config_path) {
        Ok(config) => config,
        Err(error) => {
            error!("Unable to read configuration {}: {}", config_path, error);
            process::exit(1);
        },
    };

    let pipeline = match config.pipeline() {
        Ok(pipeline) => pipeline,
        Err(error) => {
            error!("Invalid stages in {}: {}", config_path, error);
            process::exit(1);
        },
    };

    let failures = prepare_datasets(&config, &pipeline, num_threads);

    if !failures.is_empty() {
        for (name, failure) in failures.iter() {
            error!("Dataset {} failed: {}", name, failure);
        }
        process::exit(1);
    }
}

/// Every dataset gets its own run context, the datasets share nothing but the pipeline.
fn prepare_datasets(
    config: &PipelineConfig,
    pipeline: &Pipeline,
    num_threads: usize,
) -> Vec<(String, String)> {

    let pool = Pool::new(num_threads);
    let failures = Mutex::new(Vec::new());

    pool.scoped(|scope| {
        for dataset_config in config.datasets.iter() {
            let failures = &failures;
            let bounds = config.feature_bounds;

            scope.execute(move || {
                if let Err(failure) = prepare_dataset(dataset_config, bounds, pipeline) {
                    let mut failures = match failures.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    failures.push((dataset_config.name.clone(), failure.to_string()));
                }
            });
        }
    });

    pool.shutdown();

    match failures.into_inner() {
        Ok(failures) => failures,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn prepare_dataset(
    config: &DatasetConfig,
    bounds: FeatureBounds,
    pipeline: &Pipeline,
) -> recoprep::Result<()> {

    let start = Instant::now();
    let mut ctx = RunContext::new();

    let dataset = io::load_dataset(config, bounds)?;
    let dataset = pipeline.run(dataset, &mut ctx)?;

    for warning in ctx.warnings().iter() {
        warn!("{}: {}", config.name, warning);
    }

    // Results go to <output>/<stage folders>/<name>.json
    let output_path = match config.output {
        Some(ref output) => {
            let folder = PathBuf::from(output).join(pipeline.subfolder());
            fs::create_dir_all(&folder)?;
            Some(folder.join(format!("{}.json", config.name)).to_string_lossy().into_owned())
        },
        None => None,
    };

    io::write_dataset(&dataset, output_path.as_ref().map(|path| path.as_str()))?;

    info!("Prepared {} in {}ms: {} users, {} items, {} interactions, content {:?}", config.name,
        utils::to_millis(start.elapsed()), dataset.num_users(), dataset.num_items(),
        dataset.num_interactions(), dataset.get_loaded_content_matrix_names());

    Ok(())
}

fn print_usage(program: &str, opts: &Options, hint: Option<&str>) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
}

fn print_usage_and_exit(program: &str, opts: Options, hint: Option<&str>) {
    print_usage(program, &opts, hint);
    process::exit(1);
}
