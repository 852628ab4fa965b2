//! toolgraph CLI binary: run the demo agent flow or print its graph.
//!
//! Subcommands: `run` (one query through the agent), `graph` (text or DOT rendering).

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cli::display::{format_event, format_run_error};
use cli::{engine_config, run_query, CliError, RunOptions};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use toolgraph::agent::compile_agent_graph;
use toolgraph::{generate_dot, generate_text};

const APP_NAME: &str = "toolgraph";

#[derive(Parser, Debug)]
#[command(name = "toolgraph")]
#[command(about = "toolgraph: run a tool-using agent graph from the CLI")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one query through the agent flow
    Run {
        /// User message
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,

        /// Print the result (answer, tool choice, trace, events) as JSON
        #[arg(long)]
        json: bool,

        /// Skip tool selection and call this tool
        #[arg(long, value_name = "TOOL")]
        force_tool: Option<String>,

        /// Step limit for this run (default: TOOLGRAPH_MAX_STEPS or config.toml)
        #[arg(
            long,
            value_name = "N",
            value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
        )]
        max_steps: Option<usize>,

        /// Print answer chunks as they arrive
        #[arg(long)]
        stream: bool,

        /// Print node events to stderr
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print the agent graph
    Graph {
        /// Graphviz DOT instead of text
        #[arg(long)]
        dot: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = config::load_and_apply(APP_NAME, None) {
        eprintln!("toolgraph: {}", e);
        return ExitCode::FAILURE;
    }
    let _log_guard = match config::tracing_init::init("warn") {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("toolgraph: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("toolgraph: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode, CliError> {
    match args.cmd {
        Command::Graph { dot } => {
            let graph = compile_agent_graph()?;
            if dot {
                print!("{}", generate_dot(&graph));
            } else {
                print!("{}", generate_text(&graph));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            query,
            json,
            force_tool,
            max_steps,
            stream,
            verbose,
        } => {
            let opts = RunOptions {
                query: query.join(" "),
                force_tool,
                max_steps,
                stream,
            };
            run_once(&opts, json, verbose).await
        }
    }
}

async fn run_once(opts: &RunOptions, json: bool, verbose: bool) -> Result<ExitCode, CliError> {
    let engine = engine_config(APP_NAME)?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    // Live chunks only make sense for human output.
    let (chunks, printer) = if opts.stream && !json {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let printer = tokio::spawn(async move {
            use std::io::Write;
            while let Some(chunk) = rx.recv().await {
                print!("{}", chunk);
                let _ = std::io::stdout().flush();
            }
        });
        (Some(tx), Some(printer))
    } else {
        (None, None)
    };

    let result = run_query(opts, engine, cancel, chunks).await;
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    match result {
        Ok(report) => {
            if verbose {
                for event in &report.events {
                    eprintln!("{}", format_event(event));
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if opts.stream {
                // The printer already wrote every chunk.
                println!();
            } else {
                println!("{}", report.output.answer.text);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            if verbose {
                for event in &failure.events {
                    eprintln!("{}", format_event(event));
                }
            }
            if let CliError::Agent(err) = &failure.error {
                eprintln!("{}", format_run_error(err));
                return Ok(if err.is_cancelled() {
                    ExitCode::from(130)
                } else {
                    ExitCode::FAILURE
                });
            }
            Err(failure.error)
        }
    }
}
