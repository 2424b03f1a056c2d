//! `dist-opt`: runs the dist dialect elimination pass on textual IR.

mod cli;

use std::io::{Read, Write};
use std::rc::Rc;

use clap::Parser;
use cli::Cli;
use dist_elim::{DistElimPass, TracingObserver};
use dist_ir::IrContext;
use dist_ir::parser::parse_module;
use dist_ir::printer::print_module;
use dist_ir::validation::validate_module;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(message) = run(&cli) {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(cli: &Cli) -> Result<(String, String), String> {
    match cli.input_path() {
        Some(path) => std::fs::read_to_string(path)
            .map(|text| (path.display().to_string(), text))
            .map_err(|e| format!("cannot read {}: {e}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("cannot read stdin: {e}"))?;
            Ok(("<stdin>".to_owned(), text))
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let (source_name, text) = read_input(cli)?;

    let mut ctx = IrContext::new();
    let module = parse_module(&mut ctx, &text).map_err(|e| format!("{source_name}: {e}"))?;

    if cli.verify() {
        let result = validate_module(&ctx, module);
        if !result.is_ok() {
            return Err(format!("{source_name}: input IR is invalid:\n{result}"));
        }
    }

    let pass = DistElimPass::new(cli.elim_config()).with_observer(Rc::new(TracingObserver));
    let stats = pass
        .run(&mut ctx, module)
        .map_err(|e| format!("{} failed [{}]: {e}", DistElimPass::NAME, e.reason()))?;
    tracing::info!(
        visited = stats.visited,
        rewrites = stats.total(),
        "{source_name}: done"
    );

    let printed = print_module(&ctx, module.op_ref());
    match &cli.output {
        Some(path) => std::fs::write(path, printed)
            .map_err(|e| format!("cannot write {}: {e}", path.display())),
        None => std::io::stdout()
            .write_all(printed.as_bytes())
            .map_err(|e| format!("cannot write stdout: {e}")),
    }
}
