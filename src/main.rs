use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use log::{debug, info, warn};
use node_forge_shadergen::codegen::{
    ConcatAssembler, GenerationMode, GeneratorOptions, Precision, ShaderAssembler, ShaderStage,
    generate_from_source,
};
use node_forge_shadergen::dsl;
use serde::de::DeserializeOwned;

#[derive(Debug, Default, Clone)]
struct Cli {
    graph_json: Option<PathBuf>,
    config: Option<PathBuf>,
    mode: Option<GenerationMode>,
    precision: Option<Precision>,
    stage: Option<ShaderStage>,
    namespace: Option<String>,
    output: Option<PathBuf>,
}

const USAGE: &str = "supported: --graph-json <graph.json>, --config <options.json>, \
--mode preview|final, --precision float|half, --stage vertex|fragment, --namespace <name>, --output <file>";

/// Parse a lowercase option value through the same names the config file uses.
fn parse_value<T: DeserializeOwned>(flag: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| anyhow!("invalid value for {flag}: {value}"))
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        let flag = args[i].as_str();
        let Some(v) = args.get(i + 1) else {
            return Err(anyhow!("missing value for {flag} ({USAGE})"));
        };
        match flag {
            "--graph-json" => cli.graph_json = Some(PathBuf::from(v)),
            "--config" => cli.config = Some(PathBuf::from(v)),
            "--mode" => cli.mode = Some(parse_value(flag, v)?),
            "--precision" => cli.precision = Some(parse_value(flag, v)?),
            "--stage" => cli.stage = Some(parse_value(flag, v)?),
            "--namespace" => cli.namespace = Some(v.clone()),
            "--output" | "-o" => cli.output = Some(PathBuf::from(v)),
            other => return Err(anyhow!("unknown argument: {other} ({USAGE})")),
        }
        i += 2;
    }
    Ok(cli)
}

fn load_options(cli: &Cli) -> Result<GeneratorOptions> {
    let mut options = match cli.config.as_deref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read --config file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid generator options in {}", path.display()))?
        }
        None => GeneratorOptions::default(),
    };
    if let Some(mode) = cli.mode {
        options.mode = mode;
    }
    if let Some(precision) = cli.precision {
        options.precision = precision;
    }
    if let Some(stage) = cli.stage {
        options.stage = stage;
    }
    if let Some(namespace) = &cli.namespace {
        options.namespace = Some(namespace.clone());
    }
    Ok(options)
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;
    let Some(graph_path) = cli.graph_json.as_deref() else {
        bail!("--graph-json is required ({USAGE})");
    };

    let options = load_options(&cli)?;
    debug!("options: {options:?}");

    let graph = dsl::load_graph_from_path(graph_path)?;
    let fragment = generate_from_source(&graph, &options)
        .with_context(|| format!("failed to generate shader for {}", graph_path.display()))?;
    let shader = ConcatAssembler.assemble(std::slice::from_ref(&fragment));

    write_output(cli.output.as_deref(), &shader.source)?;

    if !shader.is_valid() {
        for diagnostic in &shader.diagnostics {
            eprintln!("[shadergen] {diagnostic}");
        }
        warn!("{} diagnostics; shader is invalid", shader.diagnostics.len());
        std::process::exit(1);
    }
    Ok(())
}
