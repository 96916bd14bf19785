use std::{env, path::PathBuf, process::ExitCode};

use dartgen::{render_dart, write_output, Engine, EngineConfig, PrefixResolver, TypeModel};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Dart,
    Json,
}

#[derive(Debug)]
struct GenerateOptions {
    format: OutputFormat,
    output: Option<PathBuf>,
    prereserved: Vec<String>,
    common_converter_path: Option<String>,
    external_rules: Vec<(String, String)>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    if args.len() < 3 {
        return Err("not enough arguments".to_string());
    }

    let command = args[1].as_str();
    let file = PathBuf::from(&args[2]);

    match command {
        "generate" => {
            let options = parse_generate_options(&args[3..])?;
            run_generate(&file, options)
        }
        _ => Err(format!("unknown command '{command}'")),
    }
}

fn run_generate(file: &PathBuf, options: GenerateOptions) -> Result<(), String> {
    let model = TypeModel::from_path(file).map_err(|e| e.to_string())?;

    let config = EngineConfig {
        prereserved: options.prereserved,
        common_converter_path: options.common_converter_path,
    };
    let resolver = options
        .external_rules
        .into_iter()
        .fold(PrefixResolver::new(), |resolver, (prefix, path)| {
            resolver.with_rule(prefix, path)
        });
    let mut engine = Engine::with_config(model, config);
    if !resolver.is_empty() {
        engine = engine.with_external_resolver(resolver);
    }

    let unit = engine.generate().map_err(|e| e.to_string())?;
    let rendered = match options.format {
        OutputFormat::Dart => render_dart(&unit),
        OutputFormat::Json => unit.to_json_string(true).map_err(|e| e.to_string())?,
    };

    match options.output {
        Some(path) => {
            write_output(&path, &rendered)
                .map_err(|e| format!("failed to write '{}': {e}", path.display()))?;
            eprintln!("wrote: {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn parse_generate_options(args: &[String]) -> Result<GenerateOptions, String> {
    let mut options = GenerateOptions {
        format: OutputFormat::Dart,
        output: None,
        prereserved: Vec::new(),
        common_converter_path: None,
        external_rules: Vec::new(),
    };
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--json" => {
                options.format = OutputFormat::Json;
                i += 1;
            }
            "--out" => {
                options.output = Some(PathBuf::from(option_value(args, &mut i, "--out")?));
            }
            "--reserve" => {
                let name = option_value(args, &mut i, "--reserve")?;
                options.prereserved.push(name);
            }
            "--common-converters" => {
                let path = option_value(args, &mut i, "--common-converters")?;
                options.common_converter_path = Some(path);
            }
            "--external" => {
                let rule = option_value(args, &mut i, "--external")?;
                let parsed = PrefixResolver::parse_rule(&rule).map_err(|e| e.to_string())?;
                options.external_rules.push(parsed);
            }
            other => return Err(format!("unknown option '{other}'")),
        }
    }

    Ok(options)
}

fn option_value(args: &[String], i: &mut usize, flag: &str) -> Result<String, String> {
    if *i + 1 >= args.len() {
        return Err(format!("missing value for {flag}"));
    }

    let value = args[*i + 1].trim();
    if value.is_empty() {
        return Err(format!("{flag} value must be non-empty"));
    }

    *i += 2;
    Ok(value.to_string())
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  dartgen generate <model.json> [--json] [--out <file.dart>]");
    eprintln!("                   [--reserve <pkg.Name>]... [--common-converters <path>]");
    eprintln!("                   [--external <package-prefix>=<path>]...");
    eprintln!();
    eprintln!("options:");
    eprintln!("  --json                     print the assembled declaration set as JSON");
    eprintln!("  --out <file>               write output to <file> instead of stdout");
    eprintln!("  --reserve <pkg.Name>       name already used by existing code (repeatable)");
    eprintln!("  --common-converters <path> import built-in converters from <path>");
    eprintln!("  --external <prefix>=<path> use declarations from <path> for types under <prefix>");
    eprintln!();
    eprintln!("note: set RUST_LOG=dartgen=debug to trace name assignment.");
}
