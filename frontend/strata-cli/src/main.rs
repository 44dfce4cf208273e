mod cli;

use serde::Serialize;
use strata_core::{LayerCategory, LayeredResolver, SettingsSources, Value};

const OUTPUT_SCHEMA: &str = "strata-cli/output/v1";

fn main() {
    if let Err(error) = run() {
        eprintln!("strata failed: {error}");
        std::process::exit(1);
    }
}

fn run() -> strata_core::Result<()> {
    let args = cli::Cli::parse_args();
    strata_core::logging::init_tracing(&args.log_level);

    let output = args.output;
    let command_name = match &args.command {
        cli::Command::Get { .. } => "get",
        cli::Command::Dump { .. } => "dump",
        cli::Command::Layers => "layers",
    };

    let result = build_resolver(&args).and_then(|resolver| {
        handle_command(&resolver, args.command.clone(), output)
    });
    if let Err(error) = result {
        match output {
            cli::OutputFormat::Text => return Err(error),
            cli::OutputFormat::Json => {
                print_json_error_envelope(command_name, &error)?;
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn build_resolver(args: &cli::Cli) -> strata_core::Result<LayeredResolver> {
    let mut sources = SettingsSources::with_separator(args.separator);
    let groups = [
        (LayerCategory::Global, &args.global),
        (LayerCategory::Plugin, &args.plugin),
        (LayerCategory::User, &args.user),
    ];
    for (category, paths) in groups {
        for path in paths {
            sources.add(path, category)?;
        }
    }

    let mut resolver = LayeredResolver::with_runtime(strata_core::NestedMap::with_separator(
        args.separator,
    ));
    sources.attach(&mut resolver)?;

    for assignment in &args.overrides {
        let Some((path, raw)) = assignment.split_once('=') else {
            return Err(strata_core::Error::Config(format!(
                "override '{assignment}' must have the form PATH=VALUE"
            )));
        };
        resolver.set(path.trim(), parse_cli_value(raw))?;
    }

    tracing::debug!(
        layers = resolver.layers().len(),
        overrides = args.overrides.len(),
        "settings resolver ready"
    );
    Ok(resolver)
}

fn parse_cli_value(raw: &str) -> Value {
    serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw))
}

fn handle_command(
    resolver: &LayeredResolver,
    command: cli::Command,
    output: cli::OutputFormat,
) -> strata_core::Result<()> {
    match command {
        cli::Command::Get {
            path,
            merge,
            explain,
            default,
        } => {
            if explain {
                let resolved = resolver.explain(&path)?;
                match output {
                    cli::OutputFormat::Text => {
                        println!("Path: {}", resolved.path);
                        println!(
                            "Source: {}",
                            resolved.source.as_deref().unwrap_or("<not set>")
                        );
                        for contribution in &resolved.contributions {
                            println!(
                                "  {} [{}]: {}",
                                contribution.layer, contribution.category, contribution.value
                            );
                        }
                        println!("Effective: {}", render_optional(resolved.effective.as_ref()));
                    }
                    cli::OutputFormat::Json => print_json_envelope("get", &resolved)?,
                }
                return Ok(());
            }

            let resolved = if merge {
                resolver.get_merged(&path)?
            } else {
                resolver.get(&path)?
            };
            let found = resolved.is_some();
            let value = resolved
                .or_else(|| default.as_deref().map(parse_cli_value))
                .map(|value| value.to_json());

            match output {
                cli::OutputFormat::Text => println!("{}", render_optional(value.as_ref())),
                cli::OutputFormat::Json => print_json_envelope(
                    "get",
                    &GetData {
                        path,
                        merged: merge,
                        found,
                        value,
                    },
                )?,
            }
        }
        cli::Command::Dump {
            path,
            category,
            flat,
        } => {
            let tree = match category {
                Some(category) => resolver.effective_in(category.into()),
                None => resolver.effective(),
            };

            if flat {
                let items = tree.items(&path)?;
                match output {
                    cli::OutputFormat::Text => {
                        for (key, value) in items {
                            println!("{key} = {value}");
                        }
                    }
                    cli::OutputFormat::Json => {
                        let flat: serde_json::Map<String, serde_json::Value> = items
                            .into_iter()
                            .map(|(key, value)| (key, value.to_json()))
                            .collect();
                        print_json_envelope("dump", &flat)?;
                    }
                }
                return Ok(());
            }

            let subtree = tree.get(&path)?.map(Value::to_json);
            match output {
                cli::OutputFormat::Text => match &subtree {
                    Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
                    None => println!("<not set>"),
                },
                cli::OutputFormat::Json => print_json_envelope(
                    "dump",
                    &DumpData {
                        path,
                        value: subtree,
                    },
                )?,
            }
        }
        cli::Command::Layers => {
            let layers = resolver.layers();
            match output {
                cli::OutputFormat::Text => {
                    for layer in &layers {
                        println!("{:>2}  {:<8} {}", layer.rank, layer.category, layer.name);
                    }
                }
                cli::OutputFormat::Json => print_json_envelope("layers", &layers)?,
            }
        }
    }

    Ok(())
}

fn render_optional(value: Option<&serde_json::Value>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "<not set>".to_owned())
}

fn print_json_envelope<T: Serialize>(command: &str, data: &T) -> strata_core::Result<()> {
    let envelope = CliJsonEnvelope {
        schema: OUTPUT_SCHEMA,
        status: "ok",
        command,
        data,
    };
    println!("{}", serde_json::to_string(&envelope)?);
    Ok(())
}

fn print_json_error_envelope(command: &str, error: &strata_core::Error) -> strata_core::Result<()> {
    let envelope = CliJsonErrorEnvelope {
        schema: OUTPUT_SCHEMA,
        status: "error",
        command,
        error: CliJsonErrorPayload {
            code: error_code(error),
            message: error.to_string(),
        },
    };
    println!("{}", serde_json::to_string(&envelope)?);
    Ok(())
}

fn error_code(error: &strata_core::Error) -> &'static str {
    match error {
        strata_core::Error::Addressing(_) => "addressing_error",
        strata_core::Error::Layer(_) => "layer_error",
        strata_core::Error::Config(_) => "config_error",
        strata_core::Error::Io(_) => "io_error",
        strata_core::Error::Json(_) | strata_core::Error::Toml(_) | strata_core::Error::Yaml(_) => {
            "parse_error"
        }
    }
}

#[derive(Debug, Serialize)]
struct CliJsonEnvelope<'a, T: Serialize> {
    schema: &'a str,
    status: &'a str,
    command: &'a str,
    data: &'a T,
}

#[derive(Debug, Serialize)]
struct CliJsonErrorEnvelope<'a> {
    schema: &'a str,
    status: &'a str,
    command: &'a str,
    error: CliJsonErrorPayload,
}

#[derive(Debug, Serialize)]
struct CliJsonErrorPayload {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct GetData {
    path: String,
    merged: bool,
    found: bool,
    value: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct DumpData {
    path: String,
    value: Option<serde_json::Value>,
}
