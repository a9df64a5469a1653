#[cfg(feature = "cli")]
mod cli {
    use anyhow::{bail, Context, Result};
    use clap::{Parser, Subcommand};
    use serde_json::Value;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tracing::{info, Level};

    use avrotize_core::avro::json;
    use avrotize_core::canonical::canonicalize_str;
    use avrotize_core::common::names::avro_name;
    use avrotize_core::converter::{convert_jsons_to_avro_with_config, ConverterConfig};
    use avrotize_core::fingerprint::{fingerprint_base64, fingerprint_hex, Algorithm};
    use avrotize_core::inference::xml::xml_to_document;
    use avrotize_core::inference::{InferenceConfig, StructureInferrer};

    #[derive(Parser)]
    #[command(name = "avrotize", about = "Convert JSON Schema and sample data to Avro Schema")]
    struct Cli {
        /// Log debug output to stderr
        #[arg(short, long, global = true, default_value_t = false)]
        verbose: bool,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand)]
    enum Command {
        /// Convert a JSON Schema to an Avro schema
        J2a {
            /// Path or URL to the JSON Schema input
            #[arg(value_name = "JSONSCHEMA")]
            input: String,

            /// Path to the Avro schema output file (a directory with --split-top-level-records)
            #[arg(value_name = "AVRO")]
            output: String,

            /// Namespace override
            #[arg(long)]
            namespace: Option<String>,

            /// Utility namespace
            #[arg(long)]
            utility_namespace: Option<String>,

            /// Root record class name
            #[arg(long)]
            root_class_name: Option<String>,

            /// Split top-level records into separate files
            #[arg(long, default_value_t = false)]
            split_top_level_records: bool,

            /// JSON file with converter options
            #[arg(long)]
            config: Option<PathBuf>,
        },
        /// Infer an Avro schema from JSON sample documents
        Json2a {
            /// A JSON array, a single JSON document, or newline-delimited JSON
            #[arg(value_name = "SAMPLES")]
            input: PathBuf,

            #[arg(value_name = "AVRO")]
            output: PathBuf,

            /// Name of the top-level type
            #[arg(long, default_value = "Document")]
            type_name: String,

            #[arg(long)]
            namespace: Option<String>,

            /// Fold all documents into one record instead of detecting unions
            #[arg(long, default_value_t = false)]
            no_choices: bool,

            /// JSON file with inference options
            #[arg(long)]
            config: Option<PathBuf>,
        },
        /// Infer an Avro schema from XML sample documents
        Xml2a {
            /// One or more XML documents followed by the output path
            #[arg(value_name = "XML", required = true, num_args = 2..)]
            paths: Vec<PathBuf>,

            #[arg(long)]
            namespace: Option<String>,
        },
        /// Print the Parsing Canonical Form of an Avro schema
        Pcf {
            #[arg(value_name = "AVRO")]
            input: PathBuf,
        },
        /// Print the fingerprint of an Avro schema
        Fingerprint {
            #[arg(value_name = "AVRO")]
            input: PathBuf,

            /// sha256, md5 or rabin
            #[arg(long, default_value_t = Algorithm::Sha256)]
            algorithm: Algorithm,
        },
    }

    fn read(path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }

    fn read_config<T: serde::de::DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
        match path {
            Some(path) => serde_json::from_str(&read(path)?)
                .with_context(|| format!("parsing config {}", path.display())),
            None => Ok(T::default()),
        }
    }

    /// Documents of a sample file: a JSON array, one JSON value, or NDJSON.
    fn parse_samples(content: &str) -> Result<Vec<Value>> {
        if let Ok(value) = serde_json::from_str::<Value>(content) {
            return Ok(match value {
                Value::Array(items) => items,
                other => vec![other],
            });
        }
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).with_context(|| format!("parsing line {}", i + 1))
            })
            .collect()
    }

    fn write_schema(output: &Path, schema: &Value) -> Result<()> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, serde_json::to_string_pretty(schema)?)
            .with_context(|| format!("writing {}", output.display()))?;
        info!("Wrote {}", output.display());
        Ok(())
    }

    fn pcf_of(path: &Path) -> Result<String> {
        canonicalize_str(&read(path)?).with_context(|| format!("canonicalizing {}", path.display()))
    }

    fn run(command: Command) -> Result<()> {
        match command {
            Command::J2a {
                input,
                output,
                namespace,
                utility_namespace,
                root_class_name,
                split_top_level_records,
                config,
            } => {
                let mut config: ConverterConfig = read_config(config.as_deref())?;
                if let Some(namespace) = namespace {
                    config.namespace = namespace;
                }
                if let Some(utility) = utility_namespace {
                    config.utility_namespace = Some(utility);
                }
                if let Some(root) = root_class_name {
                    config.root_class_name = root;
                }
                config.split_top_level_records |= split_top_level_records;
                convert_jsons_to_avro_with_config(&input, &output, config)
                    .with_context(|| format!("converting {input}"))?;
            }
            Command::Json2a {
                input,
                output,
                type_name,
                namespace,
                no_choices,
                config,
            } => {
                let mut config: InferenceConfig = read_config(config.as_deref())?;
                if let Some(namespace) = namespace {
                    config.namespace = namespace;
                }
                if no_choices {
                    config.infer_choices = false;
                }
                let samples = parse_samples(&read(&input)?)
                    .with_context(|| format!("reading samples from {}", input.display()))?;
                let node = StructureInferrer::with_config(config).try_infer(&type_name, &samples)?;
                write_schema(&output, &json::to_value(&node))?;
            }
            Command::Xml2a { mut paths, namespace } => {
                let Some(output) = paths.pop() else {
                    bail!("missing output path");
                };
                let mut root = None;
                let mut documents = Vec::new();
                for path in &paths {
                    let (tag, document) = xml_to_document(&read(path)?)
                        .with_context(|| format!("parsing {}", path.display()))?;
                    root.get_or_insert(tag);
                    documents.push(document);
                }
                let type_name = avro_name(&root.unwrap_or_else(|| "Document".to_string()));
                let config = InferenceConfig::new().with_namespace(&namespace.unwrap_or_default());
                let node = StructureInferrer::with_config(config).try_infer(&type_name, &documents)?;
                write_schema(&output, &json::to_value(&node))?;
            }
            Command::Pcf { input } => println!("{}", pcf_of(&input)?),
            Command::Fingerprint { input, algorithm } => {
                let pcf = pcf_of(&input)?;
                let printed = match algorithm {
                    Algorithm::Rabin => fingerprint_base64(&pcf, algorithm),
                    _ => fingerprint_hex(&pcf, algorithm),
                };
                println!("{printed}");
            }
        }
        Ok(())
    }

    pub fn main() {
        let cli = Cli::parse();

        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
            .init();

        if let Err(e) = run(cli.command) {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "cli")]
fn main() {
    cli::main();
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary is only available with the `cli` feature enabled.");
    std::process::exit(1);
}
