//! Doge — hybrid attention/SSD decoder configuration tool.
//!
//! Creates, inspects and checks `config.json` documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use doge::{DogeConfig, DogeParams};
use tracing_subscriber::EnvFilter;

/// Doge config CLI.
#[derive(Parser, Debug)]
#[command(
    name = "doge",
    about = "Doge — resolve and check hybrid attention/SSD model configs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default config document.
    Init {
        /// Output file or checkpoint directory (stdout when omitted).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of decoder layers.
        #[arg(short = 'n', long, default_value_t = doge::defaults::NUM_HIDDEN_LAYERS)]
        num_layers: usize,

        /// One attention layer every this many layers.
        #[arg(long, default_value_t = doge::defaults::ATTN_LAYER_PERIOD)]
        attn_period: usize,

        /// Index of the attention layer within each period.
        #[arg(long, default_value_t = doge::defaults::ATTN_LAYER_OFFSET)]
        attn_offset: usize,

        /// Use the cross-domain mixture of experts.
        #[arg(long, default_value_t = false)]
        moe: bool,
    },

    /// Print a summary of a config.
    Inspect {
        /// Config file or checkpoint directory.
        path: PathBuf,
    },

    /// Print the layer type of every decoder layer.
    Layers {
        /// Config file or checkpoint directory.
        path: PathBuf,

        /// Emit a JSON array instead of one line per layer.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the rotary frequency table.
    Rope {
        /// Config file or checkpoint directory.
        path: PathBuf,

        /// Runtime sequence length (affects dynamic and longrope).
        #[arg(short, long)]
        seq_len: Option<usize>,
    },

    /// Validate one or more configs.
    Check {
        /// Config files or checkpoint directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Init {
            output,
            num_layers,
            attn_period,
            attn_offset,
            moe,
        } => {
            let config = DogeConfig::new(DogeParams {
                num_hidden_layers: i64::try_from(num_layers)?,
                attn_layer_period: i64::try_from(attn_period)?,
                attn_layer_offset: i64::try_from(attn_offset)?,
                is_moe: moe,
                ..DogeParams::default()
            })
            .context("requested layout is not a valid config")?;

            match output {
                Some(path) if path.is_dir() => {
                    config.save_pretrained(&path)?;
                    tracing::info!("Wrote {}", path.join(doge::config::CONFIG_NAME).display());
                }
                Some(path) => {
                    config.to_json_file(&path)?;
                    tracing::info!("Wrote {}", path.display());
                }
                None => println!("{}", config.to_json_string()?),
            }
        }

        Command::Inspect { path } => {
            let config = load(&path)?;
            let topology = config.topology();
            println!("model_type:        {}", DogeConfig::MODEL_TYPE);
            println!("vocab_size:        {}", config.vocab_size());
            println!(
                "hidden_size:       {} ({} heads × {})",
                config.hidden_size(),
                config.num_attention_heads(),
                config.head_dim()
            );
            println!("intermediate_size: {}", config.intermediate_size());
            println!("max_positions:     {}", config.max_position_embeddings());
            println!(
                "layers:            {} ({} attn + {} ssd, period {}, offset {})",
                topology.num_layers(),
                topology.num_attention_layers(),
                topology.num_ssd_layers(),
                topology.period(),
                topology.offset()
            );
            println!("attention layers:  {:?}", topology.attention_layer_indices());
            println!("ssd_chunk_size:    {}", config.ssd_chunk_size());

            let rope = config.rope_scaling();
            print!("rope:              {} (theta {})", rope.rope_type(), config.rope_theta());
            if let Some(factor) = rope.factor() {
                print!(", factor {factor}");
            }
            if let Some(context) = rope.original_max_position_embeddings() {
                print!(", original context {context}");
            }
            println!();

            match config.cdmoe() {
                Some(cdmoe) => println!(
                    "cdmoe:             {} experts ({}² keys), {} heads × {} experts, retrieval {}",
                    cdmoe.num_experts(),
                    cdmoe.num_keys(),
                    cdmoe.num_heads(),
                    cdmoe.experts_per_head(),
                    cdmoe.retrieval_size()
                ),
                None => println!("cdmoe:             off (dense MLP)"),
            }

            let extra = &config.params().extra;
            if !extra.is_empty() {
                let keys: Vec<&str> = extra.keys().map(String::as_str).collect();
                println!("pass-through keys: {}", keys.join(", "));
            }
        }

        Command::Layers { path, json } => {
            let config = load(&path)?;
            if json {
                println!("{}", serde_json::to_string(&config.layers_type())?);
            } else {
                for slot in config.layer_plan() {
                    println!("{:>3} {} {}", slot.index, slot.layer_type, slot.kind_index);
                }
            }
        }

        Command::Rope { path, seq_len } => {
            let config = load(&path)?;
            let freqs = config.rope_frequencies(seq_len);
            println!("rope_type:         {}", config.rope_scaling().rope_type());
            println!("attention_scaling: {:.6}", freqs.attention_scaling);
            for (j, (inv_freq, wavelength)) in freqs
                .inv_freq
                .iter()
                .zip(freqs.wavelengths().iter())
                .enumerate()
            {
                println!("{j:>3} {inv_freq:.6e} {wavelength:.1}");
            }
        }

        Command::Check { paths } => {
            let mut failed = 0;
            for path in &paths {
                match load(path) {
                    Ok(_) => println!("ok    {}", path.display()),
                    Err(err) => {
                        failed += 1;
                        println!("FAIL  {}: {err:#}", path.display());
                    }
                }
            }
            if failed > 0 {
                tracing::warn!("{} of {} configs failed validation", failed, paths.len());
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load a config from a file, or from `config.json` inside a directory.
fn load(path: &Path) -> anyhow::Result<DogeConfig> {
    if path.is_dir() {
        DogeConfig::from_pretrained(path)
    } else {
        DogeConfig::from_json_file(path)
    }
}
