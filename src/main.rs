//! Graph inspection tool: builds a feature detection network from a JSON
//! configuration or flags and prints it.

use clap::{Parser, ValueEnum};
use deeposlandia::network::{load_config, FeatureDetectionNetwork, NetworkConfig};
use deeposlandia::serialization::{save_json, to_dot, to_json_string, NetworkDescription};
use deeposlandia::tensor::Phase;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    /// Layer table with output shapes and parameter counts
    Summary,
    /// Configuration and graph structure
    Json,
    /// Graphviz rendering
    Dot,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Builds and inspects feature detection network graphs", long_about = None)]
struct Args {
    /// JSON network configuration; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    image_size: Option<usize>,

    #[arg(long)]
    nb_channels: Option<usize>,

    #[arg(long)]
    nb_labels: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f32>,

    /// simple, vgg16, vgg19, inception-v1..v4, xception or resnet
    #[arg(short, long)]
    architecture: Option<String>,

    #[arg(short, long, value_enum, default_value_t = Format::Summary)]
    format: Format,

    /// Build the inference graph (no dropout)
    #[arg(long)]
    inference: bool,

    /// Include parameter nodes in the DOT rendering
    #[arg(long)]
    with_parameters: bool,

    /// Write the output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn network_config(&self) -> deeposlandia::Result<NetworkConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => NetworkConfig::default(),
        };

        if let Some(name) = &self.name {
            config.name = name.clone();
        }
        if let Some(image_size) = self.image_size {
            config.image_size = image_size;
        }
        if let Some(nb_channels) = self.nb_channels {
            config.nb_channels = nb_channels;
        }
        if let Some(nb_labels) = self.nb_labels {
            config.nb_labels = nb_labels;
        }
        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }
        if let Some(architecture) = &self.architecture {
            config = config.with_architecture(architecture.as_str());
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = args.network_config()?;
    let phase = if args.inference { Phase::Inference } else { Phase::Training };
    let network = FeatureDetectionNetwork::build_with_phase(config, phase)?;

    if let (Format::Json, Some(path)) = (args.format, &args.output) {
        save_json(path, &NetworkDescription::from(&network))?;
        info!(path = %path.display(), "network description written");
        return Ok(());
    }

    let rendered = match args.format {
        Format::Summary => network.summary(),
        Format::Json => to_json_string(&NetworkDescription::from(&network))?,
        Format::Dot => to_dot(&network.graph(), args.with_parameters),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
