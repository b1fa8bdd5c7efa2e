// Copyright 2024 The poem-generator Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use clap::Parser;
use poem_generator::first_line::{DevicePreference, FirstLineGenerator, GeneratorSettings};
use poem_generator::{Config, PoemGeneratorError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Generate candidate first lines of a poem from keywords
#[derive(Parser, Debug)]
#[command(name = "first-line", version)]
struct Args {
    /// JSON settings file (defaults apply to missing fields)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Fine-tuned weights, overrides the settings file
    #[arg(short, long)]
    checkpoint: Option<PathBuf>,

    /// Compute device, overrides the settings file
    #[arg(short, long, value_enum)]
    device: Option<DevicePreference>,

    /// Print the candidates as a JSON array
    #[arg(long)]
    json: bool,

    /// Keywords the line is generated from
    #[arg(required = true)]
    keywords: Vec<String>,
}

fn main() -> Result<(), PoemGeneratorError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut settings = match &args.settings {
        Some(path) => GeneratorSettings::from_file(path)?,
        None => GeneratorSettings::default(),
    };
    if let Some(checkpoint) = args.checkpoint {
        settings.checkpoint_path = checkpoint;
    }
    if let Some(device) = args.device {
        settings.device = device;
    }

    let generator = FirstLineGenerator::new(settings.into_config())?;
    let lines = generator.generate_from_keywords(&args.keywords)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&lines).map_err(PoemGeneratorError::generation)?;
        println!("{}", json);
    } else {
        for line in &lines {
            println!("{}", line);
        }
    }
    Ok(())
}
