use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use tale_gen_core::TrainedModel;
use tale_gen_core::corpus::{CorpusSummary, END_OF_TEXT, join_documents, split_documents};
use tale_gen_core::io::{build_model_path, list_files, read_text, write_text};
use tale_gen_core::text::tokenize;

#[derive(Parser, Debug)]
#[command(name = "tale-gen")]
#[command(about = "Train word-level Markov chains on tales and generate pastiche text")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a model from a corpus file and save it
    Train {
        #[arg(long, help = "Path to the training corpus (plain text)")]
        corpus: PathBuf,
        #[arg(short = 'n', long, default_value = "2", help = "Number of tokens in a context")]
        order: usize,
        #[arg(long, help = "Output path (defaults to <corpus stem>.n<order>.bin)")]
        output: Option<PathBuf>,
        #[arg(long, help = "Worker threads used for counting (defaults to the CPU count)")]
        threads: Option<usize>,
    },
    /// Generate text from a saved model
    Generate {
        #[arg(long, help = "Path to a model saved by `train`")]
        model: PathBuf,
        #[arg(long, default_value = "", help = "Text the generation starts from")]
        prefix: String,
        #[arg(short = 'k', long, default_value = "50", help = "Number of tokens to append")]
        k: usize,
        #[arg(long, default_value = "1", help = "Number of independent samples")]
        samples: usize,
        #[arg(long, default_value = "1.0", help = "Sampling temperature (< 1 sharpens, > 1 flattens)")]
        temperature: f64,
        #[arg(long, help = "Seed for reproducible output")]
        seed: Option<u64>,
    },
    /// Print the size of a saved model
    Info {
        #[arg(long)]
        model: PathBuf,
    },
    /// Split a directory of tales into train.txt and test.txt
    Split {
        #[arg(long, help = "Directory containing one .txt file per tale")]
        input: PathBuf,
        #[arg(long, default_value = "data", help = "Directory receiving train.txt and test.txt")]
        output: PathBuf,
        #[arg(long, default_value = "0.2")]
        test_ratio: f64,
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Train { corpus, order, output, threads } => {
            let tokens = tokenize(&read_text(&corpus)?);
            let threads = threads.unwrap_or_else(num_cpus::get);
            let model = TrainedModel::train_parallel(&tokens, order, threads)?;

            let output = match output {
                Some(path) => path,
                None => build_model_path(&corpus, order)?,
            };
            model.save(&output)?;
            info!("model saved to {}", output.display());
        }
        Command::Generate { model, prefix, k, samples, temperature, seed } => {
            let model = TrainedModel::load(&model)?;

            // A fixed seed replays the same texts
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };

            for text in model.bulk_generate(&prefix, k, samples, temperature, &mut rng)? {
                println!("{}", text);
                println!();
            }
        }
        Command::Info { model } => {
            let model = TrainedModel::load(&model)?;
            println!("{}", model.summary());
        }
        Command::Split { input, output, test_ratio, seed } => {
            let mut documents = Vec::new();
            for file in list_files(&input, "txt")? {
                documents.push(read_text(input.join(file))?);
            }

            let split = split_documents(documents, test_ratio, &mut StdRng::seed_from_u64(seed))?;
            let train = join_documents(&split.train);
            let test = join_documents(&split.test);

            // The delimiter and empty words do not count as vocabulary
            let exclude = [END_OF_TEXT, ""];
            info!("train: {}", CorpusSummary::from_text(&train, &exclude));
            info!("test: {}", CorpusSummary::from_text(&test, &exclude));

            std::fs::create_dir_all(&output)?;
            write_text(output.join("train.txt"), &train)?;
            write_text(output.join("test.txt"), &test)?;
        }
    }

    Ok(())
}
