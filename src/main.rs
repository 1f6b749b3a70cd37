use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use handknn_core::{vectorize, ClassifierConfig, ExampleStore, Hand, Label, Point3D};
use handknn_session::{
    ClassNames, EstimationConfig, LogPresenter, Recording, RecordedDetector, RecordedSource,
    Session, SessionConfig, SessionContext,
};
use handknn_storage::{load_store, save_store, ModelStorage};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Hand-pose KNN classifier tools
#[derive(Parser, Debug)]
#[command(name = "handknn")]
#[command(about = "Train, inspect and replay hand-pose KNN models", long_about = None)]
struct Args {
    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Vote with the k nearest examples only (default: all examples)
    #[arg(long, global = true)]
    k: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show labels and example counts of a model file
    Inspect {
        model: PathBuf,
    },
    /// Classify one hand given as JSON keypoints
    Classify {
        #[arg(short, long)]
        model: PathBuf,
        /// File holding a hand object or an array of {x, y, z} points
        #[arg(long)]
        keypoints: PathBuf,
    },
    /// Add every recorded hand as an example of one label
    Train {
        /// Model file to extend (created when missing)
        #[arg(short, long)]
        model: PathBuf,
        #[arg(short, long)]
        recording: PathBuf,
        #[arg(short, long)]
        label: String,
        /// Treat the label as a numeric class id
        #[arg(long)]
        numeric: bool,
    },
    /// Run a full session over recorded detector output
    Replay {
        #[arg(short, long)]
        model: PathBuf,
        #[arg(short, long)]
        recording: PathBuf,
        /// Display names for class ids 0, 1, 2, ...
        #[arg(long, value_delimiter = ',')]
        class_names: Vec<String>,
        #[arg(long)]
        flip_horizontal: bool,
        /// Frame pacing in milliseconds
        #[arg(long, default_value_t = 16)]
        frame_interval_ms: u64,
    },
    /// Keep a timestamped copy of a model in a data directory
    Archive {
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,
        #[arg(short, long)]
        model: PathBuf,
    },
    /// List archived models
    Archives {
        #[arg(short, long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let classifier = ClassifierConfig {
        k: args.k,
        ..ClassifierConfig::default()
    };
    classifier.validate()?;

    match args.command {
        Command::Inspect { model } => inspect(&model, classifier),
        Command::Classify { model, keypoints } => classify(&model, &keypoints, classifier),
        Command::Train {
            model,
            recording,
            label,
            numeric,
        } => train(&model, &recording, &label, numeric, classifier),
        Command::Replay {
            model,
            recording,
            class_names,
            flip_horizontal,
            frame_interval_ms,
        } => {
            let config = SessionConfig {
                estimation: EstimationConfig { flip_horizontal },
                class_names: ClassNames::from_list(class_names),
                frame_interval: std::time::Duration::from_millis(frame_interval_ms),
                ..SessionConfig::default()
            };
            replay(&model, &recording, config, classifier).await
        }
        Command::Archive { data_dir, model } => {
            let storage = ModelStorage::new(&data_dir)?;
            let store = load_store(&model, classifier)?;
            let description = storage.archive(&store)?;
            println!("{}", serde_json::to_string_pretty(&description)?);
            Ok(())
        }
        Command::Archives { data_dir } => {
            let storage = ModelStorage::new(&data_dir)?;
            println!("{}", serde_json::to_string_pretty(&storage.list_archives()?)?);
            Ok(())
        }
    }
}

fn inspect(model: &Path, classifier: ClassifierConfig) -> anyhow::Result<()> {
    let store = load_store(model, classifier)
        .with_context(|| format!("loading {}", model.display()))?;

    println!("model:     {}", model.display());
    match store.dim() {
        Some(dim) => println!("dimension: {}", dim),
        None => println!("dimension: -"),
    }
    println!("classes:   {}", store.num_classes());
    println!("examples:  {}", store.total_examples());
    for (label, count) in store.class_example_counts() {
        println!("  {:<16} {}", label.to_string(), count);
    }
    Ok(())
}

fn classify(model: &Path, keypoints: &Path, classifier: ClassifierConfig) -> anyhow::Result<()> {
    let store = load_store(model, classifier)
        .with_context(|| format!("loading {}", model.display()))?;
    if store.num_classes() == 0 {
        bail!("{} holds no examples", model.display());
    }

    let text = std::fs::read_to_string(keypoints)?;
    let points = match serde_json::from_str::<Hand>(&text) {
        Ok(hand) => hand.keypoints_3d,
        Err(_) => serde_json::from_str::<Vec<Point3D>>(&text)
            .with_context(|| format!("{} is neither a hand nor a point list", keypoints.display()))?,
    };

    let prediction = store.predict_class(&vectorize(&points)?)?;
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

fn train(
    model: &Path,
    recording: &Path,
    label: &str,
    numeric: bool,
    classifier: ClassifierConfig,
) -> anyhow::Result<()> {
    let label = if numeric {
        Label::Integer(label.parse().with_context(|| format!("{} is not a class id", label))?)
    } else {
        Label::from(label)
    };

    let mut store = if model.exists() {
        load_store(model, classifier)?
    } else {
        ExampleStore::with_config(classifier)?
    };
    let recording = Recording::load(recording)?;

    let mut added = 0usize;
    for (frame, hands) in recording.frames.iter().enumerate() {
        for hand in hands {
            let vector = match hand.to_vector() {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(frame, "Skipping hand: {}", e);
                    continue;
                }
            };
            store.add_example(&vector, label.clone())?;
            added += 1;
        }
    }

    save_store(model, &store)?;
    info!(
        "Added {} examples for {}; {} now holds {} classes",
        added,
        label,
        model.display(),
        store.num_classes()
    );
    Ok(())
}

async fn replay(
    model: &Path,
    recording: &Path,
    config: SessionConfig,
    classifier: ClassifierConfig,
) -> anyhow::Result<()> {
    let store = load_store(model, classifier)
        .with_context(|| format!("loading {}", model.display()))?;
    let recording = Recording::load(recording)?;
    info!("Replaying {} frames", recording.len());

    let context = SessionContext::new(store, config)?;
    let (mut session, _handle) = Session::new(
        context,
        RecordedSource::new(recording),
        RecordedDetector,
        LogPresenter,
    );

    let summary = session.run().await?;
    println!(
        "frames: {}  classified: {}  none: {}",
        summary.frames, summary.classified, summary.sentinels
    );
    Ok(())
}
