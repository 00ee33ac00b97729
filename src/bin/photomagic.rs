//! CLI for Photomagic - AI photo edits via Gemini.

use clap::{Args, Parser, Subcommand};
use photomagic::flows::DEFAULT_ANALYSIS_PROMPT;
use photomagic::{
    AnalyzeFlow, Config, EditFlow, Era, EraFlow, FlowState, GeminiProvider, GenerationResult,
    SourceImage, StyleFeature, StyleFlow,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "photomagic")]
#[command(about = "Edit, analyze, and transform photos with Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit a photo with a free-form instruction
    Edit(EditArgs),

    /// Describe a photo or answer a question about it
    Analyze(AnalyzeArgs),

    /// Restyle a photo as if taken in another era
    Era(EraArgs),

    /// Get grooming and clothing suggestions
    Style(StyleArgs),

    /// List available eras
    Eras,

    /// List style features
    Features,
}

#[derive(Args)]
struct ImageInput {
    /// Path to the source photo
    image: PathBuf,

    /// Write result images here instead of printing data URIs
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct EditArgs {
    #[command(flatten)]
    input: ImageInput,

    /// What to change
    prompt: String,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Path to the source photo
    image: PathBuf,

    /// Question to ask about the photo
    #[arg(short, long, default_value = DEFAULT_ANALYSIS_PROMPT)]
    prompt: String,
}

#[derive(Args)]
struct EraArgs {
    #[command(flatten)]
    input: ImageInput,

    /// Era label (see `photomagic eras`)
    #[arg(short, long)]
    era: Option<Era>,
}

#[derive(Args)]
struct StyleArgs {
    #[command(flatten)]
    input: ImageInput,

    /// Feature category (hairstyle, shirt, beard, jeans)
    #[arg(short, long, conflicts_with = "custom")]
    feature: Option<StyleFeature>,

    /// Custom request, sent as a single edit
    #[arg(short, long)]
    custom: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Edit(args) => edit(args, cli.json).await,
        Commands::Analyze(args) => analyze(args, cli.json).await,
        Commands::Era(args) => era(args, cli.json).await,
        Commands::Style(args) => style(args, cli.json).await,
        Commands::Eras => list_eras(cli.json),
        Commands::Features => list_features(cli.json),
    }
}

fn provider() -> anyhow::Result<GeminiProvider> {
    Ok(GeminiProvider::builder()
        .config(Config::from_env())
        .build()?)
}

async fn edit(args: EditArgs, json_output: bool) -> anyhow::Result<()> {
    let provider = provider()?;
    let mut flow = EditFlow::new();
    flow.set_image(SourceImage::from_path(&args.input.image).await?);
    flow.set_prompt(args.prompt);

    let result = finished(flow.submit(&provider).await)?;
    emit_images(std::slice::from_ref(result), args.input.output.as_deref(), json_output)
}

async fn analyze(args: AnalyzeArgs, json_output: bool) -> anyhow::Result<()> {
    let provider = provider()?;
    let mut flow = AnalyzeFlow::new();
    flow.set_image(SourceImage::from_path(&args.image).await?);
    flow.set_prompt(args.prompt);

    let result = finished(flow.submit(&provider).await)?;
    if json_output {
        let out = serde_json::json!({
            "type": "text",
            "success": true,
            "text": result.as_text(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", result.render());
    }
    Ok(())
}

async fn era(args: EraArgs, json_output: bool) -> anyhow::Result<()> {
    let provider = provider()?;
    let mut flow = EraFlow::new();
    flow.set_image(SourceImage::from_path(&args.input.image).await?);
    if let Some(era) = args.era {
        flow.select_era(era);
    }

    let result = finished(flow.submit(&provider).await)?;
    emit_images(std::slice::from_ref(result), args.input.output.as_deref(), json_output)
}

async fn style(args: StyleArgs, json_output: bool) -> anyhow::Result<()> {
    let provider = provider()?;
    let mut flow = StyleFlow::new();
    flow.set_image(SourceImage::from_path(&args.input.image).await?);
    if let Some(feature) = args.feature {
        flow.select_feature(feature);
    }
    if let Some(custom) = args.custom {
        flow.set_custom_prompt(custom);
    }

    let results = finished(flow.submit(&provider).await)?;
    emit_images(results, args.input.output.as_deref(), json_output)
}

fn finished<T>(state: &FlowState<T>) -> anyhow::Result<&T> {
    match state {
        FlowState::Succeeded(value) => Ok(value),
        FlowState::Failed(message) => anyhow::bail!("{message}"),
        _ => anyhow::bail!("submission did not complete"),
    }
}

fn emit_images(
    results: &[GenerationResult],
    output: Option<&Path>,
    json_output: bool,
) -> anyhow::Result<()> {
    let mut written = Vec::new();
    if let Some(output) = output {
        for (index, result) in results.iter().enumerate() {
            let Some(bytes) = result.image_bytes() else {
                continue;
            };
            let path = numbered_path(output, index, results.len());
            std::fs::write(&path, bytes?)?;
            written.push(path);
        }
    }

    if json_output {
        let outputs: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
        let images: Vec<String> = if written.is_empty() {
            results.iter().map(|r| r.render()).collect()
        } else {
            Vec::new()
        };
        let out = serde_json::json!({
            "type": "image",
            "success": true,
            "outputs": outputs,
            "images": images,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if written.is_empty() {
        for result in results {
            println!("{}", result.render());
        }
    } else {
        for path in &written {
            println!("Saved image: {}", path.display());
        }
    }

    Ok(())
}

/// `out.png` stays as-is for one image; several become `out-1.png`, `out-2.png`.
fn numbered_path(base: &Path, index: usize, total: usize) -> PathBuf {
    if total <= 1 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{stem}-{}.{}", index + 1, ext.to_string_lossy()),
        None => format!("{stem}-{}", index + 1),
    };
    base.with_file_name(name)
}

fn list_eras(json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let eras: Vec<_> = Era::ALL
            .iter()
            .map(|e| {
                let style = if e.is_ancient_indian() {
                    "manuscript"
                } else {
                    "photographic"
                };
                serde_json::json!({ "label": e.label(), "style": style })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&eras)?);
    } else {
        println!("Available eras:\n");
        for era in Era::ALL {
            println!("  {}", era.label());
        }
    }
    Ok(())
}

fn list_features(json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let features: Vec<_> = StyleFeature::ALL
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.as_str(),
                    "instructions": f.instructions(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&features)?);
    } else {
        println!("Style features:\n");
        for feature in StyleFeature::ALL {
            println!("  {feature}");
            for instruction in feature.instructions() {
                println!("    - {instruction}");
            }
        }
    }
    Ok(())
}
