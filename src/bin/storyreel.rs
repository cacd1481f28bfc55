use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use rand::{SeedableRng, rngs::StdRng};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use storyreel::{
    AudioCodec, AudioMixer, Credentials, FfmpegCodec, FfmpegTarget, GenerationRequest, GoogleTts,
    HttpImageGenerator, MixParams, NarrationTrack, OpenAiPrompter, Pipeline, PipelineConfig,
    Progress, Services, text,
};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the whole pipeline and write the final MP4 (requires `ffmpeg` on PATH).
    Generate(GenerateArgs),
    /// Print the speech chunks and scene paragraphs of a script. Calls no services.
    Chunks(ChunksArgs),
    /// Mix a narration file over a music file.
    Mix(MixArgs),
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    /// Plain-text narration script.
    #[arg(long)]
    script: PathBuf,

    /// Topic; picks the music folder.
    #[arg(long)]
    topic: String,

    /// Title used to name the output files.
    #[arg(long)]
    title: Option<String>,

    /// Speech-synthesis voice name.
    #[arg(long)]
    voice: String,

    /// JSON config overriding defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for music and motion choices.
    #[arg(long)]
    seed: Option<u64>,

    /// Print the full outcome as JSON instead of just the video path.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ChunksArgs {
    #[arg(long)]
    script: PathBuf,

    #[arg(long, default_value_t = text::DEFAULT_MAX_WORDS)]
    max_words: usize,
}

#[derive(Parser, Debug)]
struct MixArgs {
    #[arg(long)]
    voice_audio: PathBuf,

    #[arg(long)]
    music: PathBuf,

    /// Output MP3 path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Generate(args) => cmd_generate(args),
        Command::Chunks(args) => cmd_chunks(args),
        Command::Mix(args) => cmd_mix(args),
    }
}

fn read_script(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read script '{}'", path.display()))
}

fn cmd_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let config = match args.config.as_deref() {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };
    let creds = Credentials::from_env()?;
    let timeout = config.services.timeout_secs;

    let tts = GoogleTts::new(
        config.services.tts_base_url.clone(),
        creds.google_tts_api_key,
        timeout,
    )?;
    let prompter = OpenAiPrompter::new(
        config.services.openai_base_url.clone(),
        creds.openai_api_key,
        timeout,
    )?
    .with_model(config.services.prompt_model.clone());
    let images = HttpImageGenerator::new(creds.image_api_url, timeout)?;
    let codec = FfmpegCodec {
        mp3_bitrate: config.mp3_bitrate.clone(),
        ..FfmpegCodec::default()
    };

    let services = Services {
        speech: &tts,
        prompter: &prompter,
        images: &images,
    };
    let pipeline = Pipeline::new(&config, services, &codec)?;

    let request = GenerationRequest {
        script: read_script(&args.script)?,
        topic: args.topic,
        title: args.title,
        voice: args.voice,
    };
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut target = FfmpegTarget::default();

    let outcome = pipeline.generate(&request, &mut rng, &mut target, &mut log_progress)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.video.display());
    }
    Ok(())
}

fn log_progress(p: Progress) {
    match p {
        Progress::ChunkSynthesized { index, total } => {
            info!("synthesized chunk {}/{total}", index + 1)
        }
        Progress::SceneAcquired { index, total } => info!("scene {}/{total} ready", index + 1),
        Progress::SceneSkipped { index, total } => info!("scene {}/{total} skipped", index + 1),
        Progress::FramesEncoded { done, total } if done == total => info!("encoded {total} frames"),
        _ => {}
    }
}

fn cmd_chunks(args: ChunksArgs) -> anyhow::Result<()> {
    let script = read_script(&args.script)?;
    let cleaned = text::clean_for_speech(&script);

    println!("# speech chunks");
    for (i, chunk) in text::split_into_speech_chunks(&cleaned, args.max_words)
        .iter()
        .enumerate()
    {
        println!("{i:>3} [{:>2} words] {chunk}", text::word_count(chunk));
    }
    println!();
    println!("# scene paragraphs");
    for (i, para) in text::split_into_scene_paragraphs(&cleaned).iter().enumerate() {
        println!("{i:>3} {para}");
    }
    Ok(())
}

fn cmd_mix(args: MixArgs) -> anyhow::Result<()> {
    let codec = FfmpegCodec::default();
    let voice = std::fs::read(&args.voice_audio)
        .with_context(|| format!("read narration '{}'", args.voice_audio.display()))?;
    let music_bytes = std::fs::read(&args.music)
        .with_context(|| format!("read music '{}'", args.music.display()))?;
    let music = codec.decode(&music_bytes)?;

    let narration = NarrationTrack {
        encoded: voice,
        chunk_count: 1,
    };
    let mixed = AudioMixer::new(&codec, MixParams::default()).mix(&narration, &music)?;
    mixed.write_to(&codec, &args.out)?;
    println!(
        "{} ({:.3} s)",
        args.out.display(),
        mixed.duration_secs()
    );
    Ok(())
}
