use anyhow::Result;
use cam_describe::config::DescribeConfig;
use clap::Parser;

/// Point the device camera at something and get a spoken/printed description:
/// - captures one still frame via ffmpeg (v4l2 / avfoundation / dshow)
/// - downscales and uploads it to a vision-language model endpoint
/// - prints the returned description, optionally speaking it aloud
#[derive(Parser, Debug)]
#[command(name = "camdesc")]
#[command(about = "📷 Describe what the camera sees using a vision-language model")]
#[command(
    long_about = "Capture a still frame from the device camera, send it to a vision-language \
model endpoint, and print (optionally speak) the returned natural-language description."
)]
struct Args {
    /// Camera device
    #[arg(
        short = 'd',
        long,
        help = "Camera device: /dev/video0 (Linux), an index like 0 (macOS), video=Name (Windows)"
    )]
    device: Option<String>,

    /// Model endpoint URL
    #[arg(short, long, help = "Vision-language model endpoint URL")]
    endpoint: Option<String>,

    /// Model name
    #[arg(short, long, help = "Model name to request from the endpoint")]
    model: Option<String>,

    /// Instruction prompt
    #[arg(short, long, help = "Instruction prompt sent with the image")]
    prompt: Option<String>,

    /// Longest-side clamp in pixels before upload
    #[arg(long, default_value_t = 640,
          help = "Downscale so the longest side is at most this many pixels (64-4096)")]
    max_side: u32,

    /// JPEG quality
    #[arg(short = 'q', long, default_value_t = 80, help = "JPEG encoder quality (1-100)")]
    quality: u8,

    /// Speak the description aloud
    #[arg(long, help = "Speak the description aloud, preferring a Spanish voice")]
    speak: bool,

    /// Skip the API key requirement
    #[arg(long, help = "Skip the DESCRIBE_API_KEY requirement (local endpoints)")]
    anonymous: bool,

    /// Save the captured snapshot
    #[arg(long, value_name = "PATH", help = "Write the captured frame's data URL to a file")]
    save: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = DescribeConfig::default();
    if let Some(device) = args.device {
        config.device = device;
    }
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(prompt) = args.prompt {
        config.prompt = prompt;
    }
    config.max_long_side = args.max_side;
    config.jpeg_quality = args.quality;
    config.speak = args.speak;
    config.anonymous = args.anonymous;
    config.save_path = args.save;

    config.validate().map_err(anyhow::Error::msg)?;
    let options = config.to_describe_options();

    let description = cam_describe::describe_camera(options).await?;
    println!("{description}");
    Ok(())
}
