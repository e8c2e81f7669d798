use std::path::PathBuf;

use clap::{Parser, Subcommand};
use textstamp::request::{FontSizeField, GenerateRequest};
use textstamp::server::Server;
use textstamp::{ServerConfig, StampService};

#[derive(Parser)]
#[command(name = "textstamp", version, about = "Stamp styled text onto a template image")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve /check-template and /generate over HTTP
    Serve(ServeArgs),
    /// Render a single image to a file
    Render(RenderArgs),
}

#[derive(clap::Args)]
struct ServeArgs {
    #[arg(long, env = "TEXTSTAMP_HOST", default_value = "0.0.0.0")]
    host: String,
    #[arg(long, env = "PORT", default_value_t = 9000)]
    port: u16,
    /// Template image; a default canvas is synthesized when the file is missing
    #[arg(long, env = "TEXTSTAMP_TEMPLATE", default_value = "public/template.png")]
    template: PathBuf,
    /// Directory with the browser client
    #[arg(long, env = "TEXTSTAMP_PUBLIC_DIR", default_value = "public")]
    public_dir: PathBuf,
    /// Do not serve static files
    #[arg(long)]
    no_public: bool,
    /// Additional font directory (repeatable)
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,
    /// Skip system font discovery
    #[arg(long)]
    no_system_fonts: bool,
    /// Request-handling threads (defaults to the number of CPUs)
    #[arg(long, env = "TEXTSTAMP_WORKERS")]
    workers: Option<usize>,
    #[arg(long, env = "TEXTSTAMP_MAX_BODY_BYTES", default_value_t = 1024 * 1024)]
    max_body_bytes: usize,
    /// Initialize the template at startup
    #[arg(long)]
    eager_template: bool,
}

#[derive(clap::Args)]
struct RenderArgs {
    #[arg(long)]
    text: String,
    #[arg(long)]
    font_size: Option<u32>,
    #[arg(long)]
    color: Option<String>,
    /// top, middle or bottom
    #[arg(long)]
    position: Option<String>,
    /// left, center or right
    #[arg(long)]
    align: Option<String>,
    #[arg(long, default_value = "public/template.png")]
    template: PathBuf,
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,
    #[arg(long)]
    no_system_fonts: bool,
    #[arg(short, long)]
    output: PathBuf,
}

impl ServeArgs {
    fn into_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: self.host,
            port: self.port,
            template_path: self.template,
            public_dir: if self.no_public { None } else { Some(self.public_dir) },
            font_dirs: self.font_dirs,
            skip_system_fonts: self.no_system_fonts,
            workers: self.workers.unwrap_or(defaults.workers),
            max_body_bytes: self.max_body_bytes,
            eager_template: self.eager_template,
        }
    }
}

fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.into_config();
    let service = StampService::new(&config);
    let server = Server::bind(config, service)?;
    server.run()?;
    Ok(())
}

fn render(args: RenderArgs) -> anyhow::Result<()> {
    let config = ServerConfig {
        template_path: args.template,
        font_dirs: args.font_dirs,
        skip_system_fonts: args.no_system_fonts,
        ..Default::default()
    };
    let service = StampService::new(&config);

    // Same coercion path as HTTP requests
    let request = GenerateRequest {
        text: Some(args.text),
        font_size: args.font_size.map(|n| FontSizeField::Number(n as f64)),
        color: args.color,
        position: args.position,
        align: args.align,
    };
    let (text, style) = request.into_parts()?;

    let status = service.check_template()?;
    if status.created {
        log::info!("using synthesized default template");
    }
    let image = service.generate(&text, &style)?;
    std::fs::write(&args.output, &image.png_data)?;
    log::info!(
        "wrote {}x{} image to {} (sha256 {})",
        image.width,
        image.height,
        args.output.display(),
        image.digest()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args),
        Command::Render(args) => render(args),
    }
}
