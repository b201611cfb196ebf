use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use receiptbooth::api;
use receiptbooth::models::{self, AppConfig};
use receiptbooth::server;
use receiptbooth::services::printer::prepare_image;

#[derive(Parser)]
#[command(name = "receiptbooth")]
#[command(about = "Receiptbooth - media, payment and receipt-printer backend for photobooth kiosks")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Dither an image the way it would be printed and save it as PNG
    Dither {
        /// Input image (JPEG, PNG, GIF, WebP)
        input: PathBuf,

        /// Output PNG file path
        #[arg(short, long)]
        output: PathBuf,

        /// Print width in dots (defaults to PRINTER_WIDTH or 680)
        #[arg(short, long)]
        width: Option<u32>,
    },
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Receiptbooth API",
        description = "Media, payment and receipt-printer backend for photobooth kiosks",
        version = "0.3.0",
        license(name = "MIT")
    ),
    paths(
        api::handle_upload,
        api::handle_view,
        api::handle_create_payment,
        api::handle_callback,
        api::handle_payment_status,
        api::handle_print_text,
        api::handle_print_image,
    ),
    components(schemas(
        api::UploadResponse,
        api::ViewResponse,
        api::EmptySessionResponse,
        api::PrintTextRequest,
        api::PrintTextResponse,
        api::PrintImageResponse,
        models::UploadedAsset,
        models::SessionAsset,
        models::CreatePaymentRequest,
        models::CreatePaymentResponse,
        models::CallbackPayload,
        models::PaymentRecord,
        models::PaymentStatus,
    )),
    tags(
        (name = "Media", description = "Session photo, video and GIF storage"),
        (name = "Payment", description = "QRIS payments and gateway callbacks"),
        (name = "Print", description = "Receipt printer jobs")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) => run_server().await,
        Some(Commands::Dither {
            input,
            output,
            width,
        }) => run_dither_command(&input, &output, width),
        None => {
            run_status_command();
            Ok(())
        }
    }
}

/// Dither an image to a PNG preview (no server or printer needed)
fn run_dither_command(
    input: &Path,
    output: &Path,
    width: Option<u32>,
) -> anyhow::Result<()> {
    // Minimal logging for CLI
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "receiptbooth=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let width = width.unwrap_or_else(|| AppConfig::load().printer.width);
    if width == 0 {
        anyhow::bail!("Width must be greater than zero");
    }

    let bytes = std::fs::read(input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", input.display()))?;
    let mono = prepare_image(&bytes, width)?;
    mono.save_with_format(output, image::ImageFormat::Png)?;

    println!(
        "Dithered {} -> {} ({}x{})",
        input.display(),
        output.display(),
        mono.width(),
        mono.height()
    );
    Ok(())
}

/// Print effective configuration and available commands
fn run_status_command() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let config = AppConfig::load();
    let set = |v: bool| if v { "set" } else { "(not set)" };

    println!("Receiptbooth v{VERSION}");
    println!("Photobooth media, payment and receipt-printer backend\n");

    println!("Server:");
    println!("  BIND_ADDR        = {}", config.server.bind_addr);
    println!(
        "  API_KEY          = {}",
        set(config.server.api_key.is_some())
    );
    if config.server.allows_any_origin() {
        println!("  ALLOWED_ORIGINS  = * (any origin)");
    } else {
        println!(
            "  ALLOWED_ORIGINS  = {}",
            config.server.cors_origins().join(", ")
        );
    }
    println!(
        "  Rate limits      = {} uploads, {} views per {}s",
        config.server.upload_rate_limit,
        config.server.view_rate_limit,
        config.server.rate_limit_window_secs
    );
    println!(
        "  TRUST_PROXY      = {}",
        if config.server.trust_proxy {
            "true (clients keyed by X-Forwarded-For)"
        } else {
            "false (clients keyed by peer address)"
        }
    );

    println!("\nStorage:");
    match &config.storage.bucket {
        Some(bucket) => println!("  FIREBASE_BUCKET  = {bucket}"),
        None => println!("  FIREBASE_BUCKET  = (not set, uploads kept in memory)"),
    }

    println!("\nPayment gateway:");
    match config.payment.validate() {
        Ok(creds) => {
            println!("  DUITKU_BASE_URL  = {}", creds.base_url);
            println!("  BASE_URL         = {}", creds.public_base_url);
        }
        Err(e) => println!("  {e}"),
    }

    println!("\nPrinter:");
    match &config.printer.device {
        Some(path) => println!("  PRINTER_DEVICE   = {}", path.display()),
        None => println!("  PRINTER_DEVICE   = (not set, printing disabled)"),
    }
    println!("  PRINTER_WIDTH    = {} dots", config.printer.width);

    println!("\nCommands:");
    println!("  receiptbooth serve    Start the HTTP server");
    println!("  receiptbooth dither   Preview an image as it would be printed");
    println!("\nRun 'receiptbooth --help' for more details.");
}

/// Run the HTTP server
async fn run_server() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "receiptbooth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load();
    let bind_addr = config.server.bind_addr.clone();

    // Create application state using shared server module
    let state = server::create_app_state(config)?;

    // Build router: shared API routes plus production-only documentation
    let app = server::build_router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Receiptbooth server listening");

    // Peer addresses feed the per-client rate limits
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
