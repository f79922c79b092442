//! gloveline CLI
//!
//! Usage:
//!   gloveline                                 # Live: read the glove on the configured port
//!   gloveline --port COM5 --scene MiniGame_1  # Live, starting in a given scene
//!   gloveline --list-ports                    # Show serial ports
//!   gloveline --interactive                   # Type glove lines on stdin
//!   gloveline --replay session.txt            # Replay a captured line log
//!   gloveline --serve                         # HTTP/WebSocket bridge
//!   gloveline --replay session.txt --json     # JSON output

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

use gloveline::core::{list_ports, run_server, GloveController, GloveEventSink, SceneBindings, SerialLink, SerialSettings};
use gloveline::types::{EventOutput, ReasonCode};
use gloveline::{load_config, GloveConfig, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "gloveline",
    version = VERSION,
    about = "Decode a sensor glove's serial stream into game input events",
    long_about = "gloveline reads the text-line stream of the Bearly Different sensor glove\n\
                  (accelerometer + five flex sensors), decodes poses and finger gestures,\n\
                  and routes them according to the active scene.\n\n\
                  Modes:\n  \
                  (default)      Live serial input\n  \
                  --interactive  Glove lines typed on stdin\n  \
                  --replay FILE  Glove lines from a file, simulated frame clock\n  \
                  --serve        HTTP/WebSocket bridge for an external game\n\n\
                  In interactive and replay input, ':scene NAME' switches scenes and\n\
                  ':wait MS' lets the frame clock run."
)]
struct Args {
    /// Serial port (overrides config)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (overrides config)
    #[arg(short, long)]
    baud: Option<u32>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<String>,

    /// Scene to start in
    #[arg(long, default_value = "0Home")]
    scene: String,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Interactive mode - read glove lines from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Replay glove lines from a file
    #[arg(short, long)]
    replay: Option<String>,

    /// Run as HTTP/WebSocket bridge
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Debug logging
    #[arg(long)]
    verbose: bool,

    /// Frame period in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
}

/// Sink for terminal use; the event line already lists the calls
struct ConsoleSink;

impl GloveEventSink for ConsoleSink {
    fn open_help(&mut self) -> bool {
        true
    }
    fn panel_next(&mut self) -> bool {
        true
    }
    fn panel_prev(&mut self) -> bool {
        true
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.no_color {
        colored::control::set_override(false);
    }

    if args.list_ports {
        run_list_ports();
        return;
    }

    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(ref path) = args.replay {
        run_replay(path, config, &args);
    } else if args.interactive {
        run_interactive(config, &args);
    } else if args.serve {
        run_serve(config, &args).await;
    } else {
        run_live(config, &args).await;
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()),
        )
        .with_writer(io::stderr)
        .init();
}

/// Config file (or defaults) with command-line overrides
fn build_config(args: &Args) -> Result<GloveConfig, gloveline::GloveError> {
    let mut config = match args.config {
        Some(ref path) => load_config(path)?,
        None => GloveConfig::default(),
    };
    if let Some(ref port) = args.port {
        config.port = port.clone();
    }
    if let Some(baud) = args.baud {
        config.baud = baud;
    }
    config.validate()?;
    Ok(config)
}

fn run_list_ports() {
    match list_ports() {
        Ok(ports) if ports.is_empty() => println!("No serial ports found"),
        Ok(ports) => {
            for p in ports {
                println!("{}", p);
            }
        }
        Err(e) => {
            eprintln!("Could not list ports: {}", e);
            std::process::exit(1);
        }
    }
}

fn new_controller(config: GloveConfig, args: &Args, now: Instant) -> GloveController {
    let mut controller = GloveController::new(config);
    let out = controller.on_scene_changed(&args.scene, SceneBindings::with_sink(ConsoleSink), now);
    print_event(&out, args);
    controller
}

/// Open the glove; `None` means no glove input this session
fn connect(config: &GloveConfig) -> Option<SerialLink> {
    match SerialLink::connect(&SerialSettings::from_config(config)) {
        Ok(link) => Some(link),
        Err(e) => {
            tracing::error!("glove unavailable ({}): {}", ReasonCode::R501_PORT_UNAVAILABLE.code(), e);
            None
        }
    }
}

/// Live serial mode
async fn run_live(config: GloveConfig, args: &Args) {
    let link = connect(&config);
    let Some(link) = link else {
        eprintln!("No glove connected; falling back to interactive input.");
        run_interactive(config, args);
        return;
    };

    print_header("Live", args.no_color);
    println!("Reading {}. Ctrl-C to quit.", link.port_name());
    println!();

    let mut controller = new_controller(config, args, Instant::now());
    controller.attach_link(link);

    let mut interval = tokio::time::interval(Duration::from_millis(args.frame_ms.max(1)));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                for out in controller.update(Instant::now()) {
                    print_event(&out, args);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.detach_link();
    let status = controller.status();
    println!("\nSession ended. Lines: {} | Events: {}", status.lines_seen, status.events_emitted);
}

/// Interactive stdin mode; every input line runs one frame
fn run_interactive(config: GloveConfig, args: &Args) {
    print_header("Interactive", args.no_color);
    println!("Type glove lines (e.g. 'flex 1 0 1 1 1', 'thumb', '1.05 1.90 10.21').");
    println!("':scene NAME' switches scenes, ':wait MS' runs frames. Type 'quit' to exit.");
    println!();

    let frame = Duration::from_millis(args.frame_ms.max(1));
    let mut controller = new_controller(config, args, Instant::now());
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("[{}] > ", controller.mode());
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let now = Instant::now();
        match parse_directive(line) {
            Some(Directive::Scene(scene)) => {
                let out = controller.on_scene_changed(scene, SceneBindings::with_sink(ConsoleSink), now);
                print_event(&out, args);
            }
            Some(Directive::Wait(ms)) => {
                // Real time: sleep one frame at a time so timers see it pass
                let end = now + Duration::from_millis(ms);
                while Instant::now() < end {
                    std::thread::sleep(frame);
                    for out in controller.update(Instant::now()) {
                        print_event(&out, args);
                    }
                }
            }
            None => {
                if !controller.inject_raw(line) {
                    println!("(ignored)");
                    continue;
                }
                for out in controller.update(now) {
                    print_event(&out, args);
                }
            }
        }
    }

    let status = controller.status();
    println!("\nSession ended. Lines: {} | Events: {}", status.lines_seen, status.events_emitted);
}

/// Replay a line log on a simulated clock: one frame per line
fn run_replay(path: &str, config: GloveConfig, args: &Args) {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Could not read {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let frame = Duration::from_millis(args.frame_ms.max(1));
    let mut now = Instant::now();
    let mut controller = new_controller(config, args, now);

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#')) {
        match parse_directive(line) {
            Some(Directive::Scene(scene)) => {
                let out = controller.on_scene_changed(scene, SceneBindings::with_sink(ConsoleSink), now);
                print_event(&out, args);
            }
            Some(Directive::Wait(ms)) => {
                let end = now + Duration::from_millis(ms);
                while now < end {
                    now += frame;
                    for out in controller.update(now) {
                        print_event(&out, args);
                    }
                }
            }
            None => {
                controller.inject_raw(line);
                now += frame;
                for out in controller.update(now) {
                    print_event(&out, args);
                }
            }
        }
    }

    let status = controller.status();
    if !args.json {
        println!("\nReplay done. Lines: {} | Events: {}", status.lines_seen, status.events_emitted);
    }
}

enum Directive<'a> {
    Scene(&'a str),
    Wait(u64),
}

fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let rest = line.strip_prefix(':')?;
    let (cmd, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    match cmd {
        "scene" if !arg.trim().is_empty() => Some(Directive::Scene(arg.trim())),
        "wait" => arg.trim().parse().ok().map(Directive::Wait),
        _ => None,
    }
}

/// Run HTTP/WebSocket bridge
async fn run_serve(config: GloveConfig, args: &Args) {
    print_header("Bridge", args.no_color);

    let link = connect(&config);
    let mut controller = GloveController::new(config);
    if let Some(link) = link {
        controller.attach_link(link);
    }

    if let Err(e) = run_server(&args.addr, controller, &args.scene).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn print_event(out: &EventOutput, args: &Args) {
    if args.json {
        println!("{}", serde_json::to_string(out).unwrap_or_default());
    } else if args.no_color {
        println!("{}", out.to_parseable_string());
    } else {
        println!("{}", out.to_terminal_string());
    }
}

/// Print header
fn print_header(mode: &str, no_color: bool) {
    if no_color {
        println!("========================================");
        println!("  gloveline v{} - {}", VERSION, mode);
        println!("========================================");
    } else {
        println!("\x1b[1m╔════════════════════════════════════════╗\x1b[0m");
        println!("\x1b[1m║  🧤 gloveline v{} - {:<20}║\x1b[0m", VERSION, mode);
        println!("\x1b[1m╚════════════════════════════════════════╝\x1b[0m");
    }
    println!();
}
