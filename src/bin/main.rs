use std::{error::Error, fs, path::Path, sync::Arc};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use jvmnode::{
    cli::{Cli, Commands, parse_args},
    config::load_manifest,
    log_config::{LogFormat, manifest::LogConfigManifest},
    node::{GuardedNode, NodeRunner, TracingErrorReporter},
    properties::PropertiesFile,
    supervisor::{ProcessKiller, ProcessMonitor},
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();
    init_logging(&args);

    match args.command {
        Commands::Setup { manifest } => {
            let node = build_node(&manifest)?;
            node.setup()?;
            info!("Setup complete");
        }
        Commands::Run {
            manifest,
            once,
            no_setup,
        } => {
            let node = build_node(&manifest)?;
            if !no_setup {
                node.setup()?;
            }

            let killer = Arc::new(ProcessKiller::new());
            register_signal_handler(Arc::clone(&killer))?;

            let monitor: Arc<dyn ProcessMonitor> = killer;
            let code = node.run(!once, Some(monitor))?;
            if code != 0 {
                warn!("Node exited with code {code}");
            }
            std::process::exit(code);
        }
        Commands::Render {
            manifest,
            format,
            output,
        } => render(&manifest, format, output.as_deref())?,
        Commands::Inspect { file } => {
            let content = fs::read_to_string(&file)?;
            let properties = PropertiesFile::parse(&content)?;
            for (key, value) in properties.entries() {
                println!("{key} = {value}");
            }
        }
    }

    Ok(())
}

fn init_logging(args: &Cli) {
    let filter = if let Some(level) = args.log_level {
        EnvFilter::new(level.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_node(manifest_path: &Path) -> Result<impl NodeRunner, Box<dyn Error>> {
    let manifest = load_manifest(Some(manifest_path))?;
    let node = manifest.build()?;
    Ok(GuardedNode::new(
        node,
        manifest.node_id(),
        Arc::new(TracingErrorReporter),
    ))
}

fn render(
    manifest_path: &Path,
    format: LogFormat,
    output: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let config = LogConfigManifest::load(manifest_path)?.resolve()?;
    let rendered = format.renderer().render(&config)?;
    match output {
        Some(path) => {
            fs::write(path, &rendered)?;
            info!("Wrote {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn register_signal_handler(killer: Arc<ProcessKiller>) -> Result<(), Box<dyn Error>> {
    ctrlc::set_handler(move || {
        eprintln!("jvmnode is shutting down... killing supervised processes");
        killer.kill_all();
        std::process::exit(130);
    })?;

    Ok(())
}
