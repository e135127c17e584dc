use clap::Parser;
use rusclimate::{
    Codec, Config, Property, Topics, Value,
    actor::{Actor, Handle, Output},
    config,
};
use std::error::Error;
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    sync::mpsc,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file (uses the default topics if omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Turbo reconciliation delay in milliseconds (overrides the configuration)
    #[arg(short, long)]
    turbo_reconcile_ms: Option<f64>,
}

fn default_topics() -> Topics {
    Topics {
        set_active: Some("rusclimate/control/mode".into()),
        get_active: Some("rusclimate/state/mode".into()),
        set_rotation_speed: Some("rusclimate/control/speed".into()),
        get_rotation_speed: Some("rusclimate/state/speed".into()),
    }
}

fn parse_value(raw: &str) -> Value {
    match raw {
        "true" | "on" => Value::Bool(true),
        "false" | "off" => Value::Bool(false),
        _ => raw
            .parse::<f64>()
            .map_or_else(|_| Value::from(raw), Value::Number),
    }
}

fn handle_line(handle: &Handle, line: &str) -> Result<bool, Box<dyn Error>> {
    let mut parts = line.split_whitespace();

    match (parts.next(), parts.next(), parts.next()) {
        (Some("set"), Some(prop), Some(val)) => match prop.parse::<Property>() {
            Ok(prop) => handle.set(prop, parse_value(val))?,
            Err(_) => eprintln!("Unknown property: {prop}"),
        },
        (Some("tagged"), Some(tag), Some(val)) => handle.set_tagged(tag, parse_value(val))?,
        (Some("recv"), Some(topic), Some(payload)) => handle.receive(topic, payload)?,
        (Some("quit" | "exit"), None, None) => return Ok(false),
        (None, _, _) => {}
        _ => eprintln!("Usage: set <property> <value> | tagged <tag> <value> | recv <topic> <payload> | quit"),
    }

    Ok(true)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config {
            topics: default_topics(),
            ..Config::default()
        },
    };

    if let Some(ms) = args.turbo_reconcile_ms {
        cfg.turbo_reconcile = config::delay_from_millis(ms);
    }

    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let (handle, task) = Actor::spawn(Codec::new(&cfg, out_tx));
    let printer = tokio::spawn(async move {
        while let Some(out) = out_rx.recv().await {
            match out {
                Output::Publish { topic, payload } => println!("publish {topic} {payload}"),
                Output::Notify(prop, val) => println!("notify {prop} {val}"),
            }
        }
    });

    let mut lines = BufReader::new(io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if !handle_line(&handle, line.trim())? {
            break;
        }
    }

    // Stopping the actor drops the codec and closes the output channel
    drop(handle);
    task.await?;
    printer.await?;

    Ok(())
}
