use crate::config::load_config;
use crate::grid_dump::{write_grid_dump, GridDump};
use crate::loader::{load_json, load_yaml, LoadOutput};
use crate::sim::{LinkVariant, SimulatorObject, SystemSimulator, SystemVariant};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "flowgrid", version, about = "Architecture diagram layout on a tile grid")]
pub struct Args {
    /// Input spec (.yaml/.yml/.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Config JSON file (route weight, turn penalty)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Exit with an error when the spec has validation problems
    #[arg(long = "strict")]
    pub strict: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Ascii,
}

pub fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let (input, is_json) = read_input(args.input.as_deref())?;
    let LoadOutput { mut system, errors } = if is_json {
        load_json(&input)?
    } else {
        load_yaml(&input)?
    };

    for error in &errors {
        eprintln!("{}: {}", error.path, error.message);
    }
    if args.strict && !errors.is_empty() {
        return Err(anyhow::anyhow!(
            "{} validation error(s) in strict mode",
            errors.len()
        ));
    }

    let simulator = SystemSimulator::compute(&mut system, &config);

    match args.format {
        OutputFormat::Json => match &args.output {
            Some(path) => write_grid_dump(path, &simulator, &system)?,
            None => {
                let dump = GridDump::from_simulator(&simulator, &system);
                serde_json::to_writer_pretty(io::stdout().lock(), &dump)?;
                println!();
            }
        },
        OutputFormat::Ascii => {
            let art = render_ascii(&simulator);
            match &args.output {
                Some(path) => std::fs::write(path, art)?,
                None => io::stdout().lock().write_all(art.as_bytes())?,
            }
        }
    }

    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<(String, bool)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, false));
        }
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        return Ok((content, is_json));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, false))
}

/// One character per tile from the top of each cell stack. Purely a
/// debugging aid; the real renderer consumes the JSON dump.
fn render_ascii(simulator: &SystemSimulator) -> String {
    let grid = simulator.layout();
    let mut out = String::with_capacity(((grid.width() + 1) * grid.height()) as usize);
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            out.push(tile_char(grid.top(x, y)));
        }
        out.push('\n');
    }
    out
}

fn tile_char(object: Option<&SimulatorObject>) -> char {
    match object {
        None => ' ',
        Some(SimulatorObject::System {
            blackbox: true, ..
        }) => '#',
        Some(SimulatorObject::System { variant, .. }) => match variant {
            SystemVariant::TopLeft
            | SystemVariant::TopRight
            | SystemVariant::BottomLeft
            | SystemVariant::BottomRight => '+',
            SystemVariant::TopCenter | SystemVariant::BottomCenter => '-',
            SystemVariant::CenterLeft | SystemVariant::CenterRight => '|',
            SystemVariant::CenterCenter => ' ',
        },
        Some(SimulatorObject::Port { .. }) => 'o',
        Some(SimulatorObject::Link { variant, .. }) => match variant {
            LinkVariant::Horizontal => '-',
            LinkVariant::Vertical => '|',
            _ => '+',
        },
        Some(SimulatorObject::SystemMargin { .. }) => ' ',
        Some(SimulatorObject::SystemTitle { chars, .. }) => chars.chars().next().unwrap_or(' '),
        Some(SimulatorObject::SystemTitlePadding { .. }) => ' ',
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulatorConfig;

    #[test]
    fn ascii_rendering_shows_boxes_and_links() {
        let output =
            load_yaml("systems:\n  - id: foo\n  - id: bar\nlinks:\n  - { a: foo, b: bar }\n")
                .unwrap();
        let mut system = output.system;
        let simulator = SystemSimulator::compute(&mut system, &SimulatorConfig::default());
        let art = render_ascii(&simulator);
        assert!(art.contains('#'));
        assert!(art.contains('o'));
        assert!(art.contains('-'));
    }
}
