use std::path::PathBuf;

use clap::{Parser, Subcommand};
use heroconfig::PowerSetting;

#[derive(Parser, Debug)]
#[command(
    name = "nebula",
    author,
    version,
    about = "Animated shader hero background",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file; `<config dir>/nebula.toml` is used when present.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Fragment shader to render instead of the built-in nebula.
    #[arg(long, value_name = "FILE")]
    pub shader: Option<PathBuf>,

    /// Initial window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Fraction of the display's pixel density to render at (scale never drops below 1).
    #[arg(long, value_name = "FACTOR", value_parser = parse_dpr_factor)]
    pub dpr_factor: Option<f32>,

    /// GPU adapter preference: `low` or `high`.
    #[arg(long, value_name = "low|high", value_parser = parse_power)]
    pub power: Option<PowerSetting>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a fragment shader against the uniform contract without opening a window.
    Check {
        #[arg(value_name = "SHADER")]
        shader: PathBuf,
    },
    /// Print the resolved configuration directory and file.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WIDTHxHEIGHT, e.g. 1280x720".to_string())?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", height.trim()))?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_dpr_factor(value: &str) -> Result<f32, String> {
    let factor: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid factor '{}'", value.trim()))?;
    if !factor.is_finite() || factor <= 0.0 {
        return Err("factor must be a positive number".into());
    }
    Ok(factor)
}

pub fn parse_power(value: &str) -> Result<PowerSetting, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" | "low-power" | "integrated" => Ok(PowerSetting::Low),
        "high" | "high-performance" | "discrete" => Ok(PowerSetting::High),
        other => Err(format!("unknown power preference '{other}'; expected low or high")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_window_sizes() {
        assert_eq!(parse_size("1280x720").unwrap(), (1280, 720));
        assert_eq!(parse_size(" 800 X 600 ").unwrap(), (800, 600));
        assert!(parse_size("1280").is_err());
        assert!(parse_size("0x720").is_err());
        assert!(parse_size("widex720").is_err());
    }

    #[test]
    fn dpr_factor_must_be_positive() {
        assert_eq!(parse_dpr_factor("0.75").unwrap(), 0.75);
        assert!(parse_dpr_factor("0").is_err());
        assert!(parse_dpr_factor("-1").is_err());
        assert!(parse_dpr_factor("inf").is_err());
    }

    #[test]
    fn parses_power_aliases() {
        assert_eq!(parse_power("HIGH").unwrap(), PowerSetting::High);
        assert_eq!(parse_power("integrated").unwrap(), PowerSetting::Low);
        assert!(parse_power("turbo").is_err());
    }

    #[test]
    fn check_subcommand_takes_a_path() {
        let cli = Cli::try_parse_from(["nebula", "check", "hero.frag"]).unwrap();
        match cli.command {
            Some(Command::Check { shader }) => assert_eq!(shader, PathBuf::from("hero.frag")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn run_flags_parse_without_subcommand() {
        let cli = Cli::try_parse_from([
            "nebula",
            "--size",
            "1024x768",
            "--dpr-factor",
            "1.0",
            "--power",
            "high",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.size, Some((1024, 768)));
        assert_eq!(cli.run.dpr_factor, Some(1.0));
        assert_eq!(cli.run.power, Some(PowerSetting::High));
    }
}
