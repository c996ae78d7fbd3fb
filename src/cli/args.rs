// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::{Args, Parser, Subcommand};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Run Options:
    --source, -s <DIR>       Directory of frame images, processed in name order
    --landmarks, -l <FILE>   JSON file with one landmark list per frame
    --config, -c <FILE>      Visual pass configuration (JSON)
    --output, -o <DIR>       Output directory [default: runs/overlay]
    --fps <FPS>              Frame rate of the recording [default: 30]
    --height <METERS>        Subject height for physical-unit conversion
    --smart-skip <BOOL>      Reuse pose samples when motion is small [default: true]
    --skip-threshold <T>     Mean squared-displacement skip threshold [default: 6]
    --verbose <BOOL>         Show verbose output [default: true]

Examples:
    motion-overlay run --source frames/ --landmarks pose.json --config visuals.json
    motion-overlay run -s frames/ -l pose.json -c visuals.json -o out/
    motion-overlay run -s frames/ -l pose.json --fps 60 --height 1.8
    motion-overlay run -s frames/ -l pose.json --smart-skip false"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render the configured overlay passes over a recorded frame sequence
    Run(RunArgs),
}

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory of frame images, processed in name order
    #[arg(short, long)]
    pub source: String,

    /// JSON file with one landmark list per frame
    #[arg(short, long)]
    pub landmarks: String,

    /// Visual pass configuration (JSON)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output directory for rendered frames
    #[arg(short, long, default_value = "runs/overlay")]
    pub output: String,

    /// Frame rate of the recording
    #[arg(long, default_value_t = 30.0)]
    pub fps: f32,

    /// Subject height in meters for physical-unit conversion
    #[arg(long)]
    pub height: Option<f32>,

    /// Reuse the previous pose sample when inter-frame motion is small
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub smart_skip: bool,

    /// Mean squared-displacement threshold (px^2) for sample reuse
    #[arg(long, default_value_t = 6.0)]
    pub skip_threshold: f32,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_args_defaults() {
        let args = Cli::parse_from([
            "app",
            "run",
            "--source",
            "frames/",
            "--landmarks",
            "pose.json",
        ]);
        match args.command {
            Commands::Run(run_args) => {
                assert_eq!(run_args.source, "frames/");
                assert_eq!(run_args.landmarks, "pose.json");
                assert_eq!(run_args.output, "runs/overlay");
                assert!((run_args.fps - 30.0).abs() < f32::EPSILON);
                assert!(run_args.smart_skip);
                assert!(run_args.verbose);
                assert!(run_args.config.is_none());
                assert!(run_args.height.is_none());
            }
        }
    }

    #[test]
    fn test_run_args_custom() {
        let args = Cli::parse_from([
            "app",
            "run",
            "-s",
            "frames/",
            "-l",
            "pose.json",
            "-c",
            "visuals.json",
            "--fps",
            "60",
            "--height",
            "1.85",
            "--smart-skip",
            "false",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Run(run_args) => {
                assert_eq!(run_args.config, Some("visuals.json".to_string()));
                assert!((run_args.fps - 60.0).abs() < f32::EPSILON);
                assert_eq!(run_args.height, Some(1.85));
                assert!(!run_args.smart_skip);
                assert!(!run_args.verbose);
            }
        }
    }
}
