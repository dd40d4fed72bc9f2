use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "gaussqual")]
#[command(about = "Assess greyscale image quality with Gaussian mixture models")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Also write daily rolling log files into this directory.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a single 2-D image.
    Single(SingleArgs),

    /// Fit slices sampled from a 3-D image sequence.
    Stack(StackArgs),
}

#[derive(Debug, Clone, Args)]
pub struct SingleArgs {
    /// Path to the image to analyse.
    #[arg(long, short = 'i')]
    pub image: PathBuf,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

#[derive(Debug, Clone, Args)]
pub struct StackArgs {
    /// Directory holding the numbered slice images, e.g. `<dir>/scan_0000.tif`.
    #[arg(long, short = 'd')]
    pub dir: PathBuf,

    /// Central percentage of the stack depth to sample slices from.
    #[arg(long, short = 'z')]
    pub z_percentage: Option<f64>,

    /// Number of slices to sample.
    #[arg(long, short = 'r')]
    pub runs: Option<usize>,

    /// Maximum number of slices fitted concurrently. Defaults to the core count.
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

/// Options shared by both modes. Each one overrides the value from `--config`.
#[derive(Debug, Clone, Default, Args)]
pub struct AnalysisArgs {
    /// YAML or JSON file with run settings.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Number of Gaussian components to fit.
    #[arg(long, short = 'n')]
    pub n_components: Option<usize>,

    /// Centred percentage of each image axis to keep.
    #[arg(long)]
    pub mask_percentage: Option<f64>,

    /// Only fit grey values within [MIN, MAX].
    #[arg(
        long,
        short = 't',
        num_args = 2,
        value_names = ["MIN", "MAX"],
        allow_negative_numbers = true
    )]
    pub threshold: Option<Vec<f64>>,

    /// Initial component means, comma separated.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub initial_means: Option<Vec<f64>>,

    /// Background component indices for SNR/CNR, comma separated.
    #[arg(long, short = 'b', value_delimiter = ',')]
    pub background: Option<Vec<usize>>,

    /// Feature component indices for SNR/CNR, paired with --background.
    #[arg(long, short = 'f', value_delimiter = ',')]
    pub feature: Option<Vec<usize>>,

    /// Material names in ascending grey-value order, e.g. `--material-names air wax tissue`.
    #[arg(long, num_args = 1..)]
    pub material_names: Option<Vec<String>>,

    /// Seed for the initial-mean selection.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Save verbosity: -s writes the run settings, -ss also the fitted results.
    #[arg(short = 's', long = "save", action = ArgAction::Count)]
    pub save: u8,

    /// Directory for saved files. Defaults to `results` next to the input.
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single() {
        let cli = Cli::try_parse_from([
            "gaussqual",
            "single",
            "--image",
            "scan.tif",
            "-n",
            "3",
            "--threshold",
            "10",
            "250",
            "--initial-means",
            "50,150,220",
            "-b",
            "0,0",
            "-f",
            "1,2",
            "--material-names",
            "air",
            "wax",
            "tissue",
            "-ss",
        ])
        .unwrap();

        let Command::Single(args) = cli.command else {
            panic!("expected single mode");
        };
        assert_eq!(args.image, PathBuf::from("scan.tif"));
        let analysis = args.analysis;
        assert_eq!(analysis.n_components, Some(3));
        assert_eq!(analysis.threshold, Some(vec![10.0, 250.0]));
        assert_eq!(analysis.initial_means, Some(vec![50.0, 150.0, 220.0]));
        assert_eq!(analysis.background, Some(vec![0, 0]));
        assert_eq!(analysis.feature, Some(vec![1, 2]));
        assert_eq!(analysis.material_names.unwrap().len(), 3);
        assert_eq!(analysis.save, 2);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_parse_stack() {
        let cli = Cli::try_parse_from([
            "gaussqual",
            "--log-level",
            "debug",
            "stack",
            "-d",
            "/data/scan",
            "-n",
            "2",
            "-z",
            "50",
            "--runs",
            "10",
            "--workers",
            "4",
        ])
        .unwrap();

        let Command::Stack(args) = cli.command else {
            panic!("expected stack mode");
        };
        assert_eq!(args.z_percentage, Some(50.0));
        assert_eq!(args.runs, Some(10));
        assert_eq!(args.workers, Some(4));
        assert_eq!(args.analysis.save, 0);
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_threshold_needs_two_values() {
        assert!(Cli::try_parse_from([
            "gaussqual",
            "single",
            "--image",
            "a.png",
            "--threshold",
            "10"
        ])
        .is_err());
    }
}
