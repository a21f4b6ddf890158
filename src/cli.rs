#[derive(clap::Parser, Debug)]
#[clap(about, long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// Stack machine code
    Code,
    /// One line per code generation request
    Trace,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Command {
    /// Compile a file to stack machine code
    Compile {
        file: std::path::PathBuf,

        /// The file name of the generated output, stdout if omitted
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,

        /// Specifies the output format
        #[arg(short, long)]
        #[clap(value_enum, default_value_t = OutputFormat::Code)]
        format: OutputFormat,
    },

    /// Parse and type check a file without generating code
    Check { file: std::path::PathBuf },
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::{Cli, Command, OutputFormat};

    #[test]
    fn compile_defaults_to_code() {
        let cli = Cli::try_parse_from(["luma", "compile", "main.tl"]).unwrap();
        match cli.command {
            Command::Compile { output, format, .. } => {
                assert_eq!(output, None);
                assert_eq!(format, OutputFormat::Code);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn compile_trace_to_file() {
        let cli =
            Cli::try_parse_from(["luma", "compile", "main.tl", "-f", "trace", "-o", "out.txt"])
                .unwrap();
        match cli.command {
            Command::Compile { output, format, .. } => {
                assert_eq!(output, Some("out.txt".into()));
                assert_eq!(format, OutputFormat::Trace);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn check_needs_file() {
        assert!(Cli::try_parse_from(["luma", "check"]).is_err());
    }
}
