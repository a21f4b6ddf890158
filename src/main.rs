mod cli;
mod codegen;
mod error;
mod syntax;

use std::{fs, path::Path, process};

use clap::Parser as _;

use cli::{Cli, Command, OutputFormat};
use codegen::{recorder::Recorder, stack_code::StackCode, Generator};
use error::{ErrorKind, PResult};
use syntax::Parser;

fn read_source(path: &Path) -> PResult<String> {
    fs::read_to_string(path)
        .map_err(|why| ErrorKind::Internal(format!("cannot read {}: {why}", path.display())))
}

fn compile<G: Generator>(src: &str, gen: G) -> PResult<String> {
    let gen = Parser::new(src, gen).parse_program()?;
    Ok(gen.finish())
}

fn run(cli: Cli) -> PResult<()> {
    match cli.command {
        Command::Compile {
            file,
            output,
            format,
        } => {
            let src = read_source(&file)?;
            log::info!("compiling {} as {format:?}", file.display());

            let code = match format {
                OutputFormat::Code => compile(&src, StackCode::new())?,
                OutputFormat::Trace => compile(&src, Recorder::new())?,
            };

            match output {
                Some(path) => fs::write(&path, code).map_err(|why| {
                    ErrorKind::Internal(format!("cannot write {}: {why}", path.display()))
                }),
                None => {
                    print!("{code}");
                    Ok(())
                }
            }
        }
        Command::Check { file } => {
            let src = read_source(&file)?;
            Parser::new(&src, Recorder::new()).parse_program()?;
            log::info!("{} is well formed", file.display());
            Ok(())
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(why) = run(cli) {
        eprintln!("error: {why}");
        process::exit(why.exit_code());
    }
}
