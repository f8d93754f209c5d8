use std::fs;
use std::io;
use std::path::PathBuf;

use clap::Args as ClapArgs;
use clap::Parser;
use clap::Subcommand;
use miette::IntoDiagnostic;
use miette::WrapErr;
use symexpr::{
    CommandError, Environment, Expression, Lexer, SyntaxError, commands::parse_binding,
    differentiate_text, simplify_text,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Parse, differentiate and simplify polynomial expressions")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the tokens of an expression
    Tokenize {
        #[command(flatten)]
        input: Input,
    },
    /// Print an expression in canonical form
    Parse {
        #[command(flatten)]
        input: Input,
    },
    /// Print the derivative of an expression
    Differentiate {
        #[command(flatten)]
        input: Input,
        /// Variable to differentiate by
        #[arg(long = "by", value_name = "VAR")]
        variable: String,
    },
    /// Substitute values for variables and fold constants
    Simplify {
        #[command(flatten)]
        input: Input,
        /// Binding used for substitution, may be repeated
        #[arg(long = "let", value_name = "NAME=VALUE", value_parser = parse_binding)]
        bindings: Vec<(String, f64)>,
    },
    /// Read expressions and `!` commands from stdin
    Repl,
}

impl Commands {
    /// Runs the subcommands that turn one expression into another.
    fn transform(&self, text: &str) -> Option<Result<String, CommandError>> {
        match self {
            Commands::Differentiate { variable, .. } => Some(differentiate_text(text, variable)),
            Commands::Simplify { bindings, .. } => Some(
                Environment::try_from_iter(bindings.iter().cloned())
                    .map_err(CommandError::from)
                    .and_then(|environment| simplify_text(text, &environment)),
            ),
            _ => None,
        }
    }
}

#[derive(ClapArgs, Debug)]
#[group(required = true, multiple = false)]
struct Input {
    /// The expression text
    expression: Option<String>,
    /// Read the expression from a file instead
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl Input {
    /// Returns the source name used in diagnostics and the expression text.
    fn load(&self) -> miette::Result<(Option<String>, String)> {
        match (&self.expression, &self.file) {
            (Some(expression), _) => Ok((None, expression.clone())),
            (None, Some(filename)) => {
                let file_contents = fs::read_to_string(filename)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("reading `{}` failed", filename.display()))?;
                Ok((Some(filename.display().to_string()), file_contents))
            }
            (None, None) => Err(miette::miette!("no expression given")),
        }
    }
}

fn parse_or_exit(filename: Option<&str>, contents: &str) -> Expression {
    match symexpr::Parser::new(filename, contents).parse() {
        Ok(expression) => expression,
        Err(e) => exit_with_syntax_error(e),
    }
}

fn exit_with_syntax_error(e: SyntaxError) -> ! {
    eprintln!("[line {}] Error: {}", e.line(), e.reason());
    eprintln!("{:?}", miette::Report::new(e));
    std::process::exit(65);
}

fn print_or_exit(result: Result<String, CommandError>) -> miette::Result<()> {
    match result {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(CommandError::InvalidExpression(e)) => exit_with_syntax_error(e),
        Err(e) => Err(e.into()),
    }
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match &args.command {
        Commands::Tokenize { input } => {
            let (filename, file_contents) = input.load()?;
            for token in Lexer::new(filename.as_deref(), &file_contents) {
                let token = match token {
                    Ok(token) => token,
                    Err(e) => exit_with_syntax_error(e),
                };
                println!("{token}");
            }
            println!("EOF  null");
        }
        Commands::Parse { input } => {
            let (filename, file_contents) = input.load()?;
            println!("{}", parse_or_exit(filename.as_deref(), &file_contents));
        }
        Commands::Differentiate { input, .. } | Commands::Simplify { input, .. } => {
            let (_, file_contents) = input.load()?;
            if let Some(result) = args.command.transform(&file_contents) {
                print_or_exit(result)?;
            }
        }
        Commands::Repl => {
            symexpr::repl::run(io::stdin().lock(), io::stdout().lock())
                .into_diagnostic()
                .wrap_err("reading from stdin failed")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn command(args: &[&str]) -> Commands {
        let args = std::iter::once("symexpr").chain(args.iter().copied());
        Args::try_parse_from(args).unwrap().command
    }

    #[test]
    fn differentiate_goes_through_the_command_layer() {
        let differentiate = command(&["differentiate", "x*x", "--by", "x"]);
        assert_eq!(
            differentiate.transform("x*x").unwrap().unwrap(),
            differentiate_text("x*x", "x").unwrap()
        );
        assert!(matches!(
            differentiate.transform("x *"),
            Some(Err(CommandError::InvalidExpression(_)))
        ));

        let bad_variable = command(&["differentiate", "x", "--by", "x2"]);
        assert!(matches!(
            bad_variable.transform("x"),
            Some(Err(CommandError::InvalidValue(_)))
        ));
    }

    #[test]
    fn simplify_goes_through_the_command_layer() {
        let simplify = command(&["simplify", "x*x + y", "--let", "x=3", "--let", "y=1"]);
        assert_eq!(simplify.transform("x*x + y").unwrap().unwrap(), "10.0000");

        let negative = command(&["simplify", "x", "--let", "x=-1"]);
        assert!(matches!(
            negative.transform("x"),
            Some(Err(CommandError::InvalidValue(_)))
        ));
    }

    #[test]
    fn other_commands_do_not_transform() {
        assert!(command(&["parse", "x"]).transform("x").is_none());
        assert!(command(&["repl"]).transform("x").is_none());
    }
}
