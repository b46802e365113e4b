use super::args::*;

pub mod actions;
pub mod check;
pub mod validate;

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Check(args) => check::run(args),
        Command::Actions(args) => actions::run(args),
        Command::Validate(args) => validate::run(args),
    }
}
