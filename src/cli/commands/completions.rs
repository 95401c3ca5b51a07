use crate::cli::Cli;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io::{self, Write};

pub fn execute(shell: Shell) {
    write_script(shell, &mut io::stdout());
}

/// Completion script for `shell`, named after the binary the CLI declares
fn write_script(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin_name, out);
}
