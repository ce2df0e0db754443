use clap::Parser;
use miette::Result;

use guesttracker::cli::{self, Cli};
use guesttracker::logging;

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    logging::init(cli.global.verbose, cli.global.quiet);

    cli::run(cli)
}
