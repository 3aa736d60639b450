//! diskadm - example storage-admin CLI built on hostmux.
//!
//! Runs entirely against a mock connector; try:
//!
//! ```text
//! diskadm --host node1 --host node2 pool list
//! diskadm --host node1 volume list tank
//! diskadm --host node1 --host down1 ping
//! diskadm --host node1            # interactive mode
//! ```

mod commands;
mod mock;

use hostmux::App;

use crate::mock::MockConnector;

fn main() {
    let app = App::builder("diskadm")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Example storage administration CLI (mock backend)")
        .connector(Box::new(MockConnector))
        .functions(commands::functions())
        .group_with_help("pool", "Storage pool operations", commands::pool_commands())
        .group_with_help("volume", "Volume operations", commands::volume_commands());

    let app = commands::top_commands()
        .into_iter()
        .fold(app, |app, spec| app.command(spec))
        .build()
        .unwrap_or_else(|err| {
            eprintln!("diskadm: {}", err);
            std::process::exit(1);
        });

    app.main();
}
