//! umbra CLI binary

use anyhow::Result;
use cli::run;

fn main() -> Result<()> {
    if !run()? {
        std::process::exit(1);
    }
    Ok(())
}
