use anyhow::Result;

fn main() -> Result<()> {
    daybook_cli::cli::run()
}
