use anyhow::Result;

fn main() -> Result<()> {
    draftboard::cli::run()
}
