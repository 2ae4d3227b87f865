fn main() -> anyhow::Result<()> {
    quicknotes::cli::run()
}
