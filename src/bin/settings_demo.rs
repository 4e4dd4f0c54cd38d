use authgate::settings::*;

fn main() -> anyhow::Result<()> {
    // $ cargo run --bin settings_demo -- --settings=settings/dev.toml status
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    println!("Loaded settings: {:#?}", project_settings);
    println!("Client options: {:#?}", project_settings.client_options());

    // An empty path is expected to fail
    println!("Error on invalid path: {:?}", parse_settings(Some("")).is_err());
    Ok(())
}
