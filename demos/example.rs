use dragon_conf::{ConfigError, Format, Store};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct DatabaseSection {
    host: String,
    port: u16,
    name: String,
}

const DEFAULTS: &str = r#"
[app]
name = "demo"
debug = false

[database]
host = "localhost"
port = 5432
name = "demo"
"#;

const OVERRIDES: &str = r#"{"app": {"debug": true, "tags": ["a", "b"]}, "database": {"port": 6543}}"#;

fn main() -> Result<(), ConfigError> {
    let mut store = Store::builder()
        .with_str(Format::Toml, DEFAULTS)
        .with_str(Format::Json, OVERRIDES)
        .build()?;

    store.set("app.version", "1.2.0")?;

    println!(
        "App: {} {} (debug={})",
        store.string("app.name"),
        store.string("app.version"),
        store.bool("app.debug")
    );
    println!("Tags: {:?}", store.strings("app.tags"));
    println!("Workers: {}", store.int_or("app.workers", 4));

    let mut database = DatabaseSection::default();
    store.map_struct("database", &mut database)?;
    println!("Database: {database:?}");

    Ok(())
}
