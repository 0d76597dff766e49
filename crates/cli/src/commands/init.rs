//! `kyoryoku init`: write a starter config file.

use std::path::Path;

use kyoryoku_config::AppConfig;

pub fn run(config_path: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));

    println!("🦀 Kyoryoku Setup");
    println!("=================\n");

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created config directory: {}", dir.display());
        }
    }

    if path.exists() && !force {
        println!("⚠️  Config already exists at: {}", path.display());
        println!("   Edit it manually or re-run with --force.\n");
        return Ok(());
    }

    write_default(&path)?;
    println!("✅ Created config.toml at: {}", path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set ANTHROPIC_API_KEY (or add api_key to {})", path.display());
    println!("   2. Run: kyoryoku doctor");
    println!("   3. Run: kyoryoku support --request \"My invoice is wrong\"\n");

    Ok(())
}

fn write_default(path: &Path) -> std::io::Result<()> {
    std::fs::write(path, AppConfig::default_toml())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        run(Some(path.as_path()), false).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.default_provider, "anthropic");
        assert_eq!(config.concurrency.max_in_flight, 20);
    }

    #[test]
    fn existing_config_kept_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_model = \"custom\"\n").unwrap();

        run(Some(path.as_path()), false).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("custom"));

        run(Some(path.as_path()), true).unwrap();
        assert!(!std::fs::read_to_string(&path).unwrap().contains("custom"));
    }
}
