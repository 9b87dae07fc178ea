use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::{json, Value};
use stockroom_cli::commands::catalog::{self, CatalogCommand};
use stockroom_cli::commands::{config, CommandResult};
use stockroom_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.data_dir = dir.path().join("data");
    config
}

fn run(config: &AppConfig, command: CatalogCommand) -> (u8, Value) {
    let result: CommandResult = catalog::run(config, command);
    (result.exit_code, parse_payload(&result.output))
}

fn create(config: &AppConfig, sku: &str, stock: u32) -> Value {
    let input = json!({
        "sku": sku,
        "name": "Trail Mug",
        "description": "Enamel camping mug",
        "category": "outdoor",
        "brand": "Ridge",
        "price": 14.5,
        "stockQuantity": stock,
        "images": [],
    });
    let (exit_code, payload) = run(config, CatalogCommand::Create { input: input.to_string() });
    assert_eq!(exit_code, 0, "create failed: {payload}");
    payload["data"].clone()
}

fn id_of(product: &Value) -> String {
    product["id"].as_str().expect("product id").to_string()
}

#[test]
fn create_get_and_list_share_the_stored_product() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_in(&dir);
    let created = create(&config, "MUG-1", 4);

    assert_eq!(created["status"], "ACTIVE");
    assert!(created["weight"].is_null());

    let (exit_code, fetched) = run(&config, CatalogCommand::Get { id: id_of(&created) });
    assert_eq!(exit_code, 0);
    assert_eq!(fetched["command"], "get");
    assert_eq!(fetched["data"], created);

    let (exit_code, listed) = run(&config, CatalogCommand::List);
    assert_eq!(exit_code, 0);
    assert_eq!(listed["message"], "1 products");
    assert_eq!(listed["data"], json!([created]));
    assert!(config.products_path().exists());
}

#[test]
fn duplicate_sku_is_a_bad_request() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_in(&dir);
    create(&config, "MUG-1", 4);

    let input = json!({
        "sku": "MUG-1", "name": "n", "description": "d", "category": "c", "brand": "b",
        "price": 1, "stockQuantity": 1
    });
    let (exit_code, payload) = run(&config, CatalogCommand::Create { input: input.to_string() });

    assert_eq!(exit_code, 5);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "bad_request");
    assert_eq!(payload["message"], "SKU already exists");
}

#[test]
fn malformed_json_is_rejected_before_storage() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_in(&dir);

    let (exit_code, payload) =
        run(&config, CatalogCommand::Create { input: "{\"sku\": \"A1\"".to_string() });

    assert_eq!(exit_code, 5);
    assert_eq!(payload["error_class"], "invalid_input");
    assert!(payload["message"].as_str().expect("message").starts_with("malformed product JSON"));
    assert!(!config.products_path().exists());
}

#[test]
fn create_reads_input_from_file_reference() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_in(&dir);
    let input_path = dir.path().join("lamp.json");
    std::fs::write(
        &input_path,
        r#"{"sku":"LAMP-9","name":"Lamp","description":"","category":"home","brand":"Lumen",
            "price":39.99,"stockQuantity":0,"weight":1.25}"#,
    )
    .expect("write input");

    let (exit_code, payload) = run(
        &config,
        CatalogCommand::Create { input: format!("@{}", input_path.display()) },
    );

    assert_eq!(exit_code, 0, "{payload}");
    assert_eq!(payload["data"]["sku"], "LAMP-9");
    assert_eq!(payload["data"]["weight"], 1.25);
    assert_eq!(payload["data"]["status"], "OUT_OF_STOCK");
}

#[test]
fn stock_commands_follow_quantity_and_status() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_in(&dir);
    let id = id_of(&create(&config, "MUG-1", 3));

    let (exit_code, drained) = run(&config, CatalogCommand::Deduct { id: id.clone(), quantity: 3 });
    assert_eq!(exit_code, 0);
    assert_eq!(drained["data"]["stockQuantity"], 0);
    assert_eq!(drained["data"]["status"], "OUT_OF_STOCK");

    let (exit_code, rejected) =
        run(&config, CatalogCommand::Deduct { id: id.clone(), quantity: 1 });
    assert_eq!(exit_code, 5);
    assert_eq!(rejected["error_class"], "bad_request");

    let (exit_code, rejected) =
        run(&config, CatalogCommand::Restore { id: id.clone(), quantity: -2 });
    assert_eq!(exit_code, 5);
    assert_eq!(rejected["error_class"], "bad_request");

    let (exit_code, restored) = run(&config, CatalogCommand::Restore { id, quantity: 2 });
    assert_eq!(exit_code, 0);
    assert_eq!(restored["message"], "restored 2 units");
    assert_eq!(restored["data"]["stockQuantity"], 2);
    assert_eq!(restored["data"]["status"], "ACTIVE");
}

#[test]
fn patch_and_update_change_the_stored_product() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_in(&dir);
    let created = create(&config, "MUG-1", 3);
    let id = id_of(&created);

    let (exit_code, patched) = run(
        &config,
        CatalogCommand::Patch { id: id.clone(), input: r#"{"name":"Trail Mug XL"}"#.to_string() },
    );
    assert_eq!(exit_code, 0);
    assert_eq!(patched["data"]["name"], "Trail Mug XL");
    assert_eq!(patched["data"]["sku"], "MUG-1");

    let replacement = json!({
        "sku": "MUG-2", "name": "Mug", "description": "", "category": "outdoor",
        "brand": "Ridge", "price": 12, "stockQuantity": 8, "images": [], "status": "INACTIVE"
    });
    let (exit_code, updated) = run(
        &config,
        CatalogCommand::Update { id: id.clone(), input: replacement.to_string() },
    );
    assert_eq!(exit_code, 0, "{updated}");
    assert_eq!(updated["data"]["id"], created["id"]);
    assert_eq!(updated["data"]["createdAt"], created["createdAt"]);
    assert_eq!(updated["data"]["sku"], "MUG-2");
    assert_eq!(updated["data"]["status"], "INACTIVE");
}

#[test]
fn removed_product_is_not_found_afterwards() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_in(&dir);
    let id = id_of(&create(&config, "MUG-1", 3));

    let (exit_code, removed) = run(&config, CatalogCommand::Remove { id: id.clone() });
    assert_eq!(exit_code, 0);
    assert_eq!(removed["data"]["sku"], "MUG-1");

    let (exit_code, missing) = run(&config, CatalogCommand::Get { id: id.clone() });
    assert_eq!(exit_code, 4);
    assert_eq!(missing["error_class"], "not_found");
    assert_eq!(missing["message"], format!("product with id '{id}' not found"));
}

#[test]
fn corrupt_store_is_an_internal_error() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_in(&dir);
    std::fs::create_dir_all(&config.storage.data_dir).expect("data dir");
    std::fs::write(config.products_path(), "{{ torn").expect("write garbage");

    let (exit_code, payload) = run(&config, CatalogCommand::List);

    assert_eq!(exit_code, 7);
    assert_eq!(payload["error_class"], "internal");
}

#[test]
fn unreadable_data_dir_is_storage_unavailable() {
    let dir = TempDir::new().expect("tempdir");
    let config = config_in(&dir);
    std::fs::write(&config.storage.data_dir, "not a directory").expect("block data dir");

    let (exit_code, payload) = run(&config, CatalogCommand::List);

    assert_eq!(exit_code, 6);
    assert_eq!(payload["error_class"], "storage_unavailable");
}

#[test]
fn config_reports_env_sources() {
    let dir = TempDir::new().expect("tempdir");
    let data_dir = dir.path().display().to_string();

    let vars = [("STOCKROOM_STORAGE_DATA_DIR", data_dir.as_str()), ("STOCKROOM_LOG_LEVEL", "debug")];
    with_env(&vars, || {
        let loaded = AppConfig::load(LoadOptions::default()).expect("load config");
        let result = config::run(&loaded, None, &ConfigOverrides::default());
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let data = &payload["data"];
        assert_eq!(payload["command"], "config");
        assert_eq!(data["storage.data_dir"]["value"], data_dir.as_str());
        assert_eq!(data["storage.data_dir"]["source"], "env (STOCKROOM_STORAGE_DATA_DIR)");
        assert_eq!(data["logging.level"]["value"], "debug");
        assert_eq!(data["logging.level"]["source"], "env (STOCKROOM_LOG_LEVEL)");
        assert_eq!(data["storage.products_file"]["value"], "products.json");
        assert_eq!(data["storage.products_path"]["source"], "derived");
    });
}

#[test]
fn config_reports_explicit_file_sources() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("stockroom.toml");
    std::fs::write(&path, "[storage]\nproducts_file = \"catalog.json\"\n").expect("write toml");

    with_env(&[], || {
        let loaded = AppConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect("load config");
        let payload = parse_payload(
            &config::run(&loaded, Some(&path), &ConfigOverrides::default()).output,
        );

        assert_eq!(payload["data"]["storage.products_file"]["value"], "catalog.json");
        assert_eq!(
            payload["data"]["storage.products_file"]["source"],
            format!("file ({})", path.display())
        );
        assert_eq!(payload["data"]["logging.format"]["source"], "default");
    });
}

#[test]
fn config_attributes_data_dir_flag_over_env() {
    let env_dir = TempDir::new().expect("tempdir");
    let flag_dir = TempDir::new().expect("tempdir");
    let env_value = env_dir.path().display().to_string();

    with_env(&[("STOCKROOM_STORAGE_DATA_DIR", env_value.as_str())], || {
        let overrides = ConfigOverrides {
            data_dir: Some(flag_dir.path().to_path_buf()),
            ..ConfigOverrides::default()
        };
        let loaded = AppConfig::load(LoadOptions {
            overrides: overrides.clone(),
            ..LoadOptions::default()
        })
        .expect("load config");
        let payload = parse_payload(&config::run(&loaded, None, &overrides).output);

        let data_dir = &payload["data"]["storage.data_dir"];
        assert_eq!(data_dir["value"], flag_dir.path().display().to_string());
        assert_eq!(data_dir["source"], "cli (--data-dir)");
        assert_eq!(payload["data"]["storage.products_file"]["source"], "default");
    });
}

#[test]
fn config_ignores_blank_env_values_when_attributing() {
    let vars = [("STOCKROOM_LOG_LEVEL", "   "), ("STOCKROOM_LOGGING_FORMAT", "")];
    with_env(&vars, || {
        let loaded = AppConfig::load(LoadOptions::default()).expect("load config");
        let payload =
            parse_payload(&config::run(&loaded, None, &ConfigOverrides::default()).output);

        assert_eq!(payload["data"]["logging.level"]["value"], "info");
        assert_eq!(payload["data"]["logging.level"]["source"], "default");
        assert_eq!(payload["data"]["logging.format"]["source"], "default");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "STOCKROOM_STORAGE_DATA_DIR",
        "STOCKROOM_STORAGE_PRODUCTS_FILE",
        "STOCKROOM_LOGGING_LEVEL",
        "STOCKROOM_LOGGING_FORMAT",
        "STOCKROOM_LOG_LEVEL",
        "STOCKROOM_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
