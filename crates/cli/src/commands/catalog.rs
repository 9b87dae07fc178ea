//! Product catalog commands run against the configured JSON store.

use std::sync::Arc;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use stockroom_core::catalog::ProductCatalogService;
use stockroom_core::config::AppConfig;
use stockroom_core::domain::product::{CreateProduct, PatchProduct, Product, UpdateProduct};
use stockroom_core::errors::ApplicationError;
use stockroom_db::JsonFileRepository;
use tracing::{info, warn};
use uuid::Uuid;

use crate::commands::CommandResult;

type Catalog = ProductCatalogService<JsonFileRepository<Product>>;

/// Product JSON arguments accept either inline JSON or `@path` to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCommand {
    List,
    Get { id: String },
    Create { input: String },
    Update { id: String, input: String },
    Patch { id: String, input: String },
    Remove { id: String },
    Deduct { id: String, quantity: i64 },
    Restore { id: String, quantity: i64 },
}

impl CatalogCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get { .. } => "get",
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Patch { .. } => "patch",
            Self::Remove { .. } => "remove",
            Self::Deduct { .. } => "deduct",
            Self::Restore { .. } => "restore",
        }
    }
}

enum CommandFailure {
    Input(anyhow::Error),
    Encode(serde_json::Error),
    Application(ApplicationError),
}

impl From<ApplicationError> for CommandFailure {
    fn from(error: ApplicationError) -> Self {
        Self::Application(error)
    }
}

pub fn run(config: &AppConfig, command: CatalogCommand) -> CommandResult {
    let name = command.name();
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::runtime_failure(name, error),
    };

    let path = config.products_path();
    info!(
        event_name = "cli.command.started",
        command = name,
        path = %path.display(),
        "running catalog command"
    );
    let catalog = ProductCatalogService::new(Arc::new(JsonFileRepository::open(path)));

    match runtime.block_on(dispatch(&catalog, command)) {
        Ok((message, data)) => CommandResult::success(name, message, Some(data)),
        Err(CommandFailure::Input(error)) => {
            CommandResult::failure(name, "invalid_input", format!("{error:#}"), 5)
        }
        Err(CommandFailure::Encode(error)) => {
            CommandResult::failure(name, "internal", format!("could not encode output: {error}"), 7)
        }
        Err(CommandFailure::Application(error)) => {
            let correlation_id = Uuid::new_v4().to_string();
            let interface = error.into_interface(correlation_id.as_str());
            warn!(
                event_name = "cli.command.failed",
                command = name,
                correlation_id = %correlation_id,
                error = %interface,
                "catalog command failed"
            );
            CommandResult::interface_failure(name, &interface)
        }
    }
}

async fn dispatch(
    catalog: &Catalog,
    command: CatalogCommand,
) -> Result<(String, Value), CommandFailure> {
    match command {
        CatalogCommand::List => {
            let products = catalog.find_all().await?;
            Ok((format!("{} products", products.len()), encode(&products)?))
        }
        CatalogCommand::Get { id } => {
            let product = catalog.find_one(&id).await?;
            Ok(("product found".to_string(), encode(&product)?))
        }
        CatalogCommand::Create { input } => {
            let input: CreateProduct = parse_input(&input)?;
            let product = catalog.create(input).await?;
            Ok(("product created".to_string(), encode(&product)?))
        }
        CatalogCommand::Update { id, input } => {
            let input: UpdateProduct = parse_input(&input)?;
            let product = catalog.update(&id, input).await?;
            Ok(("product replaced".to_string(), encode(&product)?))
        }
        CatalogCommand::Patch { id, input } => {
            let input: PatchProduct = parse_input(&input)?;
            let product = catalog.patch(&id, input).await?;
            Ok(("product patched".to_string(), encode(&product)?))
        }
        CatalogCommand::Remove { id } => {
            let product = catalog.remove(&id).await?;
            Ok(("product removed".to_string(), encode(&product)?))
        }
        CatalogCommand::Deduct { id, quantity } => {
            let product = catalog.deduct_stock(&id, quantity).await?;
            Ok((format!("deducted {quantity} units"), encode(&product)?))
        }
        CatalogCommand::Restore { id, quantity } => {
            let product = catalog.restore_stock(&id, quantity).await?;
            Ok((format!("restored {quantity} units"), encode(&product)?))
        }
    }
}

fn parse_input<T: DeserializeOwned>(raw: &str) -> Result<T, CommandFailure> {
    let body = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("could not read input file `{path}`"))
            .map_err(CommandFailure::Input)?,
        None => raw.to_string(),
    };
    serde_json::from_str(&body).context("malformed product JSON").map_err(CommandFailure::Input)
}

fn encode<T: Serialize>(value: &T) -> Result<Value, CommandFailure> {
    serde_json::to_value(value).map_err(CommandFailure::Encode)
}
