//! `directory` -- command-line client for the employee directory backend.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use directory_core::{format_cell, DynamicForm, FilterExpr, FilterSet, FormValue, SchemaFieldType};
use directory_client::config::{ClientConfig, ENV_BASE_URL};
use directory_client::controller::{ListStatus, RecordListController};
use directory_client::observability::init_tracing;
use directory_client::schema_store::{SchemaStatus, SchemaStore, SchemaView};
use directory_client::session::{SessionService, SessionState, StaticTokenProvider};
use directory_client::ApiClient;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "directory", version, about = "Employee directory command-line client")]
struct Cli {
    /// Backend origin, e.g. http://localhost:8080
    #[arg(long, global = true, env = ENV_BASE_URL)]
    base_url: Option<String>,

    /// Pre-issued bearer token
    #[arg(long, global = true, env = "DIRECTORY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the schema fields in display order
    Schema,
    /// List employees
    List {
        /// Zero-based page index
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        /// Field filter as `field=op:value` (op: contains, eq, gt, lt)
        #[arg(long = "filter")]
        filters: Vec<String>,
    },
    /// Create an employee from `name=value` attributes
    Create {
        #[arg(long = "attr", required = true)]
        attrs: Vec<String>,
    },
    /// Delete an employee (soft by default)
    Delete {
        id: String,
        /// Remove the record instead of flagging it deleted
        #[arg(long)]
        hard: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    config.log.json = cli.json_logs;
    init_tracing(&config.log);
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }

    let session = Arc::new(SessionService::new(Arc::new(StaticTokenProvider::new(cli.token))));
    if let SessionState::SignedOut = session.initialize().await {
        info!("no token configured, requests are unauthenticated");
    }

    let api = Arc::new(ApiClient::new(&config, session).context("building api client")?);
    let schema = SchemaStore::new(api.clone());
    let controller = RecordListController::new(api, &config);

    match cli.cmd {
        Cmd::Schema => {
            let view = load_schema(&schema).await?;
            println!("{} ({} sampled, generated {})", view.collection, view.sample_size, view.generated_at);
            for field in &view.fields {
                let marker = if field.required { "*" } else { "" };
                println!("  {}{marker}\t{}", field.name, field.field_type);
            }
        }
        Cmd::List {
            page,
            size,
            search,
            filters,
        } => {
            let view = load_schema(&schema).await?;
            let mut params = controller.snapshot().params;
            params.page = page.or(params.page);
            params.size = size.or(params.size);
            params.set_search(search.as_deref().unwrap_or_default());
            params.filters = parse_filters(&filters)?;

            if let ListStatus::Failed(err) = controller.list(params).await {
                return Err(err).context("listing employees");
            }
            let Some(page) = controller.snapshot().page else {
                bail!("no page returned");
            };
            let names: Vec<&str> = view.fields.iter().map(|f| f.name.as_str()).collect();
            println!("id\t{}", names.join("\t"));
            for record in &page.content {
                let cells: Vec<String> = names
                    .iter()
                    .map(|name| format_cell(record.attributes.get(*name)))
                    .collect();
                println!("{}\t{}", record.id, cells.join("\t"));
            }
            println!("{} ({} total)", page.position_label(), page.total_elements);
        }
        Cmd::Create { attrs } => {
            let view = load_schema(&schema).await?;
            let mut form = DynamicForm::new(view.fields.clone(), None, |_| {});
            for raw in &attrs {
                let (name, value) = raw
                    .split_once('=')
                    .with_context(|| format!("attribute `{raw}` is not name=value"))?;
                let is_flag = view
                    .fields
                    .iter()
                    .any(|f| f.name == name && f.field_type == SchemaFieldType::Boolean);
                let value = if is_flag {
                    FormValue::Flag(matches!(value, "true" | "1" | "yes" | "on"))
                } else {
                    FormValue::from(value)
                };
                form.set_value(name, value)?;
            }
            let attributes = form.submit()?;

            controller.begin_create();
            let record = controller
                .submit_form(attributes)
                .await
                .context("creating employee")?;
            if let Some(record) = record {
                println!("{}", record.id);
            }
        }
        Cmd::Delete { id, hard } => {
            controller
                .delete(&id, !hard)
                .await
                .with_context(|| format!("deleting {id}"))?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

async fn load_schema(store: &SchemaStore) -> Result<Arc<SchemaView>> {
    match store.refresh().await {
        SchemaStatus::Ready(view) => Ok(view),
        SchemaStatus::Failed(err) => Err(err).context("loading schema"),
        SchemaStatus::Loading => bail!("schema still loading"),
    }
}

fn parse_filters(raw: &[String]) -> Result<FilterSet> {
    let mut filters = FilterSet::new();
    for entry in raw {
        let (field, expr) = entry
            .split_once('=')
            .with_context(|| format!("filter `{entry}` is not field=op:value"))?;
        let expr = FilterExpr::parse(expr);
        if !filters.apply(field, expr.operator, &expr.value) {
            bail!("filter `{entry}` has an empty field or value");
        }
    }
    Ok(filters)
}
