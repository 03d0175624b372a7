// ==========================================
// Excel 导入系统 - 命令行入口
// ==========================================

mod cli;

use clap::Parser;
use excel_import::app::{get_default_db_path, get_default_site_path, AppState};
use excel_import::domain::{FieldMapping, ProgressEvent};
use excel_import::logging;

use cli::{parse_pair, Cli, Commands};

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    let site_path = cli.site.unwrap_or_else(get_default_site_path);
    tracing::debug!(db_path = %db_path, site_path = %site_path.display(), "启动");

    let state = AppState::new(db_path, site_path)
        .await
        .map_err(anyhow::Error::msg)?;
    let api = state.import_api.clone();

    match cli.command {
        Commands::EntityTypes {
            search,
            offset,
            limit,
        } => {
            let names = api
                .list_importable_entity_types(search.as_deref(), offset, limit)
                .await
                .map_err(|e| anyhow::anyhow!("[{}] {}", e.code(), e))?;
            for name in names {
                println!("{name}");
            }
        }
        Commands::Preview { entity_type, file } => {
            let outcome = api.preview_import(&entity_type, &file).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Import {
            entity_type,
            file,
            no_create,
            no_update,
            user,
        } => {
            // 先订阅，避免错过早期事件
            let mut rx = state.events.subscribe();

            let response = api
                .start_import(&entity_type, &file, !no_create, !no_update, user.as_deref())
                .await
                .map_err(|e| anyhow::anyhow!("[{}] {}", e.code(), e))?;
            println!("{}", response.message);

            loop {
                let message = match rx.recv().await {
                    Ok(message) => message,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "进度事件积压，已跳过部分事件");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                let event: ProgressEvent = serde_json::from_value(message.payload)?;
                println!("[{:>3}%] {}", event.progress_percent, event.message);
                if event.status.is_terminal() {
                    break;
                }
            }

            state.runner.join_all().await;
        }
        Commands::Map {
            entity_type,
            pairs,
            unique,
        } => {
            let pairs = pairs
                .iter()
                .map(|raw| parse_pair(raw))
                .collect::<Result<Vec<_>, _>>()
                .map_err(anyhow::Error::msg)?;
            let mapping = FieldMapping::from_pairs(pairs);
            let columns = mapping.len();

            api.save_mapping(&entity_type, mapping, unique.as_deref())
                .await
                .map_err(|e| anyhow::anyhow!("[{}] {}", e.code(), e))?;
            println!("Saved {columns} column mappings for {entity_type}");
        }
    }

    Ok(())
}
